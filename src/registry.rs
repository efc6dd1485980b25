//! Editor registry.
//!
//! Value types are contributed as plugins under [`EXTENSION_POINT`]: a
//! descriptor (id, display name, priority, implicit flag) plus a factory that
//! builds the implementation on demand. Lookups hand out [`ValueTypeEditor`]
//! wrappers, which stamp the definition's type id before delegating and make
//! parsing always guess options first.

use std::fmt;

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    accessor::Accessor,
    definition::TypeDefinition,
    dialog::{Dialog, EditOutcome},
    error::{Result, ValueTypeError},
    markup::OptionMarkup,
    valuetype::{CategoricalType, MatrixType, NumericalType, StringType, ValueType},
};

pub const EXTENSION_POINT: &str = "importer_value_type";

/// Priority of descriptors that do not declare one. Lower wins.
pub const DEFAULT_PRIORITY: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default)]
    pub implicit: bool,
}

impl EditorDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: None,
            implicit: false,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_implicit(mut self, implicit: bool) -> Self {
        self.implicit = implicit;
        self
    }

    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

/// A value type bound to its descriptor.
pub struct ValueTypeEditor<R> {
    desc: EditorDescriptor,
    implementation: Box<dyn ValueType<R>>,
}

impl<R> fmt::Debug for ValueTypeEditor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTypeEditor")
            .field("desc", &self.desc)
            .finish_non_exhaustive()
    }
}

impl<R> ValueTypeEditor<R> {
    pub fn new(desc: EditorDescriptor, implementation: Box<dyn ValueType<R>>) -> Self {
        Self {
            desc,
            implementation,
        }
    }

    pub fn id(&self) -> &str {
        &self.desc.id
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn priority(&self) -> i32 {
        self.desc.effective_priority()
    }

    pub fn is_implicit(&self) -> bool {
        self.desc.implicit
    }

    pub fn has_editor(&self) -> bool {
        self.implementation.has_editor()
    }

    pub fn descriptor(&self) -> &EditorDescriptor {
        &self.desc
    }

    pub async fn is_type(
        &self,
        name: &str,
        index: usize,
        data: &[R],
        accessor: &dyn Accessor<R>,
        sample_size: usize,
    ) -> Result<f64> {
        self.implementation
            .is_type(name, index, data, accessor, sample_size)
            .await
    }

    pub async fn guess_options(
        &self,
        def: &mut TypeDefinition,
        data: &[R],
        accessor: &dyn Accessor<R>,
    ) -> Result<()> {
        def.type_id = self.desc.id.clone();
        self.implementation.guess_options(def, data, accessor).await
    }

    /// Stamps the type id, fills absent options from the data, then converts
    /// every row. Returns the invalid row indices in ascending order.
    pub async fn parse(
        &self,
        def: &mut TypeDefinition,
        data: &mut [R],
        accessor: &dyn Accessor<R>,
    ) -> Result<Vec<usize>> {
        def.type_id = self.desc.id.clone();
        self.implementation.guess_options(def, data, accessor).await?;
        Ok(self.implementation.parse(def, data, accessor))
    }

    pub async fn edit(&self, def: &mut TypeDefinition, dialog: &dyn Dialog) -> Result<EditOutcome> {
        def.type_id = self.desc.id.clone();
        self.implementation.edit(def, dialog).await
    }

    pub async fn options_markup(
        &self,
        current: Option<&str>,
        def: &TypeDefinition,
    ) -> Result<OptionMarkup> {
        self.implementation
            .options_markup(&self.desc, current, def)
            .await
    }
}

/// Wraps an implementation that was never registered.
pub fn create_custom_editor<R>(
    name: impl Into<String>,
    id: impl Into<String>,
    implicit: bool,
    implementation: impl ValueType<R> + 'static,
) -> ValueTypeEditor<R> {
    ValueTypeEditor::new(
        EditorDescriptor::new(id, name).with_implicit(implicit),
        Box::new(implementation),
    )
}

type Factory<R> = Box<dyn Fn() -> Box<dyn ValueType<R>>>;

fn factory<R: 'static, T>(value_type: T) -> Factory<R>
where
    T: ValueType<R> + Copy + 'static,
{
    Box::new(move || -> Box<dyn ValueType<R>> { Box::new(value_type) })
}

struct Plugin<R> {
    desc: EditorDescriptor,
    factory: Factory<R>,
}

/// Plugins of one extension point, unique by id.
pub struct EditorRegistry<R> {
    plugins: Vec<Plugin<R>>,
}

impl<R: 'static> Default for EditorRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: 'static> EditorRegistry<R> {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// Registry holding the four built-in value types under their five ids.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(EditorDescriptor, Factory<R>); 5] = [
            (
                EditorDescriptor::new("real", "Float").with_priority(10),
                factory(NumericalType),
            ),
            (
                EditorDescriptor::new("int", "Integer").with_priority(20),
                factory(NumericalType),
            ),
            (
                EditorDescriptor::new("matrix", "Matrix").with_priority(30),
                factory(MatrixType),
            ),
            (
                EditorDescriptor::new("categorical", "Categorical").with_priority(40),
                factory(CategoricalType),
            ),
            (
                EditorDescriptor::new("string", "String").with_priority(DEFAULT_PRIORITY),
                factory(StringType),
            ),
        ];
        for (desc, factory) in builtins {
            registry.plugins.push(Plugin { desc, factory });
        }
        registry
    }

    pub fn register<F>(&mut self, desc: EditorDescriptor, factory: F) -> Result<()>
    where
        F: Fn() -> Box<dyn ValueType<R>> + 'static,
    {
        if self.contains(&desc.id) {
            return Err(ValueTypeError::DuplicateId { id: desc.id });
        }
        debug!("Registered {EXTENSION_POINT} plugin '{}'", desc.id);
        self.plugins.push(Plugin {
            desc,
            factory: Box::new(factory),
        });
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.plugins.iter().any(|plugin| plugin.desc.id == id)
    }

    /// Descriptors ordered by display name.
    pub fn list(&self) -> Vec<&EditorDescriptor> {
        self.plugins
            .iter()
            .map(|plugin| &plugin.desc)
            .sorted_by(|a, b| compare_names(&a.name, &b.name))
            .collect()
    }

    pub async fn create_editor(&self, id: &str) -> Result<ValueTypeEditor<R>> {
        let plugin = self
            .plugins
            .iter()
            .find(|plugin| plugin.desc.id == id)
            .ok_or_else(|| ValueTypeError::not_found(id))?;
        Ok(ValueTypeEditor::new(plugin.desc.clone(), (plugin.factory)()))
    }

    /// One editor per plugin, ordered by display name.
    pub async fn create_editors(&self) -> Vec<ValueTypeEditor<R>> {
        self.plugins
            .iter()
            .sorted_by(|a, b| compare_names(&a.desc.name, &b.desc.name))
            .map(|plugin| ValueTypeEditor::new(plugin.desc.clone(), (plugin.factory)()))
            .collect()
    }
}

fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
