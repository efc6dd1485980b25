//! Type picker fragments: each editor renders itself as a selectable choice
//! and [`render_type_select`] joins them into one `<select>` with a configure
//! button. [`resolve_selection`] is the inverse, mapping a picked option back
//! to an editor.

use std::fmt;

use futures::future::try_join_all;

use crate::{
    definition::TypeDefinition,
    error::Result,
    registry::{EditorDescriptor, ValueTypeEditor},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeChoice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// How one editor appears in a type picker. Editors with sub-types (an id
/// type editor offering one option per known id type, say) render a group
/// whose options carry sub-type values; the group carries the editor id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionMarkup {
    Single(TypeChoice),
    Group {
        type_id: String,
        label: String,
        options: Vec<TypeChoice>,
    },
}

impl OptionMarkup {
    pub fn single(descriptor: &EditorDescriptor, current: Option<&str>) -> Self {
        OptionMarkup::Single(TypeChoice {
            value: descriptor.id.clone(),
            label: descriptor.name.clone(),
            selected: current == Some(descriptor.id.as_str()),
        })
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

impl fmt::Display for TypeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selected = if self.selected {
            " selected=\"selected\""
        } else {
            ""
        };
        write!(
            f,
            "<option value=\"{}\"{selected}>{}</option>",
            escape(&self.value),
            escape(&self.label)
        )
    }
}

impl fmt::Display for OptionMarkup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionMarkup::Single(choice) => write!(f, "{choice}"),
            OptionMarkup::Group {
                type_id,
                label,
                options,
            } => {
                write!(
                    f,
                    "<optgroup label=\"{}\" data-type=\"{}\">",
                    escape(label),
                    escape(type_id)
                )?;
                for choice in options {
                    write!(f, "{choice}")?;
                }
                write!(f, "</optgroup>")
            }
        }
    }
}

/// Renders the picker for one column. The configure button is disabled
/// unless `current` offers an option editor.
pub async fn render_type_select<R>(
    editors: &[ValueTypeEditor<R>],
    current: Option<&ValueTypeEditor<R>>,
    def: &TypeDefinition,
    empty_one: bool,
) -> Result<String> {
    let current_id = current.map(ValueTypeEditor::id);
    let options = try_join_all(
        editors
            .iter()
            .map(|editor| editor.options_markup(current_id, def)),
    )
    .await?;

    let mut html = String::from("<select class=\"form-control\">\n");
    if empty_one {
        html.push_str("<option value=\"\"></option>\n");
    }
    for option in &options {
        html.push_str(&option.to_string());
        html.push('\n');
    }
    html.push_str("</select>\n");
    let disabled = if current.is_some_and(ValueTypeEditor::has_editor) {
        ""
    } else {
        " disabled=\"disabled\""
    };
    html.push_str(&format!(
        "<span class=\"input-group-btn\"><button class=\"btn btn-secondary\"{disabled} type=\"button\"><i class=\"glyphicon glyphicon-cog\"></i></button></span>"
    ));
    Ok(html)
}

/// Outcome of picking an option in a type picker.
#[derive(Debug)]
pub struct Selection<'a, R> {
    pub editor: Option<&'a ValueTypeEditor<R>>,
    /// Whether the column should be handled as an identifier column.
    pub identifier: bool,
    /// Whether the configure button applies.
    pub configurable: bool,
}

/// Maps a picked `value` back to its editor and records it on `def`.
///
/// For options inside a group, `group` is the group's editor id and `value`
/// the sub-type; the sub-type is stored on `def` under the editor id.
pub fn resolve_selection<'a, R>(
    editors: &'a [ValueTypeEditor<R>],
    value: &str,
    group: Option<&str>,
    def: &mut TypeDefinition,
) -> Selection<'a, R> {
    let editor = match group {
        None => editors.iter().find(|editor| editor.id() == value),
        Some(type_id) => {
            let editor = editors.iter().find(|editor| editor.id() == type_id);
            def.set_extra(type_id, value);
            editor
        }
    };
    def.type_id = editor.map(|editor| editor.id().to_string()).unwrap_or_default();
    Selection {
        editor,
        identifier: editor.is_none_or(ValueTypeEditor::is_implicit),
        configurable: editor.is_some_and(ValueTypeEditor::has_editor),
    }
}
