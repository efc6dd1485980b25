//! Type definitions: the persisted record of a column's chosen value type and
//! its type-specific options.
//!
//! A definition serialises as a flat record, `{type: "<id>", ...options}`,
//! mirroring what the column metadata of an import stores. In memory the
//! options are split into one struct per built-in value type so that each
//! editor works with typed fields, while keys that belong to no built-in type
//! (sub-type selections of custom editors, for example) are kept verbatim in
//! [`TypeDefinition::extras`].
//!
//! Every option field is optional. An absent field means "not guessed yet";
//! option guessing fills absent fields only, which is what keeps repeated
//! guessing from clobbering user edits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTypeDefinition", into = "RawTypeDefinition")]
pub struct TypeDefinition {
    /// Id of the value type that owns this definition.
    pub type_id: String,
    pub options: TypeOptions,
    pub extras: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum TypeOptions {
    #[default]
    Empty,
    String(StringOptions),
    Categorical(CategoricalOptions),
    Numerical(NumericalOptions),
    Matrix(MatrixOptions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionsKind {
    String,
    Categorical,
    Numerical,
    Matrix,
}

const STRING_FIELDS: &[&str] = &["convert", "regexFrom", "regexTo"];
const CATEGORICAL_FIELDS: &[&str] = &["categories"];
const NUMERICAL_FIELDS: &[&str] = &["range"];
const MATRIX_FIELDS: &[&str] = &["range", "dataLength", "colorRange", "labels"];

impl OptionsKind {
    fn fields(self) -> &'static [&'static str] {
        match self {
            OptionsKind::String => STRING_FIELDS,
            OptionsKind::Categorical => CATEGORICAL_FIELDS,
            OptionsKind::Numerical => NUMERICAL_FIELDS,
            OptionsKind::Matrix => MATRIX_FIELDS,
        }
    }

    fn sniff(map: &Map<String, JsonValue>) -> Option<Self> {
        let has = |keys: &[&str]| keys.iter().any(|key| map.contains_key(*key));
        if has(CATEGORICAL_FIELDS) {
            Some(OptionsKind::Categorical)
        } else if has(&["dataLength", "colorRange", "labels"]) {
            Some(OptionsKind::Matrix)
        } else if has(NUMERICAL_FIELDS) {
            Some(OptionsKind::Numerical)
        } else if has(STRING_FIELDS) {
            Some(OptionsKind::String)
        } else {
            None
        }
    }
}

/// Text conversion applied by the string value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StringConversion {
    ToUpperCase,
    ToLowerCase,
    Regex,
    /// Unrecognised conversion name; treated as "no transform configured".
    Other(String),
}

impl StringConversion {
    pub fn as_str(&self) -> &str {
        match self {
            StringConversion::ToUpperCase => "toUpperCase",
            StringConversion::ToLowerCase => "toLowerCase",
            StringConversion::Regex => "regex",
            StringConversion::Other(other) => other,
        }
    }
}

impl From<String> for StringConversion {
    fn from(value: String) -> Self {
        match value.as_str() {
            "toUpperCase" => StringConversion::ToUpperCase,
            "toLowerCase" => StringConversion::ToLowerCase,
            "regex" => StringConversion::Regex,
            _ => StringConversion::Other(value),
        }
    }
}

impl From<StringConversion> for String {
    fn from(value: StringConversion) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convert: Option<StringConversion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub color: String,
}

impl Category {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoricalOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericalOptions {
    #[serde(default, with = "bounds", skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixOptions {
    #[serde(default, with = "bounds", skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_range: Option<[String; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

/// Range bounds stay numbers when finite. NaN and the infinities are written
/// as `"NaN"`, `"inf"` and `"-inf"`, and a `null` bound reads back as NaN.
mod bounds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Bound {
        Number(f64),
        Text(String),
        Missing(()),
    }

    impl From<f64> for Bound {
        fn from(value: f64) -> Self {
            if value.is_finite() {
                Bound::Number(value)
            } else {
                Bound::Text(value.to_string())
            }
        }
    }

    impl Bound {
        fn value<E: Error>(self) -> Result<f64, E> {
            match self {
                Bound::Number(value) => Ok(value),
                Bound::Text(text) => text
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| E::custom(format!("invalid range bound '{text}'"))),
                Bound::Missing(()) => Ok(f64::NAN),
            }
        }
    }

    pub fn serialize<S: Serializer>(
        range: &Option<[f64; 2]>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        range
            .map(|[min, max]| [Bound::from(min), Bound::from(max)])
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<[f64; 2]>, D::Error> {
        match Option::<[Bound; 2]>::deserialize(deserializer)? {
            Some([min, max]) => Ok(Some([min.value()?, max.value()?])),
            None => Ok(None),
        }
    }
}

impl TypeDefinition {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            ..Self::default()
        }
    }

    pub fn string_options(&self) -> Option<&StringOptions> {
        match &self.options {
            TypeOptions::String(options) => Some(options),
            _ => None,
        }
    }

    pub fn categorical_options(&self) -> Option<&CategoricalOptions> {
        match &self.options {
            TypeOptions::Categorical(options) => Some(options),
            _ => None,
        }
    }

    pub fn numerical_options(&self) -> Option<&NumericalOptions> {
        match &self.options {
            TypeOptions::Numerical(options) => Some(options),
            _ => None,
        }
    }

    pub fn matrix_options(&self) -> Option<&MatrixOptions> {
        match &self.options {
            TypeOptions::Matrix(options) => Some(options),
            _ => None,
        }
    }

    /// Switches the options to the string layout, carrying over any fields
    /// the previous options share with it.
    pub fn string_options_mut(&mut self) -> &mut StringOptions {
        if !matches!(self.options, TypeOptions::String(_)) {
            self.options = TypeOptions::String(self.options.carry_over());
        }
        match &mut self.options {
            TypeOptions::String(options) => options,
            _ => unreachable!("options were just converted to string"),
        }
    }

    pub fn categorical_options_mut(&mut self) -> &mut CategoricalOptions {
        if !matches!(self.options, TypeOptions::Categorical(_)) {
            self.options = TypeOptions::Categorical(self.options.carry_over());
        }
        match &mut self.options {
            TypeOptions::Categorical(options) => options,
            _ => unreachable!("options were just converted to categorical"),
        }
    }

    pub fn numerical_options_mut(&mut self) -> &mut NumericalOptions {
        if !matches!(self.options, TypeOptions::Numerical(_)) {
            self.options = TypeOptions::Numerical(self.options.carry_over());
        }
        match &mut self.options {
            TypeOptions::Numerical(options) => options,
            _ => unreachable!("options were just converted to numerical"),
        }
    }

    pub fn matrix_options_mut(&mut self) -> &mut MatrixOptions {
        if !matches!(self.options, TypeOptions::Matrix(_)) {
            self.options = TypeOptions::Matrix(self.options.carry_over());
        }
        match &mut self.options {
            TypeOptions::Matrix(options) => options,
            _ => unreachable!("options were just converted to matrix"),
        }
    }

    pub fn extra(&self, key: &str) -> Option<&JsonValue> {
        self.extras.get(key)
    }

    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.extras.insert(key.into(), value.into());
    }
}

impl TypeOptions {
    fn to_map(&self) -> Map<String, JsonValue> {
        let value = match self {
            TypeOptions::Empty => return Map::new(),
            TypeOptions::String(options) => serde_json::to_value(options),
            TypeOptions::Categorical(options) => serde_json::to_value(options),
            TypeOptions::Numerical(options) => serde_json::to_value(options),
            TypeOptions::Matrix(options) => serde_json::to_value(options),
        };
        match value {
            Ok(JsonValue::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn carry_over<T: DeserializeOwned + Default>(&self) -> T {
        let map = self.to_map();
        if map.is_empty() {
            return T::default();
        }
        serde_json::from_value(JsonValue::Object(map)).unwrap_or_default()
    }

    fn from_kind(kind: OptionsKind, map: Map<String, JsonValue>) -> Option<Self> {
        let value = JsonValue::Object(map);
        let options = match kind {
            OptionsKind::String => TypeOptions::String(serde_json::from_value(value).ok()?),
            OptionsKind::Categorical => {
                TypeOptions::Categorical(serde_json::from_value(value).ok()?)
            }
            OptionsKind::Numerical => TypeOptions::Numerical(serde_json::from_value(value).ok()?),
            OptionsKind::Matrix => TypeOptions::Matrix(serde_json::from_value(value).ok()?),
        };
        Some(options)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawTypeDefinition {
    #[serde(rename = "type", default)]
    type_id: String,
    #[serde(flatten)]
    fields: Map<String, JsonValue>,
}

impl From<RawTypeDefinition> for TypeDefinition {
    fn from(raw: RawTypeDefinition) -> Self {
        let RawTypeDefinition { type_id, fields } = raw;
        let Some(kind) = OptionsKind::sniff(&fields) else {
            return TypeDefinition {
                type_id,
                options: TypeOptions::Empty,
                extras: fields.into_iter().collect(),
            };
        };

        let (owned, rest): (Map<String, JsonValue>, Map<String, JsonValue>) = fields
            .into_iter()
            .partition(|(key, _)| kind.fields().contains(&key.as_str()));
        match TypeOptions::from_kind(kind, owned.clone()) {
            Some(options) => TypeDefinition {
                type_id,
                options,
                extras: rest.into_iter().collect(),
            },
            None => TypeDefinition {
                type_id,
                options: TypeOptions::Empty,
                extras: owned.into_iter().chain(rest).collect(),
            },
        }
    }
}

impl From<TypeDefinition> for RawTypeDefinition {
    fn from(definition: TypeDefinition) -> Self {
        let mut fields = definition.options.to_map();
        for (key, value) in definition.extras {
            fields.entry(key).or_insert(value);
        }
        RawTypeDefinition {
            type_id: definition.type_id,
            fields,
        }
    }
}
