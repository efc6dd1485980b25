use async_trait::async_trait;
use log::warn;
use regex::{NoExpand, Regex};

use super::ValueType;
use crate::{
    accessor::Accessor,
    data::Value,
    definition::{StringConversion, StringOptions, TypeDefinition},
    dialog::{Dialog, EditOutcome, FieldKind, Form, FormField},
    error::Result,
};

/// Catch-all text type. Always fully confident, so it must carry the least
/// preferred priority to win only when nothing else qualifies.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

enum Transform {
    Upper,
    Lower,
    Replace(Regex, String),
}

impl Transform {
    fn from_options(options: &StringOptions) -> Option<Self> {
        match options.convert.as_ref()? {
            StringConversion::ToUpperCase => Some(Transform::Upper),
            StringConversion::ToLowerCase => Some(Transform::Lower),
            StringConversion::Regex => {
                let pattern = options.regex_from.as_deref()?;
                match Regex::new(pattern) {
                    Ok(regex) => Some(Transform::Replace(
                        regex,
                        options.regex_to.clone().unwrap_or_default(),
                    )),
                    Err(err) => {
                        warn!("Ignoring string conversion with invalid pattern '{pattern}': {err}");
                        None
                    }
                }
            }
            StringConversion::Other(_) => None,
        }
    }

    fn apply(&self, value: &str) -> String {
        match self {
            Transform::Upper => value.to_uppercase(),
            Transform::Lower => value.to_lowercase(),
            Transform::Replace(regex, replacement) => regex
                .replace(value, NoExpand(replacement.as_str()))
                .into_owned(),
        }
    }
}

const CONVERT_CHOICES: &[(&str, &str)] = &[
    ("", "None"),
    ("toUpperCase", "UPPER CASE"),
    ("toLowerCase", "lower case"),
    ("regex", "Regex Replacement"),
];

#[async_trait(?Send)]
impl<R> ValueType<R> for StringType {
    async fn is_type(
        &self,
        _name: &str,
        _index: usize,
        _data: &[R],
        _accessor: &dyn Accessor<R>,
        _sample_size: usize,
    ) -> Result<f64> {
        Ok(1.0)
    }

    async fn guess_options(
        &self,
        def: &mut TypeDefinition,
        _data: &[R],
        _accessor: &dyn Accessor<R>,
    ) -> Result<()> {
        // an absent conversion already means "none"
        def.string_options_mut();
        Ok(())
    }

    fn parse(
        &self,
        def: &TypeDefinition,
        data: &mut [R],
        accessor: &dyn Accessor<R>,
    ) -> Vec<usize> {
        let Some(transform) = def.string_options().and_then(Transform::from_options) else {
            return Vec::new();
        };
        for row in data.iter_mut() {
            let converted = accessor.read(row).map(|value| transform.apply(&value));
            if let Some(converted) = converted {
                accessor.write(row, Value::Text(converted));
            }
        }
        Vec::new()
    }

    fn has_editor(&self) -> bool {
        true
    }

    async fn edit(&self, def: &mut TypeDefinition, dialog: &dyn Dialog) -> Result<EditOutcome> {
        let current = def.string_options().cloned().unwrap_or_default();
        let convert = current
            .convert
            .as_ref()
            .map(|c| c.as_str().to_string())
            .unwrap_or_default();
        let regex_selected = convert == "regex";
        let choices = CONVERT_CHOICES
            .iter()
            .map(|(value, label)| (value.to_string(), label.to_string()))
            .collect();
        let form = Form::new("Edit String Conversion", "string")
            .field(FormField::new(
                "string-convert",
                "Text Conversion",
                FieldKind::Choice(choices),
                convert,
            ))
            .field(
                FormField::new(
                    "regexFrom",
                    "Regex Search Expression",
                    FieldKind::Text,
                    current.regex_from.clone().unwrap_or_default(),
                )
                .disabled(!regex_selected),
            )
            .field(
                FormField::new(
                    "regexTo",
                    "Regex Replacement Expression",
                    FieldKind::Text,
                    current.regex_to.clone().unwrap_or_default(),
                )
                .disabled(!regex_selected),
            );
        let Some(response) = dialog.prompt(form).await? else {
            return Ok(EditOutcome::Cancelled);
        };

        let convert = response
            .get("string-convert")
            .filter(|value| !value.is_empty())
            .map(|value| StringConversion::from(value.to_string()));
        let is_regex = convert == Some(StringConversion::Regex);
        let options = def.string_options_mut();
        options.regex_from = is_regex
            .then(|| response.get("regexFrom").unwrap_or_default().to_string());
        options.regex_to = is_regex
            .then(|| response.get("regexTo").unwrap_or_default().to_string());
        options.convert = convert;
        Ok(EditOutcome::Saved)
    }
}
