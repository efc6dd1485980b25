use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use super::{Extent, ValueType, leading_float, sample_window};
use crate::{
    accessor::Accessor,
    data::Value,
    definition::TypeDefinition,
    dialog::{Dialog, EditOutcome, FieldKind, Form, FormField},
    error::Result,
};

pub const DEFAULT_NUMERICAL_RANGE: [f64; 2] = [0.0, 100.0];

/// Type id whose parse keeps integers; every other id parses floats.
const INTEGER_TYPE_ID: &str = "int";

/// Integer and real numbers. Null, blank, and `NaN` cells count as missing:
/// they are skipped during detection and become NaN when parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericalType;

fn float_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*-?([0-9]*\.?[0-9]+|[0-9]+\.?[0-9]*)(e[-+]?[0-9]+)?\s*$")
            .expect("float literal pattern")
    })
}

pub fn is_missing_number(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(raw) => raw.trim().is_empty() || raw == "NaN",
    }
}

fn is_float_literal(value: &str) -> bool {
    float_pattern().is_match(value)
}

/// Base-10 integer from the leading sign and digits of `value`; trailing
/// fraction or exponent is dropped.
fn parse_integer_prefix(value: &str) -> Value {
    let trimmed = value.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let digits_end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    let digits = &body[..digits_end];
    if digits.is_empty() {
        return Value::Float(f64::NAN);
    }
    let signed = if negative {
        format!("-{digits}")
    } else {
        digits.to_string()
    };
    match signed.parse::<i64>() {
        Ok(parsed) => Value::Integer(parsed),
        Err(_) => Value::Float(signed.parse::<f64>().unwrap_or(f64::NAN)),
    }
}

fn parse_float(value: &str) -> Value {
    Value::Float(value.trim().parse::<f64>().unwrap_or(f64::NAN))
}

#[async_trait(?Send)]
impl<R> ValueType<R> for NumericalType {
    async fn is_type(
        &self,
        _name: &str,
        _index: usize,
        data: &[R],
        accessor: &dyn Accessor<R>,
        sample_size: usize,
    ) -> Result<f64> {
        let mut valid = 0usize;
        let mut numeric = 0usize;
        for row in sample_window(data, sample_size) {
            let value = accessor.read(row);
            if is_missing_number(value.as_deref()) {
                continue;
            }
            valid += 1;
            if value.as_deref().is_some_and(is_float_literal) {
                numeric += 1;
            }
        }
        if valid == 0 {
            return Ok(0.0);
        }
        Ok(numeric as f64 / valid as f64)
    }

    async fn guess_options(
        &self,
        def: &mut TypeDefinition,
        data: &[R],
        accessor: &dyn Accessor<R>,
    ) -> Result<()> {
        let options = def.numerical_options_mut();
        if options.range.is_some() {
            return Ok(());
        }
        let mut extent = Extent::default();
        for row in data {
            let value = accessor.read(row);
            if is_missing_number(value.as_deref()) {
                continue;
            }
            if let Some(parsed) = value.as_deref().and_then(leading_float) {
                extent.observe(parsed);
            }
        }
        options.range = Some(extent.range_or(DEFAULT_NUMERICAL_RANGE));
        Ok(())
    }

    fn parse(
        &self,
        def: &TypeDefinition,
        data: &mut [R],
        accessor: &dyn Accessor<R>,
    ) -> Vec<usize> {
        let integer = def.type_id == INTEGER_TYPE_ID;
        let mut invalid = Vec::new();
        for (idx, row) in data.iter_mut().enumerate() {
            let parsed = {
                let value = accessor.read(row);
                if is_missing_number(value.as_deref()) {
                    Some(Value::Float(f64::NAN))
                } else {
                    value.as_deref().filter(|v| is_float_literal(v)).map(|v| {
                        if integer {
                            parse_integer_prefix(v)
                        } else {
                            parse_float(v)
                        }
                    })
                }
            };
            match parsed {
                Some(typed) => accessor.write(row, typed),
                None => invalid.push(idx),
            }
        }
        invalid
    }

    fn has_editor(&self) -> bool {
        true
    }

    async fn edit(&self, def: &mut TypeDefinition, dialog: &dyn Dialog) -> Result<EditOutcome> {
        let range = def
            .numerical_options()
            .and_then(|o| o.range)
            .unwrap_or(DEFAULT_NUMERICAL_RANGE);
        let form = Form::new("Edit Numerical Range", "numerical")
            .field(FormField::new(
                "numerical-min",
                "Minimum Value",
                FieldKind::Number,
                range[0].to_string(),
            ))
            .field(FormField::new(
                "numerical-max",
                "Maximum Value",
                FieldKind::Number,
                range[1].to_string(),
            ));
        let Some(response) = dialog.prompt(form).await? else {
            return Ok(EditOutcome::Cancelled);
        };
        let min = response.float("numerical-min").unwrap_or(range[0]);
        let max = response.float("numerical-max").unwrap_or(range[1]);
        def.numerical_options_mut().range = Some([min, max]);
        Ok(EditOutcome::Saved)
    }
}
