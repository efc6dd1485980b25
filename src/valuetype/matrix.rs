use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{Extent, ValueType, leading_float, sample_window};
use crate::{
    accessor::Accessor,
    data::Value,
    definition::TypeDefinition,
    dialog::{Dialog, EditOutcome, FieldKind, Form, FormField},
    error::Result,
};

pub const DEFAULT_MATRIX_COLOR_RANGE: [&str; 2] = ["#FFFFFF", "#000000"];

const DEFAULT_MATRIX_RANGE: [f64; 2] = [0.0, 100.0];

/// Cells holding a JSON array or object, such as per-row vectors of
/// measurements.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixType;

fn parse_structured(value: &str) -> Option<JsonValue> {
    match serde_json::from_str::<JsonValue>(value) {
        Ok(parsed @ (JsonValue::Array(_) | JsonValue::Object(_))) => Some(parsed),
        _ => None,
    }
}

fn element_value(element: &JsonValue) -> Option<f64> {
    match element {
        JsonValue::Number(number) => number.as_f64(),
        JsonValue::String(text) => leading_float(text),
        _ => None,
    }
}

#[async_trait(?Send)]
impl<R> ValueType<R> for MatrixType {
    async fn is_type(
        &self,
        _name: &str,
        _index: usize,
        data: &[R],
        accessor: &dyn Accessor<R>,
        sample_size: usize,
    ) -> Result<f64> {
        let window = sample_window(data, sample_size);
        if window.is_empty() {
            return Ok(0.0);
        }
        let structured = window
            .iter()
            .filter(|row| {
                accessor
                    .read(row)
                    .is_some_and(|value| parse_structured(&value).is_some())
            })
            .count();
        Ok(structured as f64 / window.len() as f64)
    }

    /// Recomputes every option from the data, replacing earlier values.
    async fn guess_options(
        &self,
        def: &mut TypeDefinition,
        data: &[R],
        accessor: &dyn Accessor<R>,
    ) -> Result<()> {
        let mut extent = Extent::default();
        let mut max_length = 0usize;
        for row in data {
            let Some(JsonValue::Array(elements)) =
                accessor.read(row).and_then(|value| parse_structured(&value))
            else {
                continue;
            };
            for element in &elements {
                if let Some(parsed) = element_value(element) {
                    extent.observe(parsed);
                }
            }
            max_length = max_length.max(elements.len());
        }

        let options = def.matrix_options_mut();
        options.range = Some(extent.range_or(DEFAULT_MATRIX_RANGE));
        options.data_length = Some(max_length);
        options.color_range = Some(DEFAULT_MATRIX_COLOR_RANGE.map(str::to_string));
        options.labels = Some((0..max_length).map(|i| i.to_string()).collect());
        Ok(())
    }

    fn parse(
        &self,
        _def: &TypeDefinition,
        data: &mut [R],
        accessor: &dyn Accessor<R>,
    ) -> Vec<usize> {
        let mut invalid = Vec::new();
        for (idx, row) in data.iter_mut().enumerate() {
            let parsed = accessor.read(row).and_then(|value| parse_structured(&value));
            match parsed {
                Some(structured) => accessor.write(row, Value::Structured(structured)),
                None => invalid.push(idx),
            }
        }
        invalid
    }

    fn has_editor(&self) -> bool {
        true
    }

    async fn edit(&self, def: &mut TypeDefinition, dialog: &dyn Dialog) -> Result<EditOutcome> {
        let current = def.matrix_options().cloned().unwrap_or_default();
        let range = current.range.unwrap_or(DEFAULT_MATRIX_RANGE);
        let data_length = current.data_length.unwrap_or(0);
        let color_range = current
            .color_range
            .clone()
            .unwrap_or_else(|| DEFAULT_MATRIX_COLOR_RANGE.map(str::to_string));
        let labels = current.labels.clone().unwrap_or_default().join("\n");

        let form = Form::new("Edit Numerical Range", "numerical")
            .field(FormField::new(
                "range-min",
                "Minimum Value",
                FieldKind::Number,
                range[0].to_string(),
            ))
            .field(FormField::new(
                "range-max",
                "Maximum Value",
                FieldKind::Number,
                range[1].to_string(),
            ))
            .field(FormField::new(
                "datalength",
                "Length of Data",
                FieldKind::Number,
                data_length.to_string(),
            ))
            .field(FormField::new(
                "colorrange-min",
                "Color of Minimum Value",
                FieldKind::Color,
                color_range[0].clone(),
            ))
            .field(FormField::new(
                "colorrange-max",
                "Color of Maximum Value",
                FieldKind::Color,
                color_range[1].clone(),
            ))
            .field(FormField::new(
                "labels",
                "Labels",
                FieldKind::TextArea,
                labels,
            ));
        let Some(response) = dialog.prompt(form).await? else {
            return Ok(EditOutcome::Cancelled);
        };

        let options = def.matrix_options_mut();
        options.range = Some([
            response.float("range-min").unwrap_or(range[0]),
            response.float("range-max").unwrap_or(range[1]),
        ]);
        options.data_length = Some(
            response
                .get("datalength")
                .and_then(|raw| raw.trim().parse::<usize>().ok())
                .unwrap_or(data_length),
        );
        options.color_range = Some([
            response
                .get("colorrange-min")
                .map_or_else(|| color_range[0].clone(), str::to_string),
            response
                .get("colorrange-max")
                .map_or_else(|| color_range[1].clone(), str::to_string),
        ]);
        options.labels = Some(match response.get("labels").unwrap_or_default() {
            "" => Vec::new(),
            text => text.split('\n').map(str::to_string).collect(),
        });
        Ok(EditOutcome::Saved)
    }
}
