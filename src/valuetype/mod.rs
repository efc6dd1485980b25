//! Value types: detection, option guessing, parsing, and option editing for
//! one category of column values.
//!
//! Implementations never assume a row shape; every cell is reached through the
//! [`Accessor`] handed in with the rows. They are also not expected to stamp
//! the definition's type id or to guess options before parsing; the
//! [`ValueTypeEditor`](crate::registry::ValueTypeEditor) wrapper does both.
//!
//! Detection and parsing fail soft. A malformed cell is "not a sample of this
//! type" during detection and an invalid row during parsing, never an error.
//! `Err` is reserved for infrastructure failures of custom implementations.

mod categorical;
mod matrix;
mod numerical;
mod string;

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

pub use categorical::{CATEGORY_COLORS, CategoricalType, FALLBACK_CATEGORY_COLOR};
pub use matrix::{DEFAULT_MATRIX_COLOR_RANGE, MatrixType};
pub use numerical::{DEFAULT_NUMERICAL_RANGE, NumericalType, is_missing_number};
pub use string::StringType;

use crate::{
    accessor::Accessor,
    definition::TypeDefinition,
    dialog::{Dialog, EditOutcome},
    error::Result,
    markup::OptionMarkup,
    registry::EditorDescriptor,
};

#[async_trait(?Send)]
pub trait ValueType<R> {
    /// Confidence in `[0, 1]` that the column holds values of this type,
    /// judged from at most `sample_size` leading rows.
    async fn is_type(
        &self,
        name: &str,
        index: usize,
        data: &[R],
        accessor: &dyn Accessor<R>,
        sample_size: usize,
    ) -> Result<f64>;

    /// Fills absent options on `def` from the column's data.
    async fn guess_options(
        &self,
        def: &mut TypeDefinition,
        data: &[R],
        accessor: &dyn Accessor<R>,
    ) -> Result<()>;

    /// Converts every row in place and returns the ascending indices of rows
    /// that could not be converted. Invalid rows are left untouched.
    fn parse(
        &self,
        def: &TypeDefinition,
        data: &mut [R],
        accessor: &dyn Accessor<R>,
    ) -> Vec<usize>;

    /// Whether [`ValueType::edit`] offers any options to edit.
    fn has_editor(&self) -> bool {
        false
    }

    async fn edit(&self, _def: &mut TypeDefinition, _dialog: &dyn Dialog) -> Result<EditOutcome> {
        Ok(EditOutcome::Cancelled)
    }

    /// Presentation of this type as a pickable choice.
    async fn options_markup(
        &self,
        descriptor: &EditorDescriptor,
        current: Option<&str>,
        _def: &TypeDefinition,
    ) -> Result<OptionMarkup> {
        Ok(OptionMarkup::single(descriptor, current))
    }
}

/// The fixed-size leading window used for detection.
pub(crate) fn sample_window<R>(data: &[R], sample_size: usize) -> &[R] {
    &data[..data.len().min(sample_size)]
}

fn leading_float_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*[-+]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][-+]?[0-9]+)?")
            .expect("leading float pattern")
    })
}

/// Parses the longest numeric prefix of `value`, ignoring trailing text.
pub(crate) fn leading_float(value: &str) -> Option<f64> {
    let found = leading_float_pattern().find(value)?;
    found.as_str().trim().parse::<f64>().ok()
}

/// Running min/max that ignores NaN observations.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Extent {
    min: Option<f64>,
    max: Option<f64>,
}

impl Extent {
    pub(crate) fn observe(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        if self.min.is_none_or(|min| value < min) {
            self.min = Some(value);
        }
        if self.max.is_none_or(|max| value > max) {
            self.max = Some(value);
        }
    }

    /// `[min, max]`, each side falling back to `default` when nothing was seen.
    pub(crate) fn range_or(&self, default: [f64; 2]) -> [f64; 2] {
        [self.min.unwrap_or(default[0]), self.max.unwrap_or(default[1])]
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use futures::executor::block_on;

    use super::ValueType;
    use crate::{
        accessor::ColumnAccessor,
        data::Value,
        definition::TypeDefinition,
        dialog::{Dialog, EditOutcome},
    };

    pub type Row = Vec<Value>;

    pub fn column(values: &[&str]) -> Vec<Row> {
        values.iter().map(|v| vec![Value::from(*v)]).collect()
    }

    pub fn cells(rows: &[Row]) -> Vec<Value> {
        rows.iter().map(|row| row[0].clone()).collect()
    }

    pub fn confidence(value_type: &dyn ValueType<Row>, rows: &[Row], sample_size: usize) -> f64 {
        block_on(value_type.is_type("col", 0, rows, &ColumnAccessor::new(0), sample_size))
            .expect("is_type")
    }

    pub fn guess(value_type: &dyn ValueType<Row>, def: &mut TypeDefinition, rows: &[Row]) {
        block_on(value_type.guess_options(def, rows, &ColumnAccessor::new(0))).expect("guess");
    }

    pub fn parse(
        value_type: &dyn ValueType<Row>,
        def: &TypeDefinition,
        rows: &mut [Row],
    ) -> Vec<usize> {
        value_type.parse(def, rows, &ColumnAccessor::new(0))
    }

    pub fn edit(
        value_type: &dyn ValueType<Row>,
        def: &mut TypeDefinition,
        dialog: &dyn Dialog,
    ) -> EditOutcome {
        block_on(value_type.edit(def, dialog)).expect("edit")
    }
}
