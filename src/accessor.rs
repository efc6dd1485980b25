//! Read/write indirection over a single column of caller-owned rows.
//!
//! Value types never inspect a row directly. They read the column's cell as
//! text and write typed values back through an [`Accessor`], so the same
//! detection and parsing logic works over ordered rows, keyed rows, or any
//! other storage the caller wraps.

use std::{borrow::Cow, collections::BTreeMap};

use crate::data::Value;

pub trait Accessor<R> {
    /// Returns the cell as text, or `None` when the cell is null or absent.
    fn read<'r>(&self, row: &'r R) -> Option<Cow<'r, str>>;

    fn write(&self, row: &mut R, value: Value);
}

/// Accessor for rows stored as ordered sequences of cells.
#[derive(Debug, Clone, Copy)]
pub struct ColumnAccessor {
    pub index: usize,
}

impl ColumnAccessor {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl Accessor<Vec<Value>> for ColumnAccessor {
    fn read<'r>(&self, row: &'r Vec<Value>) -> Option<Cow<'r, str>> {
        row.get(self.index).and_then(Value::as_text)
    }

    fn write(&self, row: &mut Vec<Value>, value: Value) {
        if row.len() <= self.index {
            row.resize(self.index + 1, Value::Null);
        }
        row[self.index] = value;
    }
}

/// Accessor for rows stored as field-name keyed records.
#[derive(Debug, Clone)]
pub struct FieldAccessor {
    pub name: String,
}

impl FieldAccessor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Accessor<BTreeMap<String, Value>> for FieldAccessor {
    fn read<'r>(&self, row: &'r BTreeMap<String, Value>) -> Option<Cow<'r, str>> {
        row.get(&self.name).and_then(Value::as_text)
    }

    fn write(&self, row: &mut BTreeMap<String, Value>, value: Value) {
        row.insert(self.name.clone(), value);
    }
}

/// Accessor assembled from a pair of closures.
pub struct FnAccessor<G, S> {
    getter: G,
    setter: S,
}

impl<G, S> FnAccessor<G, S> {
    pub fn new<R>(getter: G, setter: S) -> Self
    where
        G: for<'r> Fn(&'r R) -> Option<Cow<'r, str>>,
        S: Fn(&mut R, Value),
    {
        Self { getter, setter }
    }
}

impl<R, G, S> Accessor<R> for FnAccessor<G, S>
where
    G: for<'r> Fn(&'r R) -> Option<Cow<'r, str>>,
    S: Fn(&mut R, Value),
{
    fn read<'r>(&self, row: &'r R) -> Option<Cow<'r, str>> {
        (self.getter)(row)
    }

    fn write(&self, row: &mut R, value: Value) {
        (self.setter)(row, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_accessor_pads_short_rows_on_write() {
        let accessor = ColumnAccessor::new(2);
        let mut row = vec![Value::from("a")];
        assert!(accessor.read(&row).is_none());
        accessor.write(&mut row, Value::Integer(7));
        assert_eq!(row, vec![Value::from("a"), Value::Null, Value::Integer(7)]);
        assert_eq!(accessor.read(&row).as_deref(), Some("7"));
    }

    #[test]
    fn field_accessor_reads_and_writes_named_cells() {
        let accessor = FieldAccessor::new("score");
        let mut row = BTreeMap::new();
        row.insert("score".to_string(), Value::from("12"));
        assert_eq!(accessor.read(&row).as_deref(), Some("12"));
        accessor.write(&mut row, Value::Float(12.0));
        assert_eq!(row["score"], Value::Float(12.0));
    }

    #[test]
    fn fn_accessor_delegates_to_closures() {
        struct Record {
            label: String,
        }
        fn read_label(row: &Record) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(row.label.as_str()))
        }
        fn write_label(row: &mut Record, value: Value) {
            row.label = value.as_display();
        }
        let accessor = FnAccessor::new(read_label, write_label);
        let mut record = Record {
            label: "x".to_string(),
        };
        assert_eq!(accessor.read(&record).as_deref(), Some("x"));
        accessor.write(&mut record, Value::from("y"));
        assert_eq!(record.label, "y");
    }
}
