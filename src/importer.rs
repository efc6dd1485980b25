//! Column import driver: guesses, stamps and parses every column of a table
//! in place, or re-applies stored definitions to a fresh table.

use log::{debug, info};
use serde::Serialize;

use crate::{
    accessor::ColumnAccessor,
    data::Value,
    definition::TypeDefinition,
    error::{Result, ValueTypeError},
    guess::{GuessOptions, score_value_types},
    registry::ValueTypeEditor,
    store::ColumnDefinition,
};

/// Type applied to columns no editor qualifies for.
pub const FALLBACK_TYPE: &str = "string";

pub type Row = Vec<Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnReport {
    pub name: String,
    pub index: usize,
    pub definition: TypeDefinition,
    /// Confidence of the winning editor; `None` for fallbacks and stored
    /// definitions.
    pub confidence: Option<f64>,
    pub invalid_rows: Vec<usize>,
    /// False when the type came from the fallback or a stored definition.
    pub guessed: bool,
}

fn find_editor<'a>(editors: &'a [ValueTypeEditor<Row>], id: &str) -> Result<&'a ValueTypeEditor<Row>> {
    editors
        .iter()
        .find(|editor| editor.id() == id)
        .ok_or_else(|| ValueTypeError::not_found(id))
}

async fn apply(
    editor: &ValueTypeEditor<Row>,
    name: &str,
    index: usize,
    mut definition: TypeDefinition,
    rows: &mut [Row],
) -> Result<(TypeDefinition, Vec<usize>)> {
    let invalid = editor
        .parse(&mut definition, rows, &ColumnAccessor::new(index))
        .await?;
    if invalid.is_empty() {
        debug!("Column '{name}' parsed as {} without invalid rows", editor.id());
    } else {
        info!(
            "Column '{name}' has {} invalid row(s) as {}",
            invalid.len(),
            editor.id()
        );
    }
    Ok((definition, invalid))
}

/// Guesses a type for each of `fields` and parses the column with it.
pub async fn import_columns(
    editors: &[ValueTypeEditor<Row>],
    fields: &[String],
    rows: &mut [Row],
    options: &GuessOptions,
) -> Result<Vec<ColumnReport>> {
    let mut reports = Vec::with_capacity(fields.len());
    for (index, name) in fields.iter().enumerate() {
        let accessor = ColumnAccessor::new(index);
        let winner = score_value_types(editors, name, index, rows, &accessor, options)
            .await?
            .into_iter()
            .next()
            .map(|score| (score.editor, score.confidence));
        let (editor, confidence) = match winner {
            Some((editor, confidence)) => (editor, Some(confidence)),
            None => {
                info!("No value type matched column '{name}'; using {FALLBACK_TYPE}");
                (find_editor(editors, FALLBACK_TYPE)?, None)
            }
        };
        let (definition, invalid_rows) =
            apply(editor, name, index, TypeDefinition::default(), rows).await?;
        reports.push(ColumnReport {
            name: name.clone(),
            index,
            definition,
            confidence,
            invalid_rows,
            guessed: confidence.is_some(),
        });
    }
    Ok(reports)
}

/// Parses each stored column with its recorded type. Columns are located by
/// name in `fields`; options missing from a definition are guessed.
pub async fn validate_columns(
    editors: &[ValueTypeEditor<Row>],
    fields: &[String],
    rows: &mut [Row],
    definitions: &[ColumnDefinition],
) -> Result<Vec<ColumnReport>> {
    let mut reports = Vec::with_capacity(definitions.len());
    for column in definitions {
        let index = fields
            .iter()
            .position(|field| *field == column.name)
            .ok_or_else(|| ValueTypeError::MissingColumn {
                name: column.name.clone(),
            })?;
        let editor = find_editor(editors, &column.definition.type_id)?;
        let (definition, invalid_rows) =
            apply(editor, &column.name, index, column.definition.clone(), rows).await?;
        reports.push(ColumnReport {
            name: column.name.clone(),
            index,
            definition,
            confidence: None,
            invalid_rows,
            guessed: false,
        });
    }
    Ok(reports)
}
