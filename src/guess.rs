//! Picks a column's value type: every candidate editor scores the same leading
//! sample, candidates below their threshold drop out, and the most preferred
//! (lowest priority) survivor wins.

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::Context;
use futures::future::try_join_all;
use log::debug;
use serde::Deserialize;

use crate::{accessor::Accessor, error::Result, registry::ValueTypeEditor};

pub const DEFAULT_SAMPLE_SIZE: usize = 100;
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Type ids that must reach [`DEFAULT_THRESHOLD`] unless configured otherwise.
/// Every other type qualifies with any positive confidence.
const THRESHOLDED_TYPES: [&str; 4] = ["numerical", "categorical", "real", "int"];

#[derive(Debug, Clone, PartialEq)]
pub struct GuessOptions {
    pub sample_size: usize,
    pub thresholds: BTreeMap<String, f64>,
}

impl Default for GuessOptions {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            thresholds: THRESHOLDED_TYPES
                .iter()
                .map(|id| (id.to_string(), DEFAULT_THRESHOLD))
                .collect(),
        }
    }
}

/// On-disk form; absent keys keep their defaults and thresholds merge per id.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GuessOptionsFile {
    #[serde(default)]
    sample_size: Option<usize>,
    #[serde(default)]
    thresholds: BTreeMap<String, f64>,
}

impl From<GuessOptionsFile> for GuessOptions {
    fn from(file: GuessOptionsFile) -> Self {
        let mut options = GuessOptions::default();
        if let Some(sample_size) = file.sample_size {
            options.sample_size = sample_size;
        }
        options.thresholds.extend(file.thresholds);
        options
    }
}

impl GuessOptions {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening guess options {path:?}"))?;
        let parsed: GuessOptionsFile = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing guess options {path:?}"))?;
        Ok(parsed.into())
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let parsed: GuessOptionsFile =
            serde_yaml::from_str(text).context("Parsing guess options YAML")?;
        Ok(parsed.into())
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub fn with_threshold(mut self, type_id: impl Into<String>, threshold: f64) -> Self {
        self.thresholds.insert(type_id.into(), threshold);
        self
    }

    /// Whether `confidence` lets the type with `type_id` compete.
    pub fn qualifies(&self, type_id: &str, confidence: f64) -> bool {
        match self.thresholds.get(type_id) {
            Some(threshold) => confidence >= *threshold,
            None => confidence > 0.0,
        }
    }
}

#[derive(Debug)]
pub struct TypeScore<'a, R> {
    pub editor: &'a ValueTypeEditor<R>,
    pub confidence: f64,
}

/// Scores every editor concurrently and returns the qualifying ones, most
/// preferred first. Ties in priority keep the order of `editors`. A failing
/// detector fails the whole scoring.
pub async fn score_value_types<'a, R>(
    editors: &'a [ValueTypeEditor<R>],
    name: &str,
    index: usize,
    data: &[R],
    accessor: &dyn Accessor<R>,
    options: &GuessOptions,
) -> Result<Vec<TypeScore<'a, R>>> {
    let test_size = options.sample_size.min(data.len());
    let confidences = try_join_all(
        editors
            .iter()
            .map(|editor| editor.is_type(name, index, data, accessor, test_size)),
    )
    .await?;

    let mut scores = editors
        .iter()
        .zip(confidences)
        .inspect(|(editor, confidence)| {
            debug!("Column '{name}': {} confidence {confidence:.3}", editor.id());
        })
        .filter(|(editor, confidence)| options.qualifies(editor.id(), *confidence))
        .map(|(editor, confidence)| TypeScore { editor, confidence })
        .collect::<Vec<_>>();
    scores.sort_by_key(|score| score.editor.priority());
    Ok(scores)
}

/// The best matching editor for the column, or `None` when no editor
/// qualifies.
pub async fn guess_value_type<'a, R>(
    editors: &'a [ValueTypeEditor<R>],
    name: &str,
    index: usize,
    data: &[R],
    accessor: &dyn Accessor<R>,
    options: &GuessOptions,
) -> Result<Option<&'a ValueTypeEditor<R>>> {
    debug!("Guessing value type of column '{name}' ({index})");
    let scores = score_value_types(editors, name, index, data, accessor, options).await?;
    let winner = scores.into_iter().next().map(|score| score.editor);
    debug!(
        "Column '{name}' guessed as {}",
        winner.map_or("<none>", ValueTypeEditor::id)
    );
    Ok(winner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accessor::ColumnAccessor,
        definition::TypeDefinition,
        error::ValueTypeError,
        registry::{EditorRegistry, create_custom_editor},
        valuetype::{
            ValueType,
            test_support::{Row, column},
        },
    };
    use async_trait::async_trait;
    use futures::executor::block_on;

    fn builtins() -> Vec<ValueTypeEditor<Row>> {
        block_on(EditorRegistry::with_builtins().create_editors())
    }

    fn guessed(editors: &[ValueTypeEditor<Row>], values: &[&str]) -> Option<String> {
        let rows = column(values);
        block_on(guess_value_type(
            editors,
            "col",
            0,
            &rows,
            &ColumnAccessor::new(0),
            &GuessOptions::default(),
        ))
        .expect("guess")
        .map(|editor| editor.id().to_string())
    }

    struct Fixed {
        confidence: f64,
        fail: bool,
    }

    #[async_trait(?Send)]
    impl ValueType<Row> for Fixed {
        async fn is_type(
            &self,
            _name: &str,
            _index: usize,
            _data: &[Row],
            _accessor: &dyn Accessor<Row>,
            _sample_size: usize,
        ) -> Result<f64> {
            if self.fail {
                return Err(ValueTypeError::detector("broken", "lookup service down"));
            }
            Ok(self.confidence)
        }

        async fn guess_options(
            &self,
            _def: &mut TypeDefinition,
            _data: &[Row],
            _accessor: &dyn Accessor<Row>,
        ) -> Result<()> {
            Ok(())
        }

        fn parse(
            &self,
            _def: &TypeDefinition,
            _data: &mut [Row],
            _accessor: &dyn Accessor<Row>,
        ) -> Vec<usize> {
            Vec::new()
        }
    }

    #[test]
    fn numbers_guess_as_float() {
        assert_eq!(guessed(&builtins(), &["1", "2", "3"]).as_deref(), Some("real"));
    }

    #[test]
    fn distinct_words_guess_as_string() {
        assert_eq!(guessed(&builtins(), &["a", "b", "c"]).as_deref(), Some("string"));
    }

    #[test]
    fn repeated_words_guess_as_categorical() {
        let values = ["yes", "no", "yes", "no", "yes", "no", "yes", "no", "yes", "no"];
        assert_eq!(guessed(&builtins(), &values).as_deref(), Some("categorical"));
    }

    #[test]
    fn json_arrays_guess_as_matrix() {
        let values = ["[1,2]", "[3,4]", "[5,6]"];
        assert_eq!(guessed(&builtins(), &values).as_deref(), Some("matrix"));
    }

    #[test]
    fn nothing_qualifies_without_a_catch_all() {
        let editors = builtins()
            .into_iter()
            .filter(|editor| editor.id() != "string")
            .collect::<Vec<_>>();
        assert_eq!(guessed(&editors, &["a", "b", "c"]), None);
    }

    #[test]
    fn equal_priorities_keep_input_order() {
        let editors = vec![
            create_custom_editor("First", "first", false, Fixed { confidence: 0.2, fail: false }),
            create_custom_editor("Second", "second", false, Fixed { confidence: 0.9, fail: false }),
        ];
        assert_eq!(guessed(&editors, &["x"]).as_deref(), Some("first"));
    }

    #[test]
    fn thresholds_gate_known_types_only() {
        let options = GuessOptions::default();
        assert!(!options.qualifies("real", 0.69));
        assert!(options.qualifies("real", 0.7));
        assert!(options.qualifies("matrix", 0.01));
        assert!(!options.qualifies("matrix", 0.0));
        let strict = options.with_threshold("matrix", 0.5);
        assert!(!strict.qualifies("matrix", 0.4));
    }

    #[test]
    fn failing_detector_aborts_the_guess() {
        let mut editors = builtins();
        editors.push(create_custom_editor("Broken", "broken", false, Fixed { confidence: 0.0, fail: true }));
        let rows = column(&["1"]);
        let err = block_on(guess_value_type(
            &editors,
            "col",
            0,
            &rows,
            &ColumnAccessor::new(0),
            &GuessOptions::default(),
        ))
        .expect_err("detector failure");
        assert!(matches!(err, ValueTypeError::Detector { .. }));
    }

    #[test]
    fn sample_size_limits_detection() {
        let mut values = vec!["1"; 5];
        values.extend(["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        let rows = column(&values);
        let editors = builtins();
        let guess = |sample_size| {
            block_on(guess_value_type(
                &editors,
                "col",
                0,
                &rows,
                &ColumnAccessor::new(0),
                &GuessOptions::default().with_sample_size(sample_size),
            ))
            .expect("guess")
            .map(|editor| editor.id().to_string())
        };
        assert_eq!(guess(5).as_deref(), Some("real"));
        assert_eq!(guess(100).as_deref(), Some("string"));
    }

    #[test]
    fn yaml_thresholds_merge_over_defaults() {
        let options = GuessOptions::from_yaml("sampleSize: 20\nthresholds:\n  matrix: 0.5\n")
            .expect("yaml");
        assert_eq!(options.sample_size, 20);
        assert_eq!(options.thresholds.get("matrix"), Some(&0.5));
        assert_eq!(options.thresholds.get("int"), Some(&DEFAULT_THRESHOLD));
        assert!(GuessOptions::from_yaml("bogus: 1\n").is_err());
    }
}
