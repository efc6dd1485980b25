use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{definition::TypeDefinition, importer::ColumnReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub index: usize,
    pub definition: TypeDefinition,
}

/// Per-column type definitions as persisted between `guess`, `edit` and
/// `validate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinitions {
    pub columns: Vec<ColumnDefinition>,
}

impl ColumnDefinitions {
    pub fn from_reports(reports: &[ColumnReport]) -> Self {
        Self {
            columns: reports
                .iter()
                .map(|report| ColumnDefinition {
                    name: report.name.clone(),
                    index: report.index,
                    definition: report.definition.clone(),
                })
                .collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("Opening definitions file {path:?}"))?;
        serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing definitions YAML {path:?}"))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Creating definitions file {path:?}"))?;
        serde_yaml::to_writer(BufWriter::new(file), self).context("Writing definitions YAML")
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut ColumnDefinition> {
        self.columns.iter_mut().find(|column| column.name == name)
    }
}
