use std::collections::HashSet;

use async_trait::async_trait;
use itertools::Itertools;

use super::{ValueType, sample_window};
use crate::{
    accessor::Accessor,
    definition::{Category, TypeDefinition},
    dialog::{Dialog, EditOutcome, FieldKind, Form, FormField},
    error::Result,
};

/// Qualitative palette assigned to guessed categories in sorted order.
pub const CATEGORY_COLORS: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Color for categories past the end of [`CATEGORY_COLORS`] and for edited
/// categories without a color.
pub const FALLBACK_CATEGORY_COLOR: &str = "gray";

/// Columns with few distinct values relative to their size.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoricalType;

fn category_color(position: usize) -> &'static str {
    CATEGORY_COLORS
        .get(position)
        .copied()
        .unwrap_or(FALLBACK_CATEGORY_COLOR)
}

/// Distinct values in first-seen order, then stably sorted ignoring case, so
/// values differing only in case keep the order the data shows them in.
fn sorted_case_insensitive(values: impl IntoIterator<Item = String>) -> Vec<String> {
    values
        .into_iter()
        .unique()
        .sorted_by_key(|value| value.to_lowercase())
        .collect()
}

fn parse_category_lines(text: &str) -> Vec<Category> {
    text.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut parts = line.split('\t');
            let name = parts.next().unwrap_or_default().trim();
            let color = parts
                .next()
                .map(str::trim)
                .filter(|color| !color.is_empty())
                .unwrap_or(FALLBACK_CATEGORY_COLOR);
            Category::new(name, color)
        })
        .collect()
}

#[async_trait(?Send)]
impl<R> ValueType<R> for CategoricalType {
    async fn is_type(
        &self,
        _name: &str,
        _index: usize,
        data: &[R],
        accessor: &dyn Accessor<R>,
        sample_size: usize,
    ) -> Result<f64> {
        let mut valid = 0usize;
        let mut distinct = HashSet::new();
        for row in sample_window(data, sample_size) {
            let Some(value) = accessor.read(row) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            valid += 1;
            distinct.insert(value.into_owned());
        }
        if valid == 0 {
            return Ok(0.0);
        }
        Ok(1.0 - distinct.len() as f64 / valid as f64)
    }

    async fn guess_options(
        &self,
        def: &mut TypeDefinition,
        data: &[R],
        accessor: &dyn Accessor<R>,
    ) -> Result<()> {
        let options = def.categorical_options_mut();
        if options.categories.is_some() {
            return Ok(());
        }
        let distinct = data
            .iter()
            .filter_map(|row| accessor.read(row).map(|value| value.into_owned()));
        let categories = sorted_case_insensitive(distinct)
            .into_iter()
            .enumerate()
            .map(|(position, name)| Category::new(name, category_color(position)))
            .collect();
        options.categories = Some(categories);
        Ok(())
    }

    fn parse(
        &self,
        def: &TypeDefinition,
        data: &mut [R],
        accessor: &dyn Accessor<R>,
    ) -> Vec<usize> {
        let names = def
            .categorical_options()
            .and_then(|options| options.categories.as_ref())
            .map(|categories| {
                categories
                    .iter()
                    .map(|category| category.name.as_str())
                    .collect::<HashSet<_>>()
            })
            .unwrap_or_default();
        data.iter()
            .enumerate()
            .filter(|(_, row)| {
                accessor
                    .read(row)
                    .is_none_or(|value| !names.contains(value.as_ref()))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    fn has_editor(&self) -> bool {
        true
    }

    async fn edit(&self, def: &mut TypeDefinition, dialog: &dyn Dialog) -> Result<EditOutcome> {
        let current = def
            .categorical_options()
            .and_then(|options| options.categories.as_ref())
            .map(|categories| {
                categories
                    .iter()
                    .map(|category| format!("{}\t{}", category.name, category.color))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();
        let form = Form::new("Edit Categories (name TAB color)", "categorical").field(
            FormField::new("categories", "Categories", FieldKind::TextArea, current),
        );
        let Some(response) = dialog.prompt(form).await? else {
            return Ok(EditOutcome::Cancelled);
        };
        let categories = parse_category_lines(response.get("categories").unwrap_or_default());
        def.categorical_options_mut().categories = Some(categories);
        Ok(EditOutcome::Saved)
    }
}
