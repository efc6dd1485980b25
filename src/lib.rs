pub mod accessor;
pub mod cli;
pub mod data;
pub mod definition;
pub mod dialog;
pub mod error;
pub mod guess;
pub mod importer;
pub mod markup;
pub mod registry;
pub mod store;
pub mod table;
pub mod tabular;
pub mod valuetype;

use std::{env, io, sync::OnceLock};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use futures::executor::block_on;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, CsvArgs},
    data::Value,
    dialog::{EditOutcome, TerminalDialog},
    guess::GuessOptions,
    importer::{ColumnReport, Row},
    registry::{EditorRegistry, ValueTypeEditor},
    store::ColumnDefinitions,
    table::Table,
    tabular::{CsvOptions, ParseResult},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_valuetypes", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let registry = EditorRegistry::<Row>::with_builtins();
    match cli.command {
        Commands::Types(args) => handle_types(&registry, &args),
        Commands::Guess(args) => handle_guess(&registry, &args),
        Commands::Validate(args) => handle_validate(&registry, &args),
        Commands::Edit(args) => handle_edit(&registry, &args),
    }
}

fn handle_types(registry: &EditorRegistry<Row>, args: &cli::TypesArgs) -> Result<()> {
    if args.html {
        let editors = block_on(registry.create_editors());
        let current = match &args.current {
            Some(id) => Some(find_editor(&editors, id)?),
            None => None,
        };
        let def = definition::TypeDefinition::new(current.map_or("", ValueTypeEditor::id));
        let html = block_on(markup::render_type_select(&editors, current, &def, true))?;
        println!("{html}");
        return Ok(());
    }
    let mut table = Table::new(["id", "name", "priority", "implicit"]);
    for desc in registry.list() {
        table.push_row([
            desc.id.clone(),
            desc.name.clone(),
            desc.effective_priority().to_string(),
            desc.implicit.to_string(),
        ]);
    }
    print!("{table}");
    Ok(())
}

fn read_input(args: &CsvArgs) -> Result<ParseResult> {
    let mut options = CsvOptions::for_path(&args.input, args.delimiter, args.input_encoding.as_deref())?;
    options.header = !args.no_header;
    options.skip_empty_lines = !args.keep_empty_lines;
    info!(
        "Reading '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(options.delimiter.unwrap_or(tabular::DEFAULT_CSV_DELIMITER))
    );
    tabular::read_table(&args.input, &options)
}

fn guess_options(args: &cli::GuessArgs) -> Result<GuessOptions> {
    let mut options = match &args.config {
        Some(path) => GuessOptions::load(path)?,
        None => GuessOptions::default(),
    };
    if let Some(sample_size) = args.sample_size {
        options = options.with_sample_size(sample_size);
    }
    for (id, threshold) in &args.thresholds {
        options = options.with_threshold(id.clone(), *threshold);
    }
    debug!("Guess options: {options:?}");
    Ok(options)
}

fn handle_guess(registry: &EditorRegistry<Row>, args: &cli::GuessArgs) -> Result<()> {
    let options = guess_options(args)?;
    let ParseResult { mut data, meta } = read_input(&args.csv)?;
    let editors = block_on(registry.create_editors());
    let reports = block_on(importer::import_columns(&editors, &meta.fields, &mut data, &options))
        .with_context(|| format!("Guessing value types for {:?}", args.csv.input))?;
    print_reports(&reports, true);
    if let Some(path) = &args.output {
        ColumnDefinitions::from_reports(&reports)
            .save(path)
            .with_context(|| format!("Writing definitions to {path:?}"))?;
        info!(
            "Definitions for {} column(s) written to {:?}",
            reports.len(),
            path
        );
    }
    Ok(())
}

fn handle_validate(registry: &EditorRegistry<Row>, args: &cli::ValidateArgs) -> Result<()> {
    let definitions = ColumnDefinitions::load(&args.definitions)
        .with_context(|| format!("Loading definitions from {:?}", args.definitions))?;
    let ParseResult { mut data, meta } = read_input(&args.csv)?;
    let editors = block_on(registry.create_editors());
    let reports = block_on(importer::validate_columns(
        &editors,
        &meta.fields,
        &mut data,
        &definitions.columns,
    ))
    .with_context(|| format!("Validating {:?}", args.csv.input))?;
    print_reports(&reports, false);
    for report in reports.iter().filter(|r| !r.invalid_rows.is_empty()) {
        let samples = report
            .invalid_rows
            .iter()
            .take(5)
            .map(|&row| {
                let cell = data[row].get(report.index).map_or_else(String::new, Value::as_display);
                format!("{row}: '{cell}'")
            })
            .collect::<Vec<_>>();
        println!("{} invalid: {}", report.name, samples.join(", "));
    }
    let invalid = reports.iter().map(|r| r.invalid_rows.len()).sum::<usize>();
    if args.strict && invalid > 0 {
        bail!("{invalid} invalid row(s) found in {:?}", args.csv.input);
    }
    Ok(())
}

fn handle_edit(registry: &EditorRegistry<Row>, args: &cli::EditArgs) -> Result<()> {
    let mut definitions = ColumnDefinitions::load(&args.definitions)
        .with_context(|| format!("Loading definitions from {:?}", args.definitions))?;
    let editors = block_on(registry.create_editors());
    let column = definitions
        .column_mut(&args.column)
        .ok_or_else(|| anyhow!("Column '{}' not found in {:?}", args.column, args.definitions))?;
    let mut def = column.definition.clone();
    let type_id = args.type_id.clone().unwrap_or_else(|| def.type_id.clone());
    let selection = markup::resolve_selection(&editors, &type_id, None, &mut def);
    let Some(editor) = selection.editor else {
        bail!("Unknown value type '{type_id}'");
    };
    if !selection.configurable {
        info!("Value type '{}' has no editable options", editor.id());
    } else {
        let stdin = io::stdin();
        let dialog = TerminalDialog::new(stdin.lock(), io::stdout());
        match block_on(editor.edit(&mut def, &dialog))? {
            EditOutcome::Saved => {}
            EditOutcome::Cancelled => {
                info!("Edit of column '{}' cancelled", args.column);
                return Ok(());
            }
        }
    }
    column.definition = def;
    definitions
        .save(&args.definitions)
        .with_context(|| format!("Writing definitions to {:?}", args.definitions))?;
    info!("Saved definition of column '{}'", args.column);
    Ok(())
}

fn find_editor<'a>(editors: &'a [ValueTypeEditor<Row>], id: &str) -> Result<&'a ValueTypeEditor<Row>> {
    editors
        .iter()
        .find(|editor| editor.id() == id)
        .ok_or_else(|| anyhow!("Unknown value type '{id}'"))
}

fn print_reports(reports: &[ColumnReport], with_confidence: bool) {
    let mut table = if with_confidence {
        Table::new(["column", "type", "confidence", "invalid rows"])
    } else {
        Table::new(["column", "type", "invalid rows"])
    };
    for report in reports {
        let mut row = vec![report.name.clone(), report.definition.type_id.clone()];
        if with_confidence {
            row.push(
                report
                    .confidence
                    .map_or_else(|| "fallback".to_string(), |c| format!("{c:.2}")),
            );
        }
        row.push(report.invalid_rows.len().to_string());
        table.push_row(row);
    }
    print!("{table}");
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
