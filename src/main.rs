// FilterGrid - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. Configuration and logging initialisation (debug mode support)
// 3. Dataset loading and column declaration
// 4. Driving a GridState: preset restore, exclusions, sort, candidate
//    listing, select-all, preset save

use clap::Parser;
use filtergrid::app::select_all::SelectAllConfig;
use filtergrid::app::state::{GridOptions, GridState};
use filtergrid::core::accessor::JsonAccessor;
use filtergrid::core::date_tree::{CheckState, DateTree, NodeId};
use filtergrid::core::distinct::DisplayOptions;
use filtergrid::core::model::{Column, ExclusionSet, FieldType, FieldValue};
use filtergrid::core::natural_sort::SortDirection;
use filtergrid::core::popup::{PopupSession, SearchMode};
use filtergrid::platform::config::{load_config, AppConfig, PlatformPaths};
use filtergrid::util;
use filtergrid::util::error::{DatasetError, GridError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// FilterGrid - Filter, sort and select rows of a JSON dataset.
///
/// Declares typed columns over a JSON array of objects, applies per-column
/// exclusion filters, and persists them as a reusable preset.
#[derive(Parser, Debug)]
#[command(name = "filtergrid", version, about)]
struct Cli {
    /// JSON file containing an array of row objects.
    data: PathBuf,

    /// Column declaration `name:type` (text, integer, float, boolean,
    /// datetime, enum(A|B)). Repeat for each filterable column.
    #[arg(short = 'c', long = "column", value_name = "NAME:TYPE", required = true)]
    columns: Vec<String>,

    /// Print the filter candidates of this field after filtering.
    #[arg(long, value_name = "FIELD")]
    candidates: Option<String>,

    /// Exclude a value (`FIELD=VALUE`; an empty VALUE excludes blanks).
    #[arg(short = 'x', long = "exclude", value_name = "FIELD=VALUE")]
    exclude: Vec<String>,

    /// Restore filters from this preset before applying exclusions.
    #[arg(long, value_name = "PRESET")]
    load: Option<PathBuf>,

    /// Save the resulting filters to this preset.
    #[arg(long, value_name = "PRESET")]
    save: Option<PathBuf>,

    /// Sort the view naturally by a field (`FIELD` or `FIELD:desc`).
    #[arg(long, value_name = "FIELD[:desc]")]
    sort: Option<String>,

    /// Run select-all over the filtered rows and report the effective count.
    #[arg(long)]
    select_all: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let (config, config_warnings) = load_config(&platform_paths.config_file());

    util::logging::init(cli.debug, config.log_level.as_deref());
    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        "FilterGrid starting"
    );

    match run(&cli, &config, &platform_paths) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "FilterGrid failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &AppConfig, paths: &PlatformPaths) -> util::error::Result<()> {
    let rows = load_dataset(&cli.data)?;
    let columns = cli
        .columns
        .iter()
        .map(String::as_str)
        .map(parse_column)
        .collect::<Result<Vec<_>, _>>()?;

    let options = grid_options(config, paths);
    let total = rows.len();
    let mut grid = GridState::new(rows, columns, Arc::new(JsonAccessor), options);

    if let Some(path) = &cli.load {
        let restored = grid.load_preset_from(path);
        println!("Restored {restored} filter(s) from {}", path.display());
    } else if config.persistent && grid.begin_preset_load() {
        let restored = wait_for_preset(&mut grid);
        println!("Restored {restored} filter(s) from the persistent preset");
    }

    for (field, excluded) in parse_exclusions(&cli.exclude, grid.columns())? {
        let mut merged = grid
            .store()
            .get(&field)
            .map(|f| f.previously_filtered.clone())
            .unwrap_or_default();
        merged.extend(excluded);
        grid.set_exclusions(&field, merged);
    }

    if let Some(sort_arg) = &cli.sort {
        let (field, direction) = match sort_arg.rsplit_once(':') {
            Some((field, dir)) if dir.eq_ignore_ascii_case("desc") => {
                (field, SortDirection::Descending)
            }
            Some((field, dir)) if dir.eq_ignore_ascii_case("asc") => (field, SortDirection::Ascending),
            _ => (sort_arg.as_str(), SortDirection::Ascending),
        };
        grid.sort_by(field, direction);
    }

    for filter in grid.store().active_filters() {
        println!(
            "Filter on '{}': {} excluded value(s), {} present",
            filter.field_name,
            filter.previously_filtered.len(),
            filter.filtered_items.len()
        );
    }
    println!("Rows: {} of {total}", grid.view().len());

    if let Some(field) = &cli.candidates {
        match grid.open_filter(field) {
            Some(popup) => print_candidates(popup),
            None => println!("Unknown field '{field}'"),
        }
        grid.close_filter();
    }

    if cli.select_all {
        let outcome = grid.select_all();
        grid.run_pending();
        println!(
            "Select-all: {outcome:?}, {} row(s) effectively selected ({:?} mode)",
            grid.effective_count(),
            grid.selection().mode()
        );
    }

    if let Some(path) = &cli.save {
        grid.save_preset_to(path)?;
        println!("Saved {} filter(s) to {}", grid.store().len(), path.display());
    }

    Ok(())
}

fn grid_options(config: &AppConfig, paths: &PlatformPaths) -> GridOptions {
    GridOptions {
        display: DisplayOptions {
            language: config.language.parse().unwrap_or_default(),
            date_format: config.date_format.clone(),
        },
        search_mode: if config.starts_with {
            SearchMode::StartsWith
        } else {
            SearchMode::Contains
        },
        select_all: SelectAllConfig {
            fast_threshold: config.fast_select_all_threshold,
            batch_size: config.fast_select_all_batch_size,
            virtual_threshold: config.virtual_select_threshold,
        },
        persistent: config.persistent,
        preset_path: Some(paths.preset_file(&config.preset_file)),
    }
}

fn wait_for_preset(grid: &mut GridState<Value>) -> usize {
    loop {
        if let Some(restored) = grid.poll_preset() {
            return restored;
        }
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

fn load_dataset(path: &Path) -> Result<Vec<Value>, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Array(rows) => {
            tracing::info!(path = %path.display(), rows = rows.len(), "Dataset loaded");
            Ok(rows)
        }
        _ => Err(DatasetError::NotAnArray {
            path: path.to_path_buf(),
        }),
    }
}

fn parse_column(declaration: &str) -> Result<Column, DatasetError> {
    let invalid = |reason: String| DatasetError::InvalidColumn {
        declaration: declaration.to_string(),
        reason,
    };
    let (name, type_name) = declaration
        .split_once(':')
        .ok_or_else(|| invalid("expected NAME:TYPE".to_string()))?;
    if name.trim().is_empty() {
        return Err(invalid("empty field name".to_string()));
    }
    let field_type: FieldType = type_name.parse().map_err(invalid)?;
    Ok(Column::new(name.trim(), field_type))
}

/// Group `FIELD=VALUE` arguments by field, re-typing each value to its
/// column.
fn parse_exclusions(
    args: &[String],
    columns: &[Column],
) -> Result<Vec<(String, ExclusionSet)>, GridError> {
    let mut grouped: Vec<(String, ExclusionSet)> = Vec::new();
    for declaration in args {
        let (field, raw) = declaration.split_once('=').ok_or_else(|| DatasetError::InvalidColumn {
            declaration: declaration.clone(),
            reason: "expected FIELD=VALUE".to_string(),
        })?;
        let column = columns
            .iter()
            .find(|c| c.field_name == field)
            .ok_or_else(|| DatasetError::InvalidColumn {
                declaration: declaration.clone(),
                reason: format!("no column named '{field}'"),
            })?;

        let value = if raw.is_empty() {
            None
        } else {
            let typed = FieldValue::Text(raw.to_string()).convert(&column.field_type)?;
            Some(if column.field_type.is_date() {
                typed.truncate_to_date()
            } else {
                typed
            })
        };

        match grouped.iter_mut().find(|(f, _)| f == field) {
            Some((_, set)) => {
                set.insert(value);
            }
            None => grouped.push((field.to_string(), [value].into_iter().collect())),
        }
    }
    Ok(grouped)
}

fn print_candidates(popup: &PopupSession) {
    println!("Candidates for '{}':", popup.field_name());
    match popup.tree() {
        Some(tree) => print_tree(tree, DateTree::ROOT, 0),
        None => {
            for item in popup.items() {
                let mark = if item.is_checked() { 'x' } else { ' ' };
                println!("  [{mark}] {}", item.label);
            }
        }
    }
}

fn print_tree(tree: &DateTree, id: NodeId, depth: usize) {
    if let Some(node) = tree.node(id) {
        let mark = match node.state() {
            CheckState::Checked => 'x',
            CheckState::Unchecked => ' ',
            CheckState::Indeterminate => '-',
        };
        println!("  {:indent$}[{mark}] {}", "", node.label, indent = depth * 2);
        for (child, _) in tree.children(id) {
            print_tree(tree, child, depth + 1);
        }
    }
}
