// src/main.rs
mod utils;
mod sheets;
mod extractors;
mod storage;

use clap::{ArgGroup, Parser};
use extractors::{SchemaRegistry, TableExtractor, TableName};
use sheets::{client, workbook, ExportFormat};
use std::path::PathBuf;
use storage::{ObjectHandle, RunManifest, StorageManager, TableOutcome};
use utils::{AppError, TimingLog};

/// Extracts the tables of the Finances spreadsheet into TSV files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["sheet_url", "input"])))]
struct Args {
    /// Google Sheets link of the workbook (edit, view, pubhtml or export form)
    #[arg(long, env = "FISCALISMIA_SHEET_URL")]
    sheet_url: Option<String>,

    /// Local xlsx file to read instead of downloading
    #[arg(short, long, env = "FISCALISMIA_INPUT")]
    input: Option<PathBuf>,

    /// Object store directory for the backup, tables and manifest
    #[arg(short, long, env = "FISCALISMIA_OUTPUT_DIR", default_value = "./output")]
    output_dir: PathBuf,

    /// Worksheet holding the tables
    #[arg(long, env = "FISCALISMIA_SHEET_NAME", default_value = workbook::DEFAULT_SHEET_NAME)]
    sheet_name: String,

    /// Lifetime of the returned retrieval links, in seconds
    #[arg(long, env = "FISCALISMIA_LINK_TTL_SECS", default_value = "3600")]
    link_ttl_secs: i64,

    /// Only extract these tables (repeatable, default: all)
    #[arg(long = "table", value_name = "TABLE")]
    tables: Vec<TableName>,

    /// Debug mode - also store the raw grid and log at debug level
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let args = Args::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(args.debug);
    tracing::info!("Starting processing for args: {:?}", args);

    let mut timing = TimingLog::start();
    timing.mark("function invocation");

    let link_ttl = link_ttl(args.link_ttl_secs)?;

    // 3. Load the table layout; only duplicate tables are fatal here
    let registry = SchemaRegistry::finances()?.select(&args.tables);
    tracing::info!("Extracting {} tables", registry.len());

    // 4. Initialize storage
    let storage = StorageManager::new(&args.output_dir, link_ttl)?;
    let timestamp = storage::run_timestamp(chrono::Utc::now());

    // 5. Acquire the workbook
    let bytes = match (&args.input, &args.sheet_url) {
        (Some(path), _) => client::read_workbook_file(path).await?,
        (None, Some(url)) => {
            let url = sheets::url::clean_sheet_url(url, ExportFormat::Xlsx)?;
            client::download_workbook(&url).await?
        }
        (None, None) => {
            return Err(AppError::Config("either --sheet-url or --input is required".to_string()))
        }
    };
    timing.mark("request XLSX via URL");

    let backup = storage.backup_workbook(&bytes, &timestamp)?;
    timing.mark("persist temp file to storage");

    let grid = workbook::load_grid(&bytes, &args.sheet_name)?;
    timing.mark("loaded workbook into memory");

    if args.debug {
        let key = format!("etl/{}/debug/grid.tsv", timestamp);
        match storage::tsv::grid_to_tsv(&grid).and_then(|dump| storage.put_object(&key, &dump)) {
            Ok(handle) => tracing::info!("Saved raw grid to: {}", handle.path.display()),
            Err(e) => tracing::warn!("Failed to save raw grid: {}", e),
        }
    }

    // 6. Extract every table; failures stay per table
    let extractor = TableExtractor::new();
    let report = extractor.extract_all(&grid, &registry);
    timing.mark("extracted tables");

    // 7. Persist each table
    let mut success_count = 0;
    let mut failure_count = 0;
    let mut outcomes = Vec::new();

    for (name, result) in &report.tables {
        let outcome = match result {
            Ok(table) => match storage.save_table(table, &timestamp) {
                Ok(object) => {
                    success_count += 1;
                    TableOutcome::Stored { object, records: table.len() }
                }
                Err(e) => {
                    tracing::error!("Failed to save table {}: {}", name, e);
                    failure_count += 1;
                    TableOutcome::Failed { reason: e.to_string() }
                }
            },
            Err(e) => {
                failure_count += 1;
                TableOutcome::Failed { reason: e.to_string() }
            }
        };
        outcomes.push((*name, outcome));
    }
    timing.mark("persisted tables");
    timing.log_summary();

    let manifest = RunManifest {
        timestamp: timestamp.clone(),
        sheet_name: args.sheet_name.clone(),
        backup: Some(backup),
        tables: outcomes,
        warnings: report.warnings.clone(),
        timedelta_analysis: timing.entries().to_vec(),
    };
    let manifest_handle = storage.save_run_manifest(&manifest)?;

    // 8. Hand the retrieval links back to the caller
    let summary = serde_json::to_string_pretty(&links(&manifest, &manifest_handle))
        .map_err(|e| AppError::Processing(e.to_string()))?;
    println!("{}", summary);

    tracing::info!("Processing finished. Success: {}, Failures: {}", success_count, failure_count);

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!(
            "Failed to extract any of {} tables",
            failure_count
        )));
    }

    Ok(())
}

/// Validates the operator-supplied link lifetime.
fn link_ttl(secs: i64) -> Result<chrono::Duration, AppError> {
    chrono::Duration::try_seconds(secs)
        .filter(|ttl| *ttl > chrono::Duration::zero())
        .filter(|ttl| chrono::Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| AppError::Config(format!("link ttl out of range: {}s", secs)))
}

/// Table name -> link (or error) summary printed for the caller.
fn links(manifest: &RunManifest, manifest_handle: &ObjectHandle) -> serde_json::Value {
    let tables: serde_json::Map<String, serde_json::Value> = manifest
        .tables
        .iter()
        .map(|(name, outcome)| {
            let value = match outcome {
                TableOutcome::Stored { object, .. } => serde_json::json!({ "url": object.url }),
                TableOutcome::Failed { reason } => serde_json::json!({ "error": reason }),
            };
            (name.to_string(), value)
        })
        .collect();

    serde_json::json!({
        "timestamp": manifest.timestamp,
        "tables": tables,
        "manifest": manifest_handle.url,
        "expires_at": manifest_handle.expires_at.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{ExtractionWarning, Grid};

    #[test]
    fn test_args_require_a_source() {
        assert!(Args::try_parse_from(["fiscalismia_etl"]).is_err());
        let args = Args::try_parse_from([
            "fiscalismia_etl",
            "--input",
            "Finances.xlsx",
            "--table",
            "income",
            "--table",
            "fixed_costs",
        ])
        .unwrap();
        assert_eq!(args.tables, vec![TableName::Income, TableName::FixedCosts]);
        assert_eq!(args.sheet_name, "Finances");
        let unknown_table = ["fiscalismia_etl", "-i", "x.xlsx", "--table", "expenses"];
        assert!(Args::try_parse_from(unknown_table).is_err());
    }

    #[test]
    fn test_link_ttl_bounds() {
        assert_eq!(link_ttl(3600).unwrap(), chrono::Duration::seconds(3600));
        for secs in [0, -1, 1_000_000_000_000_000, i64::MAX] {
            assert!(matches!(link_ttl(secs), Err(AppError::Config(_))), "{}s accepted", secs);
        }
    }

    #[test]
    fn test_extracted_tables_land_in_storage_with_links() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path(), chrono::Duration::seconds(60)).unwrap();

        // Income lives in AJ:AM; every other region is blank or missing.
        let mut rows = vec![vec![String::new(); 40]; 4];
        for row in [
            ["Date:", "01.01.2024 - 31.12.2024", "", ""],
            ["Salary", "Fixed", "Monthly", "3000"],
        ] {
            let mut cells = vec![String::new(); 35];
            cells.extend(row.iter().map(|s| s.to_string()));
            rows.push(cells);
        }
        let grid = Grid::from_strings(rows);

        let registry = SchemaRegistry::finances().unwrap();
        let report = TableExtractor::new().extract_all(&grid, &registry);

        let mut outcomes = Vec::new();
        for (name, result) in &report.tables {
            let outcome = match result {
                Ok(table) => TableOutcome::Stored {
                    object: storage.save_table(table, "run").unwrap(),
                    records: table.len(),
                },
                Err(e) => TableOutcome::Failed { reason: e.to_string() },
            };
            outcomes.push((*name, outcome));
        }
        let manifest = RunManifest {
            timestamp: "run".to_string(),
            sheet_name: "Finances".to_string(),
            backup: None,
            tables: outcomes,
            warnings: report.warnings.clone(),
            timedelta_analysis: Vec::new(),
        };
        let handle = storage.save_run_manifest(&manifest).unwrap();
        let summary = links(&manifest, &handle);

        assert!(summary["tables"]["income"]["url"]
            .as_str()
            .unwrap()
            .ends_with("/etl/run/income.tsv"));
        // The 40-column grid cannot hold new_food_items (AP:AW).
        assert!(summary["tables"]["new_food_items"]["error"].is_string());
        assert!(report
            .warnings
            .contains(&ExtractionWarning::EmptyTable { table: TableName::FixedCosts }));

        let income = std::fs::read_to_string(dir.path().join("etl/run/income.tsv")).unwrap();
        assert_eq!(
            income,
            "description\ttype\tmonthly_interval\tvalue\teffective_date\texpiration_date\n\
             Salary\tFixed\tMonthly\t3000\t01.01.2024\t31.12.2024\n"
        );
    }
}
