// src/storage/mod.rs
pub mod tsv;

use crate::extractors::table::{ExtractedTable, ExtractionWarning};
use crate::extractors::TableName;
use crate::utils::error::StorageError;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Europe::Berlin;
use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Location and retrieval link of one stored object.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectHandle {
    pub key: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of one table in the run manifest.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Stored { object: ObjectHandle, records: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub timestamp: String,
    pub sheet_name: String,
    pub backup: Option<ObjectHandle>,
    pub tables: Vec<(TableName, TableOutcome)>,
    pub warnings: Vec<ExtractionWarning>,
    pub timedelta_analysis: Vec<String>,
}

/// Directory-backed object store handing out time-limited file links.
pub struct StorageManager {
    base_dir: PathBuf,
    link_ttl: Duration,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P, link_ttl: Duration) -> Result<Self, StorageError> {
        if link_ttl <= Duration::zero() || link_expiry(link_ttl).is_none() {
            return Err(StorageError::InvalidLinkTtl(link_ttl.num_seconds()));
        }

        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        // Links must be absolute
        let base_dir = base_path.canonicalize().map_err(StorageError::IoError)?;

        Ok(Self { base_dir, link_ttl })
    }

    /// Writes `bytes` under `key` (relative, `/`-separated) and returns a link to it.
    pub fn put_object(&self, key: &str, bytes: &[u8]) -> Result<ObjectHandle, StorageError> {
        let file_path = self.resolve_key(key)?;

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).map_err(StorageError::IoError)?;
        }
        fs::write(&file_path, bytes).map_err(StorageError::IoError)?;

        let expires_at = link_expiry(self.link_ttl)
            .ok_or(StorageError::InvalidLinkTtl(self.link_ttl.num_seconds()))?;

        let url = Url::from_file_path(&file_path)
            .map_err(|_| StorageError::InvalidKey(key.to_string()))?;

        tracing::debug!("Stored {} bytes at {}", bytes.len(), file_path.display());

        Ok(ObjectHandle {
            key: key.to_string(),
            path: file_path,
            url: url.to_string(),
            expires_at,
        })
    }

    /// Keeps a copy of the raw workbook next to the extracted tables.
    pub fn backup_workbook(
        &self,
        bytes: &[u8],
        timestamp: &str,
    ) -> Result<ObjectHandle, StorageError> {
        let key = format!("tmp/{}-Fiscalismia-Datasource.xlsx", timestamp);
        let handle = self.put_object(&key, bytes)?;
        tracing::info!("Workbook backed up to {}", handle.path.display());
        Ok(handle)
    }

    /// Saves one extracted table as TSV
    pub fn save_table(
        &self,
        table: &ExtractedTable,
        timestamp: &str,
    ) -> Result<ObjectHandle, StorageError> {
        let key = format!("etl/{}/{}.tsv", timestamp, table.name);
        let handle = self.put_object(&key, &tsv::to_tsv(table)?)?;
        tracing::info!(
            "Saved {} ({} records) to {}",
            table.name,
            table.len(),
            handle.path.display()
        );
        Ok(handle)
    }

    /// Saves the run manifest in JSON format
    pub fn save_run_manifest(&self, manifest: &RunManifest) -> Result<ObjectHandle, StorageError> {
        let key = format!("etl/{}/manifest.json", manifest.timestamp);
        let manifest_str = serde_json::to_string_pretty(manifest)?;
        let handle = self.put_object(&key, manifest_str.as_bytes())?;
        tracing::info!("Saved run manifest to {}", handle.path.display());
        Ok(handle)
    }

    fn resolve_key(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_dir.join(relative))
    }
}

fn link_expiry(ttl: Duration) -> Option<DateTime<Utc>> {
    Utc::now().checked_add_signed(ttl)
}

/// Run stamp used in object keys, in the sheet owner's local time.
pub fn run_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&Berlin).format("%Y-%m-%d-%H-%M-%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &tempfile::TempDir) -> StorageManager {
        StorageManager::new(dir.path().join("store"), Duration::seconds(3600)).unwrap()
    }

    #[test]
    fn test_put_object_writes_file_and_link() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let before = Utc::now();
        let handle = storage.put_object("etl/run/income.tsv", b"a\tb\n").unwrap();

        assert_eq!(fs::read(&handle.path).unwrap(), b"a\tb\n");
        assert!(handle.url.starts_with("file://"));
        assert!(handle.url.ends_with("/etl/run/income.tsv"));
        assert!(handle.expires_at >= before + Duration::seconds(3600));
    }

    #[test]
    fn test_unrepresentable_link_ttl_is_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let huge = Duration::try_seconds(1_000_000_000_000_000).unwrap();
        let result = StorageManager::new(dir.path(), huge);
        assert!(matches!(result, Err(StorageError::InvalidLinkTtl(_))));

        for ttl in [Duration::zero(), Duration::seconds(-5)] {
            let result = StorageManager::new(dir.path(), ttl);
            assert!(matches!(result, Err(StorageError::InvalidLinkTtl(_))));
        }
        assert!(Duration::try_seconds(i64::MAX).is_none());
    }

    #[test]
    fn test_run_timestamp_uses_berlin_time() {
        let winter = DateTime::parse_from_rfc3339("2024-01-15T10:00:00Z").unwrap();
        assert_eq!(run_timestamp(winter.with_timezone(&Utc)), "2024-01-15-11-00-00");

        let summer = DateTime::parse_from_rfc3339("2024-07-01T10:00:00Z").unwrap();
        assert_eq!(run_timestamp(summer.with_timezone(&Utc)), "2024-07-01-12-00-00");
    }

    #[test]
    fn test_keys_cannot_escape_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        for key in ["", "../outside.tsv", "etl/../../outside.tsv", "/etc/passwd", "./x"] {
            assert!(
                matches!(storage.put_object(key, b""), Err(StorageError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_save_table_and_backup_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let mut table = ExtractedTable::new(TableName::FixedCosts, vec!["category"]);
        table.push(vec![Some("Housing".to_string())]).unwrap();

        let handle = storage.save_table(&table, "2024-01-01-12-00-00").unwrap();
        assert_eq!(handle.key, "etl/2024-01-01-12-00-00/fixed_costs.tsv");
        assert_eq!(fs::read_to_string(&handle.path).unwrap(), "category\nHousing\n");

        let backup = storage.backup_workbook(b"PK", "2024-01-01-12-00-00").unwrap();
        assert_eq!(backup.key, "tmp/2024-01-01-12-00-00-Fiscalismia-Datasource.xlsx");
    }

    #[test]
    fn test_manifest_is_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);

        let manifest = RunManifest {
            timestamp: "2024-01-01-12-00-00".to_string(),
            sheet_name: "Finances".to_string(),
            backup: None,
            tables: vec![(
                TableName::Income,
                TableOutcome::Failed {
                    reason: "Column range 35..39 exceeds grid width 20".to_string(),
                },
            )],
            warnings: vec![ExtractionWarning::EmptyTable {
                table: TableName::VariableExpenses,
            }],
            timedelta_analysis: vec!["0ms time passed after [function invocation]".to_string()],
        };

        let handle = storage.save_run_manifest(&manifest).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&handle.path).unwrap()).unwrap();

        assert_eq!(json["tables"][0][0], "income");
        assert_eq!(json["tables"][0][1]["status"], "failed");
        assert_eq!(json["warnings"][0]["kind"], "empty_table");
        assert_eq!(json["warnings"][0]["table"], "var_expenses");
    }
}
