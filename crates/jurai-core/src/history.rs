use crate::constants::storage;
use crate::error::{JuraiError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One immutable, versioned verdict for a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub feature_id: String,
    /// Zero-padded, starting at `001`.
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub verdict: Value,
    #[serde(default)]
    pub laws_snapshot: Vec<Value>,
}

impl VerdictRecord {
    pub fn version_number(&self) -> Option<u32> {
        self.version.parse().ok()
    }
}

/// Where verdicts are kept between runs.
pub trait VerdictStore: Send + Sync {
    /// Persist `verdict` as the next version for `feature_id`.
    fn store(&self, feature_id: &str, verdict: &Value, laws_snapshot: Vec<Value>) -> Result<VerdictRecord>;

    fn latest(&self, feature_id: &str) -> Result<Option<VerdictRecord>>;

    /// The record just before the latest one.
    fn previous(&self, feature_id: &str) -> Result<Option<VerdictRecord>>;

    /// Every record, oldest first.
    fn history(&self, feature_id: &str) -> Result<Vec<VerdictRecord>>;
}

/// Stores `<root>/<feature_id>/verdict_<NNN>.json`, one pretty-printed JSON
/// file per version.
pub struct FileVerdictStore {
    root: PathBuf,
    // serializes version allocation within this process
    write_lock: Mutex<()>,
}

impl FileVerdictStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<data dir>/jurai/compliance_history`
    pub fn default_dir() -> Result<PathBuf> {
        let base = dirs::data_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| JuraiError::Config("Could not determine data directory".into()))?;
        Ok(base.join(storage::CONFIG_DIR).join(storage::HISTORY_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn feature_dir(&self, feature_id: &str) -> Result<PathBuf> {
        validate_feature_id(feature_id)?;
        Ok(self.root.join(feature_id))
    }

    /// `(version, path)` pairs sorted by version number.
    fn versions(&self, feature_id: &str) -> Result<Vec<(u32, PathBuf)>> {
        let dir = self.feature_dir(feature_id)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let number = name
                .strip_prefix(storage::VERDICT_FILE_PREFIX)
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|n| n.parse::<u32>().ok());
            if let Some(number) = number {
                versions.push((number, path));
            }
        }
        versions.sort_by_key(|(number, _)| *number);
        Ok(versions)
    }

    fn read_record(path: &Path) -> Result<VerdictRecord> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            JuraiError::Config(format!("Corrupt verdict record {}: {e}", path.display()))
        })
    }
}

impl VerdictStore for FileVerdictStore {
    fn store(&self, feature_id: &str, verdict: &Value, laws_snapshot: Vec<Value>) -> Result<VerdictRecord> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| JuraiError::Other("verdict store lock poisoned".into()))?;

        let dir = self.feature_dir(feature_id)?;
        fs::create_dir_all(&dir)?;

        // Another process may claim a version between the scan and the link;
        // rescan and take the next one rather than replace its record.
        let mut attempts = 0;
        let record = loop {
            let next = self.versions(feature_id)?.last().map_or(1, |(n, _)| n + 1);
            let record = VerdictRecord {
                feature_id: feature_id.to_string(),
                version: format!("{next:03}"),
                timestamp: Utc::now(),
                verdict: verdict.clone(),
                laws_snapshot: laws_snapshot.clone(),
            };

            let path = dir.join(format!("{}{}.json", storage::VERDICT_FILE_PREFIX, record.version));
            let tmp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
            fs::write(&tmp_path, serde_json::to_string_pretty(&record)?)?;
            if publish(&tmp_path, &path)? {
                break record;
            }

            attempts += 1;
            tracing::warn!("Verdict {} v{} already exists, retrying", feature_id, record.version);
            if attempts >= MAX_PUBLISH_ATTEMPTS {
                return Err(JuraiError::Other(format!(
                    "Could not allocate a verdict version for {feature_id} after {attempts} attempts"
                )));
            }
        };

        tracing::info!("Stored verdict {} v{}", feature_id, record.version);
        Ok(record)
    }

    fn latest(&self, feature_id: &str) -> Result<Option<VerdictRecord>> {
        match self.versions(feature_id)?.last() {
            Some((_, path)) => Self::read_record(path).map(Some),
            None => Ok(None),
        }
    }

    fn previous(&self, feature_id: &str) -> Result<Option<VerdictRecord>> {
        let versions = self.versions(feature_id)?;
        match versions.len().checked_sub(2).and_then(|i| versions.get(i)) {
            Some((_, path)) => Self::read_record(path).map(Some),
            None => Ok(None),
        }
    }

    fn history(&self, feature_id: &str) -> Result<Vec<VerdictRecord>> {
        self.versions(feature_id)?
            .iter()
            .map(|(_, path)| Self::read_record(path))
            .collect()
    }
}

const MAX_PUBLISH_ATTEMPTS: usize = 5;

/// Move a fully written temp file to its final name, refusing to replace an
/// existing record. Returns `false` (and discards the temp file) if `path` is
/// taken.
fn publish(tmp_path: &Path, path: &Path) -> Result<bool> {
    let linked = fs::hard_link(tmp_path, path);
    let _ = fs::remove_file(tmp_path);
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn validate_feature_id(feature_id: &str) -> Result<()> {
    let trimmed = feature_id.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || feature_id.contains(['/', '\\'])
        || feature_id.contains('\0')
    {
        return Err(JuraiError::Config(format!("Invalid feature id: {feature_id:?}")));
    }
    Ok(())
}
