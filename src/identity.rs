use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

pub const OWNER_KEY: &str = "localUserId";
const STORAGE_FILE: &str = "local-storage.json";
const STORAGE_TMP_EXTENSION: &str = "json.tmp";

/// Stable per-installation owner of an item collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the owner from `localUserId`, minting and persisting one on
    /// first use.
    pub fn load_or_create(storage: &LocalStorage) -> Result<Self> {
        if let Some(existing) = storage.get(OWNER_KEY)? {
            let trimmed = existing.trim();
            if !trimmed.is_empty() {
                return Ok(Self::new(trimmed));
            }
            tracing::warn!("stored owner id is blank, generating a new one");
        }
        let owner = Self::generate();
        storage
            .set(OWNER_KEY, owner.as_str())
            .context("persisting owner id")?;
        tracing::info!("generated new local owner id");
        Ok(owner)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable client-side key/value file.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn open(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(STORAGE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("reading local storage {}", self.path.display()))
            }
        };
        serde_json::from_slice(&raw)
            .with_context(|| format!("parsing local storage {}", self.path.display()))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating state directory {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(entries).context("serialising local storage")?;
        let tmp_path = self.path.with_extension(STORAGE_TMP_EXTENSION);
        fs::write(&tmp_path, &json)
            .with_context(|| format!("writing temporary local storage {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!("atomically persisting local storage {}", self.path.display())
        })?;
        Ok(())
    }
}
