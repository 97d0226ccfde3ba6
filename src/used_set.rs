use crate::candidate::CandidateId;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Entries as they may appear on disk. Older records hold bare numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredId {
    Text(String),
    Number(serde_json::Number),
}

impl From<StoredId> for CandidateId {
    fn from(value: StoredId) -> Self {
        match value {
            StoredId::Text(s) => CandidateId::native(s),
            StoredId::Number(n) => CandidateId::native(n.to_string()),
        }
    }
}

/// JSON-array file of identifiers that have already been published.
#[derive(Debug, Clone)]
pub struct UsedSetStore {
    path: PathBuf,
}

impl UsedSetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing record is an empty set. An unreadable one is an error.
    pub async fn load(&self) -> Result<BTreeSet<CandidateId>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read used set: {}", self.path.display()));
            }
        };

        let stored: Vec<StoredId> =
            serde_json::from_str(&content).map_err(|source| PipelineError::CorruptUsedSet {
                path: self.path.clone(),
                source,
            })?;
        Ok(stored.into_iter().map(CandidateId::from).collect())
    }

    /// Rewrites the record as the union of what is on disk and `ids`.
    pub async fn save(&self, ids: &BTreeSet<CandidateId>) -> Result<BTreeSet<CandidateId>> {
        let mut merged = self.load().await?;
        merged.extend(ids.iter().cloned());

        let body = serde_json::to_vec_pretty(&merged).context("Failed to encode used set")?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &body)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace used set: {}", self.path.display()))?;
        Ok(merged)
    }

    pub async fn record(&self, id: &CandidateId) -> Result<BTreeSet<CandidateId>> {
        self.save(&BTreeSet::from([id.clone()])).await
    }
}
