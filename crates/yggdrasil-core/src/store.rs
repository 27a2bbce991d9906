use crate::record::EntityRecord;
use crate::traits::EntityStore;
use crate::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// In-memory store for fixtures and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryEntityStore {
    records: Vec<EntityRecord>,
}

impl MemoryEntityStore {
    pub fn new(records: Vec<EntityRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn load_records(&self) -> Result<Vec<EntityRecord>> {
        Ok(self.records.clone())
    }
}

/// Loads one record per `*.json` file from a directory of translated
/// entities. Files prefixed with `_` are index/metadata files and skipped.
/// Unparseable files are logged and skipped; record-level problems are the
/// validator's job, not the store's.
#[derive(Debug, Clone)]
pub struct JsonEntityStore {
    dir: PathBuf,
}

impl JsonEntityStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl EntityStore for JsonEntityStore {
    async fn load_records(&self) -> Result<Vec<EntityRecord>> {
        let mut paths: Vec<PathBuf> = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('_'));
            if is_json && !hidden {
                paths.push(path);
            }
        }
        // Directory iteration order is filesystem-dependent; sort so the
        // record ordering (and therefore node ids) is reproducible.
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in &paths {
            let bytes = tokio::fs::read(path).await?;
            match serde_json::from_slice::<EntityRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => warn!("skipping {}: {}", path.display(), e),
            }
        }
        debug!(
            "loaded {} records from {} files in {}",
            records.len(),
            paths.len(),
            self.dir.display()
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_returns_records() {
        let store = MemoryEntityStore::new(vec![EntityRecord::new("Agumon", "Rookie")]);
        let records = store.load_records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Agumon");
    }

    #[tokio::test]
    async fn json_store_round_trips_and_skips_noise() {
        let dir = tempfile::tempdir().unwrap();
        let record = EntityRecord::new("Gabumon", "Rookie")
            .with_types(&["Reptile"])
            .with_attribute("Data")
            .evolves_from("Tsunomon");

        let path = dir.path().join("gabumon.json");
        tokio::fs::write(&path, serde_json::to_vec(&record).unwrap())
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("_index.json"), b"{}")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("broken.json"), b"not json")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), b"ignore me")
            .await
            .unwrap();

        let store = JsonEntityStore::new(dir.path());
        let records = store.load_records().await.unwrap();
        assert_eq!(records, vec![record]);
    }

    #[tokio::test]
    async fn json_store_orders_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zebramon", "agumon"] {
            let record = EntityRecord::new(name, "Rookie");
            tokio::fs::write(
                dir.path().join(format!("{}.json", name)),
                serde_json::to_vec(&record).unwrap(),
            )
            .await
            .unwrap();
        }

        let store = JsonEntityStore::new(dir.path());
        let records = store.load_records().await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["agumon", "zebramon"]);
    }
}
