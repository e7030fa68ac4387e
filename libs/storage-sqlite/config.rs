use serde_derive::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct SqliteStorageConfig {
    /// Path of the database file (default to ~/.local/share/linkstash/linkstash.db);
    /// the SQLite magic name ":memory:" opens a throwaway in-memory store.
    pub storage_path: Option<String>,

    /// Minimum number of links sharing a candidate prefix before it is
    /// persisted (default to: 4)
    pub prefix_threshold: Option<u32>,

    /// Characters a candidate prefix may end on (default to: "/:?=&#")
    pub prefix_separators: Option<String>,

    /// Bulk link inserts commit every this many rows (default to: 500)
    pub bulk_chunk_size: Option<u32>,
}

impl SqliteStorageConfig {
    pub fn get_storage_path(&self) -> eyre::Result<String> {
        let path_raw = self
            .storage_path
            .clone()
            .unwrap_or("~/.local/share/linkstash/linkstash.db".to_owned());

        Ok(shellexpand::full(&path_raw)?.into_owned())
    }

    pub fn get_prefix_threshold(&self) -> usize {
        self.prefix_threshold.unwrap_or(4) as usize
    }

    pub fn get_prefix_separators(&self) -> Vec<char> {
        self.prefix_separators
            .as_deref()
            .unwrap_or("/:?=&#")
            .chars()
            .collect()
    }

    pub fn get_bulk_chunk_size(&self) -> usize {
        self.bulk_chunk_size.unwrap_or(500) as usize
    }

    pub fn in_memory() -> Self {
        SqliteStorageConfig {
            storage_path: Some(":memory:".to_owned()),
            ..Default::default()
        }
    }
}
