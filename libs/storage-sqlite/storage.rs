use std::path::{Path, PathBuf};

use crate::collections::link_map::{FullLinkSchema, LinkPartsSchema};
use crate::collections::list_map::ListMemberSchema;
use crate::collections::prefix_map::PrefixSchema;
use crate::collections::property_map::PropertySchema;
use crate::config::SqliteStorageConfig;
use crate::schema;
use crate::services::link_service::LinkService;
use crate::services::prefix_service::PrefixService;
use sql_collection_db::{Connection, ConnectionConfig, QueryMap};

/// Save links as prefix/suffix decompositions inside a SQLite database
pub struct SqliteStorage {
    config: SqliteStorageConfig,
    connection: Connection,
}

impl SqliteStorage {
    pub fn try_new(config: SqliteStorageConfig) -> eyre::Result<Self> {
        let path = config.get_storage_path()?;

        let connection = if path == ":memory:" {
            Connection::in_memory()?
        } else {
            if let Some(parent) = Path::new(&path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            Connection::initialize(
                ConnectionConfig::builder()
                    .database_path(PathBuf::from(&path))
                    .build(),
            )?
        };

        schema::bootstrap(&connection)?;
        Ok(SqliteStorage { config, connection })
    }

    pub fn in_memory() -> eyre::Result<Self> {
        SqliteStorage::try_new(SqliteStorageConfig::in_memory())
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    // ---- services ----------------------------------------------------------

    pub fn prefix_service(&self) -> eyre::Result<PrefixService<'_>> {
        PrefixService::new(
            &self.connection,
            self.config.get_prefix_threshold(),
            self.config.get_prefix_separators(),
        )
    }

    pub fn link_service(&self) -> eyre::Result<LinkService<'_>> {
        LinkService::new(
            &self.connection,
            self.prefix_service()?,
            self.config.get_bulk_chunk_size(),
        )
    }

    // ---- raw collections ---------------------------------------------------

    pub fn prefixes(&self) -> QueryMap<'_, PrefixSchema> {
        self.connection.collection(PrefixSchema)
    }

    pub fn links(&self) -> QueryMap<'_, LinkPartsSchema> {
        self.connection.collection(LinkPartsSchema)
    }

    pub fn full_links(&self) -> QueryMap<'_, FullLinkSchema> {
        self.connection.collection(FullLinkSchema)
    }

    pub fn properties(&self) -> QueryMap<'_, PropertySchema> {
        self.connection.collection(PropertySchema)
    }

    /// Opens (creating on first use) a named list-membership table. The name
    /// is validated before any DDL runs.
    pub fn list(&self, table: &str) -> eyre::Result<QueryMap<'_, ListMemberSchema>> {
        let member_schema = ListMemberSchema::new(table)?;
        schema::create_list_table(&self.connection, table)?;
        Ok(self.connection.collection(member_schema))
    }
}
