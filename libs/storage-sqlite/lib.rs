mod config;
pub(crate) mod schema;
mod storage;

pub mod collections {
    pub mod link_map;
    pub mod list_map;
    pub mod prefix_map;
    pub mod property_map;
}

pub mod services {
    pub mod link_service;
    pub mod prefix_service;
    pub(crate) mod prefix_tree;
}

pub(crate) mod utils {
    pub mod like;
}

pub use config::SqliteStorageConfig;
pub use storage::SqliteStorage;
