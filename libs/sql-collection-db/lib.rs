pub(crate) mod connection;
pub(crate) mod connection_config;
pub(crate) mod errors;
pub(crate) mod key_range;
pub(crate) mod query_map;
pub(crate) mod snapshot;
pub mod table_schema;

pub use connection::Connection;
pub use connection_config::ConnectionConfig;
pub use errors::{StoreError, StoreResult};
pub use key_range::{KeyRange, Order, ValueFilter};
pub use query_map::QueryMap;
pub use snapshot::Snapshot;
pub use table_schema::TableSchema;
