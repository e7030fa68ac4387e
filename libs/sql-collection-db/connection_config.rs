use std::path::PathBuf;
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
pub struct ConnectionConfig {
    /// Database file path; the store is opened in-memory when unset.
    #[builder(default, setter(strip_option, into))]
    pub database_path: Option<PathBuf>,
    /// Foreign keys are enforced by default so that the link→prefix
    /// referential invariant holds at the store level.
    #[builder(default = true)]
    pub enforce_foreign_keys: bool,
}
