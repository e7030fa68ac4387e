use serde_derive::{Deserialize, Serialize};

pub type PrefixId = i64;

/// A persisted common leading substring of one or more link strings.
///
/// The empty prefix is always present in the store and acts as the universal
/// fallback when no longer prefix matches.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Prefix {
    pub id: PrefixId,
    pub text: String,
}

impl Prefix {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Outcome of one prefix-extraction pass over a batch of link strings.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Extraction {
    /// Prefixes newly persisted by this pass, in tree preorder.
    pub promoted: Vec<Prefix>,
    /// Batch members that already started with a persisted non-empty prefix
    /// and were therefore held out of the candidate tree.
    pub already_covered: Vec<String>,
}
