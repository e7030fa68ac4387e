use crate::prefix::PrefixId;
use serde_derive::{Deserialize, Serialize};

pub type LinkId = i64;

/// The stored decomposition of a link: the logical full string is
/// `prefix.text + suffix` and is only ever reconstructed through the
/// `full_link` view, never stored directly.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub prefix_id: PrefixId,
    pub suffix: String,
}

/// A link without its surrogate id, used as the value side of the link
/// collection when inserting or re-pointing rows.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LinkParts {
    pub prefix_id: PrefixId,
    pub suffix: String,
}

impl Link {
    pub fn parts(&self) -> LinkParts {
        LinkParts {
            prefix_id: self.prefix_id,
            suffix: self.suffix.clone(),
        }
    }
}
