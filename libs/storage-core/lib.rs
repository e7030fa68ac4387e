mod link;
mod prefix;

pub use link::{Link, LinkId, LinkParts};
pub use prefix::{Extraction, Prefix, PrefixId};
