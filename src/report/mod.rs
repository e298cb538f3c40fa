//! Validation reports: the error tree, its builder, the discriminator
//! filter, and the cross-layer merger.

mod builder;
mod errors;
mod filter;
mod merge;
mod tree;

pub use builder::{build_tree, classify};
pub use errors::{ReportError, ReportResult};
pub use filter::filter_branch_errors;
pub use merge::merge;
pub use tree::{ErrorDescriptor, ErrorKind, ErrorTree, IndexedTree, Provenance, TreeNode};
