//! Layout hierarchy generation: turns parsed layout pages into a
//! materialized node tree, expanding repeating groups per data row and
//! resolving every dynamic property against the current form data.

mod generate;
mod ids;
mod lookups;
mod sources;
mod tree;

pub use generate::generate_tree;
pub use generate::materialize;
pub use generate::resolve;
pub use ids::make_indexed_id;
pub use lookups::HierarchyIssue;
pub use lookups::IssueSeverity;
pub use lookups::LayoutLookups;
pub use sources::AppContext;
pub use sources::TreeDataSources;
pub use tree::Node;
pub use tree::NodeId;
pub use tree::NodeTree;
pub use tree::PageEntry;
pub use tree::ResolvedItem;
