//! Catalog business rules.
//!
//! Each submodule holds the storage-independent half of a catalog rule. The
//! API crate loads whatever state a rule needs (ancestor chains, existing
//! defaults), calls into here, and only then writes.

pub mod category;
pub mod listing;
pub mod lookup;
pub mod ranking;
pub mod tax;
pub mod variants;

pub use category::{CategoryPlacement, MAX_CATEGORY_DEPTH, TreeItem, TreeNode, build_tree};
pub use listing::{Page, PageRequest, ProductOrdering};
pub use ranking::order_by_ranking;
pub use tax::{TaxRateRule, select_rate, tax_amount};
pub use variants::{VariantDraft, VariantPatch, validate_variant_batch};
