pub mod selection;
mod core;

// Re-export core BOM types
pub use core::*;

// Re-export selection types and helpers
pub use selection::{PurchaseRequirement, SelectionResult, select};
