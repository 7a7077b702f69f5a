//! Purchase-order building blocks for BOM sourcing.
//!
//! This crate holds everything that does not talk to the network:
//!
//! * [`offer`] – catalog entries as scraped from a vendor, with their packaging
//!   and price-break tables.
//! * [`bom`] – reading the parts list and BOM CSV files, and the best-price
//!   selector that picks one entry and price break per BOM line.
//! * [`order`] – assembling the per-line selections into a [`PurchaseOrder`]
//!   and writing it out as CSV.
//!
//! Prices are carried as [`rust_decimal::Decimal`] end to end so that a unit
//! price read from the catalog is written to the purchase order unchanged.

pub mod bom;
pub mod offer;
pub mod order;

pub use bom::{
    BomError, BomLine, PartListing, PurchaseRequirement, SelectionResult, Source, parse_bom,
    parse_part_list, read_bom, read_part_list, select,
};
pub use offer::{CatalogEntry, PackagingKind, PriceBreak};
pub use order::{
    CatalogMatches, OrderOptions, OrderRow, PurchaseOrder, build_purchase_order,
    read_purchase_order, write_purchase_order,
};
