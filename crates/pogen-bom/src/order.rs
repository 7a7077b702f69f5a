//! Purchase-order assembly and CSV output.
//!
//! Results are keyed by BOM part number in a `BTreeMap`, so every stage and the
//! written file see the lines in ascending part-number order.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::bom::{BomError, BomLine, PurchaseRequirement, SelectionResult, select};
use crate::offer::CatalogEntry;

/// Output columns, in order
pub const ORDER_HEADERS: [&str; 6] = [
    "Part Number",
    "DK PN",
    "vendor",
    "mfgPartNumber",
    "Qty",
    "Unit Price",
];

/// `vendor` value written for lines without a selection
pub const MISSING_VENDOR: &str = "missing";

/// Selection settings for a run
#[derive(Debug, Clone, PartialEq)]
pub struct OrderOptions {
    /// Number of boards to buy parts for
    pub build_quantity: u32,
    /// Only consider Digi-Reel and Tape & Reel packaging
    pub reels_only: bool,
    /// Added once to the cost of any Digi-Reel candidate
    pub reel_surcharge: Decimal,
}

impl Default for OrderOptions {
    fn default() -> Self {
        Self {
            build_quantity: 1,
            reels_only: false,
            reel_surcharge: Decimal::ZERO,
        }
    }
}

/// Catalog lookup results keyed by BOM part number
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogMatches {
    entries: BTreeMap<String, Vec<CatalogEntry>>,
    failed: BTreeSet<String>,
}

impl CatalogMatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append lookup results for a part; a part may be looked up once per source.
    pub fn extend(&mut self, part_number: &str, entries: Vec<CatalogEntry>) {
        self.entries
            .entry(part_number.to_string())
            .or_default()
            .extend(entries);
    }

    /// Record that a lookup for this part failed
    pub fn mark_failed(&mut self, part_number: &str) {
        self.entries.entry(part_number.to_string()).or_default();
        self.failed.insert(part_number.to_string());
    }

    pub fn get(&self, part_number: &str) -> Option<&[CatalogEntry]> {
        self.entries.get(part_number).map(Vec::as_slice)
    }

    pub fn is_failed(&self, part_number: &str) -> bool {
        self.failed.contains(part_number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-line selections for a whole BOM
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseOrder {
    pub lines: BTreeMap<String, SelectionResult>,
}

impl PurchaseOrder {
    pub fn get(&self, part_number: &str) -> Option<&SelectionResult> {
        self.lines.get(part_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SelectionResult)> {
        self.lines.iter()
    }

    /// Sum of extended prices over selected lines, `None` if it overflows
    pub fn total_cost(&self) -> Option<Decimal> {
        self.lines
            .values()
            .filter_map(SelectionResult::extended_price)
            .try_fold(Decimal::ZERO, Decimal::checked_add)
    }

    pub fn missing_count(&self) -> usize {
        self.lines.values().filter(|r| !r.is_selected()).count()
    }

    pub fn rows(&self) -> Vec<OrderRow> {
        self.iter()
            .map(|(part_number, result)| OrderRow::new(part_number, result))
            .collect()
    }
}

/// Run price selection for every BOM line.
///
/// Fails if a line's per-build quantity times the build quantity overflows.
pub fn build_purchase_order(
    bom: &BTreeMap<String, BomLine>,
    matches: &CatalogMatches,
    options: &OrderOptions,
) -> Result<PurchaseOrder, BomError> {
    let mut order = PurchaseOrder::default();

    for line in bom.values() {
        let req =
            PurchaseRequirement::new(&line.part_number, line.quantity, options.build_quantity)?;
        let entries = matches.get(&req.part_key).unwrap_or_default();

        let result = match select(
            entries,
            req.required_quantity,
            options.reels_only,
            options.reel_surcharge,
        ) {
            SelectionResult::NoMatch if matches.is_failed(&req.part_key) => {
                SelectionResult::Unavailable
            }
            result => result,
        };

        if !result.is_selected() {
            log::info!(
                "No selection for {} (qty {}): {:?}",
                req.part_key,
                req.required_quantity,
                result
            );
        }
        order.lines.insert(req.part_key, result);
    }

    Ok(order)
}

/// One row of the purchase-order CSV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRow {
    #[serde(rename = "Part Number")]
    pub part_number: String,
    #[serde(rename = "DK PN")]
    pub vendor_part_number: Option<String>,
    #[serde(rename = "vendor")]
    pub vendor: String,
    #[serde(rename = "mfgPartNumber")]
    pub mpn: Option<String>,
    #[serde(rename = "Qty")]
    pub quantity: Option<u32>,
    #[serde(rename = "Unit Price", with = "rust_decimal::serde::str_option")]
    pub unit_price: Option<Decimal>,
}

impl OrderRow {
    pub fn new(part_number: &str, result: &SelectionResult) -> Self {
        match result {
            SelectionResult::Selected {
                entry,
                order_quantity,
                unit_price,
            } => Self {
                part_number: part_number.to_string(),
                vendor_part_number: Some(entry.external_id.clone()),
                vendor: entry.vendor_name.clone(),
                mpn: Some(entry.manufacturer_part_number.clone()),
                quantity: Some(*order_quantity),
                unit_price: Some(*unit_price),
            },
            _ => Self {
                part_number: part_number.to_string(),
                vendor_part_number: None,
                vendor: MISSING_VENDOR.to_string(),
                mpn: None,
                quantity: None,
                unit_price: None,
            },
        }
    }

    pub fn is_missing(&self) -> bool {
        self.vendor_part_number.is_none() && self.vendor == MISSING_VENDOR
    }
}

/// Write the purchase order as CSV, one row per BOM part in ascending order
pub fn write_purchase_order<W: Write>(writer: W, order: &PurchaseOrder) -> Result<(), BomError> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    // Written explicitly so an empty order still gets a header
    csv.write_record(ORDER_HEADERS)?;
    for row in order.rows() {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Read a purchase order written by [`write_purchase_order`]
pub fn read_purchase_order<R: Read>(reader: R) -> Result<Vec<OrderRow>, BomError> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers()?.clone();
    for column in ORDER_HEADERS {
        if !headers.iter().any(|h| h == column) {
            return Err(BomError::MissingColumn(column.to_string()));
        }
    }

    csv.deserialize::<OrderRow>()
        .map(|row| row.map_err(BomError::from))
        .collect()
}
