/// Best-price selection across catalog entries and their price breaks
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::core::BomError;
use crate::offer::{CatalogEntry, PackagingKind, PriceBreak};

/// Units to buy for one BOM line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequirement {
    pub part_key: String,
    pub required_quantity: u32,
}

impl PurchaseRequirement {
    /// `per_build` units per board times the number of boards built.
    ///
    /// A product that does not fit in a `u32` is an invalid quantity.
    pub fn new(
        part_key: impl Into<String>,
        per_build: u32,
        build_quantity: u32,
    ) -> Result<Self, BomError> {
        let part_key = part_key.into();
        let Some(required_quantity) = per_build.checked_mul(build_quantity) else {
            return Err(BomError::InvalidQuantity {
                part_number: part_key,
                value: format!("{per_build} x {build_quantity}"),
            });
        };
        Ok(Self {
            part_key,
            required_quantity,
        })
    }
}

/// Outcome of price selection for one BOM line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionResult {
    /// No catalog entries were found for the part
    NoMatch,
    /// Entries exist, but none has pricing, enough stock and the right packaging
    Unavailable,
    Selected {
        entry: CatalogEntry,
        /// Units to order: the required quantity, or the break minimum when it is higher
        order_quantity: u32,
        unit_price: Decimal,
    },
}

impl SelectionResult {
    pub fn is_selected(&self) -> bool {
        matches!(self, SelectionResult::Selected { .. })
    }

    /// `unit_price × order_quantity` for a selected line, `None` if it overflows
    pub fn extended_price(&self) -> Option<Decimal> {
        match self {
            SelectionResult::Selected {
                order_quantity,
                unit_price,
                ..
            } => unit_price.checked_mul(Decimal::from(*order_quantity)),
            _ => None,
        }
    }
}

/// One way of buying a part: an entry at one of its price breaks
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    entry: &'a CatalogEntry,
    order_quantity: u32,
    unit_price: Decimal,
    cost: Decimal,
}

impl<'a> Candidate<'a> {
    /// `None` when the cost does not fit in a `Decimal`
    fn new(
        entry: &'a CatalogEntry,
        pb: &PriceBreak,
        required: u32,
        offset: Decimal,
    ) -> Option<Self> {
        // Below the break minimum we must buy the minimum to get its price
        let order_quantity = required.max(pb.min_quantity);
        let cost = pb
            .unit_price
            .checked_mul(Decimal::from(order_quantity))?
            .checked_add(offset)?;
        Some(Self {
            entry,
            order_quantity,
            unit_price: pb.unit_price,
            cost,
        })
    }
}

fn packaging_allowed(packaging: &PackagingKind, reels_only: bool) -> bool {
    !reels_only || packaging.is_reel()
}

/// Pick the cheapest (entry, price break) combination that can fill `required_quantity`.
///
/// Entries are filtered by packaging and stock, then every price break of every
/// remaining entry is costed. The fold keeps the first candidate at the lowest
/// cost: a later candidate only wins when it is strictly cheaper.
/// `reel_surcharge` is added once to the cost of every Digi-Reel candidate.
/// A candidate whose cost overflows is skipped with a warning.
pub fn select(
    entries: &[CatalogEntry],
    required_quantity: u32,
    reels_only: bool,
    reel_surcharge: Decimal,
) -> SelectionResult {
    if entries.is_empty() {
        return SelectionResult::NoMatch;
    }

    let priced = entries
        .iter()
        .filter(|e| packaging_allowed(&e.packaging, reels_only))
        .filter(|e| e.available_quantity >= required_quantity)
        .filter_map(|e| match &e.price_breaks {
            Some(breaks) => Some((e, breaks)),
            None => {
                log::warn!(
                    "No pricing info for {} ({})",
                    e.external_id,
                    e.manufacturer_part_number
                );
                None
            }
        });

    let best = priced
        .flat_map(|(entry, breaks)| {
            let offset = if entry.packaging == PackagingKind::DigiReel {
                reel_surcharge
            } else {
                Decimal::ZERO
            };
            breaks.iter().filter_map(move |pb| {
                let candidate = Candidate::new(entry, pb, required_quantity, offset);
                if candidate.is_none() {
                    log::warn!(
                        "Cost of {} x{} @ {} overflows, skipping",
                        entry.external_id,
                        required_quantity.max(pb.min_quantity),
                        pb.unit_price
                    );
                }
                candidate
            })
        })
        .fold(None::<Candidate>, |best, cand| match best {
            Some(b) if cand.cost >= b.cost => Some(b),
            _ => Some(cand),
        });

    match best {
        Some(c) => {
            log::debug!(
                "Selected {} x{} @ {} (total {})",
                c.entry.external_id,
                c.order_quantity,
                c.unit_price,
                c.cost
            );
            SelectionResult::Selected {
                entry: c.entry.clone(),
                order_quantity: c.order_quantity,
                unit_price: c.unit_price,
            }
        }
        None => SelectionResult::Unavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(id: &str, qty: u32, packaging: PackagingKind, breaks: &[(u32, Decimal)]) -> CatalogEntry {
        CatalogEntry {
            external_id: id.to_string(),
            manufacturer_part_number: "RC0603FR-0710KL".to_string(),
            vendor_name: "Yageo".to_string(),
            description: "RES 10K OHM 1% 1/10W 0603".to_string(),
            available_quantity: qty,
            packaging,
            price_breaks: Some(breaks.iter().map(|&(q, p)| PriceBreak::new(q, p)).collect()),
        }
    }

    fn tiers() -> Vec<(u32, Decimal)> {
        vec![(1, dec!(1.00)), (100, dec!(0.80)), (1000, dec!(0.60))]
    }

    fn selected(result: &SelectionResult) -> (&str, u32, Decimal) {
        match result {
            SelectionResult::Selected {
                entry,
                order_quantity,
                unit_price,
            } => (entry.external_id.as_str(), *order_quantity, *unit_price),
            other => panic!("expected a selection, got {other:?}"),
        }
    }

    #[test]
    fn test_buys_required_quantity_at_reached_tier() {
        let entries = vec![entry("CT-1", 10_000, PackagingKind::CutTape, &tiers())];
        let result = select(&entries, 150, false, Decimal::ZERO);
        assert_eq!(selected(&result), ("CT-1", 150, dec!(0.80)));
        assert_eq!(result.extended_price(), Some(dec!(120.00)));
    }

    #[test]
    fn test_small_order_prefers_lowest_total_over_lowest_rate() {
        // 50 @ 1.00 = 50.00, 100 @ 0.80 = 80.00, 1000 @ 0.60 = 600.00
        let entries = vec![entry("CT-1", 10_000, PackagingKind::CutTape, &tiers())];
        let result = select(&entries, 50, false, Decimal::ZERO);
        assert_eq!(selected(&result), ("CT-1", 50, dec!(1.00)));
    }

    #[test]
    fn test_overbuying_to_reach_a_tier() {
        // 90 @ 1.00 = 90.00 loses to 100 @ 0.80 = 80.00
        let entries = vec![entry("CT-1", 10_000, PackagingKind::CutTape, &tiers())];
        let result = select(&entries, 90, false, Decimal::ZERO);
        assert_eq!(selected(&result), ("CT-1", 100, dec!(0.80)));
    }

    #[test]
    fn test_no_entries_is_no_match() {
        assert_eq!(select(&[], 10, false, Decimal::ZERO), SelectionResult::NoMatch);
    }

    #[test]
    fn test_insufficient_stock_is_unavailable() {
        let entries = vec![entry("CT-1", 99, PackagingKind::CutTape, &tiers())];
        assert_eq!(
            select(&entries, 100, false, Decimal::ZERO),
            SelectionResult::Unavailable
        );
    }

    #[test]
    fn test_stock_equal_to_requirement_qualifies() {
        let entries = vec![entry("CT-1", 100, PackagingKind::CutTape, &tiers())];
        assert!(select(&entries, 100, false, Decimal::ZERO).is_selected());
    }

    #[test]
    fn test_missing_pricing_is_skipped_not_fatal() {
        let mut unpriced = entry("DKR-1", 10_000, PackagingKind::DigiReel, &[]);
        unpriced.price_breaks = None;
        let entries = vec![
            unpriced,
            entry("CT-1", 10_000, PackagingKind::CutTape, &tiers()),
        ];
        let result = select(&entries, 10, false, Decimal::ZERO);
        assert_eq!(selected(&result), ("CT-1", 10, dec!(1.00)));

        let mut only_unpriced = entries[0].clone();
        only_unpriced.price_breaks = None;
        assert_eq!(
            select(&[only_unpriced], 10, false, Decimal::ZERO),
            SelectionResult::Unavailable
        );
    }

    #[test]
    fn test_empty_price_table_yields_no_candidate() {
        let entries = vec![entry("CT-1", 10_000, PackagingKind::CutTape, &[])];
        assert_eq!(
            select(&entries, 10, false, Decimal::ZERO),
            SelectionResult::Unavailable
        );
    }

    #[test]
    fn test_reels_only_filters_packaging() {
        let entries = vec![
            entry("CT-1", 10_000, PackagingKind::CutTape, &[(1, dec!(0.01))]),
            entry("UNK-1", 10_000, PackagingKind::Unknown, &[(1, dec!(0.01))]),
            entry("TR-1", 10_000, PackagingKind::TapeAndReel, &[(1, dec!(0.50))]),
        ];
        let result = select(&entries, 10, true, Decimal::ZERO);
        assert_eq!(selected(&result).0, "TR-1");

        // Without the filter the cheap cut tape wins
        let result = select(&entries, 10, false, Decimal::ZERO);
        assert_eq!(selected(&result).0, "CT-1");

        // Nothing reel-packaged at all
        assert_eq!(
            select(&entries[..2], 10, true, Decimal::ZERO),
            SelectionResult::Unavailable
        );
    }

    #[test]
    fn test_reel_surcharge_applies_to_digireel_only() {
        let breaks = [(1, dec!(0.10))];
        let entries = vec![
            entry("DKR-1", 10_000, PackagingKind::DigiReel, &breaks),
            entry("TR-1", 10_000, PackagingKind::TapeAndReel, &[(1, dec!(0.11))]),
        ];

        // 100 @ 0.10 = 10.00 beats 100 @ 0.11 = 11.00
        let result = select(&entries, 100, true, Decimal::ZERO);
        assert_eq!(selected(&result).0, "DKR-1");

        // With a 7.00 reeling fee the Digi-Reel costs 17.00
        let result = select(&entries, 100, true, dec!(7));
        assert_eq!(selected(&result), ("TR-1", 100, dec!(0.11)));
    }

    #[test]
    fn test_equal_cost_keeps_first_found() {
        let entries = vec![
            entry("A", 10_000, PackagingKind::CutTape, &[(1, dec!(0.50))]),
            entry("B", 10_000, PackagingKind::CutTape, &[(1, dec!(0.50))]),
        ];
        assert_eq!(selected(&select(&entries, 10, false, Decimal::ZERO)).0, "A");

        // Within one entry: 10 @ 1.00 and 20 @ 0.50 both cost 10.00
        let entries = vec![entry(
            "C",
            10_000,
            PackagingKind::CutTape,
            &[(1, dec!(1.00)), (20, dec!(0.50))],
        )];
        assert_eq!(
            selected(&select(&entries, 10, false, Decimal::ZERO)),
            ("C", 10, dec!(1.00))
        );
    }

    #[test]
    fn test_selection_is_true_minimum() {
        let catalog = vec![
            entry("CT-1", 500, PackagingKind::CutTape, &tiers()),
            entry(
                "TR-1",
                20_000,
                PackagingKind::TapeAndReel,
                &[(5000, dec!(0.05)), (10_000, dec!(0.04))],
            ),
            entry(
                "DKR-1",
                20_000,
                PackagingKind::DigiReel,
                &[(1, dec!(0.90)), (10, dec!(0.70)), (250, dec!(0.30))],
            ),
        ];
        let surcharge = dec!(7);

        for required in [1, 7, 10, 90, 100, 150, 250, 400, 500, 501, 3000, 5000, 20_000] {
            for reels_only in [false, true] {
                let result = select(&catalog, required, reels_only, surcharge);

                let costs: Vec<Decimal> = catalog
                    .iter()
                    .filter(|e| !reels_only || e.packaging.is_reel())
                    .filter(|e| e.available_quantity >= required)
                    .flat_map(|e| {
                        let offset = if e.packaging == PackagingKind::DigiReel {
                            surcharge
                        } else {
                            Decimal::ZERO
                        };
                        e.price_breaks.iter().flatten().map(move |pb| {
                            pb.unit_price * Decimal::from(required.max(pb.min_quantity)) + offset
                        })
                    })
                    .collect();

                match &result {
                    SelectionResult::Selected { entry, .. } => {
                        assert!(entry.available_quantity >= required);
                        assert!(!reels_only || entry.packaging.is_reel());

                        let offset = if entry.packaging == PackagingKind::DigiReel {
                            surcharge
                        } else {
                            Decimal::ZERO
                        };
                        let cost = result.extended_price().unwrap() + offset;
                        assert!(
                            costs.iter().all(|&c| cost <= c),
                            "required={required} reels_only={reels_only}: {cost} is not minimal"
                        );
                    }
                    SelectionResult::Unavailable => assert!(costs.is_empty()),
                    SelectionResult::NoMatch => unreachable!("catalog is not empty"),
                }
            }
        }
    }

    #[test]
    fn test_requirement_quantity() {
        let req = PurchaseRequirement::new("100-0001", 4, 25).unwrap();
        assert_eq!(req.required_quantity, 100);
        assert_eq!(req.part_key, "100-0001");
    }

    #[test]
    fn test_requirement_overflow_is_invalid() {
        let err = PurchaseRequirement::new("100-0001", 3_000_000_000, 2).unwrap_err();
        assert!(matches!(
            err,
            BomError::InvalidQuantity { ref part_number, ref value }
                if part_number == "100-0001" && value == "3000000000 x 2"
        ));
    }

    #[test]
    fn test_overflowing_surcharge_skips_candidate() {
        let entries = vec![entry("DKR-1", 10_000, PackagingKind::DigiReel, &[(1, dec!(1))])];
        assert_eq!(
            select(&entries, 10, false, Decimal::MAX),
            SelectionResult::Unavailable
        );

        // The cut tape offer is still costed normally
        let entries = vec![
            entries[0].clone(),
            entry("CT-1", 10_000, PackagingKind::CutTape, &[(1, dec!(2))]),
        ];
        assert_eq!(
            selected(&select(&entries, 10, false, Decimal::MAX)),
            ("CT-1", 10, dec!(2))
        );
    }

    #[test]
    fn test_overflowing_price_skips_candidate() {
        let huge = Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0);
        let entries = vec![
            entry("CT-1", u32::MAX, PackagingKind::CutTape, &[(1, huge)]),
            entry("CT-2", u32::MAX, PackagingKind::CutTape, &[(1, dec!(0.01))]),
        ];
        let result = select(&entries, 4_000_000_000, false, Decimal::ZERO);
        assert_eq!(selected(&result), ("CT-2", 4_000_000_000, dec!(0.01)));
        assert_eq!(result.extended_price(), Some(dec!(40000000)));

        assert_eq!(
            select(&entries[..1], 4_000_000_000, false, Decimal::ZERO),
            SelectionResult::Unavailable
        );
    }
}
