use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price break structure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PriceBreak {
    pub min_quantity: u32,
    pub unit_price: Decimal,
}

impl PriceBreak {
    pub fn new(min_quantity: u32, unit_price: Decimal) -> Self {
        Self {
            min_quantity,
            unit_price,
        }
    }
}

/// Packaging of a catalog entry, classified from the vendor's packaging text
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum PackagingKind {
    CutTape,
    DigiReel,
    TapeAndReel,
    Other(String),
    /// The catalog row had no packaging field at all
    #[default]
    Unknown,
}

impl PackagingKind {
    /// Classify the packaging cell text, e.g. `Digi-Reel®` or `Tape & Reel (TR)`.
    pub fn from_text(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return PackagingKind::Unknown;
        };
        if text.starts_with("Digi-Reel") {
            PackagingKind::DigiReel
        } else if text.starts_with("Tape & Reel") {
            PackagingKind::TapeAndReel
        } else if text.starts_with("Cut Tape") {
            PackagingKind::CutTape
        } else {
            PackagingKind::Other(text.to_string())
        }
    }

    pub fn is_reel(&self) -> bool {
        matches!(self, PackagingKind::DigiReel | PackagingKind::TapeAndReel)
    }
}

/// One product row from the vendor catalog
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogEntry {
    /// Vendor part number ("DK PN")
    pub external_id: String,
    pub manufacturer_part_number: String,
    pub vendor_name: String,
    pub description: String,
    pub available_quantity: u32,
    pub packaging: PackagingKind,
    /// `None` when the vendor page had no pricing table for this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_breaks: Option<Vec<PriceBreak>>,
}

impl CatalogEntry {
    pub fn has_pricing(&self) -> bool {
        self.price_breaks.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packaging_from_text() {
        assert_eq!(
            PackagingKind::from_text(Some("Digi-Reel®")),
            PackagingKind::DigiReel
        );
        assert_eq!(
            PackagingKind::from_text(Some("Tape & Reel (TR)")),
            PackagingKind::TapeAndReel
        );
        assert_eq!(
            PackagingKind::from_text(Some("Cut Tape (CT)")),
            PackagingKind::CutTape
        );
        assert_eq!(
            PackagingKind::from_text(Some("Tray")),
            PackagingKind::Other("Tray".to_string())
        );
        assert_eq!(PackagingKind::from_text(None), PackagingKind::Unknown);
    }

    #[test]
    fn test_only_reel_packaging_is_reel() {
        assert!(PackagingKind::DigiReel.is_reel());
        assert!(PackagingKind::TapeAndReel.is_reel());
        assert!(!PackagingKind::CutTape.is_reel());
        assert!(!PackagingKind::Other("Reel".to_string()).is_reel());
        assert!(!PackagingKind::Unknown.is_reel());
    }
}
