use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const PART_NUMBER_COLUMN: &str = "Part Number";
pub const QUANTITY_COLUMN: &str = "Quantity";
pub const DESCRIPTION_COLUMN: &str = "Description";

/// Manufacturer/MPN column pairs of a parts list, in lookup order
pub const SOURCE_COLUMNS: [(&str, &str); 2] = [("Mfg1", "Mpn1"), ("Mfg2", "Mpn2")];

/// Errors that can occur while reading the parts list or BOM
#[derive(Debug, thiserror::Error)]
pub enum BomError {
    #[error("Failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Invalid quantity '{value}' for part {part_number}")]
    InvalidQuantity { part_number: String, value: String },

    #[error("Part {0} is in the BOM but not in the parts list")]
    UnknownPart(String),
}

/// A manufacturer and manufacturer part number that can source a part
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    pub manufacturer: String,
    pub mpn: String,
}

/// A row of the parts list: an internal part number and how to buy it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartListing {
    pub part_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
}

/// A row of the BOM: an internal part number and units needed per build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub part_number: String,
    pub quantity: u32,
}

/// Column positions resolved from a CSV header row
struct Columns {
    headers: csv::StringRecord,
}

impl Columns {
    fn new(headers: &csv::StringRecord) -> Self {
        Self {
            headers: headers.clone(),
        }
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn required(&self, name: &str) -> Result<usize, BomError> {
        self.optional(name)
            .ok_or_else(|| BomError::MissingColumn(name.to_string()))
    }
}

fn csv_reader(content: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes())
}

/// Parse a parts list (`Part Number,Description,Mfg1,Mpn1,Mfg2,Mpn2`).
///
/// `Part Number`, `Mfg1` and `Mpn1` are required; the second source pair and the
/// description are optional. A source is kept only when both its manufacturer and
/// MPN are non-empty. A repeated part number replaces the earlier row.
pub fn parse_part_list(content: &str) -> Result<BTreeMap<String, PartListing>, BomError> {
    let mut reader = csv_reader(content);
    let columns = Columns::new(reader.headers()?);

    let part_col = columns.required(PART_NUMBER_COLUMN)?;
    let description_col = columns.optional(DESCRIPTION_COLUMN);
    let mut source_cols = Vec::with_capacity(SOURCE_COLUMNS.len());
    for (i, (mfg, mpn)) in SOURCE_COLUMNS.iter().enumerate() {
        // Only the first pair is mandatory
        let pair = if i == 0 {
            Some((columns.required(mfg)?, columns.required(mpn)?))
        } else {
            columns.optional(mfg).zip(columns.optional(mpn))
        };
        source_cols.extend(pair);
    }

    let mut parts = BTreeMap::new();
    for result in reader.records() {
        let record = result?;
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let part_number = field(part_col);
        if part_number.is_empty() {
            continue;
        }

        let sources = source_cols
            .iter()
            .filter_map(|&(mfg, mpn)| {
                let (mfg, mpn) = (field(mfg), field(mpn));
                (!mfg.is_empty() && !mpn.is_empty()).then(|| Source {
                    manufacturer: mfg.to_string(),
                    mpn: mpn.to_string(),
                })
            })
            .collect();

        let listing = PartListing {
            part_number: part_number.to_string(),
            description: description_col
                .map(field)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            sources,
        };
        parts.insert(listing.part_number.clone(), listing);
    }

    Ok(parts)
}

/// Parse a BOM (`Part Number,...,Quantity,...`); other columns are ignored.
pub fn parse_bom(content: &str) -> Result<BTreeMap<String, BomLine>, BomError> {
    let mut reader = csv_reader(content);
    let columns = Columns::new(reader.headers()?);

    let part_col = columns.required(PART_NUMBER_COLUMN)?;
    let qty_col = columns.required(QUANTITY_COLUMN)?;

    let mut lines = BTreeMap::new();
    for result in reader.records() {
        let record = result?;

        let part_number = record.get(part_col).unwrap_or("");
        if part_number.is_empty() {
            continue;
        }

        let raw_qty = record.get(qty_col).unwrap_or("");
        let quantity = raw_qty
            .parse::<u32>()
            .ok()
            .filter(|&q| q > 0)
            .ok_or_else(|| BomError::InvalidQuantity {
                part_number: part_number.to_string(),
                value: raw_qty.to_string(),
            })?;

        lines.insert(
            part_number.to_string(),
            BomLine {
                part_number: part_number.to_string(),
                quantity,
            },
        );
    }

    Ok(lines)
}

pub fn read_part_list(path: &Path) -> Result<BTreeMap<String, PartListing>, BomError> {
    parse_part_list(&fs::read_to_string(path)?)
}

pub fn read_bom(path: &Path) -> Result<BTreeMap<String, BomLine>, BomError> {
    parse_bom(&fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PART_LIST: &str = "\
Part Number,Description,Mfg1,Mpn1,Mfg2,Mpn2
100-0001,10k 0603,Yageo,RC0603FR-0710KL,Vishay,CRCW060310K0FKEA
100-0002,100nF 0402,Murata,GRM155R71C104KA88D,,
100-0003,Header,,,,
";

    #[test]
    fn test_parse_part_list() {
        let parts = parse_part_list(PART_LIST).unwrap();
        assert_eq!(parts.len(), 3);

        let resistor = &parts["100-0001"];
        assert_eq!(resistor.description.as_deref(), Some("10k 0603"));
        assert_eq!(
            resistor.sources,
            vec![
                Source {
                    manufacturer: "Yageo".to_string(),
                    mpn: "RC0603FR-0710KL".to_string(),
                },
                Source {
                    manufacturer: "Vishay".to_string(),
                    mpn: "CRCW060310K0FKEA".to_string(),
                },
            ]
        );

        assert_eq!(parts["100-0002"].sources.len(), 1);
        assert!(parts["100-0003"].sources.is_empty());
    }

    #[test]
    fn test_part_list_second_source_optional() {
        let parts = parse_part_list("Part Number,Mfg1,Mpn1\nP1,TI,LM358\n").unwrap();
        assert_eq!(parts["P1"].sources.len(), 1);
        assert_eq!(parts["P1"].description, None);
    }

    #[test]
    fn test_source_needs_both_fields() {
        let parts = parse_part_list("Part Number,Mfg1,Mpn1\nP1,,LM358\nP2,TI,\n").unwrap();
        assert!(parts["P1"].sources.is_empty());
        assert!(parts["P2"].sources.is_empty());
    }

    #[test]
    fn test_part_list_missing_column() {
        let err = parse_part_list("Part Number,Description,Mfg1\nP1,x,TI\n").unwrap_err();
        assert!(matches!(err, BomError::MissingColumn(ref c) if c == "Mpn1"));
    }

    #[test]
    fn test_parse_bom() {
        let bom = parse_bom(
            "Part Number,Description,Quantity,Designator\n\
             100-0002,100nF,4,\"C1,C2,C3,C4\"\n\
             100-0001,10k,2,\"R1,R2\"\n",
        )
        .unwrap();

        let keys: Vec<_> = bom.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["100-0001", "100-0002"]);
        assert_eq!(bom["100-0002"].quantity, 4);
    }

    #[test]
    fn test_bom_duplicate_key_replaces() {
        let bom = parse_bom("Part Number,Quantity\nP1,1\nP1,3\n").unwrap();
        assert_eq!(bom.len(), 1);
        assert_eq!(bom["P1"].quantity, 3);
    }

    #[test]
    fn test_bom_missing_quantity_column() {
        let err = parse_bom("Part Number,Qty\nP1,1\n").unwrap_err();
        assert!(matches!(err, BomError::MissingColumn(ref c) if c == "Quantity"));
    }

    #[test]
    fn test_bom_invalid_quantity() {
        for bad in ["two", "", "0", "-1"] {
            let err = parse_bom(&format!("Part Number,Quantity\nP1,{bad}\n")).unwrap_err();
            assert!(
                matches!(err, BomError::InvalidQuantity { ref value, .. } if value == bad),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "Part Number,Quantity\nP1,2\n").unwrap();
        assert_eq!(read_bom(&path).unwrap()["P1"].quantity, 2);

        let missing = dir.path().join("nope.csv");
        assert!(matches!(read_bom(&missing), Err(BomError::IoError(_))));
    }
}
