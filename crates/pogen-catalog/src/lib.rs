//! Vendor catalog lookup: searching a vendor's web catalog by manufacturer part
//! number and collecting the matching entries for every BOM line.

pub mod html;
pub mod quantity;
pub mod vendor;

use std::collections::BTreeMap;

use pogen_bom::{BomError, BomLine, CatalogEntry, CatalogMatches, PartListing, Source};

pub use quantity::{format_quantity, parse_available_quantity};
pub use vendor::{DEFAULT_TIMEOUT_SECS, VendorCatalog, parse_pricing_table, parse_product_table};

/// Environment variable overriding the catalog base URL (scheme and host)
pub const CATALOG_URL_ENV: &str = "POGEN_CATALOG_URL";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog request failed ({status}): {url}")]
    Status { status: u16, url: String },

    #[error("Invalid catalog URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Page has no '{0}' table")]
    MissingTable(&'static str),

    #[error("Failed to parse catalog page: {0}")]
    Parse(String),
}

/// A searchable parts catalog
pub trait Catalog {
    /// All catalog rows matching `keyword`, each with its price breaks when available
    fn search(&self, keyword: &str) -> Result<Vec<CatalogEntry>, CatalogError>;
}

/// Keep only entries whose manufacturer part number is exactly `mpn`
pub fn exact_matches(entries: Vec<CatalogEntry>, mpn: &str) -> Vec<CatalogEntry> {
    entries
        .into_iter()
        .filter(|e| e.manufacturer_part_number == mpn)
        .collect()
}

/// Base URL for a catalog host such as `digikey.com` or `www.digikey.ca`.
///
/// Any `www.` is dropped and exactly one is prefixed back; a value that already
/// carries a scheme is used as given.
pub fn base_url_for_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        return host.to_string();
    }
    format!("http://www.{}", host.replace("www.", ""))
}

/// [`base_url_for_host`], unless overridden by `POGEN_CATALOG_URL`
pub fn get_catalog_base_url(host: &str) -> String {
    if let Ok(url) = std::env::var(CATALOG_URL_ENV) {
        return url;
    }
    base_url_for_host(host)
}

/// Look up every BOM line's sources in the catalog, one search at a time.
///
/// Lines are visited in ascending part-number order. Every source with both a
/// manufacturer and an MPN is searched by MPN and its exact matches are added
/// under the BOM part number. A failed search is logged and recorded in the
/// result so the line resolves as unavailable. A BOM part missing from the
/// parts list is an error, checked before any request is made.
pub fn lookup_parts<C: Catalog + ?Sized>(
    catalog: &C,
    bom: &BTreeMap<String, BomLine>,
    parts: &BTreeMap<String, PartListing>,
    mut on_fetch: impl FnMut(&str, &Source),
) -> Result<CatalogMatches, BomError> {
    if let Some(unknown) = bom.keys().find(|k| !parts.contains_key(*k)) {
        return Err(BomError::UnknownPart(unknown.clone()));
    }

    let mut matches = CatalogMatches::new();
    for key in bom.keys() {
        let Some(listing) = parts.get(key) else {
            continue;
        };
        for source in &listing.sources {
            on_fetch(key, source);
            log::info!(
                "Fetching {key} {} {} ...",
                source.manufacturer,
                source.mpn
            );

            match catalog.search(&source.mpn) {
                Ok(entries) => {
                    let found = exact_matches(entries, &source.mpn);
                    log::debug!("{key}: {} exact matches for {}", found.len(), source.mpn);
                    matches.extend(key, found);
                }
                Err(e) => {
                    log::warn!("Lookup of {} for {key} failed: {e}", source.mpn);
                    matches.mark_failed(key);
                }
            }
        }
    }

    Ok(matches)
}
