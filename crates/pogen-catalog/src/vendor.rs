use std::time::Duration;

use reqwest::blocking::Client;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use pogen_bom::{CatalogEntry, PackagingKind, PriceBreak};

use crate::html::{self, Element};
use crate::quantity::parse_available_quantity;
use crate::{Catalog, CatalogError};

/// Schema.org type marking a product row in the search results
const PRODUCT_ITEMTYPE: &str = "http://schema.org/Product";
const PRODUCT_TABLE_ID: &str = "productTable";
const PRICING_TABLE_ID: &str = "product-dollars";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Product-search client for a vendor web catalog.
///
/// Every search issues one request for the result page and then one request
/// per product for its pricing table, strictly one after another.
pub struct VendorCatalog {
    client: Client,
    base_url: String,
}

impl VendorCatalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn search_url(&self, keyword: &str) -> Result<url::Url, CatalogError> {
        let url = url::Url::parse_with_params(
            &format!("{}/product-search/en", self.base_url),
            &[("keywords", keyword)],
        )?;
        Ok(url)
    }

    fn fetch(&self, keyword: &str) -> Result<String, CatalogError> {
        let url = self.search_url(keyword)?;
        log::debug!("GET {url}");

        let response = self.client.get(url.clone()).send()?;
        if !response.status().is_success() {
            return Err(CatalogError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text()?)
    }

    /// Price breaks for a vendor part number, `None` when the page has no pricing table
    fn fetch_pricing(&self, external_id: &str) -> Result<Option<Vec<PriceBreak>>, CatalogError> {
        let page = self.fetch(external_id)?;
        parse_pricing_table(&page)
    }
}

impl Catalog for VendorCatalog {
    fn search(&self, keyword: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
        let page = self.fetch(keyword)?;
        let mut entries = parse_product_table(&page)?;

        for entry in entries.iter_mut().filter(|e| !e.external_id.is_empty()) {
            entry.price_breaks = match self.fetch_pricing(&entry.external_id) {
                Ok(breaks) => breaks,
                Err(e) => {
                    log::warn!("Failed to fetch pricing for {}: {e}", entry.external_id);
                    None
                }
            };
        }

        Ok(entries)
    }
}

fn required_cell(row: &Element<'_>, class: &str) -> Result<String, CatalogError> {
    row.find_by_class("td", class)
        .map(|td| td.text())
        .ok_or_else(|| CatalogError::Parse(format!("product row has no '{class}' cell")))
}

fn parse_product_row(row: &Element<'_>) -> Result<CatalogEntry, CatalogError> {
    let packaging = row.find_by_class("td", "tr-packaging").map(|td| td.text());

    Ok(CatalogEntry {
        external_id: required_cell(row, "tr-dkPartNumber")?,
        manufacturer_part_number: required_cell(row, "tr-mfgPartNumber")?,
        vendor_name: required_cell(row, "tr-vendor")?,
        description: required_cell(row, "tr-description")?,
        available_quantity: parse_available_quantity(&required_cell(row, "tr-qtyAvailable")?),
        packaging: PackagingKind::from_text(packaging.as_deref()),
        price_breaks: None,
    })
}

/// Product rows of a search result page, without pricing.
///
/// Rows lacking one of the expected cells are skipped with a warning; a page
/// without the product table is an error.
pub fn parse_product_table(page: &str) -> Result<Vec<CatalogEntry>, CatalogError> {
    let table = html::find_by_id(page, "table", PRODUCT_TABLE_ID)
        .ok_or(CatalogError::MissingTable(PRODUCT_TABLE_ID))?;
    let body = table.find_all("tbody").into_iter().next().unwrap_or(table);

    let mut entries = Vec::new();
    for row in body
        .find_all("tr")
        .iter()
        .filter(|tr| tr.attr("itemtype").as_deref() == Some(PRODUCT_ITEMTYPE))
    {
        match parse_product_row(row) {
            Ok(entry) => entries.push(entry),
            Err(e) => log::warn!("Skipping product row: {e}"),
        }
    }

    Ok(entries)
}

fn parse_number(cell: &str) -> Option<Decimal> {
    cell.trim_start_matches('$').replace(',', "").parse().ok()
}

/// The `(quantity, unit price, extended price)` pricing table of a product page.
///
/// Header rows (no `<td>` cells) are ignored, as are blank cells.
pub fn parse_pricing_table(page: &str) -> Result<Option<Vec<PriceBreak>>, CatalogError> {
    let Some(table) = html::find_by_id(page, "table", PRICING_TABLE_ID) else {
        return Ok(None);
    };

    let mut breaks = Vec::new();
    for row in table.find_all("tr") {
        let cells: Vec<String> = row
            .find_all("td")
            .iter()
            .map(Element::text)
            .filter(|c| !c.is_empty())
            .collect();
        if cells.is_empty() {
            continue;
        }

        let bad_row = || CatalogError::Parse(format!("bad pricing row: {}", cells.join(" | ")));
        let [qty, unit_price, ..] = cells.as_slice() else {
            return Err(bad_row());
        };
        let min_quantity = parse_number(qty)
            .and_then(|q| q.trunc().to_u32())
            .filter(|&q| q > 0)
            .ok_or_else(bad_row)?;
        let unit_price = parse_number(unit_price)
            .filter(|p| !p.is_sign_negative())
            .ok_or_else(bad_row)?;

        breaks.push(PriceBreak::new(min_quantity, unit_price));
    }

    Ok(Some(breaks))
}
