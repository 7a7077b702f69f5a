use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use rust_decimal::Decimal;

use pogen_bom::{
    OrderOptions, PurchaseOrder, SelectionResult, build_purchase_order, read_bom, read_part_list,
    write_purchase_order,
};
use pogen_catalog::{
    DEFAULT_TIMEOUT_SECS, VendorCatalog, format_quantity, get_catalog_base_url, lookup_parts,
};

use crate::progress::Spinner;

/// Largest accepted `--digireel-cost`
const MAX_DIGIREEL_COST: u32 = 1_000_000;

#[derive(Args, Debug, Clone)]
pub struct OrderArgs {
    /// Path to the input BOM
    #[arg(long, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
    pub bom: PathBuf,

    /// Path to write the purchase order to
    #[arg(long = "out", value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Path to the parts list
    #[arg(long, value_name = "PATH", value_hint = clap::ValueHint::FilePath)]
    pub partlist: PathBuf,

    /// Vendor catalog host: digikey.com, digikey.ca, etc...
    #[arg(long, value_name = "HOST")]
    pub url: String,

    /// Number of boards to buy for
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub qty: u32,

    /// Only consider Digi-Reel or Tape & Reel packaging
    #[arg(long)]
    pub reels: bool,

    /// Value-added cost of a Digi-Reel, added once per line
    #[arg(
        long = "digireel-cost",
        alias = "digireel_cost",
        value_name = "COST",
        default_value = "0"
    )]
    pub digireel_cost: Decimal,

    /// Timeout for each catalog request, in seconds
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Don't print the order summary
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn execute(args: OrderArgs) -> Result<()> {
    if args.digireel_cost.is_sign_negative() {
        anyhow::bail!("--digireel-cost must not be negative");
    }
    if args.digireel_cost > Decimal::from(MAX_DIGIREEL_COST) {
        anyhow::bail!("--digireel-cost must be at most {MAX_DIGIREEL_COST}");
    }

    let parts = read_part_list(&args.partlist)
        .with_context(|| format!("Failed to read parts list {}", args.partlist.display()))?;
    let bom = read_bom(&args.bom)
        .with_context(|| format!("Failed to read BOM {}", args.bom.display()))?;

    let base_url = get_catalog_base_url(&args.url);
    log::debug!("Using catalog at {base_url}");
    let catalog = VendorCatalog::new(base_url, Duration::from_secs(args.timeout))
        .context("Failed to create catalog client")?;

    let spinner = Spinner::start();
    let matches = lookup_parts(&catalog, &bom, &parts, |key, source| {
        spinner.set_message(format!(
            "Fetching {key} {} {} ...",
            source.manufacturer.cyan(),
            source.mpn
        ));
    });
    drop(spinner);
    let matches = matches.context("Failed to look up parts")?;
    log::debug!("Looked up {} of {} BOM lines", matches.len(), bom.len());

    let options = OrderOptions {
        build_quantity: args.qty,
        reels_only: args.reels,
        reel_surcharge: args.digireel_cost,
    };
    let order = build_purchase_order(&bom, &matches, &options)
        .context("Failed to build purchase order")?;

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    write_purchase_order(BufWriter::new(file), &order)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if !args.quiet {
        write_order_table(&order, io::stdout().lock())?;
    }

    let missing = order.missing_count();
    if missing > 0 {
        eprintln!(
            "{} {missing} of {} lines have no qualifying offer",
            "Warning:".yellow(),
            order.lines.len()
        );
    }
    eprintln!(
        "{} Wrote purchase order to {}",
        "✓".green(),
        args.output.display()
    );

    Ok(())
}

fn write_order_table<W: Write>(order: &PurchaseOrder, mut writer: W) -> io::Result<()> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(comfy_table::ContentArrangement::DynamicFullWidth);

    for (part_number, result) in order.iter() {
        match result {
            SelectionResult::Selected {
                entry,
                order_quantity,
                unit_price,
            } => table.add_row(vec![
                part_number.clone(),
                entry.external_id.clone(),
                entry.vendor_name.clone(),
                entry.manufacturer_part_number.clone(),
                format_quantity(*order_quantity),
                unit_price.to_string(),
                result
                    .extended_price()
                    .map(|p| p.round_dp(2).to_string())
                    .unwrap_or_default(),
            ]),
            _ => table.add_row(vec![
                part_number.clone(),
                String::new(),
                "missing".red().to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ]),
        };
    }

    table.set_header(vec![
        "Part Number",
        "DK PN",
        "Vendor",
        "MPN",
        "Qty",
        "Unit Price",
        "Extended",
    ]);

    writeln!(writer, "{table}")?;
    let total = order
        .total_cost()
        .map(|t| t.round_dp(2).to_string())
        .unwrap_or_else(|| "overflow".to_string());
    writeln!(writer, "{} {total}", "Total:".bold())?;
    Ok(())
}
