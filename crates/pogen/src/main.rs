use clap::Parser;
use colored::Colorize;
use env_logger::Env;

mod order;
mod progress;

#[derive(Parser)]
#[command(name = "pogen")]
#[command(about = "Generate a purchase order from a BOM and parts list", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true, hide = true)]
    debug: bool,

    #[command(flatten)]
    order: order::OrderArgs,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default level depends on --debug, RUST_LOG overrides either way
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("warn")
    };
    progress::SpinnerLogger::init(&mut env_logger::Builder::from_env(env))?;

    order::execute(cli.order)
}
