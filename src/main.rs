//! # posprint CLI
//!
//! Command-line interface for ESC/POS receipt printers on USB.
//!
//! ## Usage
//!
//! ```bash
//! # List attached printers from known vendors
//! posprint devices
//!
//! # Print the test page
//! posprint test
//!
//! # Print a bill from JSON
//! posprint print bill.json
//!
//! # Pick a specific printer and custom layout settings
//! posprint --vendor-id 04b8 --product-id 0e15 --config printer.json print bill.json
//!
//! # Encode without touching USB, raw bytes to a file
//! posprint print bill.json --dry-run --output bill.bin
//! ```
//!
//! Logging goes to stderr and follows `RUST_LOG` (default `posprint=info`).

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use posprint::{
    Error, PrinterConfig, ReceiptDocument, ReceiptPrinter, RusbHost, job::PrintJob, receipt,
};

/// posprint - ESC/POS receipt printer utility
#[derive(Parser, Debug)]
#[command(name = "posprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Printer settings (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only use a printer with this USB vendor id (hex)
    #[arg(long, global = true, value_parser = parse_hex_id)]
    vendor_id: Option<u16>,

    /// Only use a printer with this USB product id (hex)
    #[arg(long, global = true, value_parser = parse_hex_id)]
    product_id: Option<u16>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List attached devices from known printer vendors
    Devices,

    /// Print the test page
    Test {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print a receipt from a JSON file
    Print {
        /// Receipt document
        file: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Encode only, do not touch the printer
    #[arg(long)]
    dry_run: bool,

    /// With --dry-run, write the raw ESC/POS stream here instead of a hex dump
    #[arg(long, value_name = "FILE", requires = "dry_run")]
    output: Option<PathBuf>,
}

fn parse_hex_id(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid USB id '{}': {}", s, e))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "posprint=debug" } else { "posprint=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = match &cli.config {
        Some(path) => PrinterConfig::load(path)?,
        None => PrinterConfig::default(),
    };

    match cli.command {
        Commands::Devices => {
            let host = RusbHost::new()?;
            let devices = host.list_devices()?;
            if devices.is_empty() {
                println!("No receipt printers found.");
            }
            for device in devices {
                println!("{}", device);
            }
        }

        Commands::Test { output } => {
            let job = receipt::test_page_job(&config);
            if output.dry_run {
                return dry_run(&job, output.output.as_deref());
            }
            let printer = connect(cli.vendor_id, cli.product_id, config).await?;
            println!("Printing test page...");
            let result = printer.print_test().await;
            printer.disconnect().await;
            result?;
            println!("Printed successfully!");
        }

        Commands::Print { file, output } => {
            let raw = fs::read_to_string(&file)?;
            let document: ReceiptDocument = serde_json::from_str(&raw)?;

            if output.dry_run {
                let job = receipt::receipt_job(&document, &config);
                return dry_run(&job, output.output.as_deref());
            }
            let printer = connect(cli.vendor_id, cli.product_id, config).await?;
            println!("Printing bill {}...", document.bill_id);
            let result = printer.print_receipt(&document).await;
            printer.disconnect().await;
            result?;
            println!("Printed successfully!");
        }
    }

    Ok(())
}

async fn connect(
    vendor_id: Option<u16>,
    product_id: Option<u16>,
    config: PrinterConfig,
) -> Result<ReceiptPrinter<RusbHost>, Error> {
    let host = RusbHost::new()?.select(vendor_id, product_id);
    let printer = ReceiptPrinter::new(host, config);
    printer.connect().await?;
    if let Some(handle) = printer.handle() {
        println!(
            "Connected: configuration {}, interface {}, endpoint {}",
            handle.configuration(),
            handle.interface(),
            handle.endpoint().number
        );
    }
    Ok(printer)
}

/// Write the encoded job to `output`, or list frames plus a hex dump.
fn dry_run(job: &PrintJob, output: Option<&Path>) -> Result<(), Error> {
    let bytes = job.to_bytes();
    match output {
        Some(path) => {
            fs::write(path, &bytes)?;
            println!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => {
            print!("{}", job.listing());
            println!();
            print!("{}", hex_dump(&bytes));
        }
    }
    Ok(())
}

fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<47}  |{}|\n", row * 16, hex.join(" "), ascii));
    }
    out
}
