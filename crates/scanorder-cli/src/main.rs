//! scanorder CLI - drive the scan-to-order pipeline from a terminal.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::AppContext;

/// Turns barcode scans into deduplicated fulfillment orders
#[derive(Parser)]
#[command(name = "scanorder")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (JSON). Defaults apply when omitted.
    #[arg(long, env = "SCANORDER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Workbook database; overrides the config file
    #[arg(long, env = "SCANORDER_DATABASE", global = true)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and any missing sheets
    Init,

    /// Register a scanned serial and process it immediately
    Scan {
        serial: String,
    },

    /// Simulate a cell edit on the scan sheet
    Edit {
        /// 1-based row of the edited cell
        #[arg(long)]
        row: usize,

        /// New cell value
        #[arg(long)]
        value: String,

        /// Edited sheet (defaults to the scan sheet)
        #[arg(long)]
        sheet: Option<String>,

        /// 1-based edited column
        #[arg(long, default_value_t = 1)]
        column: usize,
    },

    /// Process every pending scan row once
    Sweep,

    /// Run workers and the periodic sweep until interrupted
    Serve {
        /// Print each scan's progress through the pipeline
        #[arg(long)]
        progress: bool,
    },

    /// Reference catalog maintenance
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },

    /// Inspect and update orders
    Order {
        #[command(subcommand)]
        command: OrderCommands,
    },
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// Replace the catalog sheet with the contents of a CSV file
    Import { path: PathBuf },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Show one order and its line items
    Show {
        id: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List orders
    List {
        /// Only orders with this status (e.g. PENDENTE, CANCELADO)
        #[arg(long)]
        status: Option<String>,

        /// Maximum number of orders to print
        #[arg(long)]
        limit: Option<usize>,

        /// Newest orders first
        #[arg(long)]
        newest_first: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Move an order to a new fulfillment status
    SetStatus {
        id: String,
        status: String,

        /// Person responsible for the change
        #[arg(long)]
        by: String,

        /// Mark an urgent order as completed urgently
        #[arg(long)]
        urgent_done: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    scanorder::logging::init_tracing(level, cli.json_logs)?;

    let ctx = AppContext::open(cli.config.as_deref(), cli.database.as_deref())?;

    match cli.command {
        Commands::Init => commands::init::run(&ctx)?,
        Commands::Scan { serial } => commands::scan::run(&ctx, &serial)?,
        Commands::Edit {
            row,
            value,
            sheet,
            column,
        } => commands::edit::run(&ctx, row, &value, sheet, column)?,
        Commands::Sweep => commands::sweep::run(&ctx)?,
        Commands::Serve { progress } => commands::serve::run(&ctx, progress)?,
        Commands::Catalog { command } => match command {
            CatalogCommands::Import { path } => commands::catalog::import(&ctx, &path)?,
        },
        Commands::Order { command } => match command {
            OrderCommands::Show { id, json } => commands::order::show(&ctx, &id, json)?,
            OrderCommands::List {
                status,
                limit,
                newest_first,
                json,
            } => commands::order::list(&ctx, status.as_deref(), limit, newest_first, json)?,
            OrderCommands::SetStatus {
                id,
                status,
                by,
                urgent_done,
            } => commands::order::set_status(&ctx, &id, &status, &by, urgent_done)?,
        },
    }

    Ok(())
}
