use anyhow::{Context, Result};
use scanorder::{ensure_layout, Workbook};

use super::AppContext;

pub fn run(ctx: &AppContext) -> Result<()> {
    let created = ensure_layout(&*ctx.workbook, &ctx.config.sheets)
        .context("Failed to create workbook sheets")?;

    println!("Database: {}", ctx.database_path.display());
    if created.is_empty() {
        println!("All sheets already exist");
    } else {
        for sheet in &created {
            println!("Created sheet '{}'", sheet);
        }
    }

    if !ctx.workbook.has_sheet(&ctx.config.sheets.catalog)? {
        println!(
            "Catalog sheet '{}' is missing; load it with `scanorder catalog import <CSV>`",
            ctx.config.sheets.catalog
        );
    }

    Ok(())
}
