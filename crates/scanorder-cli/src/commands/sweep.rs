use anyhow::{Context, Result};
use scanorder::ScanService;

use super::{print_result, AppContext};

pub fn run(ctx: &AppContext) -> Result<()> {
    let sweeper = ctx.sweeper();
    let results = ScanService::new(ctx.pipeline())
        .sweep_once(&sweeper)
        .context("Sweep failed")?;

    if results.is_empty() {
        println!("No pending scans");
    }
    for result in &results {
        print_result(result);
    }
    Ok(())
}
