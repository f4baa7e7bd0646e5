use anyhow::{bail, Context, Result};
use scanorder::{ScanService, ScanStatus};

use super::{print_result, AppContext};

pub fn run(ctx: &AppContext, serial: &str) -> Result<()> {
    let service = ScanService::new(ctx.pipeline());
    let result = service
        .register(serial)
        .with_context(|| format!("Failed to register serial '{}'", serial))?;

    print_result(&result);
    if result.status() == Some(ScanStatus::Error) {
        bail!("{}", result.message());
    }
    Ok(())
}
