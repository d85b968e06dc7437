use serde_json::json;
use tracing::info;

use crate::cli::InitArgs;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};

pub fn run(ctx: &AppContext, args: InitArgs) -> AppResult<()> {
    let path = ctx.state_file(args.vendor);
    if path.exists() && !args.force {
        return Err(AppError::InvalidInput(format!(
            "{} already exists. pass --force to overwrite it",
            path.display()
        )));
    }

    super::seed(args.vendor, &path)?;
    let settings_created = ctx.ensure_settings()?;
    info!(vendor = %args.vendor, path = %path.display(), settings_created, "state initialized");

    let text = format!("initialized {} state at {}", args.vendor, path.display());
    let payload = json!({
        "vendor": args.vendor.as_str(),
        "path": path.display().to_string(),
        "settings_created": settings_created,
    });
    ctx.output.emit(&text, &payload)
}
