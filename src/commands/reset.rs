use serde_json::json;

use crate::cli::VendorArgs;
use crate::context::AppContext;
use crate::error::AppResult;

pub fn run(ctx: &AppContext, args: VendorArgs) -> AppResult<()> {
    let path = ctx.state_file(args.vendor);
    super::reset_file(args.vendor, &path)?;

    let text = format!("reset {} state at {}", args.vendor, path.display());
    let payload = json!({ "vendor": args.vendor.as_str(), "path": path.display().to_string() });
    ctx.output.emit(&text, &payload)
}
