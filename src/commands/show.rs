use serde_json::Value;

use crate::cli::VendorArgs;
use crate::context::AppContext;
use crate::error::AppResult;

pub fn run(ctx: &AppContext, args: VendorArgs) -> AppResult<()> {
    let path = ctx.state_file(args.vendor);
    let snapshot = super::snapshot(args.vendor, &path)?;

    let mut lines = vec![format!("{} ({})", args.vendor, path.display())];
    lines.extend(summarize(&snapshot));
    ctx.output.emit_lines(&lines, &snapshot)
}

/// One `name: count` line per top-level part of a store snapshot.
fn summarize(snapshot: &Value) -> Vec<String> {
    let Value::Object(parts) = snapshot else {
        return Vec::new();
    };
    parts
        .iter()
        .map(|(name, part)| format!("  {name}: {}", size_of(part)))
        .collect()
}

fn size_of(part: &Value) -> String {
    match part {
        Value::Array(items) => items.len().to_string(),
        // Serialized collections carry their entities under `items`.
        Value::Object(fields) => match fields.get("items") {
            Some(Value::Array(items)) => items.len().to_string(),
            _ => fields.len().to_string(),
        },
        other => other.to_string(),
    }
}
