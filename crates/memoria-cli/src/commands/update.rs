//! Update command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::Value;

use memoria_core::FieldPatch;
use memoria_core::binding::now_timestamp;
use memoria_core::model::Feature;

use super::{check_creator, open_list, parse_assignment};
use crate::cli::ListTarget;
use crate::output;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub target: ListTarget,

    /// Record id
    pub id: String,

    /// Set a field, as key=value (repeatable)
    #[arg(long = "set", short = 's', value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Remove a field (repeatable)
    #[arg(long = "unset", value_name = "KEY")]
    pub unset: Vec<String>,
}

pub async fn run(args: UpdateArgs) -> Result<()> {
    let mut patch = FieldPatch::new();
    for assignment in &args.set {
        let (key, value) = parse_assignment(assignment)?;
        if value.is_null() {
            bail!("Use --unset {} to remove a field", key);
        }
        patch = patch.set(key, value);
    }
    for key in &args.unset {
        patch = patch.remove(key.as_str());
    }
    if patch.is_empty() {
        bail!("Nothing to update. Pass --set or --unset.");
    }

    let list = open_list(&args.target)?;
    check_creator(&list, &args.id).await?;

    if list.feature == Some(Feature::CommonNotes) && !patch.contains("updatedAt") {
        patch = patch.set("updatedAt", Value::String(now_timestamp()));
    }

    list.binding
        .update_item(&args.id, patch)
        .await
        .context("Failed to update record")?;
    list.binding.close();

    output::success(&format!("Updated {}", args.id));
    Ok(())
}
