//! Watch command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use memoria_core::SyncStatus;
use memoria_core::model::SortOrder;

use super::{checked, open_list, sort_records};
use crate::cli::ListTarget;
use crate::output;

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub target: ListTarget,

    /// Display order by creation time: newest or oldest
    #[arg(long, default_value = "newest")]
    pub sort: SortOrder,

    /// Print each update as one JSON array per line
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: WatchArgs) -> Result<()> {
    let list = open_list(&args.target)?;
    let mut rx = list.binding.watch();

    output::note(&format!(
        "Watching {} (Ctrl-C to stop)...",
        args.target.resource_name()
    ));

    loop {
        let state = rx.borrow_and_update().clone();
        if !state.loading() {
            let mut items = checked(state)?;
            items.retain(|record| record.fields.is_object());
            sort_records(&mut items, args.sort);

            if args.json {
                output::json(&items)?;
            } else {
                eprintln!(
                    "{} {} record(s)",
                    chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
                    items.len()
                );
                for record in &items {
                    output::json(record)?;
                }
            }
        }

        tokio::select! {
            changed = rx.changed() => {
                changed.context("List binding closed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    if list.binding.status() == SyncStatus::Synced {
        output::success("Stopped watching");
    }
    list.binding.close();

    Ok(())
}
