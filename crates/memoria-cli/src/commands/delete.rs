//! Delete command implementation.

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use memoria_core::Record;
use memoria_core::model::{DiaryNote, Feature};

use super::{check_creator, open_list, synced_items, typed_records};
use crate::cli::ListTarget;
use crate::output;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub target: ListTarget,

    /// Record id
    pub id: String,
}

pub async fn run(args: DeleteArgs) -> Result<()> {
    let list = open_list(&args.target)?;
    check_creator(&list, &args.id).await?;

    if list.feature == Some(Feature::FamilyMembers) {
        let removed = delete_diary_notes(&args.id).await?;
        if removed > 0 {
            output::note(&format!("Deleted {} diary notes", removed));
        }
    }

    list.binding
        .delete_item(&args.id)
        .await
        .context("Failed to delete record")?;
    list.binding.close();

    output::success(&format!("Deleted {}", args.id));
    Ok(())
}

/// Delete the diary notes about a family member. Returns how many there were.
async fn delete_diary_notes(member_id: &str) -> Result<usize> {
    let diary = open_list(&ListTarget::of(Feature::DiaryNotes))?;
    let items = synced_items(&diary.binding).await?;
    let notes: Vec<Record<DiaryNote>> = typed_records(&items);

    let mut removed = 0;
    for note in DiaryNote::about(&notes, member_id) {
        debug!(id = %note.id, member = member_id, "deleting diary note");
        diary
            .binding
            .delete_item(note.id.as_str())
            .await
            .context("Failed to delete diary note")?;
        removed += 1;
    }
    diary.binding.close();

    Ok(removed)
}
