//! List command implementation.

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, Utc};
use clap::Args;
use serde_json::Value;

use memoria_core::model::{
    CommonNote, DiaryNote, Feature, Idea, IdeaFilter, IdeaStatus, Reminder, ReminderFilter,
    ReminderStatus, SortOrder, sort_by_created, sort_by_due,
};
use memoria_core::{Record, RecordId};

use super::{open_list, sort_records, synced_items, typed_records};
use crate::cli::ListTarget;
use crate::output;

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub target: ListTarget,

    /// Display order: newest, oldest, or for reminders due and due-desc
    #[arg(long, default_value = "newest")]
    pub sort: ListOrder,

    /// Only ideas (pending, done) or reminders (pending, completed, overdue) with this status
    #[arg(long)]
    pub status: Option<String>,

    /// Only ideas in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Only ideas or reminders whose text contains this, ignoring case
    #[arg(long)]
    pub search: Option<String>,

    /// Only diary notes about this family member
    #[arg(long, value_name = "ID")]
    pub member: Option<String>,

    /// Only open reminders due on this day (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub due: Option<NaiveDate>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Order of the printed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    Created(SortOrder),
    Due { latest_first: bool },
}

impl FromStr for ListOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "due" | "due-asc" => Ok(ListOrder::Due {
                latest_first: false,
            }),
            "due-desc" => Ok(ListOrder::Due { latest_first: true }),
            "newest" => Ok(ListOrder::Created(SortOrder::Newest)),
            "oldest" => Ok(ListOrder::Created(SortOrder::Oldest)),
            _ => Err(anyhow!(
                "unknown sort order '{}', expected newest, oldest, due or due-desc",
                s
            )),
        }
    }
}

pub async fn run(args: ListArgs) -> Result<()> {
    check_options(&args, args.target.feature())?;

    let list = open_list(&args.target)?;
    let mut items = synced_items(&list.binding).await?;
    list.binding.close();

    items.retain(|record| record.fields.is_object());
    let items = arrange(list.feature, items, &args)?;
    if items.is_empty() {
        output::note("No records found.");
        return Ok(());
    }

    for record in &items {
        if args.pretty {
            output::json_pretty(record)?;
        } else {
            output::json(record)?;
        }
    }

    Ok(())
}

/// Refuse options the list has no use for.
fn check_options(args: &ListArgs, feature: Option<Feature>) -> Result<()> {
    let is = |wanted: &[Feature]| feature.is_some_and(|f| wanted.contains(&f));

    if args.status.is_some() && !is(&[Feature::Ideas, Feature::Reminders]) {
        bail!("--status only applies to ideas and reminders");
    }
    if args.search.is_some() && !is(&[Feature::Ideas, Feature::Reminders]) {
        bail!("--search only applies to ideas and reminders");
    }
    if args.category.is_some() && !is(&[Feature::Ideas]) {
        bail!("--category only applies to ideas");
    }
    if args.member.is_some() && !is(&[Feature::DiaryNotes]) {
        bail!("--member only applies to diaryNotes");
    }
    if args.due.is_some() && !is(&[Feature::Reminders]) {
        bail!("--due only applies to reminders");
    }
    if matches!(args.sort, ListOrder::Due { .. }) && !is(&[Feature::Reminders]) {
        bail!("Sorting by due date only applies to reminders");
    }
    Ok(())
}

/// Filter and order the records of a list.
///
/// Known features go through their model type; records that do not have
/// the feature's shape are left out.
fn arrange(
    feature: Option<Feature>,
    mut items: Vec<Record<Value>>,
    args: &ListArgs,
) -> Result<Vec<Record<Value>>> {
    let created = match args.sort {
        ListOrder::Created(order) => order,
        ListOrder::Due { .. } => SortOrder::Newest,
    };

    let order: Vec<RecordId> = match feature {
        Some(Feature::Ideas) => {
            let filter = IdeaFilter {
                status: args
                    .status
                    .as_deref()
                    .map(str::parse::<IdeaStatus>)
                    .transpose()
                    .context("Invalid --status")?,
                category: args.category.clone(),
                search: args.search.clone(),
            };
            let mut ideas: Vec<Record<Idea>> = typed_records(&items);
            ideas.retain(|record| filter.matches(&record.fields));
            sort_by_created(&mut ideas, created);
            ids(&ideas)
        }
        Some(Feature::Reminders) => {
            let filter = ReminderFilter {
                status: args
                    .status
                    .as_deref()
                    .map(str::parse::<ReminderStatus>)
                    .transpose()
                    .context("Invalid --status")?,
                due_on: args.due,
                search: args.search.clone(),
            };
            let now = Utc::now();
            let mut reminders: Vec<Record<Reminder>> = typed_records(&items);
            reminders.retain(|record| filter.matches(&record.fields, now));
            match args.sort {
                ListOrder::Due { latest_first } => sort_by_due(&mut reminders, latest_first),
                ListOrder::Created(order) => sort_by_created(&mut reminders, order),
            }
            ids(&reminders)
        }
        Some(Feature::DiaryNotes) => {
            let notes: Vec<Record<DiaryNote>> = typed_records(&items);
            let mut notes = match &args.member {
                Some(member) => DiaryNote::about(&notes, member).cloned().collect(),
                None => notes,
            };
            sort_by_created(&mut notes, created);
            ids(&notes)
        }
        Some(Feature::CommonNotes) => {
            let mut notes: Vec<Record<CommonNote>> = typed_records(&items);
            sort_by_created(&mut notes, created);
            ids(&notes)
        }
        Some(Feature::FamilyMembers) | None => {
            sort_records(&mut items, created);
            return Ok(items);
        }
    };

    let mut by_id: HashMap<RecordId, Record<Value>> = items
        .into_iter()
        .map(|record| (record.id.clone(), record))
        .collect();
    Ok(order.iter().filter_map(|id| by_id.remove(id)).collect())
}

fn ids<T>(items: &[Record<T>]) -> Vec<RecordId> {
    items.iter().map(|record| record.id.clone()).collect()
}
