//! Add command implementation.

use std::io::Read;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use memoria_core::binding::{CREATED_AT, now_timestamp};
use memoria_core::model::{CommonNote, DiaryNote, FamilyMember, Feature, Idea, Reminder};

use super::{open_list, parse_assignment};
use crate::cli::ListTarget;
use crate::output;

#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(flatten)]
    pub target: ListTarget,

    /// Record as a JSON object, read from a file or '-' for stdin
    #[arg(long, value_name = "FILE")]
    pub json: Option<String>,

    /// Set a field, as key=value (repeatable; values are parsed as JSON when possible)
    #[arg(long = "field", short = 'f', value_name = "KEY=VALUE")]
    pub fields: Vec<String>,
}

pub async fn run(args: AddArgs) -> Result<()> {
    let mut fields = match &args.json {
        Some(source) => read_object(source)?,
        None => Map::new(),
    };
    for assignment in &args.fields {
        let (key, value) = parse_assignment(assignment)?;
        fields.insert(key, value);
    }
    if fields.is_empty() {
        bail!("Nothing to add. Pass --json or at least one --field.");
    }

    let list = open_list(&args.target)?;
    if let Some(feature) = list.feature {
        prepare(feature, &mut fields)?;
    }

    let record = list
        .binding
        .add_item(Value::Object(fields))
        .await
        .context("Failed to add record")?;
    list.binding.close();

    output::success(&format!("Added to {}", args.target.resource_name()));
    println!("{}", record.id);

    Ok(())
}

fn read_object(source: &str) -> Result<Map<String, Value>> {
    let json = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))?
    };

    match serde_json::from_str(&json).context("Invalid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("Record must be a JSON object"),
    }
}

/// Fill in defaults for a known feature and check the record has its shape.
///
/// Fields the feature does not know are dropped.
fn prepare(feature: Feature, fields: &mut Map<String, Value>) -> Result<()> {
    if feature != Feature::FamilyMembers && !fields.contains_key(CREATED_AT) {
        fields.insert(CREATED_AT.to_string(), Value::String(now_timestamp()));
    }

    let due_day = fields
        .get("dueDate")
        .and_then(Value::as_str)
        .and_then(|due| NaiveDate::parse_from_str(due, "%Y-%m-%d").ok());
    if feature == Feature::Reminders
        && let Some(day) = due_day
    {
        let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
        fields.insert(
            "dueDate".to_string(),
            Value::String(start.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        );
    }

    let value = Value::Object(std::mem::take(fields));
    let normalized = match feature {
        Feature::Ideas => normalize::<Idea>(value),
        Feature::FamilyMembers => normalize::<FamilyMember>(value),
        Feature::DiaryNotes => normalize::<DiaryNote>(value),
        Feature::CommonNotes => normalize::<CommonNote>(value),
        Feature::Reminders => normalize::<Reminder>(value),
    };

    match normalized.with_context(|| format!("Not a valid {} record", feature))? {
        Value::Object(map) => {
            *fields = map;
            Ok(())
        }
        _ => bail!("Not a valid {} record", feature),
    }
}

/// Round-trip through the model type, filling in its defaults.
fn normalize<T: Serialize + DeserializeOwned>(value: Value) -> serde_json::Result<Value> {
    let typed: T = serde_json::from_value(value)?;
    serde_json::to_value(typed)
}
