//! Subcommand implementations.

pub mod add;
pub mod delete;
pub mod list;
pub mod login;
pub mod logout;
pub mod signup;
pub mod update;
pub mod watch;
pub mod whoami;

use std::cmp::Reverse;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use memoria_core::model::{CommonNote, Feature, SortOrder};
use memoria_core::{ListBinding, ListState, PathMode, Record, SyncStatus};

use crate::cli::{Commands, ListTarget, StoreArgs};
use crate::session::{CliSession, CliStore, storage};

pub async fn handle(command: Commands, store: StoreArgs) -> Result<()> {
    match command {
        Commands::Signup(args) => signup::run(args, store).await,
        Commands::Login(args) => login::run(args, store).await,
        Commands::Logout(args) => logout::run(args).await,
        Commands::Whoami(args) => whoami::run(args).await,
        Commands::List(args) => list::run(args).await,
        Commands::Add(args) => add::run(args).await,
        Commands::Update(args) => update::run(args).await,
        Commands::Delete(args) => delete::run(args).await,
        Commands::Watch(args) => watch::run(args).await,
    }
}

/// A list opened for the saved session.
pub(crate) struct OpenList {
    pub session: CliSession,
    pub feature: Option<Feature>,
    pub binding: ListBinding<CliStore, Value>,
}

impl ListTarget {
    /// The known feature behind the resource name, if any.
    pub fn feature(&self) -> Option<Feature> {
        self.resource.parse().ok()
    }

    /// Shared features are always global; anything else is per user unless
    /// `--global` is given.
    pub fn mode(&self) -> PathMode {
        match self.feature() {
            Some(feature) if feature.mode() == PathMode::GlobalRoot => PathMode::GlobalRoot,
            _ if self.global => PathMode::GlobalRoot,
            _ => PathMode::UserScoped,
        }
    }

    /// The list backing `feature`.
    pub fn of(feature: Feature) -> Self {
        Self {
            resource: feature.resource().to_string(),
            global: false,
        }
    }

    /// Name of the collection in the store.
    pub fn resource_name(&self) -> &str {
        self.feature()
            .map(Feature::resource)
            .unwrap_or(self.resource.as_str())
    }
}

/// Load the session and bind to `target`.
pub(crate) fn open_list(target: &ListTarget) -> Result<OpenList> {
    let session = storage::require_session()?;
    let store = session.connect()?;

    let binding = ListBinding::open(
        Arc::new(store),
        target.resource_name(),
        target.mode(),
        &session.auth_state(),
    )
    .with_context(|| format!("Failed to open list '{}'", target.resource))?;

    Ok(OpenList {
        session,
        feature: target.feature(),
        binding,
    })
}

/// Wait for the first snapshot and fail if the subscription did.
pub(crate) async fn synced_items(binding: &ListBinding<CliStore, Value>) -> Result<Vec<Record<Value>>> {
    let state = binding.settled().await.context("List binding closed")?;
    checked(state)
}

pub(crate) fn checked(state: ListState<Value>) -> Result<Vec<Record<Value>>> {
    match state.status {
        SyncStatus::Synced => Ok(state.items),
        SyncStatus::Errored => match state.error {
            Some(e) => Err(e).context("Subscription failed"),
            None => bail!("Subscription failed"),
        },
        SyncStatus::Unsubscribed => bail!("Not signed in"),
        SyncStatus::Uninitialized | SyncStatus::Subscribing => bail!("List is still loading"),
    }
}

/// Decode records into a model type, leaving out those without its shape.
pub(crate) fn typed_records<T: DeserializeOwned>(items: &[Record<Value>]) -> Vec<Record<T>> {
    items
        .iter()
        .filter_map(|record| match serde_json::from_value(record.fields.clone()) {
            Ok(fields) => Some(Record::new(record.id.clone(), fields)),
            Err(e) => {
                warn!(id = %record.id, error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}

/// Order records by their `createdAt` field. Records without one go last
/// when newest-first, first when oldest-first. Ties keep their id order.
pub(crate) fn sort_records(items: &mut [Record<Value>], order: SortOrder) {
    fn created(record: &Record<Value>) -> Option<String> {
        record
            .fields
            .get(memoria_core::binding::CREATED_AT)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    items.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
    match order {
        SortOrder::Newest => items.sort_by_key(|r| Reverse(created(r))),
        SortOrder::Oldest => items.sort_by_key(created),
    }
}

/// Refuse to change a shared note created by someone else. A note that is
/// not there has no creator to check.
pub(crate) async fn check_creator(list: &OpenList, id: &str) -> Result<()> {
    if list.feature != Some(Feature::CommonNotes) {
        return Ok(());
    }

    let items = synced_items(&list.binding).await?;
    let Some(record) = items.into_iter().find(|record| record.id.as_str() == id) else {
        return Ok(());
    };

    let note: CommonNote =
        serde_json::from_value(record.fields).context("Stored note is malformed")?;
    if !note.can_modify(list.session.identity()) {
        bail!(
            "Only {} can change this note",
            note.creator_display_name
        );
    }
    Ok(())
}

/// Parse `key=value`. The value is read as JSON when it parses, otherwise
/// it is taken as a plain string.
pub(crate) fn parse_assignment(input: &str) -> Result<(String, Value)> {
    let (key, raw) = input
        .split_once('=')
        .with_context(|| format!("Expected key=value, got '{}'", input))?;

    let key = key.trim();
    if key.is_empty() {
        bail!("Missing field name in '{}'", input);
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoria_core::RecordId;
    use serde_json::json;

    fn target(resource: &str, global: bool) -> ListTarget {
        ListTarget {
            resource: resource.to_string(),
            global,
        }
    }

    #[test]
    fn assignment_values_are_json_or_text() {
        assert_eq!(parse_assignment("done=true").unwrap(), ("done".into(), json!(true)));
        assert_eq!(parse_assignment("n=3").unwrap(), ("n".into(), json!(3)));
        assert_eq!(
            parse_assignment("text=buy milk").unwrap(),
            ("text".into(), json!("buy milk"))
        );
        assert_eq!(
            parse_assignment("text=a=b").unwrap(),
            ("text".into(), json!("a=b"))
        );
        assert_eq!(parse_assignment("text=").unwrap(), ("text".into(), json!("")));
    }

    #[test]
    fn assignment_needs_key_and_equals() {
        assert!(parse_assignment("text").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn shared_notes_are_always_global() {
        assert_eq!(target("commonNotes", false).mode(), PathMode::GlobalRoot);
        assert_eq!(target("common-notes", false).resource_name(), "commonNotes");
        assert_eq!(target("ideas", false).mode(), PathMode::UserScoped);
        assert_eq!(target("bulletin", true).mode(), PathMode::GlobalRoot);
        assert_eq!(target("bulletin", false).resource_name(), "bulletin");
    }

    #[test]
    fn records_sort_by_created_at() {
        let record = |id: &str, created: Option<&str>| {
            let fields = match created {
                Some(at) => json!({ "createdAt": at }),
                None => json!({}),
            };
            Record::new(RecordId::new(id).unwrap(), fields)
        };
        let mut items = vec![
            record("b", Some("2024-05-01T09:00:00.000Z")),
            record("a", None),
            record("c", Some("2024-05-03T09:00:00.000Z")),
        ];

        sort_records(&mut items, SortOrder::Newest);
        let ids: Vec<_> = items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);

        sort_records(&mut items, SortOrder::Oldest);
        let ids: Vec<_> = items.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
