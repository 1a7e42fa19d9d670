//! On-disk layout of a file store.
//!
//! ```text
//! {root}/data/{segment}/.../{key}.json    one file per record
//! {root}/accounts/{uid}/account.json
//! {root}/changes.jsonl                    append-only change log
//! {root}/changes.lock
//! ```
//!
//! A value lives in the first `{segment}.json` file found along its path.
//! Anything below that file is a field inside it; anything without a file is
//! assembled from the directory tree.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use memoria_core::error::{AuthError, Error, RemoteErrorKind};
use memoria_core::record::tree;
use memoria_core::{FieldPatch, RecordId, Result, StoragePath};

fn map_io(err: std::io::Error) -> Error {
    Error::remote(RemoteErrorKind::Io, err.to_string())
}

fn map_json(err: serde_json::Error) -> Error {
    Error::remote(RemoteErrorKind::Protocol, format!("corrupt store file: {}", err))
}

/// Account stored in a local store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalAccount {
    /// Generated user id.
    pub uid: String,
    /// Sign-in email.
    pub email: String,
    /// Name shown on shared records.
    pub display_name: String,
    /// When the account was created.
    pub created_at: String,
    /// Password hash (bcrypt).
    pub password_hash: String,
}

/// A line of the change log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ChangeLogEvent {
    /// The path that was written.
    pub path: String,
    /// RFC 3339 timestamp.
    pub time: String,
    pub op: ChangeOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ChangeOp {
    Set,
    Update,
    Remove,
}

/// Filesystem storage under one root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a file store rooted at `root`. Nothing is created until the
    /// first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    fn accounts_dir(&self) -> PathBuf {
        self.root.join("accounts")
    }

    fn account_path(&self, uid: &RecordId) -> PathBuf {
        self.accounts_dir().join(uid.as_str()).join("account.json")
    }

    pub(crate) fn changes_path(&self) -> PathBuf {
        self.root.join("changes.jsonl")
    }

    fn changes_lock_path(&self) -> PathBuf {
        self.root.join("changes.lock")
    }

    fn dir_for(&self, path: &StoragePath) -> PathBuf {
        path.segments()
            .fold(self.data_dir(), |dir, segment| dir.join(segment))
    }

    /// The file that holds `path`, and the segments of `path` inside it.
    fn locate(&self, path: &StoragePath) -> Option<(PathBuf, Vec<String>)> {
        let segments: Vec<&str> = path.segments().collect();
        let mut dir = self.data_dir();

        for (i, segment) in segments.iter().enumerate() {
            let file = dir.join(format!("{}.json", segment));
            if file.is_file() {
                let rest = segments[i + 1..].iter().map(|s| s.to_string()).collect();
                return Some((file, rest));
            }
            dir = dir.join(segment);
        }

        None
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Read the value at `path`.
    pub fn read(&self, path: &StoragePath) -> Result<Option<Value>> {
        if let Some((file, rest)) = self.locate(path) {
            let value = read_json(&file)?;
            return Ok(tree::value_at(&value, &rest).cloned());
        }

        let dir = self.dir_for(path);
        if !dir.is_dir() {
            return Ok(None);
        }

        let value = read_dir_tree(&dir)?;
        Ok(non_empty(value))
    }

    /// Replace the value at `path`. A `null` value removes it.
    #[instrument(skip(self, value))]
    pub fn set(&self, path: &StoragePath, value: &Value) -> Result<()> {
        self.write_locked(path, ChangeOp::Set, || match self.locate(path) {
            Some((file, rest)) if rest.is_empty() => write_json(&file, value),
            Some((file, rest)) => {
                let mut current = read_json(&file)?;
                tree::set_at(&mut current, &rest, value.clone());
                write_json(&file, &current)
            }
            None => {
                remove_dir(&self.dir_for(path))?;
                write_json(&self.file_for(path), value)
            }
        })
    }

    /// Merge `patch` into the object at `path`, creating it if absent.
    #[instrument(skip(self, patch))]
    pub fn update(&self, path: &StoragePath, patch: &FieldPatch) -> Result<()> {
        self.write_locked(path, ChangeOp::Update, || match self.locate(path) {
            Some((file, rest)) => {
                let mut current = read_json(&file)?;
                tree::merge_at(&mut current, &rest, patch);
                write_json(&file, &current)
            }
            None => {
                let dir = self.dir_for(path);
                let mut current = if dir.is_dir() {
                    read_dir_tree(&dir)?
                } else {
                    Value::Object(Map::new())
                };
                tree::merge_at(&mut current, Vec::<&str>::new(), patch);
                remove_dir(&dir)?;
                write_json(&self.file_for(path), &current)
            }
        })
    }

    /// Delete `path` and everything below it.
    #[instrument(skip(self))]
    pub fn remove(&self, path: &StoragePath) -> Result<()> {
        self.write_locked(path, ChangeOp::Remove, || match self.locate(path) {
            Some((file, rest)) if rest.is_empty() => remove_file(&file),
            Some((file, rest)) => {
                let mut current = read_json(&file)?;
                if tree::remove_at(&mut current, &rest) {
                    write_json(&file, &current)?;
                }
                Ok(())
            }
            None => remove_dir(&self.dir_for(path)),
        })
    }

    fn file_for(&self, path: &StoragePath) -> PathBuf {
        let dir = path
            .parent()
            .map(|parent| self.dir_for(&parent))
            .unwrap_or_else(|| self.data_dir());
        dir.join(format!("{}.json", path.last_segment()))
    }

    /// Run `write` and log it, holding the store lock across both so that
    /// read-modify-write cycles from other processes cannot interleave.
    fn write_locked<F>(&self, path: &StoragePath, op: ChangeOp, write: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        fs::create_dir_all(&self.root).map_err(map_io)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.changes_lock_path())
            .map_err(map_io)?;

        lock_file.lock_exclusive().map_err(map_io)?;

        // Dropping the lock file on an early return releases the lock.
        write()?;
        self.append_change(path, op)?;

        lock_file.unlock().map_err(map_io)?;
        Ok(())
    }

    /// Append a line to the change log. The caller holds the store lock.
    fn append_change(&self, path: &StoragePath, op: ChangeOp) -> Result<()> {
        let event = ChangeLogEvent {
            path: path.to_string(),
            time: Utc::now().to_rfc3339(),
            op,
        };
        let line = serde_json::to_string(&event).map_err(map_json)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.changes_path())
            .map_err(map_io)?;

        writeln!(file, "{}", line).map_err(map_io)?;
        file.sync_data().map_err(map_io)?;

        trace!(path = %path, ?op, "Appended change");
        Ok(())
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Create an account with an already hashed password.
    ///
    /// # Errors
    ///
    /// [`AuthError::AccountExists`] if the email is taken.
    #[instrument(skip(self, password_hash))]
    pub fn create_account(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
    ) -> Result<LocalAccount> {
        if self.find_account_by_email(email)?.is_some() {
            return Err(AuthError::AccountExists(email.to_string()).into());
        }

        let uid = RecordId::new(Uuid::new_v4().simple().to_string())?;
        let account = LocalAccount {
            uid: uid.to_string(),
            email: email.to_string(),
            display_name: display_name.to_string(),
            created_at: Utc::now().to_rfc3339(),
            password_hash: password_hash.to_string(),
        };

        let account_path = self.account_path(&uid);
        if let Some(parent) = account_path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }

        let content = serde_json::to_string_pretty(&account).map_err(map_json)?;
        fs::write(&account_path, content).map_err(map_io)?;

        debug!(uid = %uid, email = %email, "Created local account");

        Ok(account)
    }

    /// Look up an account by user id.
    pub fn get_account(&self, uid: &str) -> Result<Option<LocalAccount>> {
        let Ok(uid) = RecordId::new(uid) else {
            return Ok(None);
        };

        let account_path = self.account_path(&uid);
        if !account_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&account_path).map_err(map_io)?;
        let account = serde_json::from_str(&content).map_err(map_json)?;
        Ok(Some(account))
    }

    /// Every account in the store.
    pub fn list_accounts(&self) -> Result<Vec<LocalAccount>> {
        let accounts_dir = self.accounts_dir();
        if !accounts_dir.exists() {
            return Ok(Vec::new());
        }

        let mut accounts = Vec::new();
        for entry in fs::read_dir(&accounts_dir).map_err(map_io)? {
            let entry = entry.map_err(map_io)?;
            let account_file = entry.path().join("account.json");

            if account_file.exists() {
                let content = fs::read_to_string(&account_file).map_err(map_io)?;
                if let Ok(account) = serde_json::from_str::<LocalAccount>(&content) {
                    accounts.push(account);
                }
            }
        }

        Ok(accounts)
    }

    /// Look up an account by email, ignoring case.
    pub fn find_account_by_email(&self, email: &str) -> Result<Option<LocalAccount>> {
        let accounts = self.list_accounts()?;
        Ok(accounts
            .into_iter()
            .find(|a| a.email.eq_ignore_ascii_case(email)))
    }
}

fn read_json(file: &Path) -> Result<Value> {
    let content = fs::read_to_string(file).map_err(map_io)?;
    serde_json::from_str(&content).map_err(map_json)
}

/// Write `value` to `file` via a temp file. Empty values remove the file.
fn write_json(file: &Path, value: &Value) -> Result<()> {
    if non_empty(value.clone()).is_none() {
        return remove_file(file);
    }

    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent).map_err(map_io)?;
    }

    let content = serde_json::to_string_pretty(value).map_err(map_json)?;
    let temp_path = file.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    fs::write(&temp_path, &content).map_err(map_io)?;
    fs::rename(&temp_path, file).map_err(map_io)?;

    Ok(())
}

fn remove_file(file: &Path) -> Result<()> {
    match fs::remove_file(file) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(map_io(e)),
        _ => Ok(()),
    }
}

fn remove_dir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(map_io(e)),
        _ => Ok(()),
    }
}

fn read_dir_tree(dir: &Path) -> Result<Value> {
    let mut map = Map::new();

    for entry in fs::read_dir(dir).map_err(map_io)? {
        let entry = entry.map_err(map_io)?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if path.is_dir() {
            if let Some(value) = non_empty(read_dir_tree(&path)?) {
                map.insert(name.to_string(), value);
            }
        } else if let Some(key) = name.strip_suffix(".json") {
            map.insert(key.to_string(), read_json(&path)?);
        }
    }

    Ok(Value::Object(map))
}

fn non_empty(value: Value) -> Option<Value> {
    match &value {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        _ => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn path(s: &str) -> StoragePath {
        StoragePath::new(s).unwrap()
    }

    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn records_are_one_file_each() {
        let (dir, store) = store();
        store
            .set(&path("users/u1/ideas/a"), &json!({"text": "x"}))
            .unwrap();

        let file = dir.path().join("data/users/u1/ideas/a.json");
        assert!(file.is_file());
        assert_eq!(
            store.read(&path("users/u1/ideas")).unwrap(),
            Some(json!({"a": {"text": "x"}}))
        );
        assert_eq!(
            store.read(&path("users/u1/ideas/a/text")).unwrap(),
            Some(json!("x"))
        );
    }

    #[test]
    fn update_merges_into_record_file() {
        let (_dir, store) = store();
        let record = path("ideas/a");
        store
            .set(&record, &json!({"text": "x", "status": "pending"}))
            .unwrap();
        store
            .update(
                &record,
                &FieldPatch::new().set("status", "done").remove("text"),
            )
            .unwrap();
        assert_eq!(store.read(&record).unwrap(), Some(json!({"status": "done"})));
    }

    #[test]
    fn concurrent_merges_keep_every_field() {
        let (dir, store) = store();
        let record = path("ideas/a");
        store.set(&record, &json!({"text": "x"})).unwrap();

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                let record = record.clone();
                std::thread::spawn(move || {
                    store
                        .update(&record, &FieldPatch::new().set(format!("f{}", i), i))
                        .unwrap();
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let value = store.read(&record).unwrap().unwrap();
        let fields = value.as_object().unwrap();
        assert_eq!(fields.len(), 17);
        assert_eq!(fields["f7"], 7);

        let leftovers: Vec<_> = fs::read_dir(dir.path().join("data/ideas"))
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn update_missing_record_creates_it() {
        let (_dir, store) = store();
        store
            .update(&path("ideas/new"), &FieldPatch::new().set("status", "done"))
            .unwrap();
        assert_eq!(
            store.read(&path("ideas")).unwrap(),
            Some(json!({"new": {"status": "done"}}))
        );
    }

    #[test]
    fn writes_below_a_record_edit_its_file() {
        let (_dir, store) = store();
        store.set(&path("ideas/a"), &json!({"text": "x"})).unwrap();
        store.set(&path("ideas/a/status"), &json!("done")).unwrap();
        store.remove(&path("ideas/a/text")).unwrap();
        assert_eq!(
            store.read(&path("ideas/a")).unwrap(),
            Some(json!({"status": "done"}))
        );
    }

    #[test]
    fn remove_is_idempotent_and_logged() {
        let (dir, store) = store();
        store.set(&path("ideas/a"), &json!({"text": "x"})).unwrap();
        store.remove(&path("ideas/a")).unwrap();
        store.remove(&path("ideas/a")).unwrap();
        assert_eq!(store.read(&path("ideas")).unwrap(), None);

        let log = fs::read_to_string(dir.path().join("changes.jsonl")).unwrap();
        let ops: Vec<ChangeOp> = log
            .lines()
            .map(|l| serde_json::from_str::<ChangeLogEvent>(l).unwrap().op)
            .collect();
        assert_eq!(ops, [ChangeOp::Set, ChangeOp::Remove, ChangeOp::Remove]);
    }

    #[test]
    fn accounts_are_unique_by_email() {
        let (_dir, store) = store();
        let account = store
            .create_account("alice@example.com", "Alice", "hash")
            .unwrap();
        assert_eq!(
            store.get_account(&account.uid).unwrap().unwrap().email,
            "alice@example.com"
        );

        let err = store
            .create_account("ALICE@example.com", "Alice again", "hash")
            .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::AccountExists(_))));
        assert!(store.get_account("../escape").unwrap().is_none());
    }
}
