//! memoria-file - Filesystem-backed store.
//!
//! Keeps the whole tree under one directory, one JSON file per record, so a
//! store can be inspected and edited by hand. Several processes may share a
//! directory: every write is appended to a locked change log that live
//! subscriptions follow.
//!
//! Access follows the same rules as the hosted database: a signed-in user
//! may read and write `users/{their uid}/...` and any path outside `users/`.

mod backend;
mod session;
mod store;
mod subscription;

pub use backend::FileBackend;
pub use session::FileSession;
pub use store::{FileStore, LocalAccount};
pub use subscription::FileSubscription;
