//! memoria-core - Core types, store traits and the list binding.
//!
//! Every Memoria feature (ideas, diary notes, family members, shared notes,
//! reminders) is a collection of records living at one path of a realtime
//! key-value store. This crate provides the pieces that turn such a path into
//! a live local list:
//!
//! - [`PathResolver`] derives the storage path from a resource name, a
//!   [`PathMode`] and the current [`AuthState`].
//! - [`ListBinding`] subscribes to that path, mirrors every snapshot into an
//!   observable [`ListState`], and offers add/update/delete against it.
//! - [`Store`] and [`AuthProvider`] are the seams backends implement;
//!   [`MemoryStore`] is the in-process implementation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use memoria_core::{AuthState, Identity, ListBinding, MemoryStore, PathMode};
//! use memoria_core::model::{Idea, IdeaStatus};
//!
//! # async fn example() -> memoria_core::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let auth = AuthState::signed_in(Identity::new("u1", "Alice"));
//! let ideas = ListBinding::<_, Idea>::open(store, "ideas", PathMode::UserScoped, &auth)?;
//!
//! let created = ideas
//!     .add_item(Idea::new("buy milk", "Errands"))
//!     .await?;
//! assert_eq!(created.fields.status, IdeaStatus::Pending);
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod memory;
pub mod model;
pub mod record;
pub mod resolver;
pub mod tokens;
pub mod traits;
pub mod types;

pub use binding::{ListBinding, ListState, SyncStatus};
pub use credentials::Credentials;
pub use error::Error;
pub use identity::{AuthSession, AuthState, Identity};
pub use memory::MemoryStore;
pub use record::{FieldPatch, FieldUpdate, Record, Snapshot};
pub use resolver::{PathMode, PathResolver, Resolution};
pub use tokens::AccessToken;
pub use traits::{AuthProvider, Store, Subscription};
pub use types::{RecordId, ResourceName, StoragePath, StoreUrl};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
