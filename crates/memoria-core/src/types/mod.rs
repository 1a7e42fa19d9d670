//! Core Memoria types.
//!
//! These types enforce store key and path rules at construction time,
//! so an invalid path never reaches a backend.

mod path;
mod record_id;
mod store_url;

pub use path::{ResourceName, StoragePath, USERS_ROOT};
pub use record_id::RecordId;
pub use store_url::StoreUrl;

pub(crate) use record_id::validate_key;
