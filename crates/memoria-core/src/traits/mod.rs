//! Core traits for store and authentication backends.

mod auth;
mod store;
mod subscription;

pub use auth::AuthProvider;
pub use store::Store;
pub use subscription::Subscription;
