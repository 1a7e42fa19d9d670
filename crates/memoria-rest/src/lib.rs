//! memoria-rest - Hosted realtime database backend.
//!
//! Writes go over the database's REST API (`PUT`, `PATCH` and `DELETE` on
//! `{db}/{path}.json`). Subscriptions use the same URL with
//! `Accept: text/event-stream`; the server streams `put` and `patch` events
//! that are applied to a local copy of the subscribed subtree.
//!
//! Accounts are handled by [`RestAuth`], a client for the identity toolkit
//! email/password endpoints. The ID token it returns is passed to
//! [`RestStore::with_token`].

mod auth;
mod client;
mod error;
mod sse;
mod store;
mod subscription;

pub use auth::{DEFAULT_AUTH_ENDPOINT, RestAuth};
pub use client::RestClient;
pub use sse::{SseEvent, SseParser};
pub use store::RestStore;
pub use subscription::RestSubscription;
