//! Live subscriptions over server-sent events.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use memoria_core::error::{Error, RemoteErrorKind};
use memoria_core::record::tree;
use memoria_core::{AccessToken, Result, Snapshot, StoragePath};

use crate::client::RestClient;
use crate::error::transport_error;
use crate::sse::{SseEvent, SseParser};

/// Payload of `put` and `patch` events.
#[derive(Debug, Deserialize)]
struct EventPayload {
    path: String,
    data: Value,
}

/// What one event does to the subscription.
#[derive(Debug, PartialEq)]
enum Outcome {
    Changed,
    Ignored,
    Failed(Error),
}

/// Snapshot stream for one path of a hosted database.
///
/// The first `put` event carries the whole subtree; later events are applied
/// to a local copy and each one yields a fresh snapshot. The stream ends after
/// an error: a `cancel` or `auth_revoked` event, a failed request, or the
/// server closing the connection.
pub struct RestSubscription {
    inner: Pin<Box<dyn Stream<Item = Result<Snapshot>> + Send>>,
}

impl RestSubscription {
    pub(crate) fn new(client: RestClient, path: StoragePath, token: Option<AccessToken>) -> Self {
        let stream = async_stream::stream! {
            let response = match client.stream(&path, token.as_ref()).await {
                Ok(response) => response,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            info!(%path, "Event stream connected");

            let mut body = response.bytes_stream();
            let mut parser = SseParser::new();
            let mut local = Value::Null;

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(%path, error = %e, "Event stream failed");
                        yield Err(transport_error(e));
                        return;
                    }
                };

                for event in parser.feed(&chunk) {
                    match apply_event(&mut local, &event) {
                        Outcome::Changed => {
                            yield Ok(Snapshot::from_value(path.clone(), local.clone()));
                        }
                        Outcome::Ignored => {}
                        Outcome::Failed(e) => {
                            warn!(%path, error = %e, "Event stream closed by server");
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            debug!(%path, "Event stream ended");
            yield Err(Error::remote(
                RemoteErrorKind::Unavailable,
                "event stream closed",
            ));
        };

        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for RestSubscription {
    type Item = Result<Snapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

fn apply_event(local: &mut Value, event: &SseEvent) -> Outcome {
    trace!(event = %event.event, "Event");

    match event.event.as_str() {
        "put" | "patch" => {
            let payload = match serde_json::from_str::<EventPayload>(&event.data) {
                Ok(payload) => payload,
                Err(e) => {
                    return Outcome::Failed(Error::remote(
                        RemoteErrorKind::Protocol,
                        format!("malformed {} event: {}", event.event, e),
                    ));
                }
            };

            let at: Vec<&str> = payload.path.split('/').filter(|s| !s.is_empty()).collect();

            if event.event == "put" {
                tree::set_at(local, &at, payload.data);
            } else if let Value::Object(children) = payload.data {
                for (key, value) in children {
                    let child = at
                        .iter()
                        .copied()
                        .chain(key.split('/').filter(|s| !s.is_empty()));
                    tree::set_at(local, child, value);
                }
            }
            Outcome::Changed
        }
        "keep-alive" => Outcome::Ignored,
        "cancel" => Outcome::Failed(Error::remote(
            RemoteErrorKind::PermissionDenied,
            "subscription cancelled by security rules",
        )),
        "auth_revoked" => Outcome::Failed(Error::remote(
            RemoteErrorKind::PermissionDenied,
            "auth token is no longer valid",
        )),
        other => {
            debug!(event = other, "Ignoring unknown event");
            Outcome::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str, data: Value) -> SseEvent {
        SseEvent {
            event: name.into(),
            data: data.to_string(),
        }
    }

    #[test]
    fn put_at_root_replaces_everything() {
        let mut local = json!({"old": {}});
        let outcome = apply_event(
            &mut local,
            &event("put", json!({"path": "/", "data": {"a": {"text": "x"}}})),
        );
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(local, json!({"a": {"text": "x"}}));
    }

    #[test]
    fn put_below_root_and_null_delete() {
        let mut local = json!({"a": {"text": "x"}, "b": {"text": "y"}});
        apply_event(
            &mut local,
            &event("put", json!({"path": "/a/status", "data": "done"})),
        );
        apply_event(&mut local, &event("put", json!({"path": "/b", "data": null})));
        assert_eq!(local, json!({"a": {"text": "x", "status": "done"}}));
    }

    #[test]
    fn patch_merges_children() {
        let mut local = json!({"a": {"text": "x", "customName": "Gran"}});
        apply_event(
            &mut local,
            &event(
                "patch",
                json!({"path": "/a", "data": {"customName": null, "status": "done"}}),
            ),
        );
        assert_eq!(local, json!({"a": {"text": "x", "status": "done"}}));
    }

    #[test]
    fn cancel_is_permission_denied() {
        let mut local = Value::Null;
        let Outcome::Failed(err) = apply_event(&mut local, &event("cancel", Value::Null)) else {
            panic!("cancel should fail the subscription");
        };
        assert_eq!(err.remote_kind(), Some(RemoteErrorKind::PermissionDenied));
    }

    #[test]
    fn keep_alive_is_ignored() {
        let mut local = Value::Null;
        assert_eq!(
            apply_event(&mut local, &event("keep-alive", Value::Null)),
            Outcome::Ignored
        );
    }
}
