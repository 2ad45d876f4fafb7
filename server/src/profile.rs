//! Best-effort display-name lookup against a public Nostr relay.
//!
//! The lookup is a single request future bounded by a timeout. It is only
//! served from its own route and never consulted while logging in.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use nostrauth_proto::Event;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

const METADATA_KIND: u32 = 0;

/// Ask `relay_url` for the kind 0 metadata of `pubkey` (lowercase hex) and
/// return its `display_name`, falling back to `name`. Any failure, including
/// running past `timeout`, yields `None`.
pub async fn lookup_display_name(
    relay_url: &str,
    pubkey: &str,
    timeout: Duration,
) -> Option<String> {
    match tokio::time::timeout(timeout, fetch_metadata(relay_url, pubkey)).await {
        Ok(Ok(name)) => name,
        Ok(Err(e)) => {
            tracing::debug!(relay = relay_url, pubkey, error = %e, "display-name lookup failed");
            None
        }
        Err(_) => {
            tracing::debug!(relay = relay_url, pubkey, "display-name lookup timed out");
            None
        }
    }
}

async fn fetch_metadata(relay_url: &str, pubkey: &str) -> anyhow::Result<Option<String>> {
    let (ws, _) = tokio_tungstenite::connect_async(relay_url).await?;
    let (mut sink, mut stream) = ws.split();

    let sub_id = format!("display-name-{}", &pubkey[..pubkey.len().min(8)]);
    let req = json!(["REQ", sub_id, {"kinds": [METADATA_KIND], "authors": [pubkey], "limit": 1}]);
    sink.send(Message::Text(req.to_string())).await?;

    let mut found = None;
    while let Some(msg) = stream.next().await {
        let text = match msg? {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };
        match parse_relay_message(&text, &sub_id, pubkey) {
            RelayReply::Event(event) => {
                found = display_name_from_content(&event.content);
                break;
            }
            RelayReply::EndOfStored => break,
            RelayReply::Other => continue,
        }
    }

    let close = json!(["CLOSE", sub_id]);
    let _ = sink.send(Message::Text(close.to_string())).await;
    let _ = sink.close().await;
    Ok(found)
}

#[derive(Debug)]
enum RelayReply {
    /// A verified metadata event by the requested author.
    Event(Event),
    EndOfStored,
    Other,
}

fn parse_relay_message(text: &str, sub_id: &str, pubkey: &str) -> RelayReply {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(text) else {
        return RelayReply::Other;
    };
    if items.get(1).and_then(Value::as_str) != Some(sub_id) {
        return RelayReply::Other;
    }

    match items.first().and_then(Value::as_str) {
        Some("EOSE") => RelayReply::EndOfStored,
        Some("EVENT") => {
            let Some(event) = items
                .get(2)
                .and_then(|v| serde_json::from_value::<Event>(v.clone()).ok())
            else {
                return RelayReply::Other;
            };
            // Relays are untrusted: drop anything unsigned or off-topic.
            if event.kind != METADATA_KIND || event.pubkey != pubkey || !event.verify() {
                return RelayReply::Other;
            }
            RelayReply::Event(event)
        }
        _ => RelayReply::Other,
    }
}

fn display_name_from_content(content: &str) -> Option<String> {
    let value: Value = serde_json::from_str(content).ok()?;
    ["display_name", "name"]
        .iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nostrauth_proto::{Keys, UnsignedEvent};
    use tokio::net::TcpListener;

    fn metadata(keys: &Keys, content: &str) -> Event {
        UnsignedEvent {
            pubkey: keys.public_key_hex(),
            created_at: 1_700_000_000,
            kind: METADATA_KIND,
            tags: vec![],
            content: content.to_string(),
        }
        .sign(keys)
    }

    /// A one-shot relay that answers every REQ with `event` then EOSE.
    async fn spawn_relay(event: Option<Event>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            while let Some(Ok(Message::Text(text))) = ws.next().await {
                let req: Value = serde_json::from_str(&text).unwrap();
                if req[0] != "REQ" {
                    continue;
                }
                let sub = req[1].as_str().unwrap().to_string();
                if let Some(event) = &event {
                    let msg = json!(["EVENT", sub, event]);
                    ws.send(Message::Text(msg.to_string())).await.unwrap();
                }
                let eose = json!(["EOSE", sub]);
                ws.send(Message::Text(eose.to_string())).await.unwrap();
            }
        });
        format!("ws://{addr}")
    }

    #[test]
    fn display_name_preferred_over_name() {
        assert_eq!(
            display_name_from_content(r#"{"name":"bob","display_name":"Bob B"}"#).as_deref(),
            Some("Bob B")
        );
        assert_eq!(display_name_from_content(r#"{"name":"bob"}"#).as_deref(), Some("bob"));
        let content = r#"{"display_name":"","name":"bob"}"#;
        assert_eq!(display_name_from_content(content).as_deref(), Some("bob"));
        assert_eq!(display_name_from_content(r#"{"about":"x"}"#), None);
        assert_eq!(display_name_from_content("not json"), None);
    }

    #[test]
    fn relay_messages_for_other_subscriptions_are_ignored() {
        let keys = Keys::generate();
        let pk = keys.public_key_hex();
        let event = metadata(&keys, r#"{"name":"x"}"#);
        let text = json!(["EVENT", "other", event]).to_string();
        assert!(matches!(parse_relay_message(&text, "mine", &pk), RelayReply::Other));
        assert!(matches!(
            parse_relay_message(&json!(["EOSE", "mine"]).to_string(), "mine", &pk),
            RelayReply::EndOfStored
        ));
        assert!(matches!(parse_relay_message("garbage", "mine", &pk), RelayReply::Other));
    }

    #[test]
    fn forged_or_foreign_events_are_dropped() {
        let keys = Keys::generate();
        let pk = keys.public_key_hex();

        let mut forged = metadata(&keys, r#"{"name":"x"}"#);
        forged.content = r#"{"name":"mallory"}"#.into();
        let text = json!(["EVENT", "s", forged]).to_string();
        assert!(matches!(parse_relay_message(&text, "s", &pk), RelayReply::Other));

        let other = metadata(&Keys::generate(), r#"{"name":"x"}"#);
        let text = json!(["EVENT", "s", other]).to_string();
        assert!(matches!(parse_relay_message(&text, "s", &pk), RelayReply::Other));
    }

    #[tokio::test]
    async fn lookup_returns_name_from_relay() {
        let keys = Keys::generate();
        let url = spawn_relay(Some(metadata(&keys, r#"{"name":"alice"}"#))).await;
        let name = lookup_display_name(&url, &keys.public_key_hex(), Duration::from_secs(5)).await;
        assert_eq!(name.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn lookup_without_metadata_is_none() {
        let keys = Keys::generate();
        let url = spawn_relay(None).await;
        let name = lookup_display_name(&url, &keys.public_key_hex(), Duration::from_secs(5)).await;
        assert_eq!(name, None);
    }

    #[tokio::test]
    async fn unreachable_relay_is_none() {
        let pk = Keys::generate().public_key_hex();
        let name = lookup_display_name("ws://127.0.0.1:9", &pk, Duration::from_millis(500)).await;
        assert_eq!(name, None);
    }

    #[tokio::test]
    async fn silent_relay_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_tcp, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let pk = Keys::generate().public_key_hex();
        let relay = format!("ws://{addr}");
        let name = lookup_display_name(&relay, &pk, Duration::from_millis(200)).await;
        assert_eq!(name, None);
    }
}
