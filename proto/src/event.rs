//! Signable events and their canonical encoding (NIP-01).
//!
//! The event id is `SHA256(encode(event))`, where `encode` produces the
//! compact JSON array
//!
//! ```text
//! [0,"<pubkey>",<created_at>,<kind>,<tags>,"<content>"]
//! ```
//!
//! This byte layout is shared with every signer in the wild. Changing the
//! field order or the string escaping invalidates all existing signatures.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::schnorr;
use crate::keys::Keys;

/// Kind tag for HTTP auth challenge events (NIP-98).
pub const AUTH_KIND: u32 = 27235;

/// An event before signing: everything that feeds the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

/// A signed event as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl UnsignedEvent {
    /// The auth event a client signs to answer `challenge`: kind 27235, no tags.
    pub fn auth(pubkey: impl Into<String>, created_at: i64, challenge: impl Into<String>) -> Self {
        Self {
            pubkey: pubkey.into(),
            created_at,
            kind: AUTH_KIND,
            tags: Vec::new(),
            content: challenge.into(),
        }
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        encode(&self.pubkey, self.created_at, self.kind, &self.tags, &self.content)
    }

    pub fn compute_id(&self) -> [u8; 32] {
        digest(&self.canonical_bytes())
    }

    /// Sign with `keys`. The event's `pubkey` is not checked against the key;
    /// a mismatched pair simply fails verification later.
    pub fn sign(self, keys: &Keys) -> Event {
        let id = self.compute_id();
        let sig = keys.sign_id(&id);
        Event {
            id: hex::encode(id),
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags,
            content: self.content,
            sig: hex::encode(sig),
        }
    }
}

impl Event {
    pub fn unsigned(&self) -> UnsignedEvent {
        UnsignedEvent {
            pubkey: self.pubkey.clone(),
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }

    /// Whether the declared id matches the recomputed one.
    pub fn id_matches(&self) -> bool {
        let computed = self.unsigned().compute_id();
        match hex::decode(&self.id) {
            Ok(declared) => declared == computed,
            Err(_) => false,
        }
    }

    /// Recompute the id, compare it to the declared one, then check the
    /// signature over the recomputed id.
    pub fn verify(&self) -> bool {
        if !self.id_matches() {
            return false;
        }
        let id = self.unsigned().compute_id();
        schnorr::verify_hex_key(&id, &self.pubkey, &self.sig)
    }
}

/// Canonical serialization of the id-bearing fields.
pub fn encode(
    pubkey: &str,
    created_at: i64,
    kind: u32,
    tags: &[Vec<String>],
    content: &str,
) -> Vec<u8> {
    let mut out = String::with_capacity(96 + content.len());
    out.push_str("[0,");
    write_string(&mut out, pubkey);
    out.push(',');
    out.push_str(&created_at.to_string());
    out.push(',');
    out.push_str(&kind.to_string());
    out.push_str(",[");
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('[');
        for (j, field) in tag.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            write_string(&mut out, field);
        }
        out.push(']');
    }
    out.push_str("],");
    write_string(&mut out, content);
    out.push(']');
    out.into_bytes()
}

pub fn digest(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

/// Quote and escape a string. Only these seven characters are escaped;
/// everything else, other control characters included, is written verbatim.
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;

    const PK: &str = "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    #[test]
    fn encodes_empty_auth_event() {
        let ev = UnsignedEvent::auth(PK, 1_700_000_000, "abc");
        let bytes = ev.canonical_bytes();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            format!("[0,\"{PK}\",1700000000,27235,[],\"abc\"]")
        );
    }

    #[test]
    fn encodes_tags_in_order() {
        let tags = vec![
            vec!["u".to_string(), "https://example.com".to_string()],
            vec!["method".to_string(), "GET".to_string()],
        ];
        let bytes = encode(PK, 1, 1, &tags, "");
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            format!("[0,\"{PK}\",1,1,[[\"u\",\"https://example.com\"],[\"method\",\"GET\"]],\"\"]")
        );
    }

    #[test]
    fn escapes_only_the_nip01_set() {
        let content = "a\"b\\c\nd\re\tf\u{08}g\u{0c}h\u{01}é/";
        let bytes = encode(PK, 1, 1, &[], content);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.ends_with("\"a\\\"b\\\\c\\nd\\re\\tf\\bg\\fh\u{01}é/\"]"));
    }

    #[test]
    fn matches_serde_json_for_plain_content() {
        // For content without exotic control characters the canonical form
        // coincides with serde_json's compact output.
        let ev = UnsignedEvent::auth(PK, 42, "line one\nline \"two\"");
        let no_tags: Vec<Vec<String>> = Vec::new();
        let expected = serde_json::to_string(&serde_json::json!([
            0, PK, 42, AUTH_KIND, no_tags, "line one\nline \"two\""
        ]))
        .unwrap();
        assert_eq!(ev.canonical_bytes(), expected.into_bytes());
    }

    #[test]
    fn digest_is_deterministic() {
        let a = UnsignedEvent::auth(PK, 1_700_000_000, "challenge");
        let b = UnsignedEvent::auth(PK, 1_700_000_000, "challenge");
        assert_eq!(a.compute_id(), b.compute_id());
    }

    #[test]
    fn any_field_change_changes_id() {
        let base = UnsignedEvent::auth(PK, 1_700_000_000, "challenge");
        let mut other = base.clone();
        other.created_at += 1;
        assert_ne!(base.compute_id(), other.compute_id());

        let mut other = base.clone();
        other.content.push('x');
        assert_ne!(base.compute_id(), other.compute_id());

        let mut other = base.clone();
        other.kind = 1;
        assert_ne!(base.compute_id(), other.compute_id());
    }

    #[test]
    fn signed_event_verifies() {
        let keys = Keys::generate();
        let ev = UnsignedEvent::auth(keys.public_key_hex(), 1_700_000_000, "token").sign(&keys);
        assert!(ev.id_matches());
        assert!(ev.verify());
    }

    #[test]
    fn tampered_content_fails() {
        let keys = Keys::generate();
        let mut ev = UnsignedEvent::auth(keys.public_key_hex(), 1_700_000_000, "token").sign(&keys);
        ev.content = "other".into();
        assert!(!ev.verify());
    }

    #[test]
    fn forged_id_fails() {
        let keys = Keys::generate();
        let mut ev = UnsignedEvent::auth(keys.public_key_hex(), 1_700_000_000, "token").sign(&keys);
        ev.id = "00".repeat(32);
        assert!(!ev.id_matches());
        assert!(!ev.verify());
    }

    #[test]
    fn malformed_id_fails_without_panicking() {
        let keys = Keys::generate();
        let mut ev = UnsignedEvent::auth(keys.public_key_hex(), 1, "token").sign(&keys);
        ev.id = "not hex".into();
        assert!(!ev.verify());
    }
}
