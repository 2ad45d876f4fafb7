//! Protocol pieces of nostrauth: the canonical auth event, Schnorr
//! verification, key encodings and the HTTP wire format.

pub mod crypto;
pub mod error;
pub mod event;
pub mod keys;
pub mod wire;

pub use error::ProtoError;
pub use event::{Event, UnsignedEvent, AUTH_KIND};
pub use keys::Keys;
