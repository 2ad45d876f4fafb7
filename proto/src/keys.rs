//! Nostr keys: x-only secp256k1 public keys as hex or `npub`, and local
//! signing keys for clients.

use bech32::{Bech32, Hrp};
use rand::RngCore;
use secp256k1::{Keypair, SecretKey, XOnlyPublicKey};
use zeroize::Zeroizing;

use crate::crypto::schnorr;
use crate::error::ProtoError;

const NPUB_HRP: Hrp = Hrp::parse_unchecked("npub");

/// A local signing identity.
pub struct Keys {
    keypair: Keypair,
}

impl Keys {
    /// Generate a fresh secret key from the OS RNG.
    pub fn generate() -> Self {
        loop {
            let mut bytes = Zeroizing::new([0u8; 32]);
            rand::rngs::OsRng.fill_bytes(&mut *bytes);
            // Out-of-range scalars are astronomically rare; draw again.
            if let Ok(keys) = Self::from_secret_bytes(&bytes[..]) {
                return keys;
            }
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ProtoError> {
        let secret = SecretKey::from_slice(bytes).map_err(|_| ProtoError::InvalidSecretKey)?;
        Ok(Self {
            keypair: Keypair::from_secret_key(schnorr::context(), &secret),
        })
    }

    pub fn from_secret_hex(hex_str: &str) -> Result<Self, ProtoError> {
        let decoded = hex::decode(hex_str.trim()).map_err(|_| ProtoError::InvalidSecretKey)?;
        let bytes = Zeroizing::new(decoded);
        Self::from_secret_bytes(&bytes)
    }

    pub fn secret_hex(&self) -> Zeroizing<String> {
        let bytes = Zeroizing::new(self.keypair.secret_bytes());
        Zeroizing::new(hex::encode(*bytes))
    }

    pub fn public_key(&self) -> XOnlyPublicKey {
        self.keypair.x_only_public_key().0
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key().serialize())
    }

    pub fn sign_id(&self, id: &[u8; 32]) -> [u8; 64] {
        schnorr::sign(&self.keypair, id)
    }
}

/// Parse a public key given as 64 hex characters or as `npub1...`.
pub fn parse_public_key(input: &str) -> Result<XOnlyPublicKey, ProtoError> {
    let input = input.trim();
    if input.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("npub")) {
        return decode_npub(input);
    }
    let bytes = hex::decode(input)?;
    if bytes.len() != schnorr::PUBLIC_KEY_LEN {
        return Err(ProtoError::InvalidPublicKey(format!(
            "expected {} bytes, got {}",
            schnorr::PUBLIC_KEY_LEN,
            bytes.len()
        )));
    }
    XOnlyPublicKey::from_slice(&bytes).map_err(|e| ProtoError::InvalidPublicKey(e.to_string()))
}

/// Lowercase hex form of any accepted public key encoding. This is the
/// join key used for identity lookups.
pub fn normalize_public_key(input: &str) -> Result<String, ProtoError> {
    parse_public_key(input).map(|pk| hex::encode(pk.serialize()))
}

pub fn encode_npub(public_key: &XOnlyPublicKey) -> Result<String, ProtoError> {
    Ok(bech32::encode::<Bech32>(NPUB_HRP, &public_key.serialize())?)
}

pub fn decode_npub(npub: &str) -> Result<XOnlyPublicKey, ProtoError> {
    let (hrp, data) = bech32::decode(npub)?;
    if hrp != NPUB_HRP {
        return Err(ProtoError::InvalidNpub(format!("expected 'npub' prefix, got '{hrp}'")));
    }
    if data.len() != schnorr::PUBLIC_KEY_LEN {
        return Err(ProtoError::InvalidNpub(format!("expected 32 bytes, got {}", data.len())));
    }
    XOnlyPublicKey::from_slice(&data).map_err(|e| ProtoError::InvalidPublicKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // BIP-340 test vector 0: secret key 3.
    const SECRET_3: &str = "0000000000000000000000000000000000000000000000000000000000000003";
    const PUBKEY_3: &str = "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";

    #[test]
    fn derives_known_public_key() {
        let keys = Keys::from_secret_hex(SECRET_3).unwrap();
        assert_eq!(keys.public_key_hex(), PUBKEY_3);
        assert_eq!(keys.secret_hex().as_str(), SECRET_3);
    }

    #[test]
    fn zero_secret_is_rejected() {
        assert!(Keys::from_secret_hex(&"00".repeat(32)).is_err());
        assert!(Keys::from_secret_hex("abc").is_err());
    }

    #[test]
    fn generated_keys_are_fresh_and_reimportable() {
        let a = Keys::generate();
        let b = Keys::generate();
        assert_ne!(a.public_key_hex(), b.public_key_hex());

        let again = Keys::from_secret_hex(&a.secret_hex()).unwrap();
        assert_eq!(again.public_key_hex(), a.public_key_hex());
    }

    #[test]
    fn npub_round_trip() {
        let keys = Keys::generate();
        let npub = encode_npub(&keys.public_key()).unwrap();
        assert!(npub.starts_with("npub1"));
        assert_eq!(decode_npub(&npub).unwrap(), keys.public_key());
        assert_eq!(normalize_public_key(&npub).unwrap(), keys.public_key_hex());
    }

    #[test]
    fn normalize_lowercases_hex() {
        assert_eq!(normalize_public_key(&PUBKEY_3.to_uppercase()).unwrap(), PUBKEY_3);
    }

    #[test]
    fn rejects_bad_public_keys() {
        assert!(parse_public_key("").is_err());
        assert!(parse_public_key("zz").is_err());
        assert!(parse_public_key(&PUBKEY_3[..62]).is_err());
        assert!(parse_public_key("npub1invalid").is_err());
        assert!(parse_public_key("ñpub1").is_err());
    }
}
