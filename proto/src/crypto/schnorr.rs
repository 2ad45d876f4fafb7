//! BIP-340 Schnorr signing and verification over secp256k1.
//!
//! Verification takes attacker-controlled input and never errors: every
//! malformed length, encoding or off-curve key collapses to `false`.

use std::sync::OnceLock;

use rand::RngCore;
use secp256k1::{schnorr::Signature, All, Keypair, Secp256k1, XOnlyPublicKey};

pub const ID_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

pub(crate) fn context() -> &'static Secp256k1<All> {
    static CTX: OnceLock<Secp256k1<All>> = OnceLock::new();
    CTX.get_or_init(Secp256k1::new)
}

/// Sign a 32-byte event id with fresh auxiliary randomness.
pub fn sign(keypair: &Keypair, id: &[u8; ID_LEN]) -> [u8; SIGNATURE_LEN] {
    let mut aux = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut aux);
    context()
        .sign_schnorr_with_aux_rand(id, keypair, &aux)
        .to_byte_array()
}

/// Verify `signature` over `id` under the x-only `public_key`.
pub fn verify(id: &[u8], public_key: &[u8], signature: &[u8]) -> bool {
    if id.len() != ID_LEN
        || public_key.len() != PUBLIC_KEY_LEN
        || signature.len() != SIGNATURE_LEN
    {
        return false;
    }
    let Ok(public_key) = XOnlyPublicKey::from_slice(public_key) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    context()
        .verify_schnorr(&signature, id, &public_key)
        .is_ok()
}

/// [`verify`] with all three inputs hex encoded.
pub fn verify_hex(id: &str, public_key: &str, signature: &str) -> bool {
    match hex::decode(id) {
        Ok(id) => verify_decoded(&id, public_key, signature),
        Err(_) => false,
    }
}

/// [`verify`] for an already computed id with hex key and signature.
pub fn verify_hex_key(id: &[u8; ID_LEN], public_key: &str, signature: &str) -> bool {
    verify_decoded(id, public_key, signature)
}

fn verify_decoded(id: &[u8], public_key: &str, signature: &str) -> bool {
    let (Ok(public_key), Ok(signature)) = (hex::decode(public_key), hex::decode(signature)) else {
        return false;
    };
    verify(id, &public_key, &signature)
}
