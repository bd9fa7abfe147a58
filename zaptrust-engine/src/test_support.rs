//! Shared fixtures for unit tests: deterministic keys and really-signed events

use crate::{canonical::EventCanonicalizer, models::SignedEvent};
use secp256k1::{Keypair, Message, Secp256k1};

/// Deterministic keypair derived from a one-byte seed
pub fn test_keypair(seed: u8) -> Keypair {
    let secp = Secp256k1::new();
    Keypair::from_seckey_slice(&secp, &[seed; 32]).expect("valid test secret key")
}

pub fn pubkey_hex(keypair: &Keypair) -> String {
    hex::encode(keypair.x_only_public_key().0.serialize())
}

/// Build an event with a correct id and Schnorr signature
pub fn signed_event(
    keypair: &Keypair,
    kind: u32,
    tags: Vec<Vec<String>>,
    content: &str,
    created_at: i64,
) -> SignedEvent {
    let mut event = SignedEvent {
        id: String::new(),
        pubkey: pubkey_hex(keypair),
        created_at,
        kind,
        tags,
        content: content.to_string(),
        sig: String::new(),
    };
    resign(keypair, &mut event);
    event
}

/// Recompute id and signature after a fixture was mutated
pub fn resign(keypair: &Keypair, event: &mut SignedEvent) {
    let secp = Secp256k1::new();
    let digest = EventCanonicalizer::new()
        .digest(event)
        .expect("canonical digest");
    event.id = hex::encode(digest);
    let message = Message::from_digest_slice(&digest).expect("32-byte digest");
    event.sig = secp.sign_schnorr_no_aux_rand(&message, keypair).to_string();
}

pub fn tag(name: &str, value: &str) -> Vec<String> {
    vec![name.to_string(), value.to_string()]
}

/// A zap receipt paying `amount` msats to `recipient`, with extra tags appended
pub fn zap_receipt(
    provider: &Keypair,
    recipient: &str,
    sender: &str,
    amount: u64,
    extra_tags: Vec<Vec<String>>,
) -> SignedEvent {
    let mut tags = vec![
        tag("p", recipient),
        tag("P", sender),
        tag("amount", &amount.to_string()),
        tag("bolt11", "lnbc10n1ptest"),
    ];
    tags.extend(extra_tags);
    signed_event(provider, 9735, tags, "", 1_700_000_000)
}
