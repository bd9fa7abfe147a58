//! Event Canonicalizer - Deterministic serialization and digest of signed events
//!
//! The canonical form is the compact JSON array
//! `[0, <lowercase hex pubkey>, <created_at>, <kind>, <tags>, <content>]`
//! and the event identifier is the SHA-256 of those bytes.

use crate::{error::ZapTrustError, models::SignedEvent, ZapTrustResult};
use sha2::{Digest, Sha256};

/// Length in bytes of an event digest
pub const EVENT_ID_LEN: usize = 32;
/// Length in bytes of an x-only public key
pub const PUBKEY_LEN: usize = 32;
/// Length in bytes of a Schnorr signature
pub const SIGNATURE_LEN: usize = 64;

/// Decode a hex field that must be exactly `N` bytes
pub(crate) fn decode_fixed_hex<const N: usize>(
    field: &str,
    value: &str,
) -> Result<[u8; N], String> {
    if value.len() != N * 2 {
        return Err(format!(
            "{} must be {} hex characters, got {}",
            field,
            N * 2,
            value.len()
        ));
    }

    let mut out = [0u8; N];
    hex::decode_to_slice(value, &mut out)
        .map_err(|e| format!("{} is not valid hex: {}", field, e))?;
    Ok(out)
}

/// Computes canonical bytes and identifiers for signed events
#[derive(Debug, Clone, Copy, Default)]
pub struct EventCanonicalizer;

impl EventCanonicalizer {
    pub fn new() -> Self {
        Self
    }

    /// Serialize the non-id, non-signature fields in canonical order
    pub fn canonical_bytes(&self, event: &SignedEvent) -> ZapTrustResult<Vec<u8>> {
        decode_fixed_hex::<PUBKEY_LEN>("pubkey", &event.pubkey)
            .map_err(ZapTrustError::invalid_receipt)?;
        let pubkey = event.pubkey.to_ascii_lowercase();

        serde_json::to_vec(&(
            0u8,
            pubkey.as_str(),
            event.created_at,
            event.kind,
            &event.tags,
            event.content.as_str(),
        ))
        .map_err(|e| ZapTrustError::invalid_receipt(format!("canonical encoding failed: {}", e)))
    }

    /// SHA-256 of the canonical bytes
    pub fn digest(&self, event: &SignedEvent) -> ZapTrustResult<[u8; EVENT_ID_LEN]> {
        let bytes = self.canonical_bytes(event)?;
        Ok(Sha256::digest(&bytes).into())
    }

    /// Hex form of [`Self::digest`], i.e. the identifier the event should carry
    pub fn compute_id(&self, event: &SignedEvent) -> ZapTrustResult<String> {
        Ok(hex::encode(self.digest(event)?))
    }

    /// Check that the declared identifier equals the canonical digest.
    /// Returns the verified digest for the signature check.
    pub fn validate_identifier(&self, event: &SignedEvent) -> ZapTrustResult<[u8; EVENT_ID_LEN]> {
        let declared = decode_fixed_hex::<EVENT_ID_LEN>("id", &event.id)
            .map_err(ZapTrustError::invalid_receipt)?;
        let computed = self.digest(event)?;

        if declared != computed {
            return Err(ZapTrustError::invalid_receipt(format!(
                "event id {} does not match canonical digest {}",
                event.id,
                hex::encode(computed)
            )));
        }

        Ok(computed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{signed_event, test_keypair};

    fn sample_event() -> SignedEvent {
        signed_event(
            &test_keypair(7),
            9735,
            vec![vec!["p".to_string(), "ab".repeat(32)]],
            "great game",
            1_700_000_000,
        )
    }

    #[test]
    fn test_canonical_bytes_are_compact_and_ordered() {
        let canonicalizer = EventCanonicalizer::new();
        let event = SignedEvent {
            id: String::new(),
            pubkey: "AB".repeat(32),
            created_at: 1_700_000_000,
            kind: 1,
            tags: vec![vec!["e".to_string(), "x".to_string()]],
            content: "line\n\"quoted\"".to_string(),
            sig: String::new(),
        };

        let bytes = canonicalizer.canonical_bytes(&event).unwrap();
        let expected = format!(
            "[0,\"{}\",1700000000,1,[[\"e\",\"x\"]],\"line\\n\\\"quoted\\\"\"]",
            "ab".repeat(32)
        );
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[test]
    fn test_validate_identifier_accepts_signed_event() {
        let canonicalizer = EventCanonicalizer::new();
        let event = sample_event();
        let digest = canonicalizer.validate_identifier(&event).unwrap();
        assert_eq!(hex::encode(digest), event.id);
    }

    #[test]
    fn test_any_field_mutation_breaks_identifier() {
        let canonicalizer = EventCanonicalizer::new();

        let mut content = sample_event();
        content.content.push('!');
        let mut timestamp = sample_event();
        timestamp.created_at += 1;
        let mut tag = sample_event();
        tag.tags.push(vec!["amount".to_string(), "1000".to_string()]);
        let mut kind = sample_event();
        kind.kind = 1;

        for event in [content, timestamp, tag, kind] {
            assert!(matches!(
                canonicalizer.validate_identifier(&event),
                Err(ZapTrustError::InvalidZapReceipt(_))
            ));
        }
    }

    #[test]
    fn test_malformed_hex_is_rejected() {
        let canonicalizer = EventCanonicalizer::new();

        let mut short_id = sample_event();
        short_id.id.truncate(10);
        let mut bad_id = sample_event();
        bad_id.id.replace_range(0..2, "zz");
        let mut bad_pubkey = sample_event();
        bad_pubkey.pubkey = "not-hex".to_string();

        for event in [short_id, bad_id, bad_pubkey] {
            assert!(matches!(
                canonicalizer.validate_identifier(&event),
                Err(ZapTrustError::InvalidZapReceipt(_))
            ));
        }
    }

    #[test]
    fn test_decode_fixed_hex_lengths() {
        assert!(decode_fixed_hex::<2>("f", "abcd").is_ok());
        assert!(decode_fixed_hex::<2>("f", "abc").is_err());
        assert!(decode_fixed_hex::<2>("f", "abcdef").is_err());
    }
}
