//! Signature Verifier - Schnorr verification of signed events
//!
//! Checks the 64-byte BIP-340 signature over the canonical event digest using
//! the event's x-only public key. Verification is pure and must run before
//! anything is persisted.

use crate::{
    canonical::{decode_fixed_hex, EventCanonicalizer, EVENT_ID_LEN, PUBKEY_LEN, SIGNATURE_LEN},
    error::ZapTrustError,
    models::SignedEvent,
    ZapTrustResult,
};
use secp256k1::{schnorr, Message, Secp256k1, VerifyOnly, XOnlyPublicKey};

/// Verifies event signatures against their claimed public key
pub struct SignatureVerifier {
    secp: Secp256k1<VerifyOnly>,
}

impl SignatureVerifier {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }

    /// Verify `event.sig` over the canonical digest of `event`
    pub fn verify(&self, event: &SignedEvent) -> ZapTrustResult<()> {
        let digest = EventCanonicalizer::new()
            .digest(event)
            .map_err(|e| ZapTrustError::signature(e.to_string()))?;
        self.verify_digest(event, &digest)
    }

    /// Verify `event.sig` over an already computed digest
    pub fn verify_digest(
        &self,
        event: &SignedEvent,
        digest: &[u8; EVENT_ID_LEN],
    ) -> ZapTrustResult<()> {
        let pubkey_bytes = decode_fixed_hex::<PUBKEY_LEN>("pubkey", &event.pubkey)
            .map_err(ZapTrustError::signature)?;
        let sig_bytes = decode_fixed_hex::<SIGNATURE_LEN>("sig", &event.sig)
            .map_err(ZapTrustError::signature)?;

        let pubkey = XOnlyPublicKey::from_slice(&pubkey_bytes)
            .map_err(|e| ZapTrustError::signature(format!("invalid public key: {}", e)))?;
        let signature = schnorr::Signature::from_slice(&sig_bytes)
            .map_err(|e| ZapTrustError::signature(format!("invalid signature encoding: {}", e)))?;
        let message = Message::from_digest_slice(digest)
            .map_err(|e| ZapTrustError::signature(format!("invalid digest: {}", e)))?;

        self.secp
            .verify_schnorr(&signature, &message, &pubkey)
            .map_err(|_| {
                ZapTrustError::signature(format!(
                    "signature does not verify for event {} under key {}",
                    event.id, event.pubkey
                ))
            })
    }
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pubkey_hex, resign, signed_event, test_keypair};

    fn sample_event() -> SignedEvent {
        signed_event(&test_keypair(3), 9735, vec![], "zap", 1_700_000_000)
    }

    #[test]
    fn test_valid_signature_verifies() {
        let verifier = SignatureVerifier::new();
        assert!(verifier.verify(&sample_event()).is_ok());
    }

    #[test]
    fn test_signature_from_other_key_fails() {
        let verifier = SignatureVerifier::new();
        let mut event = sample_event();
        // Signed by key 4, but claims key 3: id stays consistent with key 3
        let other = signed_event(&test_keypair(4), 9735, vec![], "zap", 1_700_000_000);
        event.sig = other.sig;

        assert!(matches!(
            verifier.verify(&event),
            Err(ZapTrustError::SignatureVerification(_))
        ));
    }

    #[test]
    fn test_unsigned_but_well_formed_event_fails() {
        let verifier = SignatureVerifier::new();
        let mut event = sample_event();
        event.sig = "00".repeat(64);

        assert!(matches!(
            verifier.verify(&event),
            Err(ZapTrustError::SignatureVerification(_))
        ));
    }

    #[test]
    fn test_wrong_length_and_bad_hex_fail() {
        let verifier = SignatureVerifier::new();

        let mut short_sig = sample_event();
        short_sig.sig.truncate(126);
        let mut bad_sig = sample_event();
        bad_sig.sig.replace_range(0..2, "gg");

        for event in [short_sig, bad_sig] {
            assert!(matches!(
                verifier.verify(&event),
                Err(ZapTrustError::SignatureVerification(_))
            ));
        }
    }

    #[test]
    fn test_resigned_event_verifies_under_new_key() {
        let verifier = SignatureVerifier::new();
        let keypair = test_keypair(9);
        let mut event = sample_event();
        event.pubkey = pubkey_hex(&keypair);
        resign(&keypair, &mut event);

        assert!(verifier.verify(&event).is_ok());
    }
}
