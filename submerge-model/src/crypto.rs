// spec.md §1: "The cryptographic primitives (signature verification,
// hashing) are collaborators." This module is the narrow interface the
// evaluation core depends on; hashing already lives in canonical.rs
// since it's inseparable from canonical-JSON rules. Signing/verification
// is kept behind a trait so tests can swap in a keyring fake
// (submerge-test) without linking ed25519-dalek into every test binary's
// critical path.

use ed25519_dalek::Verifier as _;
use submerge_base::{err, Result};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct KeyId<'a>(pub &'a str);

/// A single server's signing identity: one or more named keys, each
/// capable of producing a detached signature over arbitrary bytes (the
/// canonical-JSON signable form from `canonical::signable_bytes`).
pub trait Signer: Send + Sync {
    fn key_id(&self) -> &str;
    fn sign(&self, bytes: &[u8]) -> Vec<u8>;
}

/// The read side of a keyring: given an `(origin, key_id)` pair, produce
/// a verifying key if known. `submerge-vm`'s fetch coordinator is what's
/// responsible for populating a keyring when this returns `None` - this
/// trait only describes the lookup, not the fetch.
pub trait Verifier: Send + Sync {
    fn verify_key(&self, origin: &str, key_id: &str) -> Option<Vec<u8>>;

    fn verify(&self, origin: &str, key_id: &str, bytes: &[u8], signature_b64: &str) -> Result<bool> {
        let Some(raw_key) = self.verify_key(origin, key_id) else {
            return Ok(false);
        };
        let key = ed25519_dalek::PublicKey::from_bytes(&raw_key)
            .map_err(|e| err(format!("malformed verify key for {origin}:{key_id}: {e}")))?;
        let sig_bytes = base64::decode_config(signature_b64, base64::STANDARD_NO_PAD)
            .map_err(|e| err(format!("malformed signature: {e}")))?;
        let sig = ed25519_dalek::Signature::from_bytes(&sig_bytes)
            .map_err(|e| err(format!("malformed signature: {e}")))?;
        Ok(key.verify(bytes, &sig).is_ok())
    }
}

/// An in-process ed25519 signer, the one concrete `Signer` impl this
/// crate ships (tests use a fixed-seed one from `submerge-test`).
pub struct Ed25519Signer {
    key_id: String,
    keypair: ed25519_dalek::Keypair,
}

impl Ed25519Signer {
    pub fn new(key_id: impl Into<String>, keypair: ed25519_dalek::Keypair) -> Self {
        Ed25519Signer {
            key_id: key_id.into(),
            keypair,
        }
    }
}

impl Signer for Ed25519Signer {
    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        use ed25519_dalek::Signer as _;
        self.keypair.sign(bytes).to_bytes().to_vec()
    }
}
