// spec.md §4.4 Verify: "for non-local events, validates hashes and one
// or more signatures... if unknown, triggers a key fetch... On failure
// raise INVALID." The fetch-on-unknown-key path is the caller's job
// (`pipeline.rs` calls `missing_keys` first, runs the fetch coordinator,
// then calls `verify` again); this module only judges a fully-keyed event.

use submerge_model::{content_hash, signable_bytes, Event, Verifier};
use std::collections::BTreeSet;

/// `(origin, key_id)` pairs this event needs a verify key for that the
/// keyring doesn't currently have. Empty means verify can proceed now.
pub fn missing_keys(event: &Event, keyring: &dyn Verifier) -> Vec<(String, String)> {
    let mut missing = BTreeSet::new();
    for key_id in event.signatures.get(&event.origin).into_iter().flat_map(|m| m.keys()) {
        if keyring.verify_key(&event.origin, key_id).is_none() {
            missing.insert((event.origin.clone(), key_id.clone()));
        }
    }
    missing.into_iter().collect()
}

/// Verifies the content hash and every signature the event carries for
/// its own origin server. Room versions that skip event-id-from-hash
/// (v1/v2) still carry `hashes.sha256`, so this check is not gated on
/// `event_ids_are_content_derived`.
pub fn verify(event: &Event, keyring: &dyn Verifier) -> Result<(), String> {
    if let Some(hashes) = &event.hashes {
        let computed = content_hash(event).map_err(|e| format!("hashing failed: {e:?}"))?;
        let expected = base64::decode_config(&hashes.sha256, base64::STANDARD_NO_PAD)
            .map_err(|e| format!("malformed hashes.sha256: {e}"))?;
        if computed.as_slice() != expected.as_slice() {
            return Err("content hash mismatch".into());
        }
    } else {
        return Err("missing hashes.sha256".into());
    }

    let Some(origin_sigs) = event.signatures.get(&event.origin) else {
        return Err(format!("no signature from origin {}", event.origin));
    };
    if origin_sigs.is_empty() {
        return Err(format!("empty signature set from origin {}", event.origin));
    }
    let signable = signable_bytes(event).map_err(|e| format!("canonicalization failed: {e:?}"))?;
    for (key_id, sig) in origin_sigs {
        match keyring.verify(&event.origin, key_id, signable.as_bytes(), sig) {
            Ok(true) => {}
            Ok(false) => return Err(format!("signature verification failed for {}:{key_id}", event.origin)),
            Err(e) => return Err(format!("signature verification error for {}:{key_id}: {e:?}", event.origin)),
        }
    }
    Ok(())
}
