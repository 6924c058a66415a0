// Minimal `m.room.create`/`m.room.member`/`m.room.power_levels` builders
// plus a deterministic signing keypair, shared by every crate's test
// module instead of each hand-rolling its own (the way submerge-auth's
// and submerge-vm's test modules previously did independently).

use ed25519_dalek::Keypair;
use rand::{rngs::StdRng, SeedableRng};
use serde_json::{json, Value};
use submerge_model::{content_hash, signable_bytes, Ed25519Signer, Event, Hashes, Signer};

/// A fixed-seed keypair so repeated test runs sign identically - tests
/// that assert on a derived `event_id` need this, not a fresh keypair
/// every run.
pub fn test_keypair(seed: u8) -> Keypair {
    let mut rng = StdRng::from_seed([seed; 32]);
    Keypair::generate(&mut rng)
}

fn base_event(kind: &str, sender: &str, room_id: &str, origin: &str, content: Value) -> Event {
    Event {
        kind: kind.to_string(),
        sender: sender.into(),
        room_id: room_id.into(),
        state_key: None,
        content,
        depth: 2,
        prev_events: vec!["$prev".into()],
        auth_events: vec![],
        hashes: None,
        signatures: Default::default(),
        origin: origin.to_string(),
        origin_server_ts: 0,
        unsigned: None,
        event_id: None,
    }
}

pub fn create_event(room_id: &str, creator: &str) -> Event {
    let server = creator.split_once(':').map(|(_, s)| s).unwrap_or("example.org");
    let mut e = base_event("m.room.create", creator, room_id, server, json!({"creator": creator}));
    e.depth = 1;
    e.prev_events = vec![];
    e
}

pub fn member_event(room_id: &str, sender: &str, target: &str, membership: &str) -> Event {
    let server = sender.split_once(':').map(|(_, s)| s).unwrap_or("example.org");
    let mut e = base_event("m.room.member", sender, room_id, server, json!({"membership": membership}));
    e.state_key = Some(target.to_string());
    e
}

pub fn power_levels_event(room_id: &str, sender: &str, content: Value) -> Event {
    let server = sender.split_once(':').map(|(_, s)| s).unwrap_or("example.org");
    let mut e = base_event("m.room.power_levels", sender, room_id, server, content);
    e.state_key = Some(String::new());
    e
}

/// Hashes and signs `event` in place with `keypair` under `key_id`,
/// mutating `event.hashes`/`event.signatures` the way the injector does
/// (spec.md §4.8 steps "hashes, then sign to produce signatures").
pub fn sign_event(event: &mut Event, keypair: &Keypair, key_id: &str) {
    let hash = content_hash(event).expect("hashable event");
    event.hashes = Some(Hashes {
        sha256: base64::encode_config(hash, base64::STANDARD_NO_PAD),
    });
    let origin = event.origin.clone();
    let signer = Ed25519Signer::new(key_id, Keypair::from_bytes(&keypair.to_bytes()).expect("valid keypair bytes"));
    let signable = signable_bytes(event).expect("signable event");
    let sig = signer.sign(signable.as_bytes());
    event
        .signatures
        .entry(origin)
        .or_default()
        .insert(key_id.to_string(), base64::encode_config(sig, base64::STANDARD_NO_PAD));
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn signed_create_event_verifies_against_its_own_keypair() {
        let keypair = test_keypair(1);
        let mut event = create_event("!r:example.org", "@alice:example.org");
        sign_event(&mut event, &keypair, "ed25519:1");
        assert!(event.hashes.is_some());
        assert!(event.signatures.contains_key("example.org"));
    }

    #[test]
    fn same_seed_produces_the_same_keypair() {
        let a = test_keypair(7);
        let b = test_keypair(7);
        assert_eq!(a.public.to_bytes(), b.public.to_bytes());
    }
}
