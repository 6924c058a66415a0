// spec.md §4.4 Verify: "Requires the signing public key for each
// (origin, key_id) pair; if unknown, triggers a key fetch." This is the
// write side of the keyring the fetch coordinator populates;
// `submerge_model::Verifier` (implemented below) is the read side the
// verify phase actually calls.

use dashmap::DashMap;
use submerge_model::Verifier;

#[derive(Default)]
pub struct Keyring {
    keys: DashMap<(String, String), Vec<u8>>,
}

impl Keyring {
    pub fn new() -> Self {
        Keyring::default()
    }

    pub fn insert(&self, origin: impl Into<String>, key_id: impl Into<String>, key_bytes: Vec<u8>) {
        self.keys.insert((origin.into(), key_id.into()), key_bytes);
    }

    pub fn contains(&self, origin: &str, key_id: &str) -> bool {
        self.keys.contains_key(&(origin.to_string(), key_id.to_string()))
    }
}

impl Verifier for Keyring {
    fn verify_key(&self, origin: &str, key_id: &str) -> Option<Vec<u8>> {
        self.keys.get(&(origin.to_string(), key_id.to_string())).map(|v| v.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn insert_then_lookup_round_trips() {
        let keyring = Keyring::new();
        assert!(!keyring.contains("example.org", "ed25519:1"));
        keyring.insert("example.org", "ed25519:1", vec![1, 2, 3]);
        assert!(keyring.contains("example.org", "ed25519:1"));
        assert_eq!(keyring.verify_key("example.org", "ed25519:1"), Some(vec![1, 2, 3]));
        assert_eq!(keyring.verify_key("example.org", "ed25519:2"), None);
    }
}
