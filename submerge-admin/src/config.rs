//! `NodeConfig`: the one TOML-deserialized config struct the `submerge`
//! binary loads at startup (SPEC_FULL.md §3.3). A single-node
//! illustrative config, not a layered one - no environment-variable
//! override chain, unlike `sui-config`'s full layered system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use submerge_base::{err, Result};
use submerge_vm::{FetchPolicy, FetchPrevWait};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub server_name: String,
    pub data_dir: PathBuf,
    pub listen_addr: String,

    /// Key id of this node's active signing key (SPEC_FULL.md §4 item
    /// 1's X-Matrix signing, spec.md §4.8's injector signing step).
    pub signing_key_id: String,

    pub federation_request_timeout_ms: u64,

    /// Resolves spec.md §9's open question, the config-facing half:
    /// `None` disables `prev_events` backoff-waiting entirely, `Some(0)`
    /// means "auto", anything else is a fixed iteration count.
    pub fetch_prev_wait_count: Option<i64>,
    pub fetch_prev_wait_time_ms: u64,
    pub fetch_prev_limit: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            server_name: "localhost".into(),
            data_dir: PathBuf::from("./data"),
            listen_addr: "0.0.0.0:8448".into(),
            signing_key_id: "ed25519:a_1".into(),
            federation_request_timeout_ms: 10_000,
            fetch_prev_wait_count: Some(0),
            fetch_prev_wait_time_ms: 250,
            fetch_prev_limit: 100,
        }
    }
}

impl NodeConfig {
    pub fn from_str(toml_str: &str) -> Result<NodeConfig> {
        toml::from_str(toml_str).map_err(|e| err(format!("parsing node config: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<NodeConfig> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| err(format!("reading {}: {e}", path.as_ref().display())))?;
        NodeConfig::from_str(&contents)
    }

    pub fn federation_request_timeout(&self) -> Duration {
        Duration::from_millis(self.federation_request_timeout_ms)
    }

    /// Maps this config's flattened, TOML-friendly fields onto
    /// `submerge_vm::FetchPolicy`'s richer shape. `fetch_prev_wait_count
    /// == None` disables the wait; `Some(0)` is "auto"; anything else is
    /// a pinned count (spec.md §9's open question, resolved the same
    /// way `submerge_vm::options` resolves it).
    pub fn fetch_policy(&self) -> FetchPolicy {
        let fetch_prev_wait = self.fetch_prev_wait_count.map(|n| {
            if n == 0 {
                FetchPrevWait::Auto
            } else {
                FetchPrevWait::Count(n.max(0) as u32)
            }
        });
        FetchPolicy {
            fetch_prev_wait,
            fetch_prev_wait_time: Duration::from_millis(self.fetch_prev_wait_time_ms),
            fetch_prev_limit: self.fetch_prev_limit,
            ..FetchPolicy::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn defaults_round_trip_through_toml() {
        let cfg = NodeConfig::default();
        let toml_str = toml::to_string(&cfg).unwrap();
        let parsed = NodeConfig::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server_name, cfg.server_name);
        assert_eq!(parsed.listen_addr, cfg.listen_addr);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg = NodeConfig::from_str(r#"server_name = "example.org""#).unwrap();
        assert_eq!(cfg.server_name, "example.org");
        assert_eq!(cfg.listen_addr, NodeConfig::default().listen_addr);
    }

    #[test]
    fn fetch_prev_wait_count_zero_means_auto() {
        let mut cfg = NodeConfig::default();
        cfg.fetch_prev_wait_count = Some(0);
        assert_eq!(cfg.fetch_policy().fetch_prev_wait, Some(FetchPrevWait::Auto));
        cfg.fetch_prev_wait_count = Some(5);
        assert_eq!(cfg.fetch_policy().fetch_prev_wait, Some(FetchPrevWait::Count(5)));
        cfg.fetch_prev_wait_count = None;
        assert_eq!(cfg.fetch_policy().fetch_prev_wait, None);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(NodeConfig::from_str("not valid toml =").is_err());
    }
}
