// A scriptable `submerge_net::FederationClient` fake: each method's
// responses are queued in advance and popped in order, with an atomic
// call counter per method so a test can assert the "duplicate
// concurrent fetch coalesces to one RPC" scenario (spec.md §8 scenario 3).

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use submerge_base::{err, Result};
use submerge_model::{EventId, RoomId, ServerName, UserId};
use submerge_net::{FederationClient, JoinResult, JoinTemplate, PduJson, VerifyKeys};

#[derive(Default)]
pub struct CallCounts {
    pub make_join: AtomicUsize,
    pub send_join: AtomicUsize,
    pub event_auth: AtomicUsize,
    pub backfill: AtomicUsize,
    pub keys_query: AtomicUsize,
}

#[derive(Default)]
pub struct FederationFake {
    make_join: Mutex<VecDeque<std::result::Result<JoinTemplate, String>>>,
    send_join: Mutex<VecDeque<std::result::Result<JoinResult, String>>>,
    event_auth: Mutex<VecDeque<std::result::Result<Vec<PduJson>, String>>>,
    backfill: Mutex<VecDeque<std::result::Result<Vec<PduJson>, String>>>,
    keys_query: Mutex<VecDeque<std::result::Result<VerifyKeys, String>>>,
    pub calls: CallCounts,
}

impl FederationFake {
    pub fn new() -> Self {
        FederationFake::default()
    }

    pub fn script_make_join(&self, result: std::result::Result<JoinTemplate, String>) {
        self.make_join.lock().push_back(result);
    }

    pub fn script_send_join(&self, result: std::result::Result<JoinResult, String>) {
        self.send_join.lock().push_back(result);
    }

    pub fn script_event_auth(&self, result: std::result::Result<Vec<PduJson>, String>) {
        self.event_auth.lock().push_back(result);
    }

    pub fn script_backfill(&self, result: std::result::Result<Vec<PduJson>, String>) {
        self.backfill.lock().push_back(result);
    }

    pub fn script_keys_query(&self, result: std::result::Result<VerifyKeys, String>) {
        self.keys_query.lock().push_back(result);
    }
}

fn pop<T>(queue: &Mutex<VecDeque<std::result::Result<T, String>>>, what: &str) -> Result<T> {
    match queue.lock().pop_front() {
        Some(Ok(v)) => Ok(v),
        Some(Err(e)) => Err(err(e)),
        None => Err(err(format!("no scripted response queued for {what}"))),
    }
}

#[async_trait]
impl FederationClient for FederationFake {
    async fn make_join(&self, _origin: &ServerName, _room: &RoomId, _user: &UserId) -> Result<JoinTemplate> {
        self.calls.make_join.fetch_add(1, Ordering::SeqCst);
        pop(&self.make_join, "make_join")
    }

    async fn send_join(&self, _origin: &ServerName, _room: &RoomId, _event_id: &EventId, _signed_event: PduJson) -> Result<JoinResult> {
        self.calls.send_join.fetch_add(1, Ordering::SeqCst);
        pop(&self.send_join, "send_join")
    }

    async fn event_auth(&self, _origin: &ServerName, _room: &RoomId, _event_id: &EventId) -> Result<Vec<PduJson>> {
        self.calls.event_auth.fetch_add(1, Ordering::SeqCst);
        pop(&self.event_auth, "event_auth")
    }

    async fn backfill(&self, _origin: &ServerName, _room: &RoomId, _from: &[EventId], _limit: usize) -> Result<Vec<PduJson>> {
        self.calls.backfill.fetch_add(1, Ordering::SeqCst);
        pop(&self.backfill, "backfill")
    }

    async fn keys_query(&self, _origin: &ServerName) -> Result<VerifyKeys> {
        self.calls.keys_query.fetch_add(1, Ordering::SeqCst);
        pop(&self.keys_query, "keys_query")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::Ordering;
    use test_log::test;

    #[test(tokio::test)]
    async fn scripted_response_is_returned_and_call_is_counted() {
        let fake = FederationFake::new();
        fake.script_keys_query(Ok(VerifyKeys(BTreeMap::from([("ed25519:1".to_string(), "abc".to_string())]))));
        let keys = fake.keys_query(&ServerName::new("example.org")).await.unwrap();
        assert_eq!(keys.0.get("ed25519:1").unwrap(), "abc");
        assert_eq!(fake.calls.keys_query.load(Ordering::SeqCst), 1);
    }

    #[test(tokio::test)]
    async fn unscripted_call_fails_loudly_instead_of_hanging() {
        let fake = FederationFake::new();
        let result = fake.backfill(&ServerName::new("example.org"), &RoomId::new("!r:x"), &[], 10).await;
        assert!(result.is_err());
    }
}
