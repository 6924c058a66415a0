// spec.md §4.4 Access phase: "room-version-dependent early rejection
// (e.g., banned servers, forbidden event types for room version)." A
// hook registry again, matching §9's design note, but unlike conform
// these hooks can themselves raise rather than just report: a banned
// server is not recoverable the way a structural nit is.

use std::collections::BTreeSet;
use submerge_model::{Event, RoomVersion};

pub type AccessHook = fn(&Event, RoomVersion, &AccessContext) -> Result<(), String>;

#[derive(Default)]
pub struct AccessContext {
    pub banned_servers: BTreeSet<String>,
}

pub struct AccessHooks {
    hooks: Vec<(&'static str, AccessHook)>,
}

impl Default for AccessHooks {
    fn default() -> Self {
        AccessHooks {
            hooks: vec![("banned_server", check_banned_server), ("event_type_allowed", check_event_type_allowed)],
        }
    }
}

impl AccessHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, hook: AccessHook) {
        self.hooks.push((name, hook));
    }

    pub fn run(&self, event: &Event, version: RoomVersion, ctx: &AccessContext) -> Result<(), String> {
        for (_, hook) in &self.hooks {
            hook(event, version, ctx)?;
        }
        Ok(())
    }
}

fn check_banned_server(event: &Event, _version: RoomVersion, ctx: &AccessContext) -> Result<(), String> {
    if ctx.banned_servers.contains(&event.origin) {
        return Err(format!("origin server {} is banned", event.origin));
    }
    Ok(())
}

/// v11 dropped `m.room.aliases` as a state event type; older room
/// versions still permit it. A minimal illustrative rule - not a
/// reimplementation of the full per-version event allowlist, which is
/// out of scope per spec.md's Non-goals ("defining the Matrix
/// specification itself").
fn check_event_type_allowed(event: &Event, version: RoomVersion, _ctx: &AccessContext) -> Result<(), String> {
    if event.kind == "m.room.aliases" && matches!(version, RoomVersion::V11) {
        return Err("m.room.aliases is not a state event in this room version".into());
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn fixture(origin: &str, kind: &str) -> Event {
        Event {
            kind: kind.into(),
            sender: "@alice:example.org".into(),
            room_id: "!room:example.org".into(),
            state_key: None,
            content: serde_json::json!({}),
            depth: 2,
            prev_events: vec!["$prev".into()],
            auth_events: vec!["$create".into()],
            hashes: None,
            signatures: Default::default(),
            origin: origin.into(),
            origin_server_ts: 0,
            unsigned: None,
            event_id: None,
        }
    }

    #[test]
    fn banned_server_is_rejected() {
        let hooks = AccessHooks::new();
        let mut ctx = AccessContext::default();
        ctx.banned_servers.insert("evil.example.org".into());
        let event = fixture("evil.example.org", "m.room.message");
        assert!(hooks.run(&event, RoomVersion::V11, &ctx).is_err());
    }

    #[test]
    fn ordinary_event_passes() {
        let hooks = AccessHooks::new();
        let ctx = AccessContext::default();
        let event = fixture("example.org", "m.room.message");
        assert!(hooks.run(&event, RoomVersion::V11, &ctx).is_ok());
    }

    #[test]
    fn aliases_event_rejected_on_v11() {
        let hooks = AccessHooks::new();
        let ctx = AccessContext::default();
        let event = fixture("example.org", "m.room.aliases");
        assert!(hooks.run(&event, RoomVersion::V11, &ctx).is_err());
    }
}
