// spec.md §4.6: "Power-levels: senders require power_level >= threshold
// for the event type." This module parses `m.room.power_levels`
// content into the handful of fields the auth rules actually consult;
// unrecognized/extra keys in the content are the client API's concern,
// not this core's (spec.md §1 Non-goals).

use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct PowerLevels {
    pub users: BTreeMap<String, i64>,
    pub users_default: i64,
    pub events: BTreeMap<String, i64>,
    pub events_default: i64,
    pub state_default: i64,
    pub ban: i64,
    pub kick: i64,
    pub invite: i64,
    pub redact: i64,
}

impl Default for PowerLevels {
    fn default() -> Self {
        PowerLevels {
            users: BTreeMap::new(),
            users_default: 0,
            events: BTreeMap::new(),
            events_default: 0,
            state_default: 50,
            ban: 50,
            kick: 50,
            invite: 0,
            redact: 50,
        }
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

impl PowerLevels {
    /// Before any `m.room.power_levels` event exists, only the room
    /// creator holds elevated power (100), matching the implicit
    /// defaults Matrix rooms assume for their first moments.
    pub fn default_for_creator(creator: &str) -> Self {
        let mut pl = PowerLevels::default();
        pl.users.insert(creator.to_string(), 100);
        pl
    }

    pub fn from_content(content: &Value) -> Self {
        let mut pl = PowerLevels::default();
        let Some(obj) = content.as_object() else {
            return pl;
        };
        if let Some(users) = obj.get("users").and_then(Value::as_object) {
            for (k, v) in users {
                if let Some(n) = as_i64(v) {
                    pl.users.insert(k.clone(), n);
                }
            }
        }
        if let Some(events) = obj.get("events").and_then(Value::as_object) {
            for (k, v) in events {
                if let Some(n) = as_i64(v) {
                    pl.events.insert(k.clone(), n);
                }
            }
        }
        if let Some(n) = obj.get("users_default").and_then(as_i64) {
            pl.users_default = n;
        }
        if let Some(n) = obj.get("events_default").and_then(as_i64) {
            pl.events_default = n;
        }
        if let Some(n) = obj.get("state_default").and_then(as_i64) {
            pl.state_default = n;
        }
        if let Some(n) = obj.get("ban").and_then(as_i64) {
            pl.ban = n;
        }
        if let Some(n) = obj.get("kick").and_then(as_i64) {
            pl.kick = n;
        }
        if let Some(n) = obj.get("invite").and_then(as_i64) {
            pl.invite = n;
        }
        if let Some(n) = obj.get("redact").and_then(as_i64) {
            pl.redact = n;
        }
        pl
    }

    pub fn for_user(&self, user_id: &str) -> i64 {
        self.users.get(user_id).copied().unwrap_or(self.users_default)
    }

    pub fn required_for_event(&self, event_type: &str, is_state: bool) -> i64 {
        self.events
            .get(event_type)
            .copied()
            .unwrap_or(if is_state { self.state_default } else { self.events_default })
    }
}
