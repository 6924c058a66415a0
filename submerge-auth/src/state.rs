// spec.md §4.6: "evaluates the event against the state formed by its
// declared auth_events." submerge-vm resolves each id in `auth_events`
// to a fetched/local `Event` (§4.5 fetch coordinator) and classifies
// them here by type/state_key - the four slots every room version's
// auth rules actually consult.

use std::collections::BTreeMap;
use submerge_model::Event;

#[derive(Clone, Debug, Default)]
pub struct AuthState<'a> {
    pub create: Option<&'a Event>,
    pub power_levels: Option<&'a Event>,
    pub join_rules: Option<&'a Event>,
    pub members: BTreeMap<&'a str, &'a Event>,
}

impl<'a> AuthState<'a> {
    pub fn from_events(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut state = AuthState::default();
        for event in events {
            match event.kind.as_str() {
                "m.room.create" => state.create = Some(event),
                "m.room.power_levels" => state.power_levels = Some(event),
                "m.room.join_rules" => state.join_rules = Some(event),
                "m.room.member" => {
                    if let Some(state_key) = event.state_key.as_deref() {
                        state.members.insert(state_key, event);
                    }
                }
                _ => {}
            }
        }
        state
    }

    pub fn member(&self, user_id: &str) -> Option<&'a Event> {
        self.members.get(user_id).copied()
    }
}
