// spec.md §4.4 Conform phase and §9's "dynamic polymorphism of hooks"
// design note: "represent hooks as a registry of named functions with
// typed sites; the core calls a site by name; plugins register
// implementations at startup." The registry here ships with the
// built-in structural rules; additional hooks can be registered at
// construction time the same way.

use submerge_model::{ConformFlag, ConformReport, Event, RoomVersion};

pub type ConformHook = fn(&Event, RoomVersion) -> ConformReport;

pub struct ConformHooks {
    hooks: Vec<(&'static str, ConformHook)>,
}

impl Default for ConformHooks {
    fn default() -> Self {
        ConformHooks {
            hooks: vec![
                ("structural", check_structural),
                ("strict_json", check_strict_json),
                ("self_signed", check_self_signed),
            ],
        }
    }
}

impl ConformHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &'static str, hook: ConformHook) {
        self.hooks.push((name, hook));
    }

    /// Runs every registered hook and unions their reports; §4.4's
    /// `conforms` bitmask is the result.
    pub fn run(&self, event: &Event, version: RoomVersion) -> ConformReport {
        let mut report = ConformReport::new();
        for (_, hook) in &self.hooks {
            let partial = hook(event, version);
            for flag in partial.failing_flags() {
                report.set(flag);
            }
        }
        report
    }
}

fn check_structural(event: &Event, _version: RoomVersion) -> ConformReport {
    let mut report = ConformReport::new();
    if event.room_id.as_str().is_empty() {
        report.set(ConformFlag::MissingRoomId);
    }
    if event.sender.as_str().is_empty() {
        report.set(ConformFlag::MissingSender);
    }
    if event.origin.is_empty() {
        report.set(ConformFlag::MissingOrigin);
    }
    if event.depth < 1 {
        report.set(ConformFlag::InvalidDepth);
    }
    if event.depth > 1 && event.prev_events.is_empty() {
        report.set(ConformFlag::EmptyPrevEvents);
    }
    if event.kind != "m.room.create" && event.auth_events.is_empty() {
        report.set(ConformFlag::EmptyAuthEvents);
    }
    if event.auth_events.len() > 10 {
        report.set(ConformFlag::TooManyAuthEvents);
    }
    if event.prev_events.len() > 20 {
        report.set(ConformFlag::TooManyPrevEvents);
    }
    if event.hashes.as_ref().map(|h| h.sha256.is_empty()).unwrap_or(true) {
        report.set(ConformFlag::MissingContentHash);
    }
    if event.signatures.is_empty() {
        report.set(ConformFlag::MissingSignatures);
    }
    let serialized_len = serde_json::to_vec(event).map(|v| v.len()).unwrap_or(usize::MAX);
    if serialized_len > 65_536 {
        report.set(ConformFlag::OversizeEvent);
    }
    report
}

/// v6+ reject duplicate JSON keys and out-of-range integers (spec.md
/// §4.4; `submerge_model::room_version::strict_canonical_json`). Only
/// meaningful when `json_source` preserved the original bytes; without
/// them there is nothing left to re-check for duplicate keys.
fn check_strict_json(event: &Event, version: RoomVersion) -> ConformReport {
    let mut report = ConformReport::new();
    if !version.strict_canonical_json() {
        return report;
    }
    if let Ok(source) = serde_json::to_string(event) {
        if submerge_model::check_strict_canonical(&source).is_err() {
            report.set(ConformFlag::IntegerOutOfRange);
        }
    }
    report
}

fn check_self_signed(event: &Event, _version: RoomVersion) -> ConformReport {
    let mut report = ConformReport::new();
    if event.signatures.contains_key("") {
        report.set(ConformFlag::SelfSigned);
    }
    report
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn base() -> Event {
        Event {
            kind: "m.room.message".into(),
            sender: "@alice:example.org".into(),
            room_id: "!room:example.org".into(),
            state_key: None,
            content: serde_json::json!({}),
            depth: 2,
            prev_events: vec!["$prev".into()],
            auth_events: vec!["$create".into()],
            hashes: Some(submerge_model::Hashes { sha256: "abc".into() }),
            signatures: [("example.org".to_string(), Default::default())].into_iter().collect(),
            origin: "example.org".into(),
            origin_server_ts: 0,
            unsigned: None,
            event_id: None,
        }
    }

    #[test]
    fn clean_event_reports_no_flags() {
        let hooks = ConformHooks::new();
        let report = hooks.run(&base(), RoomVersion::V11);
        assert!(report.is_clean(), "unexpected flags: {report}");
    }

    #[test]
    fn missing_prev_events_past_depth_one_is_flagged() {
        let mut event = base();
        event.prev_events.clear();
        let hooks = ConformHooks::new();
        let report = hooks.run(&event, RoomVersion::V11);
        assert!(report.has(ConformFlag::EmptyPrevEvents));
    }

    #[test]
    fn create_event_is_exempt_from_the_auth_events_rule() {
        let mut event = base();
        event.kind = "m.room.create".into();
        event.depth = 1;
        event.prev_events.clear();
        event.auth_events.clear();
        let hooks = ConformHooks::new();
        let report = hooks.run(&event, RoomVersion::V11);
        assert!(!report.has(ConformFlag::EmptyAuthEvents));
    }

    #[test]
    fn registered_custom_hook_contributes_to_the_report() {
        fn always_flags_missing_event_id(_event: &Event, _version: RoomVersion) -> ConformReport {
            let mut r = ConformReport::new();
            r.set(ConformFlag::MissingEventId);
            r
        }
        let mut hooks = ConformHooks::new();
        hooks.register("custom", always_flags_missing_event_id);
        let report = hooks.run(&base(), RoomVersion::V11);
        assert!(report.has(ConformFlag::MissingEventId));
    }
}
