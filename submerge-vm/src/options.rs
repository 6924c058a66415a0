// spec.md §4.1 Options & Phase Selector. Field groups follow the
// spec.md table exactly; `Copts` (§4.8 Injector) embeds an `Options` by
// value rather than inheriting from it, since Rust has no struct
// inheritance and the teacher's own config types (e.g. `submerge-base`'s
// clock) favor composition over a trait-object base class.

use crate::fault::FaultMask;
use submerge_base::{err, Result};
use submerge_model::ConformReport;
use std::time::Duration;

/// Resolves spec.md §9's open question: the source overloads
/// `fetch_prev_wait_count` with `0` meaning "disabled" and `-1` meaning
/// "auto". Two explicit variants behind an `Option` replace both
/// sentinels: `None` is disabled, `Some(Auto)` lets the coordinator pick
/// a backoff schedule, `Some(Count(n))` pins the iteration count.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FetchPrevWait {
    Auto,
    Count(u32),
}

impl FetchPrevWait {
    /// The iteration count the fetch coordinator actually loops for.
    /// `Auto` picks a small fixed schedule; a fancier implementation
    /// could scale this with observed peer latency, but nothing in this
    /// workspace currently measures that.
    pub fn iterations(&self) -> u32 {
        match self {
            FetchPrevWait::Auto => 3,
            FetchPrevWait::Count(n) => *n,
        }
    }
}

/// Every field disables its own phase when `false` (spec.md §4.1 "Phase
/// gate" row). `issue` lives on `Copts` only: it has no meaning outside
/// local origination.
#[derive(Clone, Copy, Debug)]
pub struct PhaseGate {
    pub conform: bool,
    pub access: bool,
    pub fetch: bool,
    pub eval: bool,
    pub auth: bool,
    pub write: bool,
    pub post: bool,
    pub notify: bool,
    pub effects: bool,
}

impl Default for PhaseGate {
    fn default() -> Self {
        PhaseGate {
            conform: true,
            access: true,
            fetch: true,
            eval: true,
            auth: true,
            write: true,
            post: true,
            notify: true,
            effects: true,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FetchPolicy {
    pub fetch_auth: bool,
    pub fetch_state: bool,
    pub fetch_prev: bool,
    pub fetch_prev_any: bool,
    pub fetch_prev_all: bool,
    pub fetch_prev_wait: Option<FetchPrevWait>,
    pub fetch_prev_wait_time: Duration,
    pub fetch_prev_limit: usize,
    pub mfetch_keys: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy {
            fetch_auth: true,
            fetch_state: true,
            fetch_prev: true,
            fetch_prev_any: false,
            fetch_prev_all: true,
            fetch_prev_wait: Some(FetchPrevWait::Auto),
            fetch_prev_wait_time: Duration::from_millis(250),
            fetch_prev_limit: 100,
            mfetch_keys: true,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Admission {
    pub replays: bool,
    pub unique: bool,
    pub edu: bool,
    pub json_source: bool,
}

impl Default for Admission {
    fn default() -> Self {
        Admission {
            replays: false,
            unique: true,
            edu: false,
            json_source: false,
        }
    }
}

/// spec.md §4.7 step 3: each of these independently gates one index
/// family. §9's second open question ("room_head vs present when only
/// one is set") is resolved at `Options::validate`, not here.
#[derive(Clone, Copy, Debug)]
pub struct StateUpdate {
    pub present: bool,
    pub room_head: bool,
    pub room_head_resolve: bool,
    pub history: bool,
}

impl Default for StateUpdate {
    fn default() -> Self {
        StateUpdate {
            present: true,
            room_head: true,
            room_head_resolve: true,
            history: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Notification {
    pub notify: bool,
    pub notify_clients: bool,
    pub notify_servers: bool,
}

#[derive(Clone, Debug)]
pub struct Options {
    pub phase: PhaseGate,

    pub conforming: bool,
    pub non_conform: ConformReport,
    pub conformed: bool,
    pub report: Option<ConformReport>,

    pub fetch_policy: FetchPolicy,

    pub reserve_bytes: Option<usize>,
    pub reserve_index: usize,

    pub admission: Admission,
    pub state_update: StateUpdate,
    pub notification: Notification,

    pub nothrows: FaultMask,
    pub errorlog: FaultMask,
    pub warnlog: FaultMask,

    pub debuglog_accept: bool,
    pub infolog_accept: bool,

    /// The node conducting this eval on the remote's behalf, if this
    /// event arrived over federation rather than locally (`vm.h`'s
    /// `node_id`); used to tag log lines and to scope fetches.
    pub origin_node: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            phase: PhaseGate::default(),
            conforming: true,
            non_conform: ConformReport::new(),
            conformed: false,
            report: None,
            fetch_policy: FetchPolicy::default(),
            reserve_bytes: None,
            reserve_index: 1024,
            admission: Admission::default(),
            state_update: StateUpdate::default(),
            notification: Notification {
                notify: true,
                notify_clients: true,
                notify_servers: true,
            },
            nothrows: FaultMask(crate::fault::EXISTS),
            errorlog: !FaultMask(crate::fault::EXISTS),
            warnlog: FaultMask(crate::fault::EXISTS),
            debuglog_accept: false,
            infolog_accept: false,
            origin_node: None,
        }
    }
}

impl Options {
    /// spec.md §9's second open question, resolved: resolving heads that
    /// were never added is always a bug, never a legitimate config.
    pub fn validate(&self) -> Result<()> {
        if self.state_update.room_head_resolve && !self.state_update.room_head {
            return Err(err("room_head_resolve requires room_head"));
        }
        Ok(())
    }
}

/// spec.md §4.8: "the set of event properties to synthesize." Each bit
/// is a property the injector will fill in if `Copts` requests it and
/// the caller didn't already supply it; `prev_state` (legacy, dropped
/// from the modern data model) is intentionally absent.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PropMask {
    pub origin: bool,
    pub origin_server_ts: bool,
    pub depth: bool,
    pub prev_events: bool,
    pub auth_events: bool,
    pub hashes: bool,
    pub signatures: bool,
    pub event_id: bool,
}

impl Default for PropMask {
    fn default() -> Self {
        PropMask {
            origin: true,
            origin_server_ts: true,
            depth: true,
            prev_events: true,
            auth_events: true,
            hashes: true,
            signatures: true,
            event_id: true,
        }
    }
}

/// spec.md §3: "`Copts` extends this with fields for local origination."
#[derive(Clone, Debug)]
pub struct Copts {
    pub options: Options,
    pub client_txnid: Option<String>,
    pub prop_mask: PropMask,
    pub issue: bool,
}

impl Default for Copts {
    fn default() -> Self {
        Copts {
            options: Options::default(),
            client_txnid: None,
            prop_mask: PropMask::default(),
            issue: true,
        }
    }
}

impl std::ops::Deref for Copts {
    type Target = Options;
    fn deref(&self) -> &Options {
        &self.options
    }
}
