// spec.md §3 Fault / §7 Error Handling Design. A bitmask-enumerated sum
// type rather than a plain enum because `Options::nothrows`/`errorlog`/
// `warnlog` are themselves masks over the same six bits, and a mask that
// can't be built from the variant's own discriminant would drift from
// the taxonomy it's supposed to police.

use submerge_auth::AuthReject;
use submerge_base::Error;

pub const EXISTS: u8 = 0x01;
pub const GENERAL: u8 = 0x02;
pub const INVALID: u8 = 0x04;
pub const AUTH: u8 = 0x08;
pub const STATE: u8 = 0x10;
pub const EVENT: u8 = 0x20;

/// `nothrows`/`errorlog`/`warnlog` are all the same shape: a bitmask over
/// `EXISTS | GENERAL | INVALID | AUTH | STATE | EVENT`. Kept as a plain
/// `u8` newtype rather than a `bitflags!`-generated type since the only
/// consumer (`Fault::bit`) just needs one `&`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub struct FaultMask(pub u8);

impl FaultMask {
    pub const NONE: FaultMask = FaultMask(0);
    pub const ALL: FaultMask = FaultMask(EXISTS | GENERAL | INVALID | AUTH | STATE | EVENT);

    pub fn contains(&self, fault: &Fault) -> bool {
        self.0 & fault.bit() != 0
    }
}

impl std::ops::Not for FaultMask {
    type Output = FaultMask;
    fn not(self) -> FaultMask {
        FaultMask(!self.0 & FaultMask::ALL.0)
    }
}

impl std::ops::BitOr for FaultMask {
    type Output = FaultMask;
    fn bitor(self, rhs: FaultMask) -> FaultMask {
        FaultMask(self.0 | rhs.0)
    }
}

/// The recoverable-trap taxonomy (spec.md §3). `Accept` is the zero
/// value, not a raised fault - `execute`/`inject` return it on success.
/// `General` is the one variant that is never masked and always fatal
/// (spec.md §7: "invariant violated, corrupt DB, programmer error...
/// propagates out of the core").
#[derive(Debug)]
pub enum Fault {
    Accept,
    /// event-id already admitted (spec.md §4.2 duplicate admission).
    Exists,
    /// fatal; wraps the underlying plumbing error for diagnostics.
    General(Error),
    /// conform or verify failed; carries a human-readable reason.
    Invalid(String),
    /// the auth engine rejected the event, or its auth chain could not
    /// be closed.
    Auth(String),
    /// required room state could not be obtained.
    State(String),
    /// `prev_events` unsatisfiable per the fetch policy in force.
    Event(String),
}

impl Fault {
    pub fn bit(&self) -> u8 {
        match self {
            Fault::Accept => 0,
            Fault::Exists => EXISTS,
            Fault::General(_) => GENERAL,
            Fault::Invalid(_) => INVALID,
            Fault::Auth(_) => AUTH,
            Fault::State(_) => STATE,
            Fault::Event(_) => EVENT,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Fault::General(_))
    }

    pub fn reflect(&self) -> &'static str {
        match self {
            Fault::Accept => "ACCEPT",
            Fault::Exists => "EXISTS",
            Fault::General(_) => "GENERAL",
            Fault::Invalid(_) => "INVALID",
            Fault::Auth(_) => "AUTH",
            Fault::State(_) => "STATE",
            Fault::Event(_) => "EVENT",
        }
    }

    /// spec.md §7's fault→HTTP table.
    pub fn http_code(&self) -> u16 {
        match self {
            Fault::Accept => 200,
            Fault::Exists => 200,
            Fault::Invalid(_) => 400,
            Fault::Auth(_) => 403,
            Fault::State(_) | Fault::Event(_) => 404,
            Fault::General(_) => 500,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Fault::Invalid(r) | Fault::Auth(r) | Fault::State(r) | Fault::Event(r) => Some(r),
            _ => None,
        }
    }

    pub fn auth(reject: AuthReject) -> Fault {
        Fault::Auth(reject.to_string())
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}: {reason}", self.reflect()),
            None => write!(f, "{}", self.reflect()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    #[test]
    fn mask_not_excludes_exists_from_all_others() {
        let nothrows = FaultMask(EXISTS);
        let errorlog = !nothrows;
        assert!(!errorlog.contains(&Fault::Exists));
        assert!(errorlog.contains(&Fault::Invalid("x".into())));
        assert!(errorlog.contains(&Fault::Auth("x".into())));
    }

    #[test]
    fn general_is_never_in_all_masks_logic_but_is_always_fatal() {
        let fault = Fault::General(submerge_base::err("disk corrupt"));
        assert!(fault.is_fatal());
        assert_eq!(fault.http_code(), 500);
    }

    #[test]
    fn http_codes_match_the_fault_table() {
        assert_eq!(Fault::Exists.http_code(), 200);
        assert_eq!(Fault::Invalid("x".into()).http_code(), 400);
        assert_eq!(Fault::Auth("x".into()).http_code(), 403);
        assert_eq!(Fault::State("x".into()).http_code(), 404);
        assert_eq!(Fault::Event("x".into()).http_code(), 404);
    }
}
