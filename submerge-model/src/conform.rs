// spec.md §4.4 Conform phase: "runs a registry of hook functions that
// inspect event shape and report which rules fail as a bitmask
// (`conforms`)". The rule *functions* live in submerge_vm::conform (they
// need the room-version context); this module only defines the bitmask
// shape, reusing `Bitmap256` the way the teacher's coldb chunk bitmap
// does - a conform report never needs more than a couple dozen bits
// today, but a bitmask with headroom means adding a new structural rule
// is never a breaking change to the report's representation.

use submerge_base::Bitmap256;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum ConformFlag {
    MissingRoomId = 0,
    MissingSender = 1,
    MissingOrigin = 2,
    MissingEventId = 3,
    MismatchedRoomId = 4,
    MismatchedOrigin = 5,
    InvalidDepth = 6,
    EmptyPrevEvents = 7,
    EmptyAuthEvents = 8,
    TooManyAuthEvents = 9,
    TooManyPrevEvents = 10,
    MissingContentHash = 11,
    ContentHashMismatch = 12,
    MissingSignatures = 13,
    SelfSigned = 14,
    DuplicateJsonKeys = 15,
    IntegerOutOfRange = 16,
    OversizeEvent = 17,
}

pub const ALL_FLAGS: &[ConformFlag] = &[
    ConformFlag::MissingRoomId,
    ConformFlag::MissingSender,
    ConformFlag::MissingOrigin,
    ConformFlag::MissingEventId,
    ConformFlag::MismatchedRoomId,
    ConformFlag::MismatchedOrigin,
    ConformFlag::InvalidDepth,
    ConformFlag::EmptyPrevEvents,
    ConformFlag::EmptyAuthEvents,
    ConformFlag::TooManyAuthEvents,
    ConformFlag::TooManyPrevEvents,
    ConformFlag::MissingContentHash,
    ConformFlag::ContentHashMismatch,
    ConformFlag::MissingSignatures,
    ConformFlag::SelfSigned,
    ConformFlag::DuplicateJsonKeys,
    ConformFlag::IntegerOutOfRange,
    ConformFlag::OversizeEvent,
];

#[derive(Clone, Default, Eq, PartialEq, Hash, Debug)]
pub struct ConformReport(Bitmap256);

impl ConformReport {
    pub fn new() -> Self {
        ConformReport(Bitmap256::new())
    }

    pub fn set(&mut self, flag: ConformFlag) {
        self.0.set(flag as u8, true);
    }

    pub fn has(&self, flag: ConformFlag) -> bool {
        self.0.get(flag as u8)
    }

    pub fn is_clean(&self) -> bool {
        self.0.is_empty()
    }

    /// `report & !allowed`, i.e. failures not covered by
    /// `vm::Options::non_conform` (spec.md §4.4).
    pub fn uncovered_by(&self, allowed: &ConformReport) -> ConformReport {
        let mut out = self.clone();
        out.0.subtract(&allowed.0);
        out
    }

    pub fn failing_flags(&self) -> Vec<ConformFlag> {
        ALL_FLAGS.iter().copied().filter(|f| self.has(*f)).collect()
    }
}

impl std::fmt::Display for ConformReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = self.failing_flags();
        if flags.is_empty() {
            return write!(f, "clean");
        }
        let names: Vec<&str> = flags
            .iter()
            .map(|flag| match flag {
                ConformFlag::MissingRoomId => "missing_room_id",
                ConformFlag::MissingSender => "missing_sender",
                ConformFlag::MissingOrigin => "missing_origin",
                ConformFlag::MissingEventId => "missing_event_id",
                ConformFlag::MismatchedRoomId => "mismatched_room_id",
                ConformFlag::MismatchedOrigin => "mismatched_origin",
                ConformFlag::InvalidDepth => "invalid_depth",
                ConformFlag::EmptyPrevEvents => "empty_prev_events",
                ConformFlag::EmptyAuthEvents => "empty_auth_events",
                ConformFlag::TooManyAuthEvents => "too_many_auth_events",
                ConformFlag::TooManyPrevEvents => "too_many_prev_events",
                ConformFlag::MissingContentHash => "missing_content_hash",
                ConformFlag::ContentHashMismatch => "content_hash_mismatch",
                ConformFlag::MissingSignatures => "missing_signatures",
                ConformFlag::SelfSigned => "self_signed",
                ConformFlag::DuplicateJsonKeys => "duplicate_json_keys",
                ConformFlag::IntegerOutOfRange => "integer_out_of_range",
                ConformFlag::OversizeEvent => "oversize_event",
            })
            .collect();
        write!(f, "{}", names.join(","))
    }
}
