use crate::Membership;
use test_log::test;

#[test]
fn initial_join_and_invite_are_allowed_from_nothing() {
    assert!(Membership::transition_allowed(None, Membership::Join));
    assert!(Membership::transition_allowed(None, Membership::Invite));
    assert!(Membership::transition_allowed(None, Membership::Knock));
    assert!(!Membership::transition_allowed(None, Membership::Leave));
}

#[test]
fn ban_blocks_every_transition_except_via_leave_kick_path() {
    assert!(!Membership::transition_allowed(Some(Membership::Ban), Membership::Join));
    assert!(!Membership::transition_allowed(Some(Membership::Ban), Membership::Invite));
    assert!(!Membership::transition_allowed(Some(Membership::Ban), Membership::Leave));
}

#[test]
fn joined_member_can_leave_or_be_banned() {
    assert!(Membership::transition_allowed(Some(Membership::Join), Membership::Leave));
    assert!(Membership::transition_allowed(Some(Membership::Join), Membership::Ban));
    assert!(!Membership::transition_allowed(Some(Membership::Join), Membership::Invite));
}

#[test]
fn parse_round_trips_known_values() {
    for (s, m) in [
        ("invite", Membership::Invite),
        ("join", Membership::Join),
        ("leave", Membership::Leave),
        ("ban", Membership::Ban),
        ("knock", Membership::Knock),
    ] {
        assert_eq!(Membership::parse(s), Some(m));
    }
    assert_eq!(Membership::parse("bogus"), None);
}
