use crate::EventId;
use test_log::test;

#[test]
fn edu_placeholder_round_trips() {
    let id = EventId::edu_placeholder();
    assert!(id.is_edu_placeholder());
    let real = EventId::from("$abc:example.org");
    assert!(!real.is_edu_placeholder());
}

#[test]
fn ids_compare_by_string_value() {
    let a = EventId::from("$a:example.org");
    let b = EventId::from("$a:example.org");
    assert_eq!(a, b);
}
