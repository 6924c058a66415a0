use crate::HeadSet;
use submerge_model::EventIndex;
use test_log::test;

#[test]
fn insert_then_resolve() {
    let mut heads = HeadSet::new();
    heads.insert(EventIndex(1));
    heads.insert(EventIndex(2));
    assert!(heads.is_head(EventIndex(1)));
    heads.resolve([EventIndex(1)]);
    assert!(!heads.is_head(EventIndex(1)));
    assert!(heads.is_head(EventIndex(2)));
}

#[test]
fn resolving_a_non_head_is_harmless() {
    let mut heads = HeadSet::new();
    heads.insert(EventIndex(1));
    heads.resolve([EventIndex(99)]);
    assert_eq!(heads.len(), 1);
}
