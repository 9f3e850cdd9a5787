mod common;

use estate_deals::error::{DealError, Violation};
use estate_deals::store::WriteOutcome;

use common::{desk, property};

#[test]
fn comparison_rejects_fifth_property_and_keeps_existing_four() {
    let (desk, _) = desk();
    let comparison = desk.comparison();
    for id in ["prop-a", "prop-b", "prop-c", "prop-d"] {
        comparison.add(&property(id, 10_000_000)).expect("room left");
    }
    let before: Vec<_> = comparison.list().into_iter().map(|item| item.id).collect();

    let err = comparison
        .add(&property("prop-e", 10_000_000))
        .expect_err("comparison is full");
    assert!(matches!(
        err,
        DealError::InvariantViolation(Violation::ComparisonFull { limit: 4 })
    ));

    let after: Vec<_> = comparison.list().into_iter().map(|item| item.id).collect();
    assert_eq!(before, after);
    assert!(!comparison.contains("prop-e"));

    comparison
        .add(&property("prop-b", 10_000_000))
        .expect("already listed properties do not count twice");
}

#[test]
fn entries_can_be_removed_one_by_one_or_all_at_once() {
    let (desk, _) = desk();
    let favorites = desk.favorites();
    let first = favorites.add(&property("prop-a", 1)).expect("favorite");
    favorites.add(&property("prop-b", 2)).expect("favorite");

    assert_eq!(favorites.remove(&first.id).expect("remove"), WriteOutcome::Applied);
    assert_eq!(favorites.remove(&first.id).expect("remove again"), WriteOutcome::Unchanged);
    assert_eq!(favorites.list().len(), 1);

    favorites.clear().expect("clear");
    assert!(favorites.list().is_empty());
}

#[test]
fn favorites_keep_the_snapshot_taken_when_added() {
    let (desk, _) = desk();
    let favorites = desk.favorites();
    favorites.add(&property("prop-a", 5_000_000)).expect("favorite");
    favorites
        .add(&property("prop-a", 6_000_000))
        .expect("duplicate add");

    let listed = favorites.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].property.price, 5_000_000);
}
