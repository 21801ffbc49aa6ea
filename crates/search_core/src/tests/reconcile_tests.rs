use shared::domain::BloodGroup;

use super::*;
use crate::fixtures::donor;

fn o_positive() -> PredicateSet {
    PredicateSet::new(Some(BloodGroup::OPositive), None)
}

fn expect_query(transition: Transition) -> QueryTicket {
    match transition {
        Transition::Query { ticket, snapshot } => {
            assert_eq!(snapshot.status, SnapshotStatus::Loading);
            assert_eq!(snapshot.generation, ticket.generation);
            assert!(snapshot.records.is_empty());
            ticket
        }
        Transition::Settled(snapshot) => panic!("expected a query, settled at {snapshot}"),
    }
}

#[test]
fn starts_idle_at_generation_zero() {
    let reconciler = Reconciler::new(EmptyPredicatePolicy::Unfiltered);
    assert_eq!(reconciler.current().status, SnapshotStatus::Idle);
    assert_eq!(reconciler.current().generation, 0);
    assert_eq!(reconciler.latest_issued(), 0);
}

#[test]
fn every_submission_issues_a_new_generation_even_for_equal_predicates() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Unfiltered);
    let first = expect_query(reconciler.submit(o_positive()));
    let second = expect_query(reconciler.submit(o_positive()));
    assert_eq!(first.generation, 1);
    assert_eq!(second.generation, 2);
    assert_eq!(second.predicates, o_positive());
}

#[test]
fn last_submission_wins_when_changes_outpace_the_store() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Unfiltered);
    let tickets: Vec<QueryTicket> = [
        PredicateSet::new(Some(BloodGroup::APositive), None),
        PredicateSet::new(Some(BloodGroup::APositive), Some("pu")),
        PredicateSet::new(Some(BloodGroup::BPositive), Some("pune")),
    ]
    .into_iter()
    .map(|predicates| expect_query(reconciler.submit(predicates)))
    .collect();

    let sneha = donor(4, "Sneha Patel", BloodGroup::BPositive, "Pune", 10);
    let last = tickets.last().expect("last ticket");
    let ready = reconciler
        .resolve(last.generation, Ok(vec![sneha.clone()]))
        .expect("latest generation settles");
    assert!(ready.is_ready());

    for stale in &tickets[..2] {
        assert!(reconciler
            .resolve(stale.generation, Ok(Vec::new()))
            .is_none());
    }
    assert_eq!(reconciler.current().records, vec![sneha]);
    assert_eq!(
        reconciler.current().predicates,
        PredicateSet::new(Some(BloodGroup::BPositive), Some("pune"))
    );
}

#[test]
fn overlapping_generations_resolving_out_of_order_keep_the_newer_result() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Unfiltered);
    for _ in 0..4 {
        reconciler.submit(o_positive());
    }
    let fifth = expect_query(reconciler.submit(o_positive()));
    let sixth = expect_query(reconciler.submit(PredicateSet::new(
        Some(BloodGroup::OPositive),
        Some("delhi"),
    )));
    assert_eq!((fifth.generation, sixth.generation), (5, 6));

    let priya = donor(2, "Priya Sharma", BloodGroup::OPositive, "Delhi", 5);
    let rajesh = donor(1, "Rajesh Kumar", BloodGroup::OPositive, "Mumbai", 1);
    let settled = reconciler
        .resolve(6, Ok(vec![priya.clone()]))
        .expect("generation 6 settles");
    assert_eq!(settled.generation, 6);

    assert!(reconciler.resolve(5, Ok(vec![priya.clone(), rajesh])).is_none());
    assert_eq!(reconciler.current().generation, 6);
    assert_eq!(reconciler.current().records, vec![priya]);
}

#[test]
fn store_order_is_preserved_verbatim() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Unfiltered);
    let ticket = expect_query(reconciler.submit(PredicateSet::new(
        Some(BloodGroup::APositive),
        None,
    )));
    let newest = donor(7, "Zara Khan", BloodGroup::APositive, "Agra", 3);
    let oldest = donor(8, "Aarav Mehta", BloodGroup::APositive, "Agra", 1);

    let ready = reconciler
        .resolve(ticket.generation, Ok(vec![newest.clone(), oldest.clone()]))
        .expect("ready");
    let names: Vec<&str> = ready.records.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Zara Khan", "Aarav Mehta"]);
    assert!(ready.records[0].updated_at > ready.records[1].updated_at);
}

#[test]
fn failure_then_retry_without_predicate_change_can_become_ready() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Unfiltered);
    let first = expect_query(reconciler.submit(o_positive()));
    let failed = reconciler
        .resolve(
            first.generation,
            Err(SearchError::QueryFailed("connection reset".into())),
        )
        .expect("failure settles");
    assert!(failed.is_failed());
    assert!(failed.records.is_empty());
    assert!(failed.headline().contains("connection reset"));

    let retry = expect_query(reconciler.requery().expect("retry issues a query"));
    assert!(retry.generation > first.generation);
    assert_eq!(retry.predicates, o_positive());

    let rajesh = donor(1, "Rajesh Kumar", BloodGroup::OPositive, "Mumbai", 1);
    let ready = reconciler
        .resolve(retry.generation, Ok(vec![rajesh]))
        .expect("retry settles");
    assert!(ready.is_ready());
    assert_eq!(ready.records.len(), 1);
}

#[test]
fn superseded_failures_are_discarded() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Unfiltered);
    let first = expect_query(reconciler.submit(o_positive()));
    let second = expect_query(reconciler.submit(o_positive()));
    assert!(reconciler
        .resolve(first.generation, Err(SearchError::QueryFailed("timeout".into())))
        .is_none());
    assert_eq!(reconciler.current().status, SnapshotStatus::Loading);

    reconciler
        .resolve(second.generation, Ok(Vec::new()))
        .expect("second settles");
    assert!(reconciler.current().is_ready());
}

#[test]
fn duplicate_and_unknown_generations_are_ignored() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Unfiltered);
    let ticket = expect_query(reconciler.submit(o_positive()));
    assert!(reconciler.resolve(ticket.generation, Ok(Vec::new())).is_some());
    assert!(reconciler.resolve(ticket.generation, Ok(Vec::new())).is_none());
    assert!(reconciler.resolve(ticket.generation + 1, Ok(Vec::new())).is_none());
}

#[test]
fn notification_while_idle_issues_one_unfiltered_query() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Unfiltered);
    let ticket = expect_query(reconciler.requery().expect("query"));
    assert_eq!(ticket.generation, 1);
    assert!(ticket.predicates.is_empty());
    assert_eq!(reconciler.latest_issued(), 1);
}

#[test]
fn clearing_predicates_is_unfiltered_query_every_time_under_unfiltered_policy() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Unfiltered);
    reconciler.submit(o_positive());
    for _ in 0..2 {
        let ticket = expect_query(reconciler.submit(PredicateSet::unfiltered()));
        assert!(ticket.predicates.is_empty());
        reconciler
            .resolve(ticket.generation, Ok(Vec::new()))
            .expect("settles");
        assert!(reconciler.current().is_ready());
    }
}

#[test]
fn clearing_predicates_returns_to_idle_every_time_under_suppress_policy() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Suppress);
    let loading = expect_query(reconciler.submit(o_positive()));

    for _ in 0..2 {
        match reconciler.submit(PredicateSet::unfiltered()) {
            Transition::Settled(snapshot) => {
                assert_eq!(snapshot.status, SnapshotStatus::Idle);
                assert!(snapshot.records.is_empty());
            }
            other => panic!("expected idle, got {other:?}"),
        }
    }
    // The query issued before the clear must not resurface.
    assert!(reconciler
        .resolve(loading.generation, Ok(vec![donor(
            1,
            "Rajesh Kumar",
            BloodGroup::OPositive,
            "Mumbai",
            1
        )]))
        .is_none());
    assert_eq!(reconciler.current().status, SnapshotStatus::Idle);
}

#[test]
fn suppress_policy_ignores_requery_for_empty_predicates() {
    let mut reconciler = Reconciler::new(EmptyPredicatePolicy::Suppress);
    assert!(reconciler.requery().is_none());
    assert_eq!(reconciler.latest_issued(), 0);

    reconciler.submit(PredicateSet::new(None, Some("mumbai")));
    assert!(reconciler.requery().is_some());
}

#[test]
fn parses_policy_names() {
    assert_eq!(
        "Suppress".parse::<EmptyPredicatePolicy>(),
        Ok(EmptyPredicatePolicy::Suppress)
    );
    assert_eq!(
        " unfiltered ".parse::<EmptyPredicatePolicy>(),
        Ok(EmptyPredicatePolicy::Unfiltered)
    );
    assert!("everything".parse::<EmptyPredicatePolicy>().is_err());
}

#[test]
fn headline_distinguishes_loading_empty_ready_and_failed() {
    let loading = ResultSnapshot::loading(3, o_positive());
    assert!(loading.headline().starts_with("Searching"));

    let mut ready = ResultSnapshot::idle(3, o_positive());
    ready.status = SnapshotStatus::Ready;
    assert!(ready.headline().starts_with("No donors found"));

    ready.records.push(donor(1, "Rajesh Kumar", BloodGroup::OPositive, "Mumbai", 1));
    assert_eq!(ready.headline(), "Found 1 donor for O+");
}
