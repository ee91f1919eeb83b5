use pgen_runtime::{ExchangeOutcome, GenerationOutcome, GenerationRejection};
use pgen_testkit::{colliding_recipes, distinct_recipes, FixtureCatalog, Harness};

#[test]
fn six_artifacts_against_five_blanks_is_refused_whole() {
    let h = Harness::new(FixtureCatalog::new().category("mixer", distinct_recipes("m", 6)));
    h.credit_inventory(5);

    let out = h.request("mixer").unwrap();
    assert_eq!(
        out,
        GenerationOutcome::Rejected(GenerationRejection::Insufficient {
            required: 6,
            available: 5,
        })
    );
    assert_eq!(h.inventory_balance(), 5);
    assert_eq!(h.stored_count().unwrap(), 0);
    assert_eq!(h.service.storage_summary(&h.requester).unwrap().count, 0);
}

#[test]
fn shortfall_after_conflict_resolution_discards_the_session_output() {
    let mut recipes = distinct_recipes("m", 2);
    recipes.extend(colliding_recipes("x", 2));
    let h = Harness::new(FixtureCatalog::new().category("mixer", recipes));
    h.credit_inventory(2);

    assert!(matches!(h.request("mixer").unwrap(), GenerationOutcome::NeedsSelection { .. }));
    let out = h.select(&[0]).unwrap();
    assert_eq!(
        out,
        ExchangeOutcome::Rejected(GenerationRejection::Insufficient {
            required: 3,
            available: 2,
        })
    );
    assert!(!h.service.has_session(&h.requester));
    assert_eq!(h.inventory_balance(), 2);
    assert_eq!(h.stored_count().unwrap(), 0);
}

#[test]
fn network_pool_pays_first_when_both_can() {
    let h = Harness::new(FixtureCatalog::new().category("mixer", distinct_recipes("m", 4)));
    h.credit_inventory(10);
    h.credit_network(10);

    let GenerationOutcome::Generated { report, .. } = h.request("mixer").unwrap() else {
        panic!("either supply covers the batch");
    };
    assert_eq!(report.debited_from.as_deref(), Some("network"));
    assert_eq!(h.network_balance(), 6);
    assert_eq!(h.inventory_balance(), 10);
}

#[test]
fn inventory_pays_when_network_pool_cannot_cover() {
    let h = Harness::new(FixtureCatalog::new().category("mixer", distinct_recipes("m", 4)));
    h.credit_network(3);
    h.credit_inventory(10);

    let GenerationOutcome::Generated { report, .. } = h.request("mixer").unwrap() else {
        panic!("inventory covers the batch");
    };
    assert_eq!(report.debited_from.as_deref(), Some("inventory"));
    assert_eq!(h.network_balance(), 3);
    assert_eq!(h.inventory_balance(), 6);
}

#[test]
fn offline_network_falls_back_to_inventory() {
    let h = Harness::new(FixtureCatalog::new().category("mixer", distinct_recipes("m", 4)));
    h.credit_inventory(10);
    h.credit_network(10);
    h.network.set_online(false);

    let GenerationOutcome::Generated { report, .. } = h.request("mixer").unwrap() else {
        panic!("inventory pays while the pool is offline");
    };
    assert_eq!(report.debited_from.as_deref(), Some("inventory"));
    assert_eq!(h.network_balance(), 10);
    assert_eq!(h.inventory_balance(), 6);
}

#[test]
fn offline_network_degrades_to_insufficient_not_error() {
    let h = Harness::new(FixtureCatalog::new().category("mixer", distinct_recipes("m", 4)));
    h.credit_inventory(3);
    h.credit_network(10);
    h.network.set_online(false);

    let out = h.request("mixer").unwrap();
    assert_eq!(
        out,
        GenerationOutcome::Rejected(GenerationRejection::Insufficient {
            required: 4,
            available: 3,
        })
    );
    assert_eq!(h.network_balance(), 10);
    assert_eq!(h.inventory_balance(), 3);
}

#[test]
fn failed_network_commit_falls_through_to_inventory() {
    let h = Harness::new(FixtureCatalog::new().category("mixer", distinct_recipes("m", 2)));
    h.credit_inventory(5);
    h.credit_network(5);
    h.network.fail_commits(true);

    let GenerationOutcome::Generated { report, .. } = h.request("mixer").unwrap() else {
        panic!("inventory pays after the pool commit fails");
    };
    assert_eq!(report.debited_from.as_deref(), Some("inventory"));
    assert_eq!(h.network_balance(), 5);
    assert_eq!(h.inventory_balance(), 3);
}
