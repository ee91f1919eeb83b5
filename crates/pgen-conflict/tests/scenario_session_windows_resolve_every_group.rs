use std::time::Instant;

use pgen_conflict::{
    group, BatchProtocol, ConflictGroup, ConflictSession, Exchange, ProtocolStep, SessionRegistry,
};
use pgen_schemas::{ItemStack, RecipeEntry, RequesterId, WindowSelection};
use proptest::prelude::*;

fn groups(sizes: &[usize]) -> Vec<ConflictGroup> {
    let recipes: Vec<RecipeEntry> = sizes
        .iter()
        .enumerate()
        .flat_map(|(g, &n)| {
            (0..n).map(move |c| RecipeEntry {
                inputs: vec![ItemStack::new(format!("in{c}"), 0, 1)],
                outputs: vec![ItemStack::new(format!("out{g}"), 0, 1)],
                ..RecipeEntry::default()
            })
        })
        .collect();
    group(recipes).conflicts
}

proptest! {
    #[test]
    fn full_length_batch_always_completes(
        sizes in prop::collection::vec(2usize..6, 1..30),
        seed in any::<u64>(),
    ) {
        let gs = groups(&sizes);
        let mut s = ConflictSession::new(RequesterId::from_name("p"), "m", vec![], gs);
        let choices: Vec<i64> = sizes
            .iter()
            .enumerate()
            .map(|(i, n)| ((seed as usize).wrapping_add(i) % n) as i64)
            .collect();
        prop_assert_eq!(s.select_batch(&choices), Ok(sizes.len()));
        prop_assert!(s.is_complete());
        prop_assert_eq!(s.final_recipes().map(|r| r.len()), Some(sizes.len()));
    }

    #[test]
    fn stale_token_never_mutates(
        sizes in prop::collection::vec(2usize..5, 2..20),
        advance in 0usize..10,
        stale in 0u32..40,
        choices in prop::collection::vec(-2i64..6, 0..8),
    ) {
        let p = BatchProtocol::new(6);
        let mut s = ConflictSession::new(RequesterId::from_name("p"), "m", vec![], groups(&sizes));
        let advance = advance.min(sizes.len() - 1);
        for _ in 0..advance {
            s.select(0).unwrap();
        }
        prop_assume!(stale != s.token());

        let before = (s.cursor(), s.selections().clone());
        let step = p.apply(&mut s, &WindowSelection::choose(stale, choices.clone()));
        let is_resend = matches!(step, ProtocolStep::Resend { .. });
        prop_assert!(is_resend);
        let step = p.apply(&mut s, &WindowSelection::cancel(stale));
        prop_assert_eq!(step, ProtocolStep::IgnoredStale);
        prop_assert_eq!((s.cursor(), s.selections().clone()), before);
    }
}

#[test]
fn windows_through_registry_complete_once() {
    let reg = SessionRegistry::new();
    let p = BatchProtocol::new(6);
    let id = RequesterId::from_name("steve");
    reg.create(ConflictSession::new(id, "m", vec![], groups(&[2; 8])))
        .unwrap();

    let w = reg.window(&p, &id).unwrap();
    assert_eq!((w.start_index, w.groups.len()), (1, 6));

    let ex = reg.submit(&p, &id, &WindowSelection::choose(1, vec![1; 6]), Instant::now());
    let Exchange::Step(ProtocolStep::Window(w)) = ex else {
        panic!("expected second window, got {ex:?}");
    };
    assert_eq!((w.start_index, w.groups.len()), (7, 2));

    // duplicate of the first reply arrives late
    let dup = reg.submit(&p, &id, &WindowSelection::choose(1, vec![1; 6]), Instant::now());
    assert!(matches!(dup, Exchange::Step(ProtocolStep::Resend { .. })));

    let ex = reg.submit(&p, &id, &WindowSelection::choose(7, vec![0, 1]), Instant::now());
    assert!(matches!(ex, Exchange::Step(ProtocolStep::Complete { ref recipes, .. }) if recipes.len() == 8));
    assert!(reg.is_empty());

    let again = reg.submit(&p, &id, &WindowSelection::choose(9, vec![0]), Instant::now());
    assert_eq!(again, Exchange::NoSession);
}

#[test]
fn stalled_session_persists_until_cancelled() {
    let reg = SessionRegistry::new();
    let p = BatchProtocol::default();
    let id = RequesterId::from_name("idle");
    reg.create(ConflictSession::new(id, "m", vec![], groups(&[3, 3])))
        .unwrap();

    let much_later = Instant::now() + std::time::Duration::from_secs(7 * 24 * 3600);
    assert!(reg.sweep_idle(much_later).is_empty());
    assert!(reg.contains(&id));

    let ex = reg.submit(&p, &id, &WindowSelection::cancel(1), Instant::now());
    assert_eq!(ex, Exchange::Step(ProtocolStep::Cancelled));
    assert!(!reg.contains(&id));
}
