use std::sync::Arc;

use pgen_schemas::{EncodedStack, GeneratedArtifact, ItemStack, RequesterId};
use pgen_store::{FileBackend, OutputStore, StoreBackend};

fn artifact(out: &str) -> GeneratedArtifact {
    GeneratedArtifact {
        inputs: vec![EncodedStack::from_stack(&ItemStack::new("gt:dust", 0, 1))],
        outputs: vec![EncodedStack::from_stack(&ItemStack::new(out, 0, 1).named(out))],
        crafting: false,
        substitute: false,
        category: "gt.recipe.mixer".into(),
    }
}

#[test]
fn extract_two_of_three_then_rest_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FileBackend::new(dir.path().join("patterngen")));
    let store = OutputStore::new(backend.clone());
    let k = RequesterId::from_name("steve");

    store
        .save(&k, vec![artifact("First"), artifact("Second"), artifact("Third")], "mixer")
        .unwrap();

    let taken = store.extract(&k, 2).unwrap();
    let names: Vec<_> = taken.iter().map(|a| a.output_summary()).collect();
    assert_eq!(names, vec!["First", "Second"]);
    assert_eq!(store.count(&k).unwrap(), 1);

    // a fresh store over the same directory sees the persisted remainder
    let reopened = OutputStore::new(Arc::new(FileBackend::new(dir.path().join("patterngen"))));
    assert_eq!(reopened.summary(&k).unwrap().previews, vec!["Third"]);

    let rest = reopened.extract(&k, 10).unwrap();
    assert_eq!(rest.len(), 1);
    assert!(backend.read(&k).unwrap().is_none());
    assert!(!backend.path_for(&k).exists());
}

#[test]
fn extract_from_empty_store_is_empty_not_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = OutputStore::new(Arc::new(FileBackend::new(dir.path())));
    let k = RequesterId::from_name("nobody");
    assert!(store.extract(&k, 10).unwrap().is_empty());
    assert!(store.is_empty(&k).unwrap());
}
