use std::collections::BTreeSet;
use std::sync::Arc;

use drift_session::{
    Catalog, ContentHash, DriftConfig, Endpoint, GenerationDefaults, NavOutcome, PruneOutcome,
    Session, SessionError, SyntheticBackend,
};
use drift_store::{BlobStore, StoreLayout};
use drift_types::ContentHasher;
use proptest::prelude::*;

fn defaults() -> GenerationDefaults {
    GenerationDefaults {
        query_candidates: 3,
        diffuse_candidates: 2,
        skip_rate: 0.5,
    }
}

fn in_memory_session(seed: u64) -> Session {
    Session::new(
        Arc::new(SyntheticBackend::new(seed)),
        Arc::new(Catalog::in_memory()),
        defaults(),
    )
}

/// Grow a random tree: each step jumps to an existing stack position and
/// diffuses from it. Every step uses a distinct skip rate, so no two nodes
/// share a hash.
fn grow(session: &mut Session, steps: &[(usize, usize)]) {
    for (step, (position, candidate)) in steps.iter().enumerate() {
        let len = session.stack().len();
        session.set_stack_position(position % len).unwrap();
        let rate = (step + 1) as f32 / 100.0;
        session.diffuse(rate, candidate % 2).unwrap();
    }
}

fn stack_hashes(session: &Session) -> Vec<ContentHash> {
    session
        .stack()
        .entries()
        .iter()
        .map(|id| session.graph().get(*id).unwrap().hash())
        .collect()
}

fn graph_hashes(session: &Session) -> BTreeSet<ContentHash> {
    session
        .graph()
        .walk()
        .into_iter()
        .map(|(_, n)| n.hash())
        .collect()
}

fn steps() -> impl Strategy<Value = Vec<(usize, usize)>> {
    proptest::collection::vec((0usize..64, 0usize..2), 0..12)
}

proptest! {
    #[test]
    fn prop_blob_round_trip(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let catalog = Catalog::in_memory();
        let hash = catalog.blobs().put(&payload).unwrap();
        prop_assert_eq!(catalog.blobs().get(&hash).unwrap(), payload);
    }

    #[test]
    fn prop_hash_ignores_chunking(
        payload in proptest::collection::vec(any::<u8>(), 0..2048),
        cut in 0usize..2048,
    ) {
        let cut = cut.min(payload.len());
        let mut hasher = ContentHasher::new();
        hasher.update(&payload[..cut]).update(&payload[cut..]);
        prop_assert_eq!(hasher.finalize(), ContentHash::of(&payload));
        prop_assert_eq!(ContentHash::of(&payload), ContentHash::of(&payload));
    }

    #[test]
    fn prop_chain_of_n_derivations(ops in proptest::collection::vec(any::<bool>(), 0..10)) {
        let mut s = in_memory_session(3);
        let root = s.query("a paper crane").unwrap();
        for (i, diffuse) in ops.iter().enumerate() {
            if *diffuse {
                s.diffuse((i + 1) as f32 / 10.0, 0).unwrap();
            } else {
                s.upscale(0).unwrap();
            }
        }
        let n = ops.len();
        prop_assert_eq!(s.stack().len(), n + 1);
        prop_assert_eq!(s.graph().height(), n);
        prop_assert_eq!(s.graph().descendant_hashes(root).unwrap().len(), n);
    }

    #[test]
    fn prop_prune_removes_subtree_from_stack(steps in steps(), pick in 0usize..64) {
        let mut s = in_memory_session(5);
        s.query("a paper crane").unwrap();
        grow(&mut s, &steps);
        prop_assume!(s.stack().len() > 1);

        let position = 1 + pick % (s.stack().len() - 1);
        let target = s.set_stack_position(position).unwrap();
        let parent = s.graph().get(target).unwrap().parent().unwrap();
        let k = s.graph().descendants(target).unwrap().len();
        let stack_before = s.stack().len();
        let nodes_before = s.graph().len();
        let siblings_before = s.graph().get(parent).unwrap().children().len();

        let outcome = s.prune_current_document().unwrap();
        prop_assert_eq!(outcome, PruneOutcome::Pruned { nodes: k + 1, stack_entries: k + 1 });
        prop_assert_eq!(s.stack().len(), stack_before - (k + 1));
        prop_assert_eq!(s.graph().len(), nodes_before - (k + 1));
        prop_assert_eq!(s.graph().get(parent).unwrap().children().len(), siblings_before - 1);
        prop_assert_eq!(s.active(), Some(parent));
    }

    #[test]
    fn prop_back_then_forward_restores(steps in steps(), pick in 0usize..64) {
        let mut s = in_memory_session(11);
        s.query("a paper crane").unwrap();
        grow(&mut s, &steps);
        prop_assume!(s.stack().len() > 1);

        let position = 1 + pick % (s.stack().len() - 1);
        let start = s.set_stack_position(position).unwrap();
        prop_assert!(s.back().unwrap().moved().is_some());
        prop_assert_eq!(s.forward().unwrap(), NavOutcome::Moved(start));
        prop_assert_eq!(s.active(), Some(start));
    }

    #[test]
    fn prop_serialization_preserves_shape(steps in steps()) {
        let mut s = in_memory_session(13);
        s.query("a paper crane").unwrap();
        grow(&mut s, &steps);

        let (loaded, report) = Session::from_bytes(
            &s.to_bytes().unwrap(),
            s.backend().clone(),
            s.catalog().clone(),
            s.defaults(),
        )
        .unwrap();
        prop_assert!(report.is_complete());
        prop_assert_eq!(loaded.graph().len(), s.graph().len());
        prop_assert_eq!(graph_hashes(&loaded), graph_hashes(&s));
        prop_assert_eq!(stack_hashes(&loaded), stack_hashes(&s));
    }
}

#[test]
fn query_leaves_one_root_entry() {
    let mut s = in_memory_session(1);
    s.query("first").unwrap();
    s.diffuse(0.5, 0).unwrap();

    let root = s.query("second").unwrap();
    assert_eq!(s.stack().entries(), &[root]);
    assert_eq!(s.graph().len(), 1);
    assert_eq!(s.graph().get(root).unwrap().parent(), None);
}

#[test]
fn pruning_the_root_changes_nothing() {
    let mut s = in_memory_session(2);
    s.query("root").unwrap();
    grow(&mut s, &[(0, 0), (1, 1), (0, 1)]);
    s.goto_root().unwrap();

    let before = (graph_hashes(&s), stack_hashes(&s));
    assert!(matches!(
        s.prune_current_document().unwrap(),
        PruneOutcome::Refused(_)
    ));
    assert_eq!((graph_hashes(&s), stack_hashes(&s)), before);
}

#[test]
fn rerunning_a_prompt_keeps_both_results() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(Catalog::open_workspace(dir.path(), StoreLayout { prefix_len: 1 }).unwrap());
    let mut first = Session::new(Arc::new(SyntheticBackend::new(1)), catalog.clone(), defaults());
    let mut second = Session::new(Arc::new(SyntheticBackend::new(2)), catalog.clone(), defaults());
    first.query("a fox in snow").unwrap();
    second.query("a fox in snow").unwrap();

    let a = first.save_current().unwrap();
    let b = second.save_current().unwrap();
    assert_ne!(a, b);
    assert_eq!(first.save_current().unwrap(), a);

    let records = catalog.list_queries().unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.name == "a fox in snow"));
    assert_eq!(catalog.query_hash_at(0).unwrap(), a);
    assert_eq!(catalog.query_hash_at(1).unwrap(), b);
}

#[test]
fn duplicate_session_name_leaves_catalog_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = DriftConfig::new(dir.path(), Endpoint::Synthetic { seed: 9 });
    config.store.prefix_len = 1;

    let mut s = Session::from_config(&config).unwrap();
    s.query("harbor at night").unwrap();
    s.save_as("harbor").unwrap();
    let listed = s.catalog().list_sessions().unwrap();
    let saved = s.catalog().session_bytes("harbor").unwrap();

    s.diffuse(0.2, 1).unwrap();
    let err = s.save_as("harbor").unwrap_err();
    assert!(matches!(err, SessionError::Conflict { .. }));
    assert!(s.is_unsaved());
    assert_eq!(s.catalog().list_sessions().unwrap(), listed);
    assert_eq!(s.catalog().session_bytes("harbor").unwrap(), saved);
}

#[test]
fn workspace_session_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = DriftConfig::new(dir.path(), Endpoint::Synthetic { seed: 4 });
    config.store.prefix_len = 1;

    let expected = {
        let mut s = Session::from_config(&config).unwrap();
        s.query("salt flats").unwrap();
        grow(&mut s, &[(0, 1), (1, 0), (0, 0)]);
        s.save_current().unwrap();
        s.save_as("flats").unwrap();
        (graph_hashes(&s), stack_hashes(&s))
    };

    let fresh = Session::from_config(&config).unwrap();
    let (loaded, report) = Session::load(
        "flats",
        fresh.backend().clone(),
        fresh.catalog().clone(),
        fresh.defaults(),
    )
    .unwrap();
    assert!(report.is_complete());
    assert_eq!((graph_hashes(&loaded), stack_hashes(&loaded)), expected);
    assert_eq!(fresh.catalog().list_queries().unwrap().len(), 1);

    let hash = fresh.catalog().query_hash_at(0).unwrap();
    let mut from_doc = fresh.fork();
    from_doc.start_from_doc(&hash).unwrap();
    assert_eq!(from_doc.graph().len(), 1);
}
