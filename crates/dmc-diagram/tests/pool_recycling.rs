use std::collections::BTreeMap;

use dmc_core::{DmcError, RngHandle};
use dmc_diagram::{Pool, VertexId};
use proptest::prelude::*;

#[test]
fn freed_slots_are_reused() {
    let mut pool: Pool<VertexId, &str> = Pool::new();
    let a = pool.insert("a");
    let b = pool.insert("b");
    let c = pool.insert("c");
    assert_eq!(pool.remove(b).unwrap(), "b");
    assert!(!pool.contains(b));
    let d = pool.insert("d");
    assert_eq!(d, b);
    assert_eq!(*pool.get(a).unwrap(), "a");
    assert_eq!(*pool.get(c).unwrap(), "c");
    assert_eq!(*pool.get(d).unwrap(), "d");
    assert_eq!(pool.len(), 3);
}

#[test]
fn dead_ids_are_reported() {
    let mut pool: Pool<VertexId, u8> = Pool::new();
    let a = pool.insert(1);
    pool.remove(a).unwrap();
    match pool.get(a) {
        Err(DmcError::Diagram(info)) => assert_eq!(info.code, "unknown-vertex"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(pool.remove(a).is_err());
    assert!(pool.get_mut(VertexId::from_raw(17)).is_err());
}

#[test]
fn random_pick_covers_alive_records_only() {
    let mut pool: Pool<VertexId, usize> = Pool::new();
    let ids: Vec<_> = (0..6).map(|i| pool.insert(i)).collect();
    pool.remove(ids[1]).unwrap();
    pool.remove(ids[4]).unwrap();
    let mut rng = RngHandle::from_seed(3);
    let mut hits = BTreeMap::new();
    for _ in 0..400 {
        let id = pool.random_pick(&mut rng).unwrap();
        *hits.entry(id).or_insert(0usize) += 1;
    }
    assert_eq!(hits.len(), 4);
    assert!(!hits.contains_key(&ids[1]));
    assert!(!hits.contains_key(&ids[4]));

    let empty: Pool<VertexId, usize> = Pool::new();
    assert_eq!(empty.random_pick(&mut rng), None);
}

proptest! {
    #[test]
    fn random_insert_remove_keeps_ids_stable(ops in proptest::collection::vec((any::<bool>(), 0usize..16), 1..200)) {
        let mut pool: Pool<VertexId, u64> = Pool::new();
        let mut model: BTreeMap<VertexId, u64> = BTreeMap::new();
        let mut counter = 0u64;
        for (insert, pick) in ops {
            if insert || model.is_empty() {
                counter += 1;
                let id = pool.insert(counter);
                prop_assert!(!model.contains_key(&id));
                model.insert(id, counter);
            } else {
                let id = *model.keys().nth(pick % model.len()).unwrap();
                prop_assert_eq!(pool.remove(id).unwrap(), model.remove(&id).unwrap());
            }
            prop_assert_eq!(pool.len(), model.len());
            for (id, value) in &model {
                prop_assert_eq!(pool.get(*id).unwrap(), value);
            }
            let mut alive: Vec<_> = pool.ids().collect();
            alive.sort();
            prop_assert_eq!(alive, model.keys().copied().collect::<Vec<_>>());
        }
    }
}
