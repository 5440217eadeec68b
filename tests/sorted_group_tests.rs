mod common;

use common::Scored;
use geneforge::chromosome::{Maximize, Minimize};
use geneforge::population::{ChromosomeSlot, FitnessOrder, GroupFlags, GroupKind, SortedGroup};
use proptest::prelude::*;
use rstest::rstest;
use std::sync::Arc;

fn slots(fitness: &[f32]) -> Vec<ChromosomeSlot<Scored>> {
    fitness
        .iter()
        .enumerate()
        .map(|(i, &f)| ChromosomeSlot::new(Arc::new(Scored { fitness: f, tag: i }), f, i))
        .collect()
}

fn maximize() -> FitnessOrder {
    FitnessOrder::new(Arc::new(Maximize), false)
}

fn fill(kind: GroupKind, size: usize, s: &mut [ChromosomeSlot<Scored>]) -> SortedGroup {
    let mut g = SortedGroup::new(kind, size, maximize());
    for i in 0..s.len() {
        g.add(i, s);
    }
    g
}

#[rstest]
#[case(GroupKind::Best, vec![1, 3, 0])]
#[case(GroupKind::Worst, vec![2, 4, 0])]
fn test_equal_fitness_keeps_earlier_member_ahead(
    #[case] kind: GroupKind,
    #[case] expected: Vec<usize>,
) {
    let mut s = slots(&[2.0, 5.0, 0.0, 5.0, 0.0]);
    let g = fill(kind, 3, &mut s);
    assert_eq!(g.indices(), expected.as_slice());
}

#[test]
fn test_full_group_requires_strictly_better() {
    let mut s = slots(&[3.0, 2.0, 2.0, 2.5]);
    let mut g = SortedGroup::new(GroupKind::Best, 2, maximize());
    g.add(0, &mut s);
    g.add(1, &mut s);
    // Ties with the last member do not displace it.
    assert_eq!(g.add(2, &mut s), None);
    assert!(!s[2].flags().contains(GroupFlags::BEST));

    assert_eq!(g.add(3, &mut s), Some(1));
    assert_eq!(g.indices(), &[0, 3]);
    assert!(!s[1].flags().contains(GroupFlags::BEST));
    assert!(s[3].flags().contains(GroupFlags::BEST));
}

#[test]
fn test_remove_rejects_non_members() {
    let mut s = slots(&[1.0, 2.0, 3.0]);
    let mut g = fill(GroupKind::Best, 2, &mut s);
    assert!(!g.remove(0, &mut s));
    assert!(g.remove(2, &mut s));
    assert_eq!(g.indices(), &[1]);
    assert!(s[2].flags().is_empty());
}

#[test]
fn test_ranking_rejects_outside_members() {
    let mut s = slots(&[1.0, 4.0, 3.0, 2.0]);
    let best = fill(GroupKind::Best, 2, &mut s);
    let worst = fill(GroupKind::Worst, 2, &mut s);
    assert_eq!(best.ranking(1, &s), Some(0));
    assert_eq!(best.ranking(2, &s), Some(1));
    assert_eq!(best.ranking(3, &s), None);
    assert_eq!(worst.ranking(0, &s), Some(0));
    assert_eq!(worst.ranking(9, &s), None);
}

#[test]
fn test_copy_to_with_other_ordering_reinserts() {
    let mut s = slots(&[1.0, 4.0, 3.0, 2.0]);
    let best = fill(GroupKind::Best, 3, &mut s);
    assert_eq!(best.indices(), &[1, 2, 3]);

    let mut inverted = SortedGroup::new(
        GroupKind::Other,
        3,
        FitnessOrder::new(Arc::new(Minimize), false),
    );
    best.copy_to(&mut inverted, &mut s, false);
    assert_eq!(inverted.indices(), &[3, 2, 1]);

    let mut raw = SortedGroup::new(GroupKind::Other, 2, maximize());
    best.copy_to(&mut raw, &mut s, true);
    assert_eq!(raw.indices(), &[1, 2]);
}

#[test]
fn test_other_group_allows_repeats_without_flags() {
    let s = slots(&[1.0, 2.0]);
    let mut g = SortedGroup::new(GroupKind::Other, 4, maximize());
    g.add_unflagged(0, &s);
    g.add_unflagged(1, &s);
    g.add_unflagged(1, &s);
    assert_eq!(g.indices(), &[1, 1, 0]);
    assert!(s.iter().all(|slot| slot.flags().is_empty()));
}

proptest! {
    #[test]
    fn prop_second_add_changes_nothing(
        fitness in proptest::collection::vec(-100.0f32..100.0, 1..20),
        size in 1usize..8,
        pick in any::<prop::sample::Index>(),
    ) {
        let mut s = slots(&fitness);
        let mut g = fill(GroupKind::Best, size, &mut s);
        let index = pick.index(s.len());
        g.add(index, &mut s);
        let before = g.indices().to_vec();
        prop_assert_eq!(g.add(index, &mut s), None);
        prop_assert_eq!(g.indices(), before.as_slice());

        let mut sorted = fitness.clone();
        sorted.sort_by(|a, b| b.total_cmp(a));
        let members: Vec<f32> = g.indices().iter().map(|&i| fitness[i]).collect();
        prop_assert_eq!(members, sorted[..size.min(fitness.len())].to_vec());
    }
}
