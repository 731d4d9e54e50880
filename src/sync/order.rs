//! Referenced-first ordering for push.

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Active,
    Done,
}

/// Indices of `keys` ordered so each entry follows the entries it depends on.
///
/// Dependencies naming unknown keys are ignored. Cycles are broken at the
/// first back edge. Independent entries keep their input order.
pub(crate) fn dependency_order<K: Eq + Hash>(
    keys: &[K],
    deps_of: impl Fn(usize) -> Vec<K>,
) -> Vec<usize> {
    let index: HashMap<&K, usize> = keys.iter().enumerate().map(|(i, k)| (k, i)).collect();
    let neighbours = |i: usize| -> Vec<usize> {
        deps_of(i)
            .iter()
            .filter_map(|k| index.get(k).copied())
            .collect()
    };

    let mut marks = vec![Mark::New; keys.len()];
    let mut order = Vec::with_capacity(keys.len());

    for root in 0..keys.len() {
        if marks[root] != Mark::New {
            continue;
        }
        marks[root] = Mark::Active;
        let mut stack = vec![(root, neighbours(root), 0usize)];

        loop {
            let Some(top) = stack.last_mut() else {
                break;
            };
            if let Some(&next) = top.1.get(top.2) {
                top.2 += 1;
                if marks[next] == Mark::New {
                    marks[next] = Mark::Active;
                    stack.push((next, neighbours(next), 0));
                }
            } else {
                let node = top.0;
                stack.pop();
                marks[node] = Mark::Done;
                order.push(node);
            }
        }
    }

    order
}
