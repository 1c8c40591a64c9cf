//! Ordering the attractive set for assignment.
//!
//! Assignment splits a node's volume across its attractive links, so all
//! flow into a node must be known before any link out of it is processed.
//! Links are emitted node by node in topological order of the attractive
//! sub-graph; among ready nodes the one farthest from the destination goes
//! first, and each node's links are emitted farthest first.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use tracing::warn;

use super::search::AttractiveLink;

/// Return `links` in assignment order.
///
/// For the expected-cost model with positive travel costs this is a
/// descending-distance order. If the attractive sub-graph has a cycle, the
/// farthest unprocessed node is released early and a warning is logged.
pub(crate) fn assignment_order(links: &[AttractiveLink], node_count: usize) -> Vec<AttractiveLink> {
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); node_count];
    let mut indegree = vec![0usize; node_count];
    let mut farthest = vec![f64::NEG_INFINITY; node_count];

    for (idx, link) in links.iter().enumerate() {
        outgoing[link.from.0].push(idx);
        indegree[link.to.0] += 1;
        farthest[link.from.0] = farthest[link.from.0].max(link.distance);
    }
    for out in &mut outgoing {
        out.sort_by(|&a, &b| links[b].distance.total_cmp(&links[a].distance));
    }

    let mut ready: BinaryHeap<(OrderedFloat<f64>, Reverse<usize>)> = (0..node_count)
        .filter(|&n| indegree[n] == 0 && !outgoing[n].is_empty())
        .map(|n| (OrderedFloat(farthest[n]), Reverse(n)))
        .collect();

    let mut done = vec![false; node_count];
    let mut order = Vec::with_capacity(links.len());

    loop {
        let node = match ready.pop() {
            Some((_, Reverse(node))) => node,
            None => {
                let remaining = (0..node_count)
                    .filter(|&n| !done[n] && !outgoing[n].is_empty())
                    .max_by(|&a, &b| farthest[a].total_cmp(&farthest[b]).then(b.cmp(&a)));
                match remaining {
                    Some(node) => {
                        warn!(
                            node,
                            waiting = indegree[node],
                            "attractive links form a cycle; releasing node early"
                        );
                        node
                    }
                    None => break,
                }
            }
        };

        if done[node] {
            continue;
        }
        done[node] = true;

        for &idx in &outgoing[node] {
            let link = links[idx];
            order.push(link);

            let to = link.to.0;
            indegree[to] = indegree[to].saturating_sub(1);
            if indegree[to] == 0 && !done[to] && !outgoing[to].is_empty() {
                ready.push((OrderedFloat(farthest[to]), Reverse(to)));
            }
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LinkId, NodeId};

    fn link(id: usize, from: usize, to: usize, distance: f64) -> AttractiveLink {
        AttractiveLink {
            link: LinkId(id),
            from: NodeId(from),
            to: NodeId(to),
            frequency: 0.1,
            distance,
        }
    }

    fn ids(order: &[AttractiveLink]) -> Vec<usize> {
        order.iter().map(|l| l.link.0).collect()
    }

    #[test]
    fn chain_is_emitted_farthest_first() {
        // 0 -> 1 -> 2 -> 3 (destination), given in insertion order
        let links = vec![link(0, 2, 3, 10.0), link(1, 1, 2, 25.0), link(2, 0, 1, 40.0)];
        assert_eq!(ids(&assignment_order(&links, 4)), vec![2, 1, 0]);
    }

    #[test]
    fn node_links_follow_all_inflow() {
        // Two routes from 0 to 3, one through 1 and one through 2, plus a
        // shortcut 1 -> 2
        let links = vec![
            link(0, 1, 3, 10.0),
            link(1, 2, 3, 12.0),
            link(2, 1, 2, 14.0),
            link(3, 0, 1, 30.0),
            link(4, 0, 2, 29.0),
        ];
        let order = ids(&assignment_order(&links, 4));

        let pos = |id: usize| order.iter().position(|&x| x == id).unwrap();
        assert_eq!(order.len(), 5);
        assert_eq!(pos(3), 0);
        assert_eq!(pos(4), 1);
        // Node 2 receives from 0 and 1, so both precede its out-link
        assert!(pos(2) < pos(1));
        assert!(pos(4) < pos(1));
    }

    #[test]
    fn cycle_still_emits_every_link() {
        let links = vec![link(0, 0, 1, 5.0), link(1, 1, 0, 5.0), link(2, 1, 2, 3.0)];
        let order = assignment_order(&links, 3);
        let mut got = ids(&order);
        got.sort();
        assert_eq!(got, vec![0, 1, 2]);
    }

    #[test]
    fn empty_set() {
        assert!(assignment_order(&[], 3).is_empty());
    }
}
