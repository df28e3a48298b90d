//! Generate paths that cover every edge of a variation graph that the
//! existing paths don't already walk.

use std::collections::{BTreeSet, VecDeque};

use fnv::FnvHashSet;
use log::debug;

use crate::error::{ConvertError, ConvertResult};
use crate::vg::{Edge, Mapping, VariationGraph};

pub struct PathSpanner<'a> {
    vg: &'a VariationGraph,
    uncovered: BTreeSet<Edge>,
}

impl<'a> PathSpanner<'a> {
    /// Every pair of consecutive mappings in `paths` must be joined by
    /// an edge of the graph; those edges count as covered, and all
    /// others are left for `next_path` to pick up.
    pub fn new<'p, I>(vg: &'a VariationGraph, paths: I) -> ConvertResult<Self>
    where
        I: IntoIterator<Item = (&'p str, &'p [Mapping])>,
    {
        let mut covered: FnvHashSet<Edge> = FnvHashSet::default();
        for (name, mappings) in paths {
            for (rank, pair) in mappings.windows(2).enumerate() {
                let (prev, cur) = (&pair[0].position, &pair[1].position);
                let edge = vg
                    .edge(prev.node_id, cur.node_id, prev.is_reverse, cur.is_reverse)
                    .ok_or_else(|| {
                        ConvertError::malformed_path(
                            name,
                            rank + 1,
                            format!(
                                "can't find edge ({},{}) from_start={} to_end={} \
                                 implied by consecutive mappings",
                                prev.node_id, cur.node_id, prev.is_reverse, cur.is_reverse
                            ),
                        )
                    })?;
                covered.insert(*edge);
            }
        }

        let uncovered: BTreeSet<Edge> =
            vg.edges().filter(|e| !covered.contains(*e)).copied().collect();
        debug!(
            "{} edges covered by paths, {} left to span",
            covered.len(),
            uncovered.len()
        );

        Ok(PathSpanner { vg, uncovered })
    }

    pub fn has_next_path(&self) -> bool {
        !self.uncovered.is_empty()
    }

    pub fn num_uncovered(&self) -> usize {
        self.uncovered.len()
    }

    /// Take the smallest uncovered edge and greedily grow a walk of
    /// uncovered edges from both of its ends, then return the walk as
    /// one full-node mapping per node visited.
    pub fn next_path(&mut self) -> ConvertResult<Vec<Mapping>> {
        let first = self
            .uncovered
            .iter()
            .next()
            .copied()
            .ok_or(ConvertError::InvalidOperation("no uncovered edges left to span"))?;
        self.uncovered.remove(&first);

        let vg = self.vg;
        let mut chain: VecDeque<Edge> = VecDeque::new();
        chain.push_back(first);

        // extend right: leave the end node on the strand we entered it
        while let Some(&end) = chain.back() {
            let next = self.take_uncovered(vg.out_edges(end.to), |e| {
                e.from_start == end.to_end
            });
            match next {
                Some(edge) => chain.push_back(edge),
                None => break,
            }
        }

        // extend left: enter the front node on the strand we leave it
        while let Some(&front) = chain.front() {
            let prev = self.take_uncovered(vg.in_edges(front.from), |e| {
                e.to_end == front.from_start
            });
            match prev {
                Some(edge) => chain.push_front(edge),
                None => break,
            }
        }

        debug!("spanning chain of {} edges starting at {:?}", chain.len(), first);
        self.chain_mappings(&chain)
    }

    /// Remove and return the smallest uncovered candidate passing
    /// `matches`.
    fn take_uncovered<F>(&mut self, candidates: &[Edge], matches: F) -> Option<Edge>
    where
        F: Fn(&Edge) -> bool,
    {
        let edge = candidates
            .iter()
            .filter(|e| matches(*e) && self.uncovered.contains(*e))
            .min()
            .copied()?;
        self.uncovered.remove(&edge);
        Some(edge)
    }

    fn chain_mappings(&self, chain: &VecDeque<Edge>) -> ConvertResult<Vec<Mapping>> {
        let steps = chain
            .front()
            .map(|e| (e.from, e.from_start))
            .into_iter()
            .chain(chain.iter().map(|e| (e.to, e.to_end)));

        steps
            .enumerate()
            .map(|(rank, (node_id, reversed))| -> ConvertResult<Mapping> {
                let node = self.vg.node(node_id).ok_or_else(|| {
                    ConvertError::malformed_path(
                        "<spanning path>",
                        rank,
                        format!("edge references unknown node {}", node_id),
                    )
                })?;
                Ok(Mapping::to_boundary(node_id, node.strand_start(reversed), reversed))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vg::Node;

    fn mapping(node_id: i64, reversed: bool, vg: &VariationGraph) -> Mapping {
        let node = vg.node(node_id).unwrap();
        Mapping::to_boundary(node_id, node.strand_start(reversed), reversed)
    }

    fn no_paths() -> Vec<(&'static str, &'static [Mapping])> {
        Vec::new()
    }

    fn steps(mappings: &[Mapping]) -> Vec<(i64, bool)> {
        mappings
            .iter()
            .map(|m| (m.node_id(), m.is_reverse()))
            .collect()
    }

    /// 1 -> 2 -> 4 and 1 -> 3 -> 4
    fn bubble() -> VariationGraph {
        let mut vg = VariationGraph::new();
        vg.add_node(Node::new(1, "ACGT"));
        vg.add_node(Node::new(2, "A"));
        vg.add_node(Node::new(3, "G"));
        vg.add_node(Node::new(4, "TTCA"));
        vg.add_edge(Edge::new(1, 2, false, false));
        vg.add_edge(Edge::new(1, 3, false, false));
        vg.add_edge(Edge::new(2, 4, false, false));
        vg.add_edge(Edge::new(3, 4, false, false));
        vg
    }

    #[test]
    fn covered_edges_are_skipped() {
        let vg = bubble();
        let path = vec![mapping(1, false, &vg), mapping(2, false, &vg), mapping(4, false, &vg)];
        let mut spanner = PathSpanner::new(&vg, vec![("ref", path.as_slice())]).unwrap();
        assert_eq!(spanner.num_uncovered(), 2);
        assert!(spanner.has_next_path());

        let next = spanner.next_path().unwrap();
        assert_eq!(steps(&next), vec![(1, false), (3, false), (4, false)]);
        assert!(!spanner.has_next_path());
        assert!(matches!(
            spanner.next_path(),
            Err(ConvertError::InvalidOperation(_))
        ));
    }

    #[test]
    fn chains_extend_left_as_well_as_right() {
        let vg = bubble();
        let mut spanner = PathSpanner::new(&vg, no_paths()).unwrap();
        assert_eq!(spanner.num_uncovered(), 4);
        // smallest edge is 1->2, which grows right to 4
        let first = spanner.next_path().unwrap();
        assert_eq!(steps(&first), vec![(1, false), (2, false), (4, false)]);
        let second = spanner.next_path().unwrap();
        assert_eq!(steps(&second), vec![(1, false), (3, false), (4, false)]);
        assert!(!spanner.has_next_path());

        let mut vg = bubble();
        vg.add_node(Node::new(0, "CC"));
        vg.add_edge(Edge::new(5, 6, false, false));
        vg.add_edge(Edge::new(0, 1, false, false));
        let path = vec![mapping(1, false, &vg), mapping(2, false, &vg)];
        let mut spanner = PathSpanner::new(&vg, vec![("p", path.as_slice())]).unwrap();
        // 0->1 is the smallest uncovered edge; right extension from 1
        // takes 1->3, then 3->4
        let first = spanner.next_path().unwrap();
        assert_eq!(steps(&first), vec![(0, false), (1, false), (3, false), (4, false)]);
        // 2->4 has nothing uncovered to its left or right
        let second = spanner.next_path().unwrap();
        assert_eq!(steps(&second), vec![(2, false), (4, false)]);
        // 5->6 references nodes that don't exist
        assert!(matches!(
            spanner.next_path(),
            Err(ConvertError::MalformedPath { .. })
        ));
    }

    #[test]
    fn left_extension_uses_incoming_edges() {
        let mut vg = VariationGraph::new();
        vg.add_node(Node::new(1, "AC"));
        vg.add_node(Node::new(2, "GT"));
        vg.add_node(Node::new(3, "TTG"));
        // 1+ -> 2+ -> 3-
        vg.add_edge(Edge::new(1, 2, false, false));
        vg.add_edge(Edge::new(2, 3, false, true));
        let mut spanner = PathSpanner::new(&vg, no_paths()).unwrap();
        let mappings = spanner.next_path().unwrap();
        assert_eq!(steps(&mappings), vec![(1, false), (2, false), (3, true)]);
        // reversed nodes start at their last base
        assert_eq!(mappings[2].position.offset, 2);

        let mut vg2 = vg.clone();
        vg2.add_node(Node::new(4, "A"));
        // 4- -> 1+
        vg2.add_edge(Edge::new(4, 1, true, false));
        let mut spanner = PathSpanner::new(&vg2, no_paths()).unwrap();
        // smallest is 1->2: right grows to 3, left takes 4->1
        let mappings = spanner.next_path().unwrap();
        assert_eq!(
            steps(&mappings),
            vec![(4, true), (1, false), (2, false), (3, true)]
        );
    }

    #[test]
    fn strand_mismatch_stops_extension() {
        let mut vg = VariationGraph::new();
        vg.add_node(Node::new(1, "AC"));
        vg.add_node(Node::new(2, "GT"));
        vg.add_node(Node::new(3, "T"));
        vg.add_edge(Edge::new(1, 2, false, false));
        // leaves 2 from its start, so it can't follow 1+ -> 2+
        vg.add_edge(Edge::new(2, 3, true, false));
        let mut spanner = PathSpanner::new(&vg, no_paths()).unwrap();
        let first = spanner.next_path().unwrap();
        assert_eq!(steps(&first), vec![(1, false), (2, false)]);
        let second = spanner.next_path().unwrap();
        assert_eq!(steps(&second), vec![(2, true), (3, false)]);
    }

    #[test]
    fn missing_implied_edge_is_malformed() {
        let vg = bubble();
        let path = vec![mapping(2, false, &vg), mapping(3, false, &vg)];
        match PathSpanner::new(&vg, vec![("bad", path.as_slice())]) {
            Err(ConvertError::MalformedPath { path, rank, .. }) => {
                assert_eq!(path, "bad");
                assert_eq!(rank, 1);
            }
            _ => panic!("expected a malformed path"),
        }
    }

    #[test]
    fn reversed_walks_cover_edges_written_forward() {
        let vg = bubble();
        // 4- 2- 1- walks 2->4 and 1->2 backwards
        let path = vec![mapping(4, true, &vg), mapping(2, true, &vg), mapping(1, true, &vg)];
        let spanner = PathSpanner::new(&vg, vec![("rev", path.as_slice())]).unwrap();
        assert_eq!(spanner.num_uncovered(), 2);
    }
}
