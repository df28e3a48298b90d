//! The input variation graph: nodes carrying DNA, strand-aware edges,
//! and named paths made of mappings. Graphs are either built directly,
//! loaded from vg JSON, or parsed from GFA by the `parser` module.
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

use crate::cigar::CIGAR;
use crate::dna;
use crate::error::{ConvertError, ConvertResult};

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    #[serde(default)]
    pub sequence: String,
}

impl Node {
    pub fn new(id: i64, sequence: &str) -> Self {
        Node {
            id,
            sequence: sequence.to_string(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Offset of the first base visited when walking the node on the
    /// given strand.
    #[inline]
    pub fn strand_start(&self, reversed: bool) -> usize {
        if reversed {
            self.len().saturating_sub(1)
        } else {
            0
        }
    }
}

/// A directed adjacency. `from_start` means the edge leaves `from`
/// from its start, i.e. `from` is walked in reverse; `to_end` means
/// it enters `to` at its end, i.e. `to` is walked in reverse.
///
/// The field order gives the ordering (from, to, from_start, to_end).
#[derive(
    Default,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
pub struct Edge {
    pub from: i64,
    pub to: i64,
    #[serde(default)]
    pub from_start: bool,
    #[serde(default)]
    pub to_end: bool,
}

impl Edge {
    pub fn new(from: i64, to: i64, from_start: bool, to_end: bool) -> Self {
        Edge {
            from,
            to,
            from_start,
            to_end,
        }
    }

    /// The same adjacency written from the other end.
    #[inline]
    pub fn flipped(&self) -> Self {
        Edge {
            from: self.to,
            to: self.from,
            from_start: !self.to_end,
            to_end: !self.from_start,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub node_id: i64,
    /// Forward strand offset of the first base visited, also for
    /// reverse mappings. vg JSON counts reverse offsets from the start
    /// of the reverse strand; `from_json_reader` converts them.
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub is_reverse: bool,
}

impl Position {
    pub fn new(node_id: i64, offset: usize, is_reverse: bool) -> Self {
        Position {
            node_id,
            offset,
            is_reverse,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    #[serde(default)]
    pub from_length: usize,
    #[serde(default)]
    pub to_length: usize,
    /// CIGAR-like descriptor; only empty or `<from_length>M` is
    /// accepted.
    #[serde(default)]
    pub sequence: String,
}

impl Edit {
    /// A plain match of `len` bases
    pub fn matching(len: usize) -> Self {
        Edit {
            from_length: len,
            to_length: len,
            sequence: format!("{}M", len),
        }
    }

    /// Returns the reason this edit isn't a plain match, if it isn't.
    pub fn check_trivial(&self) -> Result<(), String> {
        if self.from_length != self.to_length {
            return Err(format!(
                "to_length {} != from_length {}",
                self.to_length, self.from_length
            ));
        }
        let expected = format!("{}M", self.from_length);
        if self.sequence.is_empty() || self.sequence == expected {
            return Ok(());
        }
        match CIGAR::from_bytestring_exact(self.sequence.as_bytes()) {
            Some(cigar) if !cigar.is_gapless() => Err(format!(
                "sequence={} contains an insertion or deletion",
                self.sequence
            )),
            _ => Err(format!("sequence={} != expected={}", self.sequence, expected)),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub position: Position,
    #[serde(default, rename = "edit")]
    pub edits: Vec<Edit>,
}

impl Mapping {
    pub fn new(position: Position, edits: Vec<Edit>) -> Self {
        Mapping { position, edits }
    }

    /// A mapping with no edits, covering the node from `offset` to
    /// its boundary in the walk direction.
    pub fn to_boundary(node_id: i64, offset: usize, is_reverse: bool) -> Self {
        Mapping {
            position: Position::new(node_id, offset, is_reverse),
            edits: Vec::new(),
        }
    }

    #[inline]
    pub fn node_id(&self) -> i64 {
        self.position.node_id
    }

    #[inline]
    pub fn is_reverse(&self) -> bool {
        self.position.is_reverse
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub name: String,
    #[serde(default, rename = "mapping")]
    pub mappings: Vec<Mapping>,
}

/// One graph chunk of vg's JSON output.
#[derive(Default, Debug, Deserialize)]
struct GraphChunk {
    #[serde(default)]
    node: Vec<Node>,
    #[serde(default)]
    edge: Vec<Edge>,
    #[serde(default)]
    path: Vec<Path>,
}

/// Nodes are kept in an arena indexed through `node_index`; edges in
/// an ordered set plus per-node adjacency lists.
#[derive(Default, Debug, Clone)]
pub struct VariationGraph {
    nodes: Vec<Node>,
    node_index: FnvHashMap<i64, usize>,
    edges: BTreeSet<Edge>,
    out_edges: FnvHashMap<i64, Vec<Edge>>,
    in_edges: FnvHashMap<i64, Vec<Edge>>,
    paths: BTreeMap<String, Vec<Mapping>>,
}

impl VariationGraph {
    pub fn new() -> Self {
        Default::default()
    }

    /// Read one or more concatenated vg JSON graph objects. Chunks
    /// are merged the same way `add_node`, `add_edge` and `add_path`
    /// merge.
    pub fn from_json_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        let mut graph = VariationGraph::new();
        let stream =
            serde_json::Deserializer::from_reader(reader).into_iter::<GraphChunk>();
        for chunk in stream {
            let chunk = chunk?;
            chunk.node.into_iter().for_each(|n| {
                graph.add_node(n);
            });
            chunk.edge.into_iter().for_each(|e| {
                graph.add_edge(e);
            });
            for path in chunk.path {
                graph.add_path(&path.name, path.mappings);
            }
        }
        graph.reverse_offsets_to_forward();
        Ok(graph)
    }

    /// Rewrite reverse mapping offsets counted on the reverse strand as
    /// forward strand offsets. Offsets off their node are left for
    /// the mapper to report.
    fn reverse_offsets_to_forward(&mut self) {
        let nodes = &self.nodes;
        let node_index = &self.node_index;
        for mapping in self.paths.values_mut().flatten() {
            if !mapping.is_reverse() {
                continue;
            }
            let len = match node_index.get(&mapping.node_id()) {
                Some(&ix) => nodes[ix].len(),
                None => continue,
            };
            if let Some(offset) = len.checked_sub(mapping.position.offset + 1) {
                mapping.position.offset = offset;
            }
        }
    }

    /// Insert a node; returns false (keeping the existing node) if
    /// the id is already present.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Insert an edge; returns false if it, or the same adjacency
    /// written from the other end, is already present.
    pub fn add_edge(&mut self, edge: Edge) -> bool {
        if self.edges.contains(&edge) || self.edges.contains(&edge.flipped()) {
            return false;
        }
        self.edges.insert(edge);
        self.out_edges.entry(edge.from).or_default().push(edge);
        self.in_edges.entry(edge.to).or_default().push(edge);
        true
    }

    /// Append mappings to the named path, creating it if needed.
    pub fn add_path(&mut self, name: &str, mappings: Vec<Mapping>) {
        self.paths
            .entry(name.to_string())
            .or_default()
            .extend(mappings);
    }

    pub fn node(&self, id: i64) -> Option<&Node> {
        self.node_index.get(&id).map(|&ix| &self.nodes[ix])
    }

    /// Nodes in the order they were added
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Look up an edge by its flags, accepting either way of writing
    /// the adjacency. Returns the edge as stored.
    pub fn edge(
        &self,
        from: i64,
        to: i64,
        from_start: bool,
        to_end: bool,
    ) -> Option<&Edge> {
        let edge = Edge::new(from, to, from_start, to_end);
        self.edges
            .get(&edge)
            .or_else(|| self.edges.get(&edge.flipped()))
    }

    /// All edges in (from, to, from_start, to_end) order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Edges stored with `from == id`
    pub fn out_edges(&self, id: i64) -> &[Edge] {
        self.out_edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Edges stored with `to == id`
    pub fn in_edges(&self, id: i64) -> &[Edge] {
        self.in_edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn paths(&self) -> &BTreeMap<String, Vec<Mapping>> {
        &self.paths
    }

    pub fn path(&self, name: &str) -> Option<&[Mapping]> {
        self.paths.get(name).map(Vec::as_slice)
    }

    pub fn num_mappings(&self) -> usize {
        self.paths.values().map(Vec::len).sum()
    }

    /// Number of bases a mapping covers: the sum of its edit lengths,
    /// or with no edits the distance from its offset to the node
    /// boundary in its direction. Every edit has to be a plain match.
    pub fn segment_length(
        &self,
        mapping: &Mapping,
        path: &str,
        rank: usize,
    ) -> ConvertResult<usize> {
        if mapping.edits.is_empty() {
            let node = self.mapped_node(mapping, path, rank)?;
            let offset = mapping.position.offset;
            return Ok(if mapping.is_reverse() {
                offset + 1
            } else {
                node.len() - offset
            });
        }
        mapping
            .edits
            .iter()
            .enumerate()
            .try_fold(0, |total, (ix, edit)| {
                edit.check_trivial()
                    .map(|_| total + edit.from_length)
                    .map_err(|reason| ConvertError::MalformedEdit {
                        path: path.to_string(),
                        rank,
                        edit: ix,
                        reason,
                    })
            })
    }

    /// The node a mapping is on, checking that its offset lies within
    /// the node.
    pub(crate) fn mapped_node(
        &self,
        mapping: &Mapping,
        path: &str,
        rank: usize,
    ) -> ConvertResult<&Node> {
        let id = mapping.node_id();
        let node = self.node(id).ok_or_else(|| {
            ConvertError::malformed_path(path, rank, format!("unknown node {}", id))
        })?;
        if mapping.position.offset >= node.len() {
            return Err(ConvertError::malformed_path(
                path,
                rank,
                format!(
                    "offset {} out of range for node {} of length {}",
                    mapping.position.offset,
                    id,
                    node.len()
                ),
            ));
        }
        Ok(node)
    }

    /// DNA spelled by a list of mappings, read straight from the
    /// nodes.
    pub fn mappings_dna(&self, path: &str, mappings: &[Mapping]) -> ConvertResult<String> {
        let mut out = String::new();
        for (rank, mapping) in mappings.iter().enumerate() {
            let node = self.mapped_node(mapping, path, rank)?;
            let length = self.segment_length(mapping, path, rank)?;
            let pos = &mapping.position;
            let dna = dna::oriented_slice(&node.sequence, pos.offset, length, pos.is_reverse)
                .ok_or_else(|| {
                    ConvertError::malformed_path(
                        path,
                        rank,
                        format!("{} bases run off the end of node {}", length, node.id),
                    )
                })?;
            out.push_str(&dna);
        }
        Ok(out)
    }

    /// DNA spelled by one of the graph's own paths
    pub fn path_dna(&self, name: &str) -> ConvertResult<String> {
        let mappings = self
            .path(name)
            .ok_or_else(|| ConvertError::UnknownPath(name.to_string()))?;
        self.mappings_dna(name, mappings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_graph() -> VariationGraph {
        let mut vg = VariationGraph::new();
        vg.add_node(Node::new(1, "ACGT"));
        vg.add_node(Node::new(2, "GGA"));
        vg.add_edge(Edge::new(1, 2, false, false));
        vg
    }

    #[test]
    fn duplicate_nodes_keep_first() {
        let mut vg = small_graph();
        assert!(!vg.add_node(Node::new(1, "TTTT")));
        assert_eq!(vg.node(1).unwrap().sequence, "ACGT");
        assert_eq!(vg.num_nodes(), 2);
    }

    #[test]
    fn edge_lookup_accepts_both_spellings() {
        let mut vg = small_graph();
        assert!(vg.edge(1, 2, false, false).is_some());
        // 2 reversed into 1 reversed is the same adjacency
        let found = vg.edge(2, 1, true, true).copied();
        assert_eq!(found, Some(Edge::new(1, 2, false, false)));
        assert!(vg.edge(2, 1, false, false).is_none());
        assert!(!vg.add_edge(Edge::new(2, 1, true, true)));
        assert_eq!(vg.num_edges(), 1);
        assert_eq!(vg.out_edges(1).len(), 1);
        assert_eq!(vg.in_edges(2).len(), 1);
        assert!(vg.out_edges(2).is_empty());
    }

    #[test]
    fn segment_lengths() {
        let vg = small_graph();
        let fwd = Mapping::to_boundary(1, 1, false);
        assert_eq!(vg.segment_length(&fwd, "p", 0), Ok(3));
        let rev = Mapping::to_boundary(1, 1, true);
        assert_eq!(vg.segment_length(&rev, "p", 0), Ok(2));
        let edits = Mapping::new(
            Position::new(1, 0, false),
            vec![Edit::matching(2), Edit::matching(1)],
        );
        assert_eq!(vg.segment_length(&edits, "p", 0), Ok(3));
    }

    #[test]
    fn nontrivial_edits_are_rejected() {
        let vg = small_graph();
        let mut bad = Edit::matching(2);
        bad.to_length = 3;
        let mapping = Mapping::new(Position::new(1, 0, false), vec![Edit::matching(1), bad]);
        match vg.segment_length(&mapping, "p", 4) {
            Err(ConvertError::MalformedEdit { path, rank, edit, .. }) => {
                assert_eq!((path.as_str(), rank, edit), ("p", 4, 1));
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut bad = Edit::matching(2);
        bad.sequence = "1M1X".to_string();
        let mapping = Mapping::new(Position::new(1, 0, false), vec![bad]);
        assert!(vg.segment_length(&mapping, "p", 0).is_err());

        let mut padded = Edit::matching(12);
        padded.sequence = "012M".to_string();
        assert_eq!(
            padded.check_trivial(),
            Err("sequence=012M != expected=12M".to_string())
        );

        let mut indel = Edit::matching(2);
        indel.sequence = "1M1D".to_string();
        assert!(indel
            .check_trivial()
            .unwrap_err()
            .contains("insertion or deletion"));

        let mut empty = Edit::matching(2);
        empty.sequence.clear();
        let mapping = Mapping::new(Position::new(1, 0, false), vec![empty]);
        assert_eq!(vg.segment_length(&mapping, "p", 0), Ok(2));
    }

    #[test]
    fn path_dna_follows_strands() {
        let mut vg = small_graph();
        vg.add_path(
            "p",
            vec![
                Mapping::to_boundary(1, 0, false),
                Mapping::to_boundary(2, 2, true),
            ],
        );
        assert_eq!(vg.path_dna("p").unwrap(), "ACGTTCC");
        assert!(matches!(vg.path_dna("q"), Err(ConvertError::UnknownPath(_))));
    }

    #[test]
    fn load_vg_json() {
        let json = r#"
        {"node": [{"id": 1, "sequence": "ACGT"}, {"id": 2, "sequence": "GGA"}],
         "edge": [{"from": 1, "to": 2}],
         "path": [{"name": "x", "mapping": [
            {"position": {"node_id": 1}, "edit": [{"from_length": 4, "to_length": 4}], "rank": 1},
            {"position": {"node_id": 2}, "rank": 2}]}]}
        {"node": [{"id": 3, "sequence": "T"}],
         "edge": [{"from": 2, "to": 3, "to_end": true}],
         "path": [{"name": "x", "mapping": [{"position": {"node_id": 3, "is_reverse": true}}]}]}
        "#;
        let vg = VariationGraph::from_json_reader(json.as_bytes()).unwrap();
        assert_eq!(vg.num_nodes(), 3);
        assert_eq!(vg.num_edges(), 2);
        assert_eq!(vg.path("x").map(|p| p.len()), Some(3));
        assert!(vg.edge(2, 3, false, true).is_some());
        assert_eq!(vg.path_dna("x").unwrap(), "ACGTGGAA");
    }

    #[test]
    fn load_vg_json_reverse_offsets() {
        let json = r#"
        {"path": [{"name": "x", "mapping": [
            {"position": {"node_id": 2, "is_reverse": true},
             "edit": [{"from_length": 4, "to_length": 4, "sequence": "4M"}]},
            {"position": {"node_id": 1, "is_reverse": true}, "edit": [{"from_length": 2, "to_length": 2}]}]},
          {"name": "y", "mapping": [
            {"position": {"node_id": 2, "offset": 1, "is_reverse": true},
             "edit": [{"from_length": 2, "to_length": 2}]}]}]}
        {"node": [{"id": 1, "sequence": "ACGT"}, {"id": 2, "sequence": "TTCA"}]}
        "#;
        let vg = VariationGraph::from_json_reader(json.as_bytes()).unwrap();
        let x = vg.path("x").unwrap();
        assert_eq!(x[0].position, Position::new(2, 3, true));
        assert_eq!(x[1].position, Position::new(1, 3, true));
        assert_eq!(vg.path_dna("x").unwrap(), "TGAAAC");
        assert_eq!(vg.path("y").unwrap()[0].position.offset, 2);
        assert_eq!(vg.path_dna("y").unwrap(), "GA");
    }
}
