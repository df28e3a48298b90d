//! Map variation graph paths onto a side graph, one path at a time.
//!
//! Each path is walked twice. The first pass copies the DNA of every
//! node that isn't in the side graph yet into new sequences and records
//! where it went in the lookup. The second pass reads the path back out
//! of the lookup as a list of side graph segments and adds a join
//! wherever consecutive segments aren't already adjacent.

use fnv::FnvHashMap;
use log::{debug, info, warn};

use crate::dna;
use crate::error::{ConvertError, ConvertResult};
use crate::lookup::SideGraphLookup;
use crate::pathspanner::PathSpanner;
use crate::sidegraph::{Join, Position, Segment, Sequence, SideGraph};
use crate::vg::{Mapping, VariationGraph};

/// Spanning paths are named with this prefix and a counter
pub const SPANNING_PATH_PREFIX: &str = "___span_";

/// A validated mapping, resolved against its node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MappingSpan {
    /// lookup index of the node
    node: usize,
    node_id: i64,
    node_len: usize,
    /// forward strand offset of the first base visited
    offset: usize,
    length: usize,
    reversed: bool,
}

impl MappingSpan {
    /// Forward strand offset of the last base visited
    #[inline]
    fn last_offset(&self) -> usize {
        if self.reversed {
            self.offset + 1 - self.length
        } else {
            self.offset + self.length - 1
        }
    }

    #[inline]
    fn starts_at_boundary(&self) -> bool {
        if self.reversed {
            self.offset + 1 == self.node_len
        } else {
            self.offset == 0
        }
    }

    #[inline]
    fn ends_at_boundary(&self) -> bool {
        if self.reversed {
            self.last_offset() == 0
        } else {
            self.last_offset() + 1 == self.node_len
        }
    }

    /// Extend the span back to the start of its node (`first`) and/or
    /// forward to the end of its node (`last`), in walk direction.
    fn clamped(&self, first: bool, last: bool) -> Self {
        let mut span = *self;
        if first && !span.starts_at_boundary() {
            let start = if span.reversed { span.node_len - 1 } else { 0 };
            span.length += if span.reversed {
                start - span.offset
            } else {
                span.offset
            };
            span.offset = start;
        }
        if last && !span.ends_at_boundary() {
            span.length = if span.reversed {
                span.offset + 1
            } else {
                span.node_len - span.offset
            };
        }
        span
    }
}

#[derive(Debug, Clone)]
struct MappedPath {
    name: String,
    mappings: Vec<Mapping>,
    segments: Vec<Segment>,
}

pub struct PathMapper<'a> {
    vg: &'a VariationGraph,
    sg: SideGraph,
    lookup: SideGraphLookup,
    /// node id -> lookup index
    node_index: FnvHashMap<i64, usize>,
    paths: Vec<MappedPath>,
    path_ids: FnvHashMap<String, usize>,
    /// id of the path that created each side graph sequence
    seq_origins: Vec<usize>,
    spanned: bool,
}

impl<'a> PathMapper<'a> {
    pub fn new(vg: &'a VariationGraph) -> Self {
        let mut mapper = PathMapper {
            vg,
            sg: SideGraph::new(),
            lookup: SideGraphLookup::new(),
            node_index: FnvHashMap::default(),
            paths: Vec::new(),
            path_ids: FnvHashMap::default(),
            seq_origins: Vec::new(),
            spanned: false,
        };
        mapper.init(vg);
        mapper
    }

    /// Start over on the given graph, dropping everything mapped so
    /// far.
    pub fn init(&mut self, vg: &'a VariationGraph) {
        self.vg = vg;
        self.sg = SideGraph::new();
        self.node_index = vg
            .nodes()
            .enumerate()
            .map(|(ix, node)| (node.id, ix))
            .collect();
        self.lookup.init(self.node_index.len());
        self.paths.clear();
        self.path_ids.clear();
        self.seq_origins.clear();
        self.spanned = false;
    }

    pub fn side_graph(&self) -> &SideGraph {
        &self.sg
    }

    pub fn num_paths(&self) -> usize {
        self.paths.len()
    }

    /// Name of a path by the order it was added in
    pub fn path_name(&self, id: usize) -> Option<&str> {
        self.paths.get(id).map(|p| p.name.as_str())
    }

    /// Names of all added paths, in the order they were added
    pub fn path_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.paths.iter().map(|p| p.name.as_str())
    }

    /// Name of the path whose conversion created a side graph sequence
    pub fn origin_path_name(&self, seq_id: usize) -> Option<&str> {
        self.seq_origins
            .get(seq_id)
            .and_then(|&path_id| self.path_name(path_id))
    }

    /// The side graph segments an added path was mapped to
    pub fn side_graph_path(&self, name: &str) -> ConvertResult<&[Segment]> {
        self.path_ids
            .get(name)
            .map(|&id| self.paths[id].segments.as_slice())
            .ok_or_else(|| ConvertError::UnknownPath(name.to_string()))
    }

    /// DNA of a side graph sequence: `length` bases (or the rest of
    /// the sequence if `None`) from `offset` on the forward strand,
    /// reverse complemented if `reversed`.
    pub fn side_graph_dna(
        &self,
        seq_id: usize,
        offset: usize,
        length: Option<usize>,
        reversed: bool,
    ) -> Option<String> {
        let seq = self.sg.sequence(seq_id)?;
        let length = length.unwrap_or_else(|| seq.len().saturating_sub(offset));
        seq.dna_slice(offset, length, reversed)
    }

    /// DNA spelled by an added path when walked through the side graph
    pub fn side_graph_path_dna(&self, name: &str) -> ConvertResult<String> {
        self.segments_dna(self.side_graph_path(name)?)
    }

    fn segments_dna(&self, segments: &[Segment]) -> ConvertResult<String> {
        let mut out = String::new();
        for segment in segments {
            let dna = self
                .sg
                .sequence(segment.seq_id())
                .and_then(|seq| seq.segment_dna(segment))
                .ok_or_else(|| {
                    ConvertError::internal(format!(
                        "segment {} lies outside the side graph",
                        segment
                    ))
                })?;
            out.push_str(&dna);
        }
        Ok(out)
    }

    /// Add one of the input graph's own paths by name
    pub fn add_graph_path(&mut self, name: &str) -> ConvertResult<()> {
        let vg = self.vg;
        let mappings = vg
            .path(name)
            .ok_or_else(|| ConvertError::UnknownPath(name.to_string()))?;
        self.add_path(name, mappings)
    }

    /// Add the primary path first (`primary`, or else the first path
    /// by name), then all other graph paths in name order. With
    /// `skip_malformed`, paths rejected because of their input are
    /// logged and left out. Returns the number of paths added.
    pub fn add_graph_paths(
        &mut self,
        primary: Option<&str>,
        skip_malformed: bool,
    ) -> ConvertResult<usize> {
        let vg = self.vg;
        let primary = match primary {
            Some(name) if vg.path(name).is_none() => {
                return Err(ConvertError::UnknownPath(name.to_string()));
            }
            Some(name) => name,
            None => match vg.paths().keys().next() {
                Some(name) => name.as_str(),
                None => return Ok(0),
            },
        };
        info!("adding primary path {}", primary);
        self.add_graph_path(primary)?;

        let mut added = 1;
        for name in vg.paths().keys().filter(|name| name.as_str() != primary) {
            match self.add_graph_path(name) {
                Ok(()) => added += 1,
                Err(err) if skip_malformed && err.is_input_error() => {
                    warn!("skipping path {}: {}", name, err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(added)
    }

    /// Map a path onto the side graph, extending it with whatever
    /// sequence the path visits that isn't there yet. The path is
    /// validated in full before anything is changed, so a rejected
    /// path leaves the mapper as it was.
    pub fn add_path(&mut self, name: &str, mappings: &[Mapping]) -> ConvertResult<()> {
        if self.path_ids.contains_key(name) {
            return Err(ConvertError::DuplicatePath(name.to_string()));
        }
        let spans = self.resolve_spans(name, mappings)?;

        let path_id = self.paths.len();
        self.path_ids.insert(name.to_string(), path_id);
        self.paths.push(MappedPath {
            name: name.to_string(),
            mappings: mappings.to_vec(),
            segments: Vec::new(),
        });

        let num_sequences = self.sg.num_sequences();
        let mut pending: Option<Sequence> = None;
        let mut path_pos = 0;
        let last = spans.len().saturating_sub(1);
        for (rank, span) in spans.iter().enumerate() {
            let clamped = span.clamped(rank == 0, rank == last);
            pending = self.add_segment(path_id, path_pos, &clamped, pending)?;
            path_pos += span.length;
        }
        if let Some(seq) = pending {
            self.commit_sequence(seq, path_id)?;
        }

        let segments = self.add_path_joins(&spans)?;
        debug!(
            "added path {}: {} mappings, {} new sequences, {} segments",
            name,
            mappings.len(),
            self.sg.num_sequences() - num_sequences,
            segments.len()
        );
        self.paths[path_id].segments = segments;
        Ok(())
    }

    /// Resolve every mapping against its node. Only the first mapping
    /// may start inside a node and only the last may end inside one.
    fn resolve_spans(&self, name: &str, mappings: &[Mapping]) -> ConvertResult<Vec<MappingSpan>> {
        let last = mappings.len().saturating_sub(1);
        mappings
            .iter()
            .enumerate()
            .map(|(rank, mapping)| {
                let node = self.vg.mapped_node(mapping, name, rank)?;
                let length = self.vg.segment_length(mapping, name, rank)?;
                let node_ix = *self.node_index.get(&node.id).ok_or_else(|| {
                    ConvertError::internal(format!("node {} missing from the index", node.id))
                })?;
                let span = MappingSpan {
                    node: node_ix,
                    node_id: node.id,
                    node_len: node.len(),
                    offset: mapping.position.offset,
                    length,
                    reversed: mapping.is_reverse(),
                };
                let fits = if span.reversed {
                    length <= span.offset + 1
                } else {
                    span.offset + length <= span.node_len
                };
                if length == 0 || !fits {
                    return Err(ConvertError::malformed_path(
                        name,
                        rank,
                        format!(
                            "{} bases from offset {} don't fit on node {} of length {}",
                            length, span.offset, span.node_id, span.node_len
                        ),
                    ));
                }
                if rank != 0 && !span.starts_at_boundary() {
                    return Err(ConvertError::malformed_path(
                        name,
                        rank,
                        format!(
                            "offset {} on node {} is not at the node boundary; \
                             offsets are only permitted on the first mapping",
                            span.offset, span.node_id
                        ),
                    ));
                }
                if rank != last && !span.ends_at_boundary() {
                    return Err(ConvertError::malformed_path(
                        name,
                        rank,
                        format!(
                            "mapping ends before the boundary of node {}; \
                             partial nodes are only permitted on the last mapping",
                            span.node_id
                        ),
                    ));
                }
                Ok(span)
            })
            .collect()
    }

    /// First pass for one mapping. Unmapped bases are appended to the
    /// pending sequence (started if there is none); mapped bases end
    /// it. Returns the sequence still pending afterwards.
    fn add_segment(
        &mut self,
        path_id: usize,
        path_pos: usize,
        span: &MappingSpan,
        pending: Option<Sequence>,
    ) -> ConvertResult<Option<Sequence>> {
        let from = Position::new(span.node, span.offset);

        if self.lookup.map_position(from).is_some() {
            if let Some(seq) = pending {
                self.commit_sequence(seq, path_id)?;
            }
            return Ok(None);
        }

        let mut seq = match pending {
            Some(seq) => seq,
            None => Sequence::new(
                self.sg.num_sequences(),
                self.make_seq_name(path_id, path_pos),
            ),
        };
        let node = self.vg.node(span.node_id).ok_or_else(|| {
            ConvertError::internal(format!("node {} vanished", span.node_id))
        })?;
        let dna = dna::oriented_slice(&node.sequence, span.offset, span.length, span.reversed)
            .ok_or_else(|| {
                ConvertError::internal(format!(
                    "span of {} bases at {} runs off node {}",
                    span.length, span.offset, span.node_id
                ))
            })?;

        let to = Position::new(seq.id, seq.len());
        self.lookup.add_interval(from, to, span.length, span.reversed)?;
        seq.append(&dna);
        Ok(Some(seq))
    }

    fn commit_sequence(&mut self, seq: Sequence, path_id: usize) -> ConvertResult<()> {
        self.sg.add_sequence(seq)?;
        self.seq_origins.push(path_id);
        Ok(())
    }

    /// Second pass: look up every mapping's exact range, merge the
    /// results into one segment list and add the joins between
    /// consecutive segments.
    fn add_path_joins(&mut self, spans: &[MappingSpan]) -> ConvertResult<Vec<Segment>> {
        let mut sg_path: Vec<Segment> = Vec::new();
        let mut segments: Vec<Segment> = Vec::new();
        for span in spans {
            segments.clear();
            let start = Position::new(span.node, span.offset);
            let end = Position::new(span.node, span.last_offset());
            self.lookup.get_path(start, end, &mut segments)?;
            // single bases come back walked forward
            if span.reversed && span.length == 1 {
                if let Some(seg) = segments.first_mut() {
                    *seg = seg.flipped();
                }
            }
            merge_paths(&mut sg_path, &segments);
        }

        for pair in sg_path.windows(2) {
            let join = Join::new(pair[0].out_side(), pair[1].in_side());
            if !join.is_trivial() {
                self.sg.add_join(join);
            }
        }
        Ok(sg_path)
    }

    fn make_seq_name(&self, path_id: usize, path_pos: usize) -> String {
        format!("{}_{}", self.paths[path_id].name, path_pos)
    }

    /// Add paths along every graph edge that no added path walks, so
    /// the whole graph ends up in the side graph. Returns the number
    /// of paths added. Can only be called once.
    pub fn add_spanning_paths(&mut self) -> ConvertResult<usize> {
        if self.spanned {
            return Err(ConvertError::InvalidOperation(
                "spanning paths have already been added",
            ));
        }
        self.spanned = true;
        if self.vg.num_nodes() == 0 {
            return Ok(0);
        }

        let vg = self.vg;
        let mut spanner = PathSpanner::new(
            vg,
            self.paths
                .iter()
                .map(|p| (p.name.as_str(), p.mappings.as_slice())),
        )?;

        let mut count = 0;
        while spanner.has_next_path() {
            let mappings = spanner.next_path()?;
            let name = format!("{}{}", SPANNING_PATH_PREFIX, count);
            self.add_path(&name, &mappings)?;
            count += 1;
        }
        info!("added {} spanning paths", count);
        Ok(count)
    }

    /// Check that every added path spells the same DNA in the side
    /// graph as it does in the input graph.
    pub fn verify_paths(&self) -> ConvertResult<()> {
        for path in self.paths.iter() {
            let expected = self.vg.mappings_dna(&path.name, &path.mappings)?;
            let found = self.segments_dna(&path.segments)?;
            if expected != found {
                return Err(ConvertError::Verification {
                    path: path.name.clone(),
                    expected,
                    found,
                });
            }
        }
        info!("verified DNA of {} paths", self.paths.len());
        Ok(())
    }
}

/// Append `path` onto `prev_path`, merging the last segment of
/// `prev_path` with the first of `path` when they are contiguous.
fn merge_paths(prev_path: &mut Vec<Segment>, path: &[Segment]) {
    let mut rest = path;
    if let (Some(last), Some(first)) = (prev_path.last_mut(), path.first()) {
        if last.try_extend(first) {
            rest = &path[1..];
        }
    }
    prev_path.extend_from_slice(rest);
}
