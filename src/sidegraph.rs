//! The side graph data model: sequences with their DNA, and joins
//! between sides of bases.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::dna;
use crate::error::{ConvertError, ConvertResult};
use crate::orientation::Orientation;

/// A base in a sequence. Used both for side graph sequences and, by
/// the lookup, for input nodes (where `seq_id` is a node index).
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
pub struct Position {
    pub seq_id: usize,
    pub pos: usize,
}

impl Position {
    #[inline]
    pub fn new(seq_id: usize, pos: usize) -> Self {
        Position { seq_id, pos }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.seq_id, self.pos)
    }
}

/// One side of a base. `forward` is the left side, the one a forward
/// walk enters through.
#[derive(
    Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
pub struct Side {
    pub base: Position,
    pub forward: bool,
}

impl Side {
    #[inline]
    pub fn new(base: Position, forward: bool) -> Self {
        Side { base, forward }
    }

    #[inline]
    pub fn orientation(&self) -> Orientation {
        Orientation::from_reverse_flag(!self.forward)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.orientation())
    }
}

/// A run of `length` bases of one sequence, walked in one direction.
/// `side` is the side the walk enters through: the first base
/// visited, and whether the walk runs forward from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Segment {
    pub side: Side,
    pub length: usize,
}

impl Segment {
    #[inline]
    pub fn new(side: Side, length: usize) -> Self {
        Segment { side, length }
    }

    #[inline]
    pub fn is_forward(&self) -> bool {
        self.side.forward
    }

    #[inline]
    pub fn seq_id(&self) -> usize {
        self.side.base.seq_id
    }

    #[inline]
    pub fn in_side(&self) -> Side {
        self.side
    }

    /// The side the walk leaves through, on the last base visited
    pub fn out_side(&self) -> Side {
        let base = self.side.base;
        let last = if self.side.forward {
            base.pos + self.length - 1
        } else {
            base.pos + 1 - self.length
        };
        Side::new(Position::new(base.seq_id, last), !self.side.forward)
    }

    /// Lowest position covered
    pub fn min_pos(&self) -> Position {
        if self.side.forward {
            self.side.base
        } else {
            self.out_side().base
        }
    }

    /// Highest position covered
    pub fn max_pos(&self) -> Position {
        if self.side.forward {
            self.out_side().base
        } else {
            self.side.base
        }
    }

    /// The same bases walked the other way
    pub fn flipped(&self) -> Self {
        Segment::new(self.out_side(), self.length)
    }

    /// Absorb `next` if it continues this segment in the same sequence
    /// and direction with no gap.
    pub fn try_extend(&mut self, next: &Segment) -> bool {
        if self.is_forward() != next.is_forward() {
            return false;
        }
        let contiguous = Join::new(self.out_side(), next.in_side()).is_trivial();
        if contiguous {
            self.length += next.length;
        }
        contiguous
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} x{}]", self.side, self.length)
    }
}

/// A side graph sequence and its DNA, which only ever grows while the
/// sequence is being built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sequence {
    pub id: usize,
    pub name: String,
    dna: String,
}

impl Sequence {
    pub fn new(id: usize, name: String) -> Self {
        Sequence {
            id,
            name,
            dna: String::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dna.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dna.is_empty()
    }

    pub fn dna(&self) -> &str {
        &self.dna
    }

    pub(crate) fn append(&mut self, dna: &str) {
        self.dna.push_str(dna);
    }

    /// DNA of `length` bases starting at `offset` on the forward
    /// strand, reverse complemented if `reversed`.
    pub fn dna_slice(&self, offset: usize, length: usize, reversed: bool) -> Option<String> {
        let end = offset.checked_add(length)?;
        let slice = self.dna.get(offset..end)?;
        Some(if reversed {
            dna::reverse_complement(slice)
        } else {
            slice.to_string()
        })
    }

    /// DNA covered by a segment of this sequence, in walk order
    pub fn segment_dna(&self, segment: &Segment) -> Option<String> {
        self.dna_slice(segment.min_pos().pos, segment.length, !segment.is_forward())
    }
}

/// An adjacency between two sides. The sides are stored sorted so a
/// join compares equal regardless of which end it was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Join {
    side1: Side,
    side2: Side,
}

impl Join {
    pub fn new(a: Side, b: Side) -> Self {
        let (side1, side2) = if a <= b { (a, b) } else { (b, a) };
        Join { side1, side2 }
    }

    #[inline]
    pub fn side1(&self) -> Side {
        self.side1
    }

    #[inline]
    pub fn side2(&self) -> Side {
        self.side2
    }

    /// A join is trivial if it connects the right side of a base to
    /// the left side of the next base in the same sequence, which the
    /// sequence already implies.
    pub fn is_trivial(&self) -> bool {
        let (a, b) = (self.side1, self.side2);
        if a.base.seq_id != b.base.seq_id || a.forward == b.forward {
            return false;
        }
        let (right, left) = if a.forward { (b, a) } else { (a, b) };
        right.base.pos + 1 == left.base.pos
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.side1, self.side2)
    }
}

#[derive(Default, Debug, Clone, Serialize)]
pub struct SideGraph {
    sequences: Vec<Sequence>,
    joins: BTreeSet<Join>,
}

impl SideGraph {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sequence ids are dense, so a sequence must be added with the
    /// id `num_sequences()`.
    pub fn add_sequence(&mut self, seq: Sequence) -> ConvertResult<()> {
        if seq.id != self.sequences.len() {
            return Err(ConvertError::internal(format!(
                "sequence {} added out of order, expected id {}",
                seq.id,
                self.sequences.len()
            )));
        }
        self.sequences.push(seq);
        Ok(())
    }

    pub fn sequence(&self, id: usize) -> Option<&Sequence> {
        self.sequences.get(id)
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    /// Total number of bases over all sequences
    pub fn total_length(&self) -> usize {
        self.sequences.iter().map(Sequence::len).sum()
    }

    /// Returns false if the join was already present
    pub fn add_join(&mut self, join: Join) -> bool {
        self.joins.insert(join)
    }

    pub fn join(&self, join: &Join) -> Option<&Join> {
        self.joins.get(join)
    }

    pub fn joins(&self) -> impl Iterator<Item = &Join> + '_ {
        self.joins.iter()
    }

    pub fn num_joins(&self) -> usize {
        self.joins.len()
    }
}

impl fmt::Display for SideGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "SideGraph: {} sequences ({} bases), {} joins",
            self.num_sequences(),
            self.total_length(),
            self.num_joins()
        )?;
        for seq in self.sequences.iter() {
            writeln!(f, "  seq {} {} len={}", seq.id, seq.name, seq.len())?;
        }
        for join in self.joins.iter() {
            writeln!(f, "  join {}", join)?;
        }
        Ok(())
    }
}
