//! Coordinate lookup between input nodes and side graph sequences.
//!
//! Every input node gets an ordered map of non-overlapping intervals,
//! keyed by their lowest offset. Each interval maps its bases one to
//! one onto a forward run of a side graph sequence, either in the same
//! direction or reversed.

use std::collections::BTreeMap;

use crate::error::{ConvertError, ConvertResult};
use crate::sidegraph::{Position, Segment, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MappedInterval {
    /// lowest input offset
    start: usize,
    length: usize,
    /// output position of the first base walked, i.e. of `start` if
    /// forward and of `start + length - 1` if reversed
    to: Position,
    reversed: bool,
}

impl MappedInterval {
    #[inline]
    fn end(&self) -> usize {
        self.start + self.length
    }

    #[inline]
    fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos < self.end()
    }

    /// Output position of an input offset inside the interval
    #[inline]
    fn map(&self, pos: usize) -> Position {
        let delta = if self.reversed {
            self.end() - 1 - pos
        } else {
            pos - self.start
        };
        Position::new(self.to.seq_id, self.to.pos + delta)
    }
}

#[derive(Default, Debug, Clone)]
pub struct SideGraphLookup {
    intervals: Vec<BTreeMap<usize, MappedInterval>>,
}

impl SideGraphLookup {
    pub fn new() -> Self {
        Default::default()
    }

    /// Clear all intervals. Input sequence ids (node indices) must lie
    /// in `0..num_inputs` afterwards.
    pub fn init(&mut self, num_inputs: usize) {
        self.intervals.clear();
        self.intervals.resize_with(num_inputs, BTreeMap::new);
    }

    pub fn num_intervals(&self) -> usize {
        self.intervals.iter().map(BTreeMap::len).sum()
    }

    fn find(&self, pos: Position) -> Option<&MappedInterval> {
        let (_, iv) = self.intervals.get(pos.seq_id)?.range(..=pos.pos).next_back()?;
        if iv.contains(pos.pos) {
            Some(iv)
        } else {
            None
        }
    }

    /// The side graph side an input base maps to. The side is
    /// forward if the input's forward strand runs forward along the
    /// side graph sequence.
    pub fn map_position(&self, pos: Position) -> Option<Side> {
        self.find(pos)
            .map(|iv| Side::new(iv.map(pos.pos), !iv.reversed))
    }

    /// Map `length` input bases starting at `from`, walking up the
    /// node (or down it if `reversed`), onto `length` side graph bases
    /// starting at `to` and walking forward. None of the input bases
    /// may be mapped already.
    pub fn add_interval(
        &mut self,
        from: Position,
        to: Position,
        length: usize,
        reversed: bool,
    ) -> ConvertResult<()> {
        if length == 0 {
            return Err(ConvertError::internal("empty lookup interval"));
        }
        let start = if reversed {
            (from.pos + 1).checked_sub(length).ok_or_else(|| {
                ConvertError::internal(format!(
                    "reversed interval of length {} runs below {}",
                    length, from
                ))
            })?
        } else {
            from.pos
        };
        let interval = MappedInterval {
            start,
            length,
            to,
            reversed,
        };
        let map = self.intervals.get_mut(from.seq_id).ok_or_else(|| {
            ConvertError::internal(format!("unknown input sequence {}", from.seq_id))
        })?;
        // only the last interval starting before our end can overlap us
        if let Some((_, prev)) = map.range(..interval.end()).next_back() {
            if prev.end() > start {
                return Err(ConvertError::internal(format!(
                    "interval {}+{} overlaps mapped interval {}:{}+{}",
                    from, length, from.seq_id, prev.start, prev.length
                )));
            }
        }
        map.insert(start, interval);
        Ok(())
    }

    /// Decompose the input range from `start` to `end` (inclusive,
    /// walking down if `start` is past `end`) into the side graph
    /// segments covering it, in walk order, and append them to `out`.
    /// Contiguous pieces are coalesced. A single base is always
    /// walked forward; callers walking it in reverse flip the result.
    pub fn get_path(
        &self,
        start: Position,
        end: Position,
        out: &mut Vec<Segment>,
    ) -> ConvertResult<()> {
        if start.seq_id != end.seq_id {
            return Err(ConvertError::internal(format!(
                "range {} to {} spans input sequences",
                start, end
            )));
        }
        let forward = start.pos <= end.pos;
        let first_new = out.len();
        let mut cur = start.pos;
        loop {
            let here = Position::new(start.seq_id, cur);
            let iv = self.find(here).ok_or_else(|| {
                ConvertError::internal(format!("input position {} is not mapped", here))
            })?;
            let (last, length) = if forward {
                let last = end.pos.min(iv.end() - 1);
                (last, last - cur + 1)
            } else {
                let last = end.pos.max(iv.start);
                (last, cur - last + 1)
            };
            let segment = Segment::new(Side::new(iv.map(cur), forward != iv.reversed), length);
            let merged = out.len() > first_new
                && out.last_mut().map_or(false, |prev| prev.try_extend(&segment));
            if !merged {
                out.push(segment);
            }
            if last == end.pos {
                break;
            }
            cur = if forward { last + 1 } else { last - 1 };
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(seq_id: usize, pos: usize) -> Position {
        Position::new(seq_id, pos)
    }

    fn seg(seq_id: usize, p: usize, forward: bool, length: usize) -> Segment {
        Segment::new(Side::new(pos(seq_id, p), forward), length)
    }

    #[test]
    fn map_forward_and_reversed_intervals() {
        let mut lookup = SideGraphLookup::new();
        lookup.init(2);
        lookup.add_interval(pos(0, 0), pos(0, 10), 5, false).unwrap();
        // node 1 offsets 4..0 onto output 15..20
        lookup.add_interval(pos(1, 4), pos(0, 15), 5, true).unwrap();

        assert_eq!(
            lookup.map_position(pos(0, 3)),
            Some(Side::new(pos(0, 13), true))
        );
        assert_eq!(lookup.map_position(pos(0, 5)), None);
        assert_eq!(
            lookup.map_position(pos(1, 4)),
            Some(Side::new(pos(0, 15), false))
        );
        assert_eq!(
            lookup.map_position(pos(1, 0)),
            Some(Side::new(pos(0, 19), false))
        );
        assert_eq!(lookup.map_position(pos(2, 0)), None);
        assert_eq!(lookup.num_intervals(), 2);
    }

    #[test]
    fn overlapping_intervals_are_rejected() {
        let mut lookup = SideGraphLookup::new();
        lookup.init(1);
        lookup.add_interval(pos(0, 5), pos(0, 0), 5, false).unwrap();
        assert!(lookup.add_interval(pos(0, 9), pos(1, 0), 1, false).is_err());
        assert!(lookup.add_interval(pos(0, 5), pos(1, 0), 3, true).is_err());
        assert!(lookup.add_interval(pos(0, 0), pos(1, 0), 6, false).is_err());
        assert!(lookup.add_interval(pos(0, 4), pos(1, 0), 5, true).is_ok());
        assert!(lookup.add_interval(pos(0, 10), pos(1, 5), 2, false).is_ok());
        assert!(lookup.add_interval(pos(0, 1), pos(1, 0), 3, true).is_err());
        assert!(lookup.add_interval(pos(3, 0), pos(1, 0), 1, false).is_err());
        assert_eq!(lookup.num_intervals(), 3);
    }

    #[test]
    fn get_path_coalesces_contiguous_pieces() {
        let mut lookup = SideGraphLookup::new();
        lookup.init(1);
        // offsets 0..3 -> 0..3, 3..6 -> 3..6 : one run
        lookup.add_interval(pos(0, 0), pos(0, 0), 3, false).unwrap();
        lookup.add_interval(pos(0, 3), pos(0, 3), 3, false).unwrap();
        // offsets 6..8 -> seq 1, reversed
        lookup.add_interval(pos(0, 7), pos(1, 0), 2, true).unwrap();

        let mut out = Vec::new();
        lookup.get_path(pos(0, 1), pos(0, 7), &mut out).unwrap();
        assert_eq!(out, vec![seg(0, 1, true, 5), seg(1, 1, false, 2)]);

        let mut out = Vec::new();
        lookup.get_path(pos(0, 7), pos(0, 0), &mut out).unwrap();
        assert_eq!(out, vec![seg(1, 0, true, 2), seg(0, 5, false, 6)]);
    }

    #[test]
    fn get_path_leaves_existing_segments_alone() {
        let mut lookup = SideGraphLookup::new();
        lookup.init(1);
        lookup.add_interval(pos(0, 0), pos(0, 3), 2, false).unwrap();
        let mut out = vec![seg(0, 0, true, 3)];
        lookup.get_path(pos(0, 0), pos(0, 1), &mut out).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn single_base_is_walked_forward() {
        let mut lookup = SideGraphLookup::new();
        lookup.init(1);
        lookup.add_interval(pos(0, 2), pos(0, 0), 3, true).unwrap();
        let mut out = Vec::new();
        lookup.get_path(pos(0, 1), pos(0, 1), &mut out).unwrap();
        assert_eq!(out, vec![seg(0, 1, false, 1)]);
    }

    #[test]
    fn unmapped_ranges_are_errors() {
        let mut lookup = SideGraphLookup::new();
        lookup.init(1);
        lookup.add_interval(pos(0, 0), pos(0, 0), 2, false).unwrap();
        let mut out = Vec::new();
        assert!(lookup.get_path(pos(0, 0), pos(0, 3), &mut out).is_err());
    }
}
