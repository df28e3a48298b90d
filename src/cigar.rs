use bytemuck::{Contiguous, Pod, Zeroable};

use nom::{bytes::complete::*, IResult};

#[repr(u8)]
#[derive(Contiguous, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CIGAROp {
    M = 0,
    I = 1,
    D = 2,
    N = 3,
    S = 4,
    H = 5,
    P = 6,
    E = 7,
    X = 8,
}

impl CIGAROp {
    fn from_u8_byte(value: u8) -> Option<Self> {
        Self::from_integer(value)
    }

    fn to_u8_char(self) -> u8 {
        use CIGAROp::*;
        match self {
            M => b'M',
            I => b'I',
            D => b'D',
            N => b'N',
            S => b'S',
            H => b'H',
            P => b'P',
            E => b'=',
            X => b'X',
        }
    }

    /// Operations that keep the query and reference in lockstep,
    /// i.e. the only ones a side graph conversion can accept.
    #[inline]
    pub fn is_match_or_mismatch(&self) -> bool {
        use CIGAROp::*;
        matches!(self, M | E | X)
    }
}

impl std::fmt::Display for CIGAROp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sym = char::from(self.to_u8_char());
        write!(f, "{}", sym)
    }
}

/// A memory-efficient representation of a single CIGAR op + length, as
/// a u32.
#[repr(transparent)]
#[derive(Zeroable, Pod, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(clippy::identity_op)]
pub struct CIGARPair(u32);

#[allow(clippy::len_without_is_empty)]
impl CIGARPair {
    pub fn new(len: u32, op: CIGAROp) -> Option<Self> {
        if len < (1 << 28) {
            Some(CIGARPair((len << 4) | (op as u32)))
        } else {
            None
        }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.0 >> 4
    }

    #[inline]
    pub fn op(&self) -> CIGAROp {
        let op = (self.0 & 0xF) as u8;
        // only ever constructed from a valid op
        CIGAROp::from_u8_byte(op).unwrap_or(CIGAROp::M)
    }

    pub fn into_pair(&self) -> (u32, CIGAROp) {
        (self.len(), self.op())
    }
}

impl std::fmt::Display for CIGARPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.len(), self.op())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CIGAR(pub Vec<CIGARPair>);

impl CIGAR {
    fn parse_op_cmd(input: &[u8]) -> IResult<&[u8], CIGAROp> {
        use nom::{branch::alt, combinator::map};
        use CIGAROp::*;
        alt((
            map(tag("M"), |_| M),
            map(tag("I"), |_| I),
            map(tag("D"), |_| D),
            map(tag("N"), |_| N),
            map(tag("S"), |_| S),
            map(tag("H"), |_| H),
            map(tag("P"), |_| P),
            map(tag("="), |_| E),
            map(tag("X"), |_| X),
        ))(input)
    }

    fn parse_len(input: &[u8]) -> IResult<&[u8], u32> {
        use nom::{character::complete::digit1, combinator::map_res};
        map_res(digit1, |bs: &[u8]| {
            std::str::from_utf8(bs)
                .map_err(|_| ())
                .and_then(|s| s.parse::<u32>().map_err(|_| ()))
        })(input)
    }

    pub(crate) fn parser_bytestring(i: &[u8]) -> IResult<&[u8], Self> {
        use nom::{
            combinator::{map, map_opt},
            multi::many1,
            sequence::pair,
        };
        map(
            many1(map_opt(
                pair(Self::parse_len, Self::parse_op_cmd),
                |(len, op)| CIGARPair::new(len, op),
            )),
            CIGAR,
        )(i)
    }

    /// Parse a CIGAR object that must span the entire input
    pub fn from_bytestring_exact(i: &[u8]) -> Option<Self> {
        match Self::parser_bytestring(i) {
            Ok((rest, cg)) if rest.is_empty() => Some(cg),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.iter().fold(0, |s, pair| s + pair.len() as usize)
    }

    /// is_empty corresponds to whether or not the contained vector is
    /// empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, CIGAROp)> + '_ {
        self.0.iter().map(CIGARPair::into_pair)
    }

    /// True if no operation moves the query and reference out of
    /// step with each other.
    pub fn is_gapless(&self) -> bool {
        self.iter().all(|(_, op)| op.is_match_or_mismatch())
    }
}

impl std::fmt::Display for CIGAR {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for pair in self.0.iter() {
            let (len, op) = pair.into_pair();
            write!(f, "{}{}", len, op)?
        }
        Ok(())
    }
}
