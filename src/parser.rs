//! GFA1 loading into a `VariationGraph`.
//!
//! Only the subset of GFA1 that maps onto a variation graph is read:
//! segments with integer names become nodes, links become edges, and
//! paths become one full-node mapping per step. Overlaps have to be
//! `*` or of length zero. Headers are accepted and ignored; other line
//! types are reported as `UnknownLineType`, which the default
//! tolerance skips.

pub mod error;

pub use self::error::{
    GFAFieldResult, GFAResult, ParseError, ParseFieldError, ParserTolerance,
};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bstr::{io::BufReadExt, ByteSlice};
use lazy_static::lazy_static;
use log::{debug, info};
use nom::IResult;
use regex::bytes::Regex;

use crate::cigar::CIGAR;
use crate::orientation::Orientation;
use crate::vg::{Edge, Mapping, Node, VariationGraph};

/// One parsed GFA line, already in variation graph terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GFALine {
    Header,
    Segment(Node),
    Link(Edge),
    /// Path name and its steps. Steps are resolved into mappings once
    /// every segment has been seen.
    Path(String, Vec<(i64, Orientation)>),
}

#[derive(Debug, Clone, Default)]
pub struct GFAParser {
    tolerance: ParserTolerance,
}

impl GFAParser {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_tolerance(tolerance: ParserTolerance) -> Self {
        GFAParser { tolerance }
    }

    pub fn parse_line(&self, line: &[u8]) -> GFAResult<GFALine> {
        let line = line.trim_end_with(|c| c.is_ascii_whitespace());
        if line.is_empty() {
            return Err(ParseError::EmptyLine);
        }
        let mut fields = line.split_str(b"\t");
        let hdr = fields.next().ok_or(ParseError::EmptyLine)?;
        let parsed = match hdr {
            b"H" => return Ok(GFALine::Header),
            b"S" => parse_segment(&mut fields).map(GFALine::Segment),
            b"L" => parse_link(&mut fields).map(GFALine::Link),
            b"P" => parse_path(&mut fields).map(|(name, steps)| GFALine::Path(name, steps)),
            _ => return Err(ParseError::UnknownLineType),
        };
        parsed.map_err(|err| ParseError::invalid_line(err, line))
    }

    /// Build a graph from GFA lines. Paths are added once all lines
    /// have been read, so segments may come after the paths using
    /// them.
    pub fn parse_lines<I, L>(&self, lines: I) -> GFAResult<VariationGraph>
    where
        I: Iterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let mut graph = VariationGraph::new();
        let mut paths: Vec<(String, Vec<(i64, Orientation)>)> = Vec::new();
        let mut skipped = 0;

        for line in lines {
            match self.parse_line(line.as_ref()) {
                Ok(GFALine::Header) => (),
                Ok(GFALine::Segment(node)) => {
                    if !graph.add_node(node) {
                        debug!("skipping duplicate segment");
                    }
                }
                Ok(GFALine::Link(edge)) => {
                    graph.add_edge(edge);
                }
                Ok(GFALine::Path(name, steps)) => paths.push((name, steps)),
                Err(err) if err.can_safely_continue(&self.tolerance) => {
                    skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        for (name, steps) in paths {
            let mappings = resolve_steps(&graph, &steps);
            graph.add_path(&name, mappings);
        }

        info!(
            "loaded GFA: {} nodes, {} edges, {} paths ({} lines skipped)",
            graph.num_nodes(),
            graph.num_edges(),
            graph.paths().len(),
            skipped
        );
        Ok(graph)
    }

    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> GFAResult<VariationGraph> {
        let file = File::open(path.as_ref())?;
        self.parse_reader(BufReader::new(file))
    }

    /// Parse GFA from any buffered reader, stopping at the first IO
    /// error.
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> GFAResult<VariationGraph> {
        let mut lines = reader.byte_lines();
        let mut io_err = None;
        let stream = std::iter::from_fn(|| match lines.next()? {
            Ok(line) => Some(line),
            Err(err) => {
                io_err = Some(err);
                None
            }
        });
        let graph = self.parse_lines(stream);
        match io_err {
            Some(err) => Err(err.into()),
            None => graph,
        }
    }
}

/// Full-node mappings for each step. Steps on unknown segments are
/// kept with offset 0 so that the conversion reports them.
fn resolve_steps(graph: &VariationGraph, steps: &[(i64, Orientation)]) -> Vec<Mapping> {
    steps
        .iter()
        .map(|&(id, orient)| {
            let reversed = orient.is_reverse();
            let offset = graph
                .node(id)
                .map(|node| node.strand_start(reversed))
                .unwrap_or(0);
            Mapping::to_boundary(id, offset, reversed)
        })
        .collect()
}

fn next_field<'a, I>(input: &mut I) -> GFAFieldResult<&'a [u8]>
where
    I: Iterator<Item = &'a [u8]>,
{
    input.next().ok_or(ParseFieldError::MissingFields)
}

fn parse_name(input: &[u8]) -> GFAFieldResult<&[u8]> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"(?-u)^[!-)+-<>-~][!-~]*$").unwrap();
    }
    if RE.is_match(input) {
        Ok(input)
    } else {
        Err(ParseFieldError::InvalidField("name"))
    }
}

fn parse_node_id(input: &[u8]) -> GFAFieldResult<i64> {
    let name = parse_name(input)?;
    let name = name.to_str()?;
    name.parse().map_err(|_| ParseFieldError::IdError)
}

fn parse_sequence(input: &[u8]) -> GFAFieldResult<String> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"(?-u)^[A-Za-z=.]+$").unwrap();
    }
    if RE.is_match(input) {
        Ok(input.to_str()?.to_string())
    } else {
        Err(ParseFieldError::InvalidField("sequence"))
    }
}

/// `*`, or a CIGAR whose ops all have length zero
fn parse_overlap(input: &[u8]) -> GFAFieldResult<()> {
    if input == b"*" {
        return Ok(());
    }
    let cigar = CIGAR::from_bytestring_exact(input)
        .ok_or(ParseFieldError::InvalidField("overlap"))?;
    if cigar.len() == 0 {
        Ok(())
    } else {
        Err(ParseFieldError::NonZeroOverlap)
    }
}

fn parse_orient(input: &[u8]) -> GFAFieldResult<Orientation> {
    Orientation::parse_error(Orientation::from_bytes_plus_minus(input))
}

fn parse_segment<'a, I>(input: &mut I) -> GFAFieldResult<Node>
where
    I: Iterator<Item = &'a [u8]>,
{
    let id = parse_node_id(next_field(input)?)?;
    let sequence = parse_sequence(next_field(input)?)?;
    Ok(Node { id, sequence })
}

fn parse_link<'a, I>(input: &mut I) -> GFAFieldResult<Edge>
where
    I: Iterator<Item = &'a [u8]>,
{
    let from = parse_node_id(next_field(input)?)?;
    let from_orient = parse_orient(next_field(input)?)?;
    let to = parse_node_id(next_field(input)?)?;
    let to_orient = parse_orient(next_field(input)?)?;
    parse_overlap(next_field(input)?)?;
    Ok(Edge::new(
        from,
        to,
        from_orient.is_reverse(),
        to_orient.is_reverse(),
    ))
}

fn parse_path<'a, I>(input: &mut I) -> GFAFieldResult<(String, Vec<(i64, Orientation)>)>
where
    I: Iterator<Item = &'a [u8]>,
{
    let name = parse_name(next_field(input)?)?.to_str()?.to_string();
    let steps = match parse_steps(next_field(input)?) {
        Ok((rest, steps)) if rest.is_empty() => steps,
        _ => return Err(ParseFieldError::InvalidField("segment names")),
    };
    next_field(input)?
        .split_str(b",")
        .try_for_each(parse_overlap)?;
    Ok((name, steps))
}

fn parse_step(input: &[u8]) -> IResult<&[u8], (i64, Orientation)> {
    use nom::{
        bytes::complete::tag,
        character::complete::digit1,
        branch::alt,
        combinator::{map, map_res},
        sequence::pair,
    };
    let id = map_res(digit1, |bs: &[u8]| {
        std::str::from_utf8(bs)
            .map_err(|_| ())
            .and_then(|s| s.parse::<i64>().map_err(|_| ()))
    });
    let orient = alt((
        map(tag("+"), |_| Orientation::Forward),
        map(tag("-"), |_| Orientation::Backward),
    ));
    pair(id, orient)(input)
}

fn parse_steps(input: &[u8]) -> IResult<&[u8], Vec<(i64, Orientation)>> {
    use nom::{bytes::complete::tag, multi::separated_nonempty_list};
    separated_nonempty_list(tag(","), parse_step)(input)
}
