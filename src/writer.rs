//! Export of a converted side graph: sequences as FASTA, the graph and
//! its paths as SQL inserts, and everything as JSON.
use std::io::{self, Write};

use serde::Serialize;

use crate::pathmapper::PathMapper;
use crate::sidegraph::{Join, Segment, Sequence, Side, SideGraph};

pub const FASTA_LINE_WIDTH: usize = 80;

/// One record per sequence, named by the sequence name
pub fn write_fasta<W: Write>(sg: &SideGraph, stream: &mut W) -> io::Result<()> {
    for seq in sg.sequences() {
        write_fasta_record(seq, stream)?;
    }
    Ok(())
}

pub fn write_fasta_record<W: Write>(seq: &Sequence, stream: &mut W) -> io::Result<()> {
    writeln!(stream, ">{}", seq.name)?;
    for line in seq.dna().as_bytes().chunks(FASTA_LINE_WIDTH) {
        stream.write_all(line)?;
        stream.write_all(b"\n")?;
    }
    Ok(())
}

pub fn fasta_string(sg: &SideGraph) -> String {
    let mut result = Vec::new();
    // writing to a Vec can't fail
    let _ = write_fasta(sg, &mut result);
    String::from_utf8_lossy(&result).into_owned()
}

fn sql_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn sql_bool(b: bool) -> &'static str {
    if b {
        "'TRUE'"
    } else {
        "'FALSE'"
    }
}

fn sql_side(side: &Side) -> String {
    format!(
        "{}, {}, {}",
        side.base.seq_id,
        side.base.pos,
        sql_bool(side.forward)
    )
}

/// SQL inserts for the sequences, joins and paths of a conversion.
/// `description` goes into the leading comment.
pub fn write_sql<W: Write>(
    mapper: &PathMapper<'_>,
    description: &str,
    stream: &mut W,
) -> io::Result<()> {
    let sg = mapper.side_graph();
    writeln!(stream, "-- {}", description)?;
    if let Some(primary) = mapper.path_name(0) {
        writeln!(stream, "-- primary path: {}", primary)?;
    }
    writeln!(stream)?;

    for seq in sg.sequences() {
        if let Some(origin) = mapper.origin_path_name(seq.id) {
            writeln!(stream, "-- sequence {} from path {}", seq.id, origin)?;
        }
        writeln!(
            stream,
            "INSERT INTO Sequence VALUES ({}, {}, {});",
            seq.id,
            sql_string(&seq.name),
            seq.len()
        )?;
    }
    writeln!(stream)?;

    for (id, join) in sg.joins().enumerate() {
        writeln!(
            stream,
            "INSERT INTO Join VALUES ({}, {}, {});",
            id,
            sql_side(&join.side1()),
            sql_side(&join.side2())
        )?;
    }
    writeln!(stream)?;

    for (id, name) in mapper.path_names().enumerate() {
        writeln!(
            stream,
            "INSERT INTO Path VALUES ({}, {});",
            id,
            sql_string(name)
        )?;
    }
    writeln!(stream)?;

    for (id, name) in mapper.path_names().enumerate() {
        writeln!(stream, "-- path items for input path {}", name)?;
        let segments = mapper
            .side_graph_path(name)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        for (rank, seg) in segments.iter().enumerate() {
            writeln!(
                stream,
                "INSERT INTO PathItem VALUES ({}, {}, {}, {}, {}, {});",
                id,
                rank,
                seg.seq_id(),
                seg.side.base.pos,
                seg.length,
                sql_bool(seg.is_forward())
            )?;
        }
        writeln!(stream)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct PathDump<'a> {
    name: &'a str,
    segments: &'a [Segment],
}

#[derive(Serialize)]
struct SideGraphDump<'a> {
    sequences: &'a [Sequence],
    joins: Vec<&'a Join>,
    paths: Vec<PathDump<'a>>,
}

/// The side graph with its DNA, joins and mapped paths as one JSON
/// object.
pub fn write_json<W: Write>(mapper: &PathMapper<'_>, stream: W) -> serde_json::Result<()> {
    let sg = mapper.side_graph();
    let paths = mapper
        .path_names()
        .filter_map(|name| {
            let segments = mapper.side_graph_path(name).ok()?;
            Some(PathDump { name, segments })
        })
        .collect();
    let dump = SideGraphDump {
        sequences: sg.sequences(),
        joins: sg.joins().collect(),
        paths,
    };
    serde_json::to_writer_pretty(stream, &dump)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vg::{Edge, Mapping, Node, VariationGraph};

    fn snp_graph() -> VariationGraph {
        let mut vg = VariationGraph::new();
        vg.add_node(Node::new(1, "ACGTA"));
        vg.add_node(Node::new(2, "C"));
        vg.add_node(Node::new(3, "G"));
        vg.add_node(Node::new(4, "TTAG"));
        vg.add_edge(Edge::new(1, 2, false, false));
        vg.add_edge(Edge::new(1, 3, false, false));
        vg.add_edge(Edge::new(2, 4, false, false));
        vg.add_edge(Edge::new(3, 4, false, false));
        let walk = |ids: &[i64]| -> Vec<Mapping> {
            ids.iter().map(|&id| Mapping::to_boundary(id, 0, false)).collect()
        };
        vg.add_path("ref", walk(&[1, 2, 4]));
        vg.add_path("alt's", walk(&[1, 3, 4]));
        vg
    }

    #[test]
    fn fasta_wraps_lines() {
        let mut sg = SideGraph::new();
        let mut seq = Sequence::new(0, "long_0".to_string());
        seq.append(&"ACGT".repeat(41));
        sg.add_sequence(seq).unwrap();
        let mut seq = Sequence::new(1, "short_3".to_string());
        seq.append("GG");
        sg.add_sequence(seq).unwrap();

        let fasta = fasta_string(&sg);
        let lines: Vec<_> = fasta.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], ">long_0");
        assert_eq!(lines[1].len(), 80);
        assert_eq!(lines[2].len(), 80);
        assert_eq!(lines[3], "ACGT");
        assert_eq!(lines[4], ">short_3");
        assert_eq!(lines[5], "GG");
    }

    #[test]
    fn sql_inserts() {
        let vg = snp_graph();
        let mut pm = PathMapper::new(&vg);
        pm.add_graph_path("ref").unwrap();
        pm.add_graph_path("alt's").unwrap();

        let mut out = Vec::new();
        write_sql(&pm, "vg2sg test.gfa", &mut out).unwrap();
        let sql = String::from_utf8(out).unwrap();

        assert!(sql.starts_with("-- vg2sg test.gfa\n-- primary path: ref\n"));
        assert!(sql.contains("INSERT INTO Sequence VALUES (0, 'ref_0', 10);"));
        assert!(sql.contains("-- sequence 1 from path alt's\n"));
        assert!(sql.contains("INSERT INTO Sequence VALUES (1, 'alt''s_5', 1);"));
        assert!(sql.contains("INSERT INTO Join VALUES (0, 0, 4, 'FALSE', 1, 0, 'TRUE');"));
        assert!(sql.contains("INSERT INTO Join VALUES (1, 0, 6, 'TRUE', 1, 0, 'FALSE');"));
        assert!(sql.contains("INSERT INTO Path VALUES (1, 'alt''s');"));
        assert!(sql.contains("INSERT INTO PathItem VALUES (0, 0, 0, 0, 10, 'TRUE');"));
        assert!(sql.contains("INSERT INTO PathItem VALUES (1, 1, 1, 0, 1, 'TRUE');"));
        assert!(sql.contains("INSERT INTO PathItem VALUES (1, 2, 0, 6, 4, 'TRUE');"));
        assert_eq!(sql.matches("INSERT INTO PathItem").count(), 4);
    }

    #[test]
    fn json_dump() {
        let vg = snp_graph();
        let mut pm = PathMapper::new(&vg);
        pm.add_graph_path("ref").unwrap();
        pm.add_graph_path("alt's").unwrap();

        let mut out = Vec::new();
        write_json(&pm, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["sequences"][0]["dna"], "ACGTACTTAG");
        assert_eq!(value["sequences"][1]["name"], "alt's_5");
        assert_eq!(value["joins"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["paths"][1]["name"], "alt's");
        assert_eq!(value["paths"][1]["segments"][1]["length"], 1);
        assert_eq!(value["paths"][1]["segments"][1]["side"]["forward"], true);
    }
}
