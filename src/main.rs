use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use vg2sg::parser::GFAParser;
use vg2sg::{writer, PathMapper, VariationGraph};

#[derive(Parser, Debug)]
#[command(name = "vg2sg")]
#[command(about = "Convert the paths of a variation graph into a side graph", long_about = None)]
struct Command {
    /// Input graph, GFA1 (.gfa) or vg JSON (anything else)
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// Output side graph sequences in FASTA format
    #[arg(value_name = "OUT_FA")]
    out_fasta: PathBuf,

    /// Output side graph SQL inserts
    #[arg(value_name = "OUT_SQL")]
    out_sql: PathBuf,

    /// Name of the path converted first
    #[arg(short = 'p', long = "primary-path", value_name = "NAME")]
    primary_path: Option<String>,

    /// Add paths spanning every edge no input path walks, so the
    /// entire graph gets converted
    #[arg(short = 's', long = "span")]
    span: bool,

    /// Also dump the side graph and its paths as JSON to this file
    #[arg(long = "json", value_name = "FILE")]
    json: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn load_graph(path: &Path) -> Result<VariationGraph> {
    let is_gfa = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("gfa"));
    let graph = if is_gfa {
        GFAParser::new().parse_file(path)?
    } else {
        let file = File::open(path)?;
        VariationGraph::from_json_reader(BufReader::new(file))?
    };
    Ok(graph)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn main() -> Result<()> {
    let args = Command::parse();

    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    info!("loading graph {}", args.graph.display());
    let vg = load_graph(&args.graph)
        .with_context(|| format!("failed to load {}", args.graph.display()))?;
    info!(
        "graph has {} nodes, {} edges and {} paths with a total of {} mappings",
        vg.num_nodes(),
        vg.num_edges(),
        vg.paths().len(),
        vg.num_mappings()
    );

    if args.primary_path.is_none() && vg.paths().is_empty() && !args.span {
        bail!("no paths in {}", args.graph.display());
    }

    let mut pm = PathMapper::new(&vg);
    pm.add_graph_paths(args.primary_path.as_deref(), args.span)?;
    if args.span {
        pm.add_spanning_paths()?;
    }
    pm.verify_paths()?;

    let mut fasta = create(&args.out_fasta)?;
    writer::write_fasta(pm.side_graph(), &mut fasta)?;
    fasta.flush()?;

    let mut sql = create(&args.out_sql)?;
    let description = format!("vg2sg {}", args.graph.display());
    writer::write_sql(&pm, &description, &mut sql)?;
    sql.flush()?;

    if let Some(json_path) = &args.json {
        let mut json = create(json_path)?;
        writer::write_json(&pm, &mut json)?;
        json.flush()?;
    }

    let sg = pm.side_graph();
    info!(
        "side graph has {} sequences ({} bases) and {} joins from {} paths",
        sg.num_sequences(),
        sg.total_length(),
        sg.num_joins(),
        pm.num_paths()
    );
    Ok(())
}
