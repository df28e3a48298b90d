pub mod cigar;
pub mod dna;
pub mod error;
pub mod lookup;
pub mod orientation;
pub mod parser;
pub mod pathmapper;
pub mod pathspanner;
pub mod sidegraph;
pub mod vg;
pub mod writer;

pub use error::{ConvertError, ConvertResult};
pub use pathmapper::PathMapper;
pub use sidegraph::SideGraph;
pub use vg::VariationGraph;
