use std::{error, fmt};

pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors raised while converting variation graph paths into a side
/// graph. Everything except `Verification` and `Internal` is caused by
/// the input; those two mean the conversion itself is wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// An edit that isn't a plain match: mismatched from/to lengths
    /// or a descriptor other than `<from_length>M`.
    MalformedEdit {
        path: String,
        rank: usize,
        edit: usize,
        reason: String,
    },
    /// A mapping that can't be placed on the graph, or an adjacency
    /// between consecutive mappings that the graph doesn't contain.
    MalformedPath {
        path: String,
        rank: usize,
        reason: String,
    },
    DuplicatePath(String),
    UnknownPath(String),
    InvalidOperation(&'static str),
    /// The DNA spelled by a path in the side graph differs from the
    /// DNA of the path in the input graph.
    Verification {
        path: String,
        expected: String,
        found: String,
    },
    /// A broken invariant of the coordinate lookup or side graph.
    Internal(String),
}

impl ConvertError {
    pub(crate) fn malformed_path<S: Into<String>>(
        path: &str,
        rank: usize,
        reason: S,
    ) -> Self {
        Self::MalformedPath {
            path: path.to_string(),
            rank,
            reason: reason.into(),
        }
    }

    pub(crate) fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// True if the error was caused by the input graph or by the
    /// caller, rather than by a defect in the conversion.
    #[inline]
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Self::Verification { .. } | Self::Internal(_))
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ConvertError as CE;
        match self {
            CE::MalformedEdit {
                path,
                rank,
                edit,
                reason,
            } => write!(
                f,
                "Nontrivial edit found: edit {} of mapping {} of path {}: {}",
                edit, rank, path, reason
            ),
            CE::MalformedPath { path, rank, reason } => {
                write!(f, "Malformed mapping {} of path {}: {}", rank, path, reason)
            }
            CE::DuplicatePath(name) => {
                write!(f, "Path {} has already been added", name)
            }
            CE::UnknownPath(name) => write!(f, "Path {} not found", name),
            CE::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            CE::Verification {
                path,
                expected,
                found,
            } => write!(
                f,
                "Verification failed for path {}: side graph DNA (length {}) \
                 does not match input DNA (length {}). This is a bug, please \
                 report it",
                path,
                found.len(),
                expected.len()
            ),
            CE::Internal(msg) => {
                write!(f, "Internal error: {}. This is a bug, please report it", msg)
            }
        }
    }
}

impl error::Error for ConvertError {}
