use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The crate's error type.
#[derive(Debug)]
pub enum MlErr {
    /// Two widths that must agree do not (input vs weights, params vs topology, ...).
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidTopology(String),
    ParamGenExhausted {
        got: usize,
        expected: usize,
    },
    InvalidConfig(String),
    EmptyDataset,
    Io(io::Error),
    Json(serde_json::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "size mismatch for {what}: got {got}, expected {expected}"
            ),
            MlErr::InvalidTopology(msg) => write!(f, "invalid topology: {msg}"),
            MlErr::ParamGenExhausted { got, expected } => write!(
                f,
                "the parameter generator ran out of values, got {got} and expected {expected}"
            ),
            MlErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            MlErr::EmptyDataset => write!(f, "the operation requires at least one example"),
            MlErr::Io(e) => write!(f, "io error: {e}"),
            MlErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Io(e) => Some(e),
            MlErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for MlErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Checks that `got` equals `expected`, naming the mismatching quantity otherwise.
pub(crate) fn check_size(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(MlErr::SizeMismatch {
            what,
            got,
            expected,
        });
    }

    Ok(())
}
