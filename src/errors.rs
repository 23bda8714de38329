//
// Errors
//
use std::io;
use std::result;
use std::error;
use std::num;
use std::fmt;
use ndarray as nd;

/// Type alias for Iredell errors
pub type Result<X> = result::Result<X, Error>;

/// Wrapper for the kinds of errors occurring in the counting pipeline
#[derive(Debug)]
pub enum Error {
    /// Conflicting or out-of-range options, caught before any I/O happens
    Config(String),
    /// An input line that does not match the format the stage expects
    MalformedRecord(String),
    InvalidDimensions(String),
    ShapeError(nd::ShapeError),
    IOError(io::Error),
    ParseFloatError(num::ParseFloatError),
    MissingFile(&'static str, Option<io::Error>),
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Config(ref info) => write!(f, "Bad configuration: {}", info),
            Error::MalformedRecord(ref info) => write!(f, "Malformed record: {}", info),
            Error::InvalidDimensions(ref info) => write!(f, "Dimension mismatch: {}", info),
            Error::ShapeError(ref err) => write!(f, "NDArray shape error: {:?}", err),
            Error::IOError(ref err) => write!(f, "IO error: {}", err),
            Error::ParseFloatError(ref err) => write!(f, "Error parsing float: {}", err),
            Error::MissingFile(ref info, ref opt_err) => {
                write!(f,
                    "The {} must already exist at this point but there was a problem opening it. \
                    Wrong directory? Maybe missed a step? The OS error was: ",
                    info)?;
                if let Some(ref err) = *opt_err { err.fmt(f) }
                else { write!(f, "Unknown") }
            },
            Error::Other(ref info) => write!(f, "{}", info),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::ShapeError(ref err) => Some(err),
            Error::IOError(ref err) => Some(err),
            Error::ParseFloatError(ref err) => Some(err),
            Error::MissingFile(_, Some(ref err)) => Some(err),
            _ => None,
        }
    }
}
//
// Convert everything else into Error
//
impl From<nd::ShapeError> for Error {
    fn from(err: nd::ShapeError) -> Self {
        Error::ShapeError(err)
    }
}
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IOError(err)
    }
}
impl From<num::ParseFloatError> for Error {
    fn from(err: num::ParseFloatError) -> Self {
        Error::ParseFloatError(err)
    }
}
