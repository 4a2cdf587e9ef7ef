use std::fmt::{Debug, Display};

use miette::miette;

/// Pipeline error taxonomy.
///
/// The first variants are fatal and user-visible: they abort the run,
/// trigger scratch cleanup and are surfaced to the caller with a
/// human-readable cause. Per-clip download/normalization failures never
/// appear here: they are logged and the clip is excluded from the run.
#[derive(Debug)]
pub enum Error {
    /// The search returned no usable candidate for the query.
    NoResults { query: String },

    /// No clip survived download and normalization.
    EmptyClipSet,

    /// The search API answered with a non-2xx status.
    Api { status: u16, message: String },

    /// Joining the playback sequence into one file failed.
    Concatenation(miette::Report),

    /// Cutting the concatenated file to the target duration failed.
    Trim(miette::Report),

    /// Rejected before the pipeline starts.
    InvalidConfig(String),

    /// The run was cooperatively cancelled.
    Cancelled,

    Miette(miette::Report),
}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Miette(miette::Report::msg(err))
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::NoResults { query } => miette!("No clips found for query '{query}'"),
            Error::EmptyClipSet => miette!("No clip survived download and normalization"),
            Error::Api { status, message } => {
                miette!("Search API request failed with status {status}: {message}")
            }
            Error::Concatenation(report) => report.wrap_err("Could not concatenate clips"),
            Error::Trim(report) => report.wrap_err("Could not trim the concatenated video"),
            Error::InvalidConfig(msg) => miette!("Invalid configuration: {msg}"),
            Error::Cancelled => miette!("Run cancelled"),
            Error::Miette(report) => report,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NoResults { query } => write!(f, "no clips found for query '{query}'"),
            Error::EmptyClipSet => write!(f, "no clip survived download and normalization"),
            Error::Api { status, message } => {
                write!(f, "search API status {status}: {message}")
            }
            Error::Concatenation(report) => write!(f, "concatenation failed: {report}"),
            Error::Trim(report) => write!(f, "trim failed: {report}"),
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Error::Cancelled => write!(f, "run cancelled"),
            Error::Miette(report) => write!(f, "{report}"),
        }
    }
}

impl Error {
    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            err => err,
        }
    }
}

/// Build an ad-hoc error result from a message.
pub fn bail<T, D>(msg: D) -> Result<T>
where
    D: Display + Debug + Send + Sync + 'static,
{
    Err(Error::Miette(miette::Report::msg(msg)))
}

pub type Result<T> = std::result::Result<T, Error>;
