use std::path::PathBuf;
use std::time::Duration;

use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

/// Fatal errors that stop a split before any part is extracted.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The input path does not point at an existing file.
    #[error("input file does not exist: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The input extension is not one of the supported containers.
    #[error("unsupported audio format '{extension}' for {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// A file stem cannot be derived from the input path.
    #[error("failed to derive a base name for the input file")]
    InvalidInputName,

    /// Both the header read and the packet scan failed to yield a duration.
    #[error("unable to determine the duration of {}: {header}; fallback scan: {scan}", .path.display())]
    ProbeFailure {
        path: PathBuf,
        header: ProbeError,
        scan: ProbeError,
    },

    /// No usable encoder binary was found.
    #[error("encoder not found: {0}")]
    EncoderMissing(String),

    /// Wrapper around IO errors encountered while preparing the output directory.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by a single duration probing strategy.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Wrapper around errors produced by the Symphonia demuxers.
    #[error(transparent)]
    Symphonia(#[from] SymphoniaError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error returned when the container does not expose any default track.
    #[error("input stream does not provide a default track")]
    MissingDefaultTrack,

    /// The strategy ran but could not establish a length.
    #[error("stream length is unknown")]
    UnknownLength,
}

/// Per-part failures. These are recorded in the batch report and never stop
/// sibling extractions.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The encoder process could not be started.
    #[error("failed to launch encoder: {0}")]
    Launch(#[source] std::io::Error),

    /// The encoder exited unsuccessfully.
    #[error("encoder exited with {}: {stderr}", describe_code(.code))]
    Failed { code: Option<i32>, stderr: String },

    /// The encoder did not finish within the configured timeout and was killed.
    #[error("encoder timed out after {}s", .after.as_secs())]
    TimedOut { after: Duration },

    /// IO error while preparing the output file or waiting on the process.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => String::from("a signal"),
    }
}
