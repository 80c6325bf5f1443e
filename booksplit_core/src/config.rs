use std::fmt::Display;
use std::fs;
use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;

use crate::error::SplitError;
use crate::format::AudioFormat;
use crate::plan::Segment;

/// Default target length of a part: twelve minutes.
pub const DEFAULT_SEGMENT_SECONDS: u64 = 12 * 60;
/// Default overlap added around every cut.
pub const DEFAULT_OVERLAP_SECONDS: u64 = 7;
/// Default re-encoding bitrate.
pub const DEFAULT_BITRATE_KBPS: u32 = 48;

/// Bounds applied to user supplied [`PlanParameters`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    pub segment_seconds: RangeInclusive<u64>,
    pub overlap_seconds: RangeInclusive<u64>,
    pub bitrate_kbps: RangeInclusive<u32>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            segment_seconds: 60..=241 * 60,
            overlap_seconds: 0..=299,
            bitrate_kbps: 16..=256,
        }
    }
}

/// Tunables for planning and encoding, already clamped to their [`Limits`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanParameters {
    segment_seconds: u64,
    overlap_seconds: u64,
    bitrate_kbps: Option<u32>,
}

impl PlanParameters {
    /// Clamp the values against the default [`Limits`].
    pub fn new(segment_seconds: u64, overlap_seconds: u64, bitrate_kbps: Option<u32>) -> Self {
        Self::with_limits(
            &Limits::default(),
            segment_seconds,
            overlap_seconds,
            bitrate_kbps,
        )
    }

    pub fn with_limits(
        limits: &Limits,
        segment_seconds: u64,
        overlap_seconds: u64,
        bitrate_kbps: Option<u32>,
    ) -> Self {
        Self {
            segment_seconds: clamp("segment length", segment_seconds, &limits.segment_seconds)
                .max(1),
            overlap_seconds: clamp("overlap", overlap_seconds, &limits.overlap_seconds),
            bitrate_kbps: bitrate_kbps
                .map(|bitrate| clamp("bitrate", bitrate, &limits.bitrate_kbps)),
        }
    }

    pub fn segment_seconds(&self) -> u64 {
        self.segment_seconds
    }

    pub fn overlap_seconds(&self) -> u64 {
        self.overlap_seconds
    }

    /// `None` means parts are stream copies of the source.
    pub fn bitrate_kbps(&self) -> Option<u32> {
        self.bitrate_kbps
    }
}

impl Default for PlanParameters {
    fn default() -> Self {
        Self::new(
            DEFAULT_SEGMENT_SECONDS,
            DEFAULT_OVERLAP_SECONDS,
            Some(DEFAULT_BITRATE_KBPS),
        )
    }
}

fn clamp<T: Copy + Ord + Display>(name: &str, value: T, range: &RangeInclusive<T>) -> T {
    let clamped = value.max(*range.start()).min(*range.end());
    if clamped != value {
        warn!(
            "{name} {value} is outside {}..={}, using {clamped}",
            range.start(),
            range.end()
        );
    }
    clamped
}

/// Configuration for one split run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Canonicalized path of the source file to split.
    pub input_path: PathBuf,
    /// Directory into which the parts are written.
    pub output_dir: PathBuf,
    /// Container of the source, reused for the parts.
    pub format: AudioFormat,
    /// File stem of the source, used to name the parts.
    pub stem: String,
    pub params: PlanParameters,
    /// Per-part encoder timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Maximum number of concurrent encoder processes. `None` starts every
    /// part at once.
    pub threads: Option<NonZeroUsize>,
    /// Explicit encoder binary; otherwise `ffmpeg` is looked up on `PATH`.
    pub encoder: Option<PathBuf>,
}

impl Config {
    /// Validate the input and build a configuration with default options.
    pub fn new<P: AsRef<Path>>(input: P, params: PlanParameters) -> Result<Self, SplitError> {
        Self::builder(input, params).build()
    }

    pub fn builder<P: AsRef<Path>>(input: P, params: PlanParameters) -> ConfigBuilder {
        ConfigBuilder {
            input: input.as_ref().to_path_buf(),
            params,
            output_dir: None,
            timeout: None,
            threads: None,
            encoder: None,
        }
    }

    /// Output path for a planned part: `{stem}-{index}-{total}.{ext}`.
    ///
    /// The index is zero-padded to the width of the total so that the parts
    /// sort in playback order.
    pub fn output_path(&self, segment: &Segment) -> PathBuf {
        let width = num_width(segment.total);
        self.output_dir.join(format!(
            "{}-{:0width$}-{}.{}",
            self.stem,
            segment.index,
            segment.total,
            self.format.extension()
        ))
    }
}

fn num_width(mut value: usize) -> usize {
    let mut width = 1;
    while value >= 10 {
        value /= 10;
        width += 1;
    }
    width
}

/// Builder for [`Config`].
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    input: PathBuf,
    params: PlanParameters,
    output_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    threads: Option<NonZeroUsize>,
    encoder: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Write the parts somewhere other than the sibling directory named after
    /// the source.
    pub fn output_dir<P: AsRef<Path>>(mut self, output_dir: P) -> Self {
        self.output_dir = Some(output_dir.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn threads(mut self, threads: NonZeroUsize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn encoder<P: AsRef<Path>>(mut self, encoder: P) -> Self {
        self.encoder = Some(encoder.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<Config, SplitError> {
        if !self.input.is_file() {
            return Err(SplitError::InputNotFound(self.input));
        }

        let format = AudioFormat::from_path(&self.input).ok_or_else(|| {
            let extension = self
                .input
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default();
            SplitError::UnsupportedFormat {
                path: self.input.clone(),
                extension,
            }
        })?;

        let input_path = fs::canonicalize(&self.input)?;
        let stem = input_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or(SplitError::InvalidInputName)?
            .to_owned();

        let output_dir = self
            .output_dir
            .unwrap_or_else(|| input_path.with_file_name(&stem));

        Ok(Config {
            input_path,
            output_dir,
            format,
            stem,
            params: self.params,
            timeout: self.timeout,
            threads: self.threads,
            encoder: self.encoder,
        })
    }
}
