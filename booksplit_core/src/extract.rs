use std::env;
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::{ExtractionError, SplitError};
use crate::format::AudioFormat;
use crate::plan::{format_timestamp, Segment};

const ENCODER_NAME: &str = "ffmpeg";
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL_BYTES: usize = 2_048;

/// One part to cut from the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionJob {
    pub segment: Segment,
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: AudioFormat,
    /// Re-encode at this bitrate; `None` copies the stream.
    pub bitrate_kbps: Option<u32>,
}

/// Cuts `[start, end)` of a job's source into its output file.
///
/// Implementations are shared between worker threads.
pub trait Extractor: Sync {
    fn extract(&self, job: &ExtractionJob) -> Result<(), ExtractionError>;
}

/// Extractor that shells out to `ffmpeg`, one process per job.
#[derive(Clone, Debug)]
pub struct FfmpegExtractor {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegExtractor {
    /// Use the given binary, or search `PATH` for `ffmpeg`.
    pub fn locate(explicit: Option<&Path>, timeout: Option<Duration>) -> Result<Self, SplitError> {
        let binary = match explicit {
            Some(path) if is_executable(path) => path.to_path_buf(),
            Some(path) => {
                return Err(SplitError::EncoderMissing(format!(
                    "{} is not an executable file",
                    path.display()
                )))
            }
            None => find_on_path(ENCODER_NAME).ok_or_else(|| {
                SplitError::EncoderMissing(format!("'{ENCODER_NAME}' was not found on PATH"))
            })?,
        };
        debug!("using encoder at '{}'", binary.display());

        Ok(Self::with_binary(binary, timeout))
    }

    pub fn with_binary<P: Into<PathBuf>>(binary: P, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments passed to the encoder for `job`.
    pub fn arguments(&self, job: &ExtractionJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(job.source.clone().into_os_string());
        args.extend(
            [
                "-ss".to_owned(),
                format_timestamp(job.segment.start),
                "-to".to_owned(),
                format_timestamp(job.segment.end),
                "-vn".to_owned(),
            ]
            .map(OsString::from),
        );

        match (job.bitrate_kbps, job.format.lossy_codec()) {
            (Some(bitrate), Some(codec)) => {
                args.extend(["-c:a", codec, "-b:a"].map(OsString::from));
                args.push(OsString::from(format!("{bitrate}k")));
            }
            _ => args.extend(["-c", "copy"].map(OsString::from)),
        }

        args.push(job.output.clone().into_os_string());
        args
    }
}

impl Extractor for FfmpegExtractor {
    fn extract(&self, job: &ExtractionJob) -> Result<(), ExtractionError> {
        let args = self.arguments(job);
        debug!("{}", render_command(&self.binary, &args));

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExtractionError::Launch)?;

        // Drained on its own thread so a chatty encoder cannot fill the pipe
        // and stall while we poll for exit.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buffer = Vec::new();
                let _ = stderr.read_to_end(&mut buffer);
                buffer
            })
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if let Some(limit) = self.timeout {
                if started.elapsed() >= limit {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ExtractionError::TimedOut { after: limit });
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stderr = stderr_reader
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(ExtractionError::Failed {
                code: status.code(),
                stderr: stderr_tail(&stderr),
            })
        }
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_owned()
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .flat_map(|dir| candidates(&dir, name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let mut names = vec![dir.join(name)];
    if cfg!(windows) {
        names.push(dir.join(Path::new(name).with_extension("exe")));
    }
    names
}

/// Lossy textual form of an argument list, for logs.
pub fn render_command(binary: &Path, args: &[OsString]) -> String {
    std::iter::once(binary.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}
