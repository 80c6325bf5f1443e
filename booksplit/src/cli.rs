mod duration;

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{builder::ValueParser, value_parser, Arg, ArgAction, Command};

pub use duration::parse_duration;

pub const DEFAULT_TIMEOUT: &str = "30m";

/// Parse the `--timeout` value; `none` disables the timeout.
pub fn parse_timeout(value: &str) -> Result<Option<Duration>, String> {
    if value.trim().eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    parse_duration(value).map(Some).map_err(|err| err.to_string())
}

/// Negative lengths count as zero; range limits are applied by the library.
pub fn non_negative(value: i64) -> u64 {
    value.max(0).unsigned_abs()
}

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Split a long audiobook into overlapping parts")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("duration")
                .short('d')
                .long("duration")
                .value_name("MINUTES")
                .help("Target length of each part in minutes (1-241)")
                .default_value("12")
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("delta")
                .long("delta")
                .value_name("SECONDS")
                .help("Seconds of overlap around every cut (0-299)")
                .default_value("7")
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("bitrate")
                .short('b')
                .long("bitrate")
                .value_name("KBPS")
                .help("Re-encode parts at this bitrate in kbps (16-256)")
                .default_value("48")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("copy")
                .long("copy")
                .help("Copy the audio stream instead of re-encoding it")
                .conflicts_with("bitrate")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("DURATION")
                .help("Give up on a part after this long (e.g. 600, 90s, 1h30m, none)")
                .default_value(DEFAULT_TIMEOUT)
                .value_parser(ValueParser::new(parse_timeout)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_DIR")
                .help("Directory for the parts [default: next to the input, named after it]")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .value_name("N")
                .help("Maximum number of encoder processes at once [default: all parts]")
                .value_parser(value_parser!(NonZeroUsize)),
        )
        .arg(
            Arg::new("encoder")
                .long("encoder")
                .value_name("PATH")
                .help("Path to the ffmpeg binary [default: found on PATH]")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Print the planned parts without writing files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("file_path")
                .value_name("FILE_PATH")
                .help("Path to the input audio file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
}
