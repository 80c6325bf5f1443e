use std::fs::File;
use std::io;
use std::path::Path;

use log::{debug, warn};
use symphonia::core::codecs::CodecParameters;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};
use symphonia::default::get_probe;

use crate::error::{ProbeError, SplitError};

/// Source of the total playable length of an input, in whole seconds.
pub trait DurationProber {
    fn probe(&self, path: &Path) -> Result<u64, SplitError>;
}

impl<F> DurationProber for F
where
    F: Fn(&Path) -> Result<u64, SplitError>,
{
    fn probe(&self, path: &Path) -> Result<u64, SplitError> {
        self(path)
    }
}

/// Prober backed by the Symphonia demuxers.
///
/// The container header is consulted first. When it does not advertise a
/// length, every packet of the default track is read instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaProber;

impl SymphoniaProber {
    /// Length advertised by the container header, rounded up to whole seconds.
    pub fn header_duration(path: &Path) -> Result<u64, ProbeError> {
        let reader = open(path)?;
        let track = reader
            .default_track()
            .ok_or(ProbeError::MissingDefaultTrack)?;
        let frames = track
            .codec_params
            .n_frames
            .filter(|&frames| frames > 0)
            .ok_or(ProbeError::UnknownLength)?;
        let time_base = time_base(&track.codec_params).ok_or(ProbeError::UnknownLength)?;

        Ok(ceil_seconds(time_base.calc_time(frames)))
    }

    /// Length measured by demuxing the whole default track.
    pub fn scanned_duration(path: &Path) -> Result<u64, ProbeError> {
        let mut reader = open(path)?;
        let track = reader
            .default_track()
            .ok_or(ProbeError::MissingDefaultTrack)?;
        let track_id = track.id;
        let time_base = time_base(&track.codec_params).ok_or(ProbeError::UnknownLength)?;

        let mut end_ts = 0u64;
        let mut packets = 0u64;
        loop {
            match reader.next_packet() {
                Ok(packet) => {
                    if packet.track_id() != track_id {
                        continue;
                    }
                    packets += 1;
                    end_ts = end_ts.max(packet.ts().saturating_add(packet.dur()));
                }
                Err(SymphoniaError::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(err) => return Err(err.into()),
            }
        }
        debug!(
            "scanned {packets} packet(s) of '{}', last timestamp {end_ts}",
            path.display()
        );

        Ok(ceil_seconds(time_base.calc_time(end_ts)))
    }
}

impl DurationProber for SymphoniaProber {
    fn probe(&self, path: &Path) -> Result<u64, SplitError> {
        probe_with(path, Self::header_duration, Self::scanned_duration)
    }
}

/// Ask `header` for the length and fall back to `scan` when it cannot tell.
fn probe_with<H, S>(path: &Path, header: H, scan: S) -> Result<u64, SplitError>
where
    H: FnOnce(&Path) -> Result<u64, ProbeError>,
    S: FnOnce(&Path) -> Result<u64, ProbeError>,
{
    let header = match header(path) {
        Ok(seconds) => return Ok(seconds),
        Err(err) => err,
    };

    warn!(
        "could not read the length of '{}' from its header ({header}), scanning packets",
        path.display()
    );
    scan(path).map_err(|scan| SplitError::ProbeFailure {
        path: path.to_path_buf(),
        header,
        scan,
    })
}

fn open(path: &Path) -> Result<Box<dyn FormatReader>, ProbeError> {
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    Ok(probed.format)
}

fn time_base(params: &CodecParameters) -> Option<TimeBase> {
    params
        .time_base
        .or_else(|| params.sample_rate.map(|rate| TimeBase::new(1, rate)))
}

fn ceil_seconds(time: Time) -> u64 {
    if time.frac > 0.0 {
        time.seconds + 1
    } else {
        time.seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_lengths_round_up() {
        let time_base = TimeBase::new(1, 8_000);
        assert_eq!(ceil_seconds(time_base.calc_time(8_800)), 2);
        assert_eq!(ceil_seconds(time_base.calc_time(24_000)), 3);
        assert_eq!(ceil_seconds(time_base.calc_time(0)), 0);
    }

    #[test]
    fn closures_act_as_probers() {
        let fixed = |_: &Path| -> Result<u64, SplitError> { Ok(42) };
        assert_eq!(fixed.probe(Path::new("any.m4a")).unwrap(), 42);
    }

    #[test]
    fn header_length_wins_without_scanning() {
        let seconds = probe_with(
            Path::new("book.m4b"),
            |_| Ok(3_600),
            |_| panic!("scan must not run when the header has a length"),
        )
        .unwrap();
        assert_eq!(seconds, 3_600);
    }

    #[test]
    fn missing_header_length_falls_back_to_scan() {
        let seconds = probe_with(
            Path::new("book.m4b"),
            |_| Err(ProbeError::UnknownLength),
            |_| Ok(1_234),
        )
        .unwrap();
        assert_eq!(seconds, 1_234);
    }

    #[test]
    fn failing_scan_keeps_both_errors() {
        let err = probe_with(
            Path::new("book.m4b"),
            |_| Err(ProbeError::UnknownLength),
            |_| Err(ProbeError::MissingDefaultTrack),
        )
        .unwrap_err();
        match err {
            SplitError::ProbeFailure { path, header, scan } => {
                assert_eq!(path, Path::new("book.m4b"));
                assert!(matches!(header, ProbeError::UnknownLength));
                assert!(matches!(scan, ProbeError::MissingDefaultTrack));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
