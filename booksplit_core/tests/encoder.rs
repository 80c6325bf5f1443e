//! Drives [`FfmpegExtractor`] against small shell scripts standing in for
//! `ffmpeg`, covering success, failure and timeouts of the subprocess.
#![cfg(unix)]

mod common;

use booksplit_core::{
    plan, run_with, AudioFormat, Config, ExtractionError, ExtractionJob, Extractor,
    FfmpegExtractor, Limits, NoProgress, PlanParameters, SymphoniaProber,
};
use common::write_test_tone;
use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tempfile::{tempdir, TempDir};

struct Scripts {
    _dir: TempDir,
    /// Writes its arguments, one per line, into the last argument.
    echo: PathBuf,
    /// Complains on stderr and exits with status 3.
    failing: PathBuf,
    /// Never finishes on its own.
    hanging: PathBuf,
}

// Written once, before any test spawns a process, so no script is ever
// executed while a forked child still holds it open for writing.
fn scripts() -> &'static Scripts {
    static SCRIPTS: OnceLock<Scripts> = OnceLock::new();
    SCRIPTS.get_or_init(|| {
        let dir = tempdir().expect("failed to create script dir");
        let echo = write_script(
            dir.path(),
            "echo-ffmpeg",
            r#"for last; do :; done
printf '%s\n' "$@" > "$last""#,
        );
        let failing = write_script(
            dir.path(),
            "failing-ffmpeg",
            "echo 'Invalid data found when processing input' >&2\nexit 3",
        );
        let hanging = write_script(dir.path(), "hanging-ffmpeg", "exec sleep 30");
        Scripts {
            _dir: dir,
            echo,
            failing,
            hanging,
        }
    })
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("failed to mark script executable");
    path
}

fn single_job(dir: &Path) -> ExtractionJob {
    let segment = plan(1_100, 600, 7)[1];
    ExtractionJob {
        segment,
        source: dir.join("book.m4a"),
        output: dir.join("book-2-2.m4a"),
        format: AudioFormat::M4a,
        bitrate_kbps: Some(48),
    }
}

#[test]
fn successful_encoder_receives_cut_arguments() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let job = single_job(work_dir.path());

    let extractor = FfmpegExtractor::locate(Some(scripts().echo.as_path()), None)?;
    extractor.extract(&job)?;

    let args: Vec<String> = fs::read_to_string(&job.output)?
        .lines()
        .map(str::to_owned)
        .collect();
    let expected_tail = [
        "-ss", "00:09:53", "-to", "00:18:20", "-vn", "-c:a", "aac", "-b:a", "48k",
    ];
    let output = job.output.to_string_lossy().into_owned();
    assert_eq!(args.last(), Some(&output));
    assert_eq!(&args[args.len() - 10..args.len() - 1], &expected_tail);

    work_dir.close()?;
    Ok(())
}

#[test]
fn failing_encoder_reports_status_and_stderr() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let job = single_job(work_dir.path());

    let extractor = FfmpegExtractor::with_binary(&scripts().failing, None);
    match extractor.extract(&job) {
        Err(ExtractionError::Failed { code, stderr }) => {
            assert_eq!(code, Some(3));
            assert_eq!(stderr, "Invalid data found when processing input");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    work_dir.close()?;
    Ok(())
}

#[test]
fn hung_encoder_is_killed_after_timeout() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let job = single_job(work_dir.path());

    let timeout = Duration::from_millis(300);
    let extractor = FfmpegExtractor::with_binary(&scripts().hanging, Some(timeout));
    let started = Instant::now();
    let result = extractor.extract(&job);

    assert!(
        matches!(result, Err(ExtractionError::TimedOut { after }) if after == timeout),
        "unexpected result: {result:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(10));

    work_dir.close()?;
    Ok(())
}

#[test]
fn missing_binary_is_a_launch_failure() -> Result<(), Box<dyn Error>> {
    let _ = scripts();
    let work_dir = tempdir()?;
    let job = single_job(work_dir.path());

    let extractor = FfmpegExtractor::with_binary(work_dir.path().join("gone"), None);
    assert!(matches!(
        extractor.extract(&job),
        Err(ExtractionError::Launch(_))
    ));

    work_dir.close()?;
    Ok(())
}

#[test]
fn run_replaces_stale_parts_and_copies_without_bitrate() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("tone.wav");
    write_test_tone(&input_path, 8_000, 5_000)?;

    let limits = Limits {
        segment_seconds: 1..=60,
        ..Limits::default()
    };
    let config = Config::builder(
        &input_path,
        PlanParameters::with_limits(&limits, 2, 0, None),
    )
    .encoder(&scripts().echo)
    .build()?;

    fs::create_dir_all(&config.output_dir)?;
    let stale = config.output_dir.join("tone-1-2.wav");
    fs::write(&stale, "stale")?;

    let extractor = FfmpegExtractor::locate(config.encoder.as_deref(), None)?;
    let report = run_with(&config, &SymphoniaProber, &extractor, &mut NoProgress)?;

    assert!(report.is_complete());
    assert_eq!(report.jobs.len(), 2);

    let first = fs::read_to_string(&stale)?;
    assert!(first.contains("-ss\n00:00:00\n-to\n00:00:02\n"));
    assert!(first.contains("-c\ncopy\n"));

    // The 1s remainder is folded into the second part.
    let second = fs::read_to_string(config.output_dir.join("tone-2-2.wav"))?;
    assert!(second.contains("-ss\n00:00:02\n-to\n00:00:05\n"));

    work_dir.close()?;
    Ok(())
}

#[test]
fn one_failing_part_leaves_the_rest_written() -> Result<(), Box<dyn Error>> {
    struct FailSecond {
        ok: FfmpegExtractor,
        failing: FfmpegExtractor,
    }

    impl Extractor for FailSecond {
        fn extract(&self, job: &ExtractionJob) -> Result<(), ExtractionError> {
            if job.segment.index == 2 {
                self.failing.extract(job)
            } else {
                self.ok.extract(job)
            }
        }
    }

    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("tone.wav");
    write_test_tone(&input_path, 8_000, 9_000)?;

    let limits = Limits {
        segment_seconds: 1..=60,
        ..Limits::default()
    };
    let config = Config::builder(
        &input_path,
        PlanParameters::with_limits(&limits, 3, 1, Some(64)),
    )
    .build()?;

    let extractor = FailSecond {
        ok: FfmpegExtractor::with_binary(&scripts().echo, None),
        failing: FfmpegExtractor::with_binary(&scripts().failing, None),
    };
    let report = run_with(&config, &SymphoniaProber, &extractor, &mut NoProgress)?;

    assert_eq!(report.jobs.len(), 3);
    assert_eq!(report.succeeded(), 2);
    let failed: Vec<usize> = report.failures().map(|job| job.segment.index).collect();
    assert_eq!(failed, vec![2]);
    assert!(config.output_dir.join("tone-1-3.wav").is_file());
    assert!(config.output_dir.join("tone-3-3.wav").is_file());
    assert!(!config.output_dir.join("tone-2-3.wav").exists());

    work_dir.close()?;
    Ok(())
}
