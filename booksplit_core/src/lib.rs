use std::fs;

use log::info;

mod config;
mod driver;
mod error;
mod extract;
mod format;
mod plan;
mod probe;

pub use config::{
    Config, ConfigBuilder, Limits, PlanParameters, DEFAULT_BITRATE_KBPS, DEFAULT_OVERLAP_SECONDS,
    DEFAULT_SEGMENT_SECONDS,
};
pub use driver::{
    build_jobs, execute, BatchReport, JobReport, NoProgress, ProgressEvent, ProgressReporter,
};
pub use error::{ExtractionError, ProbeError, SplitError};
pub use extract::{render_command, ExtractionJob, Extractor, FfmpegExtractor};
pub use format::AudioFormat;
pub use plan::{format_timestamp, plan, Segment, GOLDEN_RATIO};
pub use probe::{DurationProber, SymphoniaProber};

/// Probe the source and plan its parts without extracting anything.
pub fn plan_segments(config: &Config) -> Result<Vec<ExtractionJob>, SplitError> {
    plan_segments_with(config, &SymphoniaProber)
}

/// Like [`plan_segments`], measuring the source with `prober`.
pub fn plan_segments_with<P>(config: &Config, prober: &P) -> Result<Vec<ExtractionJob>, SplitError>
where
    P: DurationProber + ?Sized,
{
    let total_duration = prober.probe(&config.input_path)?;
    Ok(build_jobs(config, &plan_for(config, total_duration)))
}

fn plan_for(config: &Config, total_duration: u64) -> Vec<Segment> {
    let segments = plan(
        total_duration,
        config.params.segment_seconds(),
        config.params.overlap_seconds(),
    );
    info!(
        "planned {} part(s) of ~{}s with {}s overlap for {}s of '{}'",
        segments.len(),
        config.params.segment_seconds(),
        config.params.overlap_seconds(),
        total_duration,
        config.input_path.display()
    );
    segments
}

/// Split the configured source with `ffmpeg`, discarding progress events.
pub fn run(config: Config) -> Result<BatchReport, SplitError> {
    run_with_progress(config, NoProgress)
}

/// Split the configured source with `ffmpeg`, reporting progress to `reporter`.
///
/// Missing encoders and unreadable sources are fatal. Failures of individual
/// parts are returned inside the [`BatchReport`].
pub fn run_with_progress<R: ProgressReporter>(
    config: Config,
    mut reporter: R,
) -> Result<BatchReport, SplitError> {
    let extractor = FfmpegExtractor::locate(config.encoder.as_deref(), config.timeout)?;
    run_with(&config, &SymphoniaProber, &extractor, &mut reporter)
}

/// Split using the supplied collaborators.
pub fn run_with<P, E, R>(
    config: &Config,
    prober: &P,
    extractor: &E,
    reporter: &mut R,
) -> Result<BatchReport, SplitError>
where
    P: DurationProber + ?Sized,
    E: Extractor + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let total_duration = prober.probe(&config.input_path)?;
    let segments = plan_for(config, total_duration);
    let jobs = build_jobs(config, &segments);

    if !jobs.is_empty() {
        fs::create_dir_all(&config.output_dir)?;
    }

    reporter.report(ProgressEvent::Start {
        total_duration,
        segments: &segments,
    });
    let report = execute(jobs, extractor, config.threads, reporter);
    reporter.report(ProgressEvent::Finish(&report));

    info!(
        "{} of {} part(s) written to '{}'",
        report.succeeded(),
        report.jobs.len(),
        config.output_dir.display()
    );

    Ok(report)
}
