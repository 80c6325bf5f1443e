use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::config::Config;
use crate::error::ExtractionError;
use crate::extract::{ExtractionJob, Extractor};
use crate::plan::Segment;

/// Progress notifications emitted while a split runs.
#[derive(Debug)]
pub enum ProgressEvent<'a> {
    /// The source was probed and planned; extraction is about to start.
    Start {
        total_duration: u64,
        segments: &'a [Segment],
    },
    /// One part finished, successfully or not. Parts finish in any order.
    JobFinished(&'a JobReport),
    /// Every part has finished.
    Finish(&'a BatchReport),
}

/// Receiver of [`ProgressEvent`]s. Events are always delivered on the thread
/// that started the run.
pub trait ProgressReporter {
    fn report(&mut self, _event: ProgressEvent<'_>) {}
}

impl<F> ProgressReporter for F
where
    F: FnMut(ProgressEvent<'_>),
{
    fn report(&mut self, event: ProgressEvent<'_>) {
        self(event)
    }
}

/// Reporter that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Outcome of a single part.
#[derive(Debug)]
pub struct JobReport {
    pub segment: Segment,
    pub output: PathBuf,
    /// Wall time spent on the part, or why it failed.
    pub outcome: Result<Duration, ExtractionError>,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcomes of every part of a run, ordered by segment index.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.jobs.iter().filter(|job| job.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|job| !job.is_success())
    }

    pub fn is_complete(&self) -> bool {
        self.jobs.iter().all(JobReport::is_success)
    }
}

/// Turn a plan into extraction jobs targeting the configured output directory.
pub fn build_jobs(config: &Config, segments: &[Segment]) -> Vec<ExtractionJob> {
    segments
        .iter()
        .map(|segment| ExtractionJob {
            segment: *segment,
            source: config.input_path.clone(),
            output: config.output_path(segment),
            format: config.format,
            bitrate_kbps: config.params.bitrate_kbps(),
        })
        .collect()
}

/// Run every job and wait for all of them.
///
/// At most `threads` encoder invocations run at once; `None` starts every job
/// immediately. A failing or timed out job never stops its siblings.
pub fn execute<E, R>(
    jobs: Vec<ExtractionJob>,
    extractor: &E,
    threads: Option<NonZeroUsize>,
    reporter: &mut R,
) -> BatchReport
where
    E: Extractor + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let workers = threads.map_or(jobs.len(), NonZeroUsize::get).min(jobs.len());
    info!("running {} job(s) on {workers} worker(s)", jobs.len());

    let next = AtomicUsize::new(0);
    let mut slots: Vec<Option<JobReport>> = jobs.iter().map(|_| None).collect();
    let (sender, receiver) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..workers {
            let sender = sender.clone();
            let jobs = &jobs;
            let next = &next;
            scope.spawn(move || loop {
                let position = next.fetch_add(1, Ordering::Relaxed);
                let Some(job) = jobs.get(position) else {
                    break;
                };
                if sender.send((position, run_job(extractor, job))).is_err() {
                    break;
                }
            });
        }
        drop(sender);

        for (position, report) in receiver {
            reporter.report(ProgressEvent::JobFinished(&report));
            slots[position] = Some(report);
        }
    });

    BatchReport {
        jobs: slots.into_iter().flatten().collect(),
    }
}

fn run_job<E: Extractor + ?Sized>(extractor: &E, job: &ExtractionJob) -> JobReport {
    debug!("starting part {} -> '{}'", job.segment, job.output.display());
    let started = Instant::now();

    let outcome = remove_stale_output(&job.output)
        .and_then(|()| extractor.extract(job))
        .map(|()| started.elapsed());

    match &outcome {
        Ok(elapsed) => info!(
            "wrote '{}' in {:.1}s",
            job.output.display(),
            elapsed.as_secs_f64()
        ),
        Err(err) => error!("part {} failed: {err}", job.segment),
    }

    JobReport {
        segment: job.segment,
        output: job.output.clone(),
        outcome,
    }
}

fn remove_stale_output(path: &Path) -> Result<(), ExtractionError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("removed existing '{}'", path.display());
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
