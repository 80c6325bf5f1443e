mod cli;

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use booksplit_core::{
    format_timestamp, plan_segments, run_with_progress, BatchReport, Config, PlanParameters,
    ProgressEvent, Segment,
};
use indicatif::{HumanDuration, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::cli::{build_cli, non_negative};

/// `[HH:MM:SS - HH:MM:SS] (N.N min)` for one part.
fn describe(segment: &Segment) -> String {
    format!(
        "[{} - {}] ({:.1} min)",
        format_timestamp(segment.start),
        format_timestamp(segment.end),
        segment.duration_secs() as f64 / 60.0
    )
}

fn print_summary(report: &BatchReport) {
    for job in &report.jobs {
        let range = describe(&job.segment);
        match &job.outcome {
            Ok(elapsed) => println!(
                "  ok      {} {range} in {}",
                job.output.display(),
                HumanDuration(*elapsed)
            ),
            Err(err) => println!("  FAILED  {} {range}: {err}", job.output.display()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = build_cli().get_matches();

    let input_path = matches
        .get_one::<PathBuf>("file_path")
        .expect("required argument");
    if !input_path.is_file() {
        return Err(anyhow!(
            "input file does not exist: {}",
            input_path.display()
        ));
    }

    let minutes = non_negative(
        *matches
            .get_one::<i64>("duration")
            .expect("defaulted argument"),
    );
    let delta = non_negative(*matches.get_one::<i64>("delta").expect("defaulted argument"));
    let bitrate = if matches.get_flag("copy") {
        None
    } else {
        matches.get_one::<u32>("bitrate").copied()
    };
    let timeout = *matches
        .get_one::<Option<Duration>>("timeout")
        .expect("defaulted argument");
    let dry_run = matches.get_flag("dry-run");

    let params = PlanParameters::new(minutes.saturating_mul(60), delta, bitrate);
    let mut builder = Config::builder(input_path, params).timeout(timeout);
    if let Some(output_dir) = matches.get_one::<PathBuf>("output") {
        builder = builder.output_dir(output_dir);
    }
    if let Some(threads) = matches.get_one::<NonZeroUsize>("jobs") {
        builder = builder.threads(*threads);
    }
    if let Some(encoder) = matches.get_one::<PathBuf>("encoder") {
        builder = builder.encoder(encoder);
    }

    let config = builder.build().with_context(|| {
        format!(
            "failed to create configuration for '{}'",
            input_path.display()
        )
    })?;

    if dry_run {
        let plan = plan_segments(&config)
            .with_context(|| format!("failed to plan segments for '{}'", input_path.display()))?;

        if plan.is_empty() {
            println!("Dry run: no segments would be generated.");
        } else {
            println!("Dry run: would generate {} segment(s):", plan.len());
            for job in plan {
                println!("  {} {}", job.output.display(), describe(&job.segment));
            }
        }

        return Ok(());
    }

    let progress = ProgressBar::new(0);
    progress.set_draw_target(ProgressDrawTarget::stderr());
    let bar_style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let progress_handle = progress.clone();
    let result = run_with_progress(config, move |event: ProgressEvent<'_>| match event {
        ProgressEvent::Start {
            total_duration,
            segments,
        } => {
            progress_handle.set_style(bar_style.clone());
            progress_handle.set_length(segments.len() as u64);
            progress_handle.enable_steady_tick(Duration::from_millis(100));
            progress_handle.set_message(format!(
                "encoding {} of audio",
                HumanDuration(Duration::from_secs(total_duration))
            ));
        }
        ProgressEvent::JobFinished(job) => {
            progress_handle.inc(1);
            if let Some(name) = job.output.file_name() {
                progress_handle.set_message(name.to_string_lossy().into_owned());
            }
        }
        ProgressEvent::Finish(_) => {
            progress_handle.set_message(String::from("Completed"));
        }
    })
    .with_context(|| format!("failed to split '{}'", input_path.display()));

    progress.finish_and_clear();

    let report = result?;
    print_summary(&report);

    let failed = report.failures().count();
    if failed > 0 {
        return Err(anyhow!(
            "{failed} of {} part(s) failed",
            report.jobs.len()
        ));
    }

    Ok(())
}
