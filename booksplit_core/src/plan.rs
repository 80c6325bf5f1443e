use std::fmt;

/// Ratio of target length to trailing remainder above which the remainder is
/// folded into the previous segment instead of becoming a part of its own.
pub const GOLDEN_RATIO: f64 = 1.618;

/// A planned, half-open range `[start, end)` of the source, in whole seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Segment {
    /// First second covered by the segment.
    pub start: u64,
    /// Second at which the segment stops (exclusive).
    pub end: u64,
    /// 1-based position of the segment within its plan.
    pub index: usize,
    /// Number of segments in the plan this segment belongs to.
    pub total: usize,
}

impl Segment {
    /// Length of the segment in seconds.
    pub fn duration_secs(&self) -> u64 {
        self.end - self.start
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} [{} - {}]",
            self.index,
            self.total,
            format_timestamp(self.start),
            format_timestamp(self.end)
        )
    }
}

/// Render whole seconds as `HH:MM:SS`; hours grow past two digits if needed.
pub fn format_timestamp(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3_600,
        (seconds % 3_600) / 60,
        seconds % 60
    )
}

/// Plan the segments for a source lasting `total_duration` seconds.
///
/// A cursor sweeps the timeline in steps of `segment_seconds`. Every segment
/// except the first reaches `overlap` seconds back before its step, and every
/// segment reaches `overlap` seconds past it, so adjacent parts share up to
/// `2 * overlap` seconds around each cut. When the final step would produce a
/// remainder that is short compared to the target length (the ratio exceeds
/// [`GOLDEN_RATIO`]) the previous segment is stretched to the end instead.
///
/// Ends never pass `total_duration`. The function is total: a zero
/// `segment_seconds` is treated as one second and a zero duration yields an
/// empty plan.
pub fn plan(total_duration: u64, segment_seconds: u64, overlap: u64) -> Vec<Segment> {
    let step = segment_seconds.max(1);
    let mut ranges: Vec<(u64, u64)> = Vec::new();
    let mut cursor = 0u64;

    while cursor < total_duration {
        let reach = cursor.saturating_add(step);

        if cursor == 0 {
            ranges.push((0, reach.saturating_add(overlap).min(total_duration)));
        } else if reach >= total_duration {
            let remainder = total_duration - cursor + overlap;
            if step as f64 / remainder as f64 > GOLDEN_RATIO {
                if let Some(previous) = ranges.last_mut() {
                    previous.1 = total_duration;
                }
            } else {
                let start = leading_edge(cursor, overlap, &ranges);
                ranges.push((start, total_duration));
            }
        } else {
            let start = leading_edge(cursor, overlap, &ranges);
            ranges.push((start, reach.saturating_add(overlap).min(total_duration)));
        }

        cursor = reach;
    }

    let total = ranges.len();
    ranges
        .into_iter()
        .enumerate()
        .map(|(position, (start, end))| Segment {
            start,
            end,
            index: position + 1,
            total,
        })
        .collect()
}

// The previous start is at most `cursor - step`, so the result never passes
// the cursor and coverage is kept.
fn leading_edge(cursor: u64, overlap: u64, ranges: &[(u64, u64)]) -> u64 {
    let earliest = ranges.last().map_or(0, |&(start, _)| start + 1);
    cursor.saturating_sub(overlap).max(earliest)
}
