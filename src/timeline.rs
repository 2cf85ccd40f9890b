//! Wall-clock breakdown of a worker's lifecycle.

use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock UNIX timestamps in seconds, taken at fixed points of a worker's lifecycle:
///
/// `[start, after start barrier, (after fetch, after compute, after publish, after barrier) × iterations, end]`
///
/// Timestamps of different workers are comparable as long as their clocks are.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    marks: Vec<f64>,
}
impl Timeline {
    pub fn new() -> Self {
        Self { marks: Vec::new() }
    }

    /// Record the current time.
    pub fn mark(&mut self) {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0);
        self.marks.push(now);
    }

    pub fn marks(&self) -> &[f64] {
        &self.marks
    }

    /// Seconds between the first and the last mark.
    pub fn total_seconds(&self) -> f64 {
        match (self.marks.first(), self.marks.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// Outcome of one worker.
///
/// ## Fields
/// - **worker_id**: Id of the worker
/// - **iterations**: Amount of completed rounds (identical across the workers of one job)
/// - **convergence_value**: Last global convergence value the worker observed
/// - **timeline**: Lifecycle timestamps, see [`Timeline`]
#[derive(Clone, Debug)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub iterations: usize,
    pub convergence_value: f64,
    pub timeline: Timeline,
}
impl WorkerReport {
    /// Seconds spent iterating: from the release of the start barrier to the end of the run.
    pub fn iterations_seconds(&self) -> f64 {
        let marks = self.timeline.marks();
        match (marks.get(1), marks.last()) {
            (Some(started), Some(end)) => end - started,
            _ => 0.0,
        }
    }

    /// Comma-separated row: worker id, iterations, convergence value, then every timestamp.
    pub fn csv_row(&self) -> String {
        let mut fields = vec![self.worker_id.to_string(), self.iterations.to_string(), self.convergence_value.to_string()];
        fields.extend(self.timeline.marks().iter().map(|m| format!("{:.6}", m)));
        fields.join(",")
    }
}
