use super::handler::PageHandler;
use super::token::{DispatchToken, TokenSender};
use super::{CrawlError, Report, Task};
use crate::portal::CourseFetcher;
use crate::utils::fmt_duration;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Queries slower than this are logged at `warn`.
const SLOW_THRESHOLD: Duration = Duration::from_secs(20);

/// Channels a worker is wired to.
pub struct WorkerChannels<T> {
    /// This worker's own single-slot task queue.
    pub tasks: mpsc::Receiver<Task>,
    /// Shared: announces the worker is ready for a task.
    pub idle: mpsc::Sender<usize>,
    pub reports: mpsc::Sender<Report<T>>,
    pub tokens: TokenSender,
}

/// A single worker instance.
///
/// Workers announce themselves idle, take one task at a time from their own
/// slot, and hand the dispatch token back once the task is reported.
pub struct Worker<H> {
    id: usize,
    fetcher: Arc<dyn CourseFetcher>,
    handler: Arc<H>,
    delay: Duration,
}

impl<H: PageHandler> Worker<H> {
    pub fn new(id: usize, fetcher: Arc<dyn CourseFetcher>, handler: Arc<H>, delay: Duration) -> Self {
        Self {
            id,
            fetcher,
            handler,
            delay,
        }
    }

    /// Runs the worker's main loop until the dispatcher hangs up or the run is cancelled.
    pub async fn run(self, channels: WorkerChannels<H::Output>, cancel: CancellationToken) {
        let WorkerChannels {
            mut tasks,
            idle,
            reports,
            tokens,
        } = channels;
        trace!(worker_id = self.id, "Worker started");

        loop {
            if idle.send(self.id).await.is_err() {
                break;
            }

            let task = tokio::select! {
                _ = cancel.cancelled() => break,
                task = tasks.recv() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            let start = Instant::now();
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!(
                        worker_id = self.id,
                        course_key = task.link.course.key.as_str(),
                        "Cancelled during course query, abandoning it"
                    );
                    break;
                }
                result = self.process(&task) => result,
            };
            self.log_result(&task, &result, start.elapsed());

            let generation = task.generation;
            let report = Report {
                task: task.id,
                generation,
                link: task.link,
                result,
            };
            if reports.send(report).await.is_err() {
                debug!(worker_id = self.id, "Result collector closed, exiting");
                break;
            }

            // The dispatcher may have stopped listening; the token is simply dropped then.
            let _ = tokens.send(DispatchToken::after(self.delay, generation)).await;
        }

        trace!(worker_id = self.id, "Worker exiting");
    }

    async fn process(&self, task: &Task) -> Result<H::Output, CrawlError> {
        let body = self.fetcher.fetch_course(&task.link).await?;
        self.handler.handle(&task.link, body)
    }

    fn log_result(&self, task: &Task, result: &Result<H::Output, CrawlError>, duration: Duration) {
        let course_key = task.link.course.key.as_str();
        let course = task.link.course.text.as_str();

        if duration > SLOW_THRESHOLD {
            warn!(
                worker_id = self.id,
                course_key,
                duration = fmt_duration(duration),
                "Slow course query"
            );
        }

        match result {
            Ok(_) => debug!(
                worker_id = self.id,
                course_key,
                generation = task.generation,
                duration = fmt_duration(duration),
                "Course query completed"
            ),
            Err(e) => error!(
                worker_id = self.id,
                course_key,
                course,
                kind = e.kind(),
                error = %e,
                duration = fmt_duration(duration),
                "Course query failed"
            ),
        }
    }
}
