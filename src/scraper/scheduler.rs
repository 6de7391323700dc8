//! The dispatcher: hands course queries to workers, one token at a time.
//!
//! There is exactly one [`DispatchToken`]. The dispatcher waits until the
//! token's `not_before`, gives the next task to an idle worker, and then waits
//! for that worker to hand the token back. A dispatch that does not come back
//! within `stall_timeout` is sent again under a new generation; whatever the
//! stalled worker eventually returns is stale and discarded here, while its
//! late result is filtered out by the collector. Only a task that reached a
//! worker counts as an attempt; waiting for a worker to become idle is not
//! charged to the task at the head of the queue.

use super::token::{DispatchToken, TokenReceiver};
use super::{CrawlError, Report, Task};
use crate::parser::CourseLink;
use crate::utils::fmt_duration;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Outcome of one bounded wait.
enum Wait<T> {
    Ready(T),
    TimedOut,
    /// Cancelled, or the other side went away.
    Stopped,
}

pub struct Dispatcher<T> {
    pub(super) links: Vec<CourseLink>,
    /// One single-slot task queue per worker, indexed by worker id.
    pub(super) slots: Vec<mpsc::Sender<Task>>,
    pub(super) idle: mpsc::Receiver<usize>,
    pub(super) tokens: TokenReceiver,
    pub(super) reports: mpsc::Sender<Report<T>>,
    pub(super) stall_timeout: Duration,
    pub(super) max_redispatch: u32,
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Dispatches every link in order. Returns when all are done or on cancellation.
    pub async fn run(mut self, cancel: CancellationToken) {
        let links = std::mem::take(&mut self.links);
        let total = links.len();
        let mut token = DispatchToken::now(0);
        let mut generation = 0u64;

        info!(total, "Dispatcher started");

        for (task_id, link) in links.into_iter().enumerate() {
            let mut attempts = 0u32;

            loop {
                let not_before = token.not_before.min(Instant::now() + self.stall_timeout);
                if !self.sleep_until(not_before, &cancel).await {
                    return;
                }

                let Some(worker_id) = self.next_idle(&cancel).await else {
                    return;
                };

                attempts += 1;
                generation += 1;
                let task = Task {
                    id: task_id,
                    generation,
                    link: link.clone(),
                };
                debug!(
                    worker_id,
                    generation,
                    attempt = attempts,
                    course_key = link.course.key.as_str(),
                    "Dispatching course query"
                );
                if self.slots[worker_id].send(task).await.is_err() {
                    debug!(worker_id, "Worker went away, stopping dispatch");
                    return;
                }

                match self.await_token(generation, &cancel).await {
                    Wait::Ready(released) => {
                        token = released;
                        break;
                    }
                    Wait::Stopped => return,
                    Wait::TimedOut if attempts > self.max_redispatch => {
                        warn!(
                            course_key = link.course.key.as_str(),
                            course = link.course.text.as_str(),
                            attempts,
                            "Course query stalled too often, giving up"
                        );
                        let report = Report {
                            task: task_id,
                            generation,
                            link: link.clone(),
                            result: Err(CrawlError::Stalled { attempts }),
                        };
                        if self.reports.send(report).await.is_err() {
                            return;
                        }
                        token = DispatchToken::now(generation);
                        break;
                    }
                    Wait::TimedOut => {
                        warn!(
                            course_key = link.course.key.as_str(),
                            attempt = attempts,
                            stall_timeout = fmt_duration(self.stall_timeout),
                            "Course query stalled, dispatching it again"
                        );
                        token = DispatchToken::now(generation);
                    }
                }
            }
        }

        info!(total, "All course queries dispatched");
    }

    /// Sleeps until `deadline`, discarding stale tokens meanwhile. False when cancelled.
    async fn sleep_until(&mut self, deadline: Instant, cancel: &CancellationToken) -> bool {
        let sleep = time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = &mut sleep => return true,
                Some(stale) = self.tokens.recv() => discard(stale),
            }
        }
    }

    /// Waits for a worker to announce itself idle, warning every `stall_timeout`
    /// while all of them are busy. `None` when cancelled or all workers are gone.
    async fn next_idle(&mut self, cancel: &CancellationToken) -> Option<usize> {
        let since = Instant::now();
        let deadline = time::sleep(self.stall_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = &mut deadline => {
                    warn!(
                        waited = fmt_duration(since.elapsed()),
                        "All workers are busy with stalled queries, still waiting"
                    );
                    deadline.as_mut().reset(Instant::now() + self.stall_timeout);
                }
                idle = self.idle.recv() => return idle,
                Some(stale) = self.tokens.recv() => discard(stale),
            }
        }
    }

    /// Waits up to `stall_timeout` for the token of `generation` to come back.
    async fn await_token(&mut self, generation: u64, cancel: &CancellationToken) -> Wait<DispatchToken> {
        let deadline = time::sleep(self.stall_timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Wait::Stopped,
                _ = &mut deadline => return Wait::TimedOut,
                token = self.tokens.recv() => match token {
                    Some(token) if token.generation == generation => return Wait::Ready(token),
                    Some(stale) => discard(stale),
                    None => return Wait::Stopped,
                },
            }
        }
    }
}

fn discard(stale: DispatchToken) {
    trace!(generation = stale.generation, "Discarding stale dispatch token");
}
