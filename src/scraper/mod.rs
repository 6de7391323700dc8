//! Rate-limited crawl of course pages.
//!
//! One dispatcher feeds course queries to a small pool of workers. At most
//! one query is dispatched per `delay`, measured from the moment the previous
//! one finished. Every task ends up as exactly one [`CrawlOutcome`], though a
//! stalled task may be fetched more than once behind the scenes.

pub mod handler;
pub mod scheduler;
pub mod token;
pub mod worker;

pub use handler::{ExtractSchedule, KeepRaw, PageHandler};

use crate::config::Config;
use crate::parser::{CourseLink, ParseError};
use crate::portal::{CourseFetcher, PortalError};
use scheduler::Dispatcher;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use worker::{Worker, WorkerChannels};

/// Why a single course could not be crawled.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error(transparent)]
    Transport(#[from] PortalError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("no response after {attempts} dispatch attempts")]
    Stalled { attempts: u32 },
}

impl CrawlError {
    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            CrawlError::Transport(_) => "transport",
            CrawlError::Parse(_) => "parse",
            CrawlError::Io(_) => "io",
            CrawlError::Stalled { .. } => "stalled",
        }
    }
}

/// One dispatch of a course query.
#[derive(Debug, Clone)]
pub struct Task {
    /// Position in the input; stays the same across re-dispatches.
    pub id: usize,
    pub generation: u64,
    pub link: CourseLink,
}

/// What a worker (or the dispatcher, for a stall) reports about a task.
#[derive(Debug)]
pub struct Report<T> {
    pub task: usize,
    pub generation: u64,
    pub link: CourseLink,
    pub result: Result<T, CrawlError>,
}

#[derive(Debug)]
pub struct CrawlOutcome<T> {
    pub link: CourseLink,
    pub result: Result<T, CrawlError>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub completed: usize,
    pub failed: usize,
    /// Late results of tasks that had already been reported.
    pub duplicates: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub delay: Duration,
    pub stall_timeout: Duration,
    pub workers: usize,
    pub max_redispatch: u32,
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            delay: config.request_delay,
            stall_timeout: config.stall_timeout,
            workers: config.workers,
            max_redispatch: config.max_redispatch,
        }
    }
}

pub struct Pipeline<H> {
    fetcher: Arc<dyn CourseFetcher>,
    handler: Arc<H>,
    config: PipelineConfig,
}

impl<H: PageHandler + 'static> Pipeline<H> {
    pub fn new(fetcher: Arc<dyn CourseFetcher>, handler: H, config: PipelineConfig) -> Self {
        Self {
            fetcher,
            handler: Arc::new(handler),
            config,
        }
    }

    /// Starts the dispatcher and workers on the current runtime.
    pub fn spawn(&self, links: Vec<CourseLink>, cancel: CancellationToken) -> Outcomes<H::Output> {
        let workers = self.config.workers.max(1);
        let total = links.len();
        let mut tasks = JoinSet::new();

        let (idle_tx, idle_rx) = mpsc::channel(workers);
        let (reports_tx, reports_rx) = mpsc::channel(workers * 2);
        let (token_tx, token_rx) = token::channel();

        let mut slots = Vec::with_capacity(workers);
        for id in 0..workers {
            let (slot_tx, slot_rx) = mpsc::channel(1);
            slots.push(slot_tx);

            let worker = Worker::new(
                id,
                self.fetcher.clone(),
                self.handler.clone(),
                self.config.delay,
            );
            let channels = WorkerChannels {
                tasks: slot_rx,
                idle: idle_tx.clone(),
                reports: reports_tx.clone(),
                tokens: token_tx.clone(),
            };
            tasks.spawn(worker.run(channels, cancel.clone()));
        }

        let dispatcher = Dispatcher {
            links,
            slots,
            idle: idle_rx,
            tokens: token_rx,
            reports: reports_tx,
            stall_timeout: self.config.stall_timeout,
            max_redispatch: self.config.max_redispatch,
        };
        tasks.spawn(dispatcher.run(cancel));

        info!(
            total,
            workers,
            delay = crate::utils::fmt_duration(self.config.delay),
            "Crawl started"
        );

        Outcomes {
            reports: reports_rx,
            total,
            finished: HashSet::with_capacity(total),
            summary: CrawlSummary::default(),
            tasks,
        }
    }
}

/// Receiving end of a running crawl.
pub struct Outcomes<T> {
    reports: mpsc::Receiver<Report<T>>,
    total: usize,
    finished: HashSet<usize>,
    summary: CrawlSummary,
    tasks: JoinSet<()>,
}

impl<T> Outcomes<T> {
    /// The next finished task, or `None` once every task has finished or the
    /// crawl stopped early.
    pub async fn next(&mut self) -> Option<CrawlOutcome<T>> {
        while self.finished.len() < self.total {
            let report = self.reports.recv().await?;

            if !self.finished.insert(report.task) {
                self.summary.duplicates += 1;
                warn!(
                    course_key = report.link.course.key.as_str(),
                    generation = report.generation,
                    "Discarding late duplicate result"
                );
                continue;
            }

            match report.result {
                Ok(_) => self.summary.completed += 1,
                Err(_) => self.summary.failed += 1,
            }
            return Some(CrawlOutcome {
                link: report.link,
                result: report.result,
            });
        }

        None
    }

    pub fn summary(&self) -> CrawlSummary {
        self.summary
    }

    /// Stops whatever is still running and returns the final tally.
    pub async fn shutdown(mut self) -> CrawlSummary {
        self.reports.close();
        self.tasks.shutdown().await;
        debug!(
            completed = self.summary.completed,
            failed = self.summary.failed,
            duplicates = self.summary.duplicates,
            unfinished = self.total - self.finished.len(),
            "Crawl shut down"
        );
        self.summary
    }
}
