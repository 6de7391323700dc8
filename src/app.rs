use crate::cli::Command;
use crate::config::Config;
use crate::data::{Block, PageCache, SqlWriter, sql};
use crate::parser::{self, AcademicSemester, Course, CourseLink};
use crate::portal::PortalClient;
use crate::scraper::{CrawlError, CrawlSummary, ExtractSchedule, KeepRaw, Pipeline, PipelineConfig};
use crate::signals;
use crate::utils::{fmt_duration, log_if_slow};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const SLOW_MAIN_PAGE: Duration = Duration::from_secs(10);

/// Courses that could not be processed, or were processed with rows dropped.
#[derive(Debug, Default)]
struct Failures {
    failed: Vec<String>,
    incomplete: Vec<String>,
}

impl Failures {
    fn record(&mut self, course: &Course, error: &CrawlError) {
        error!(
            course_key = course.key.as_str(),
            course = course.text.as_str(),
            kind = error.kind(),
            error = %error,
            "Course failed"
        );
        self.failed.push(course.key.clone());
    }

    fn record_unattached(&mut self, course: &Course, rows: usize) {
        if rows == 0 {
            return;
        }
        warn!(
            course_key = course.key.as_str(),
            course = course.text.as_str(),
            rows,
            "Timetable rows without a subject were dropped"
        );
        self.incomplete.push(format!("{}({rows})", course.key));
    }
}

pub struct App {
    config: Config,
    cancel: CancellationToken,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Runs one command to completion, translating the outcome into an exit code.
    pub async fn run(self, command: Command) -> ExitCode {
        signals::cancel_on_ctrl_c(self.cancel.clone());

        let result = match command {
            Command::Crawl {
                output,
                schema,
                only,
            } => self.crawl(&output, schema, &only).await,
            Command::Download { cache_root } => self.download(&cache_root).await,
            Command::Parse {
                dir,
                output,
                schema,
            } => self.parse(dir, &output, schema).await,
            Command::Inspect { file } => self.inspect(&file).await.map(|()| Failures::default()),
        };

        match result {
            Ok(failures) => {
                if !failures.incomplete.is_empty() {
                    warn!(
                        count = failures.incomplete.len(),
                        courses = failures.incomplete.join(" "),
                        "Some courses had timetable rows without a subject; check their pages"
                    );
                }
                if failures.failed.is_empty() {
                    return ExitCode::SUCCESS;
                }
                warn!(
                    count = failures.failed.len(),
                    courses = failures.failed.join(" "),
                    "Some courses failed; re-run them with `crawl --only <KEY>`"
                );
                ExitCode::from(2)
            }
            Err(e) => {
                error!(error = format!("{e:#}"), "Run aborted");
                ExitCode::FAILURE
            }
        }
    }

    async fn crawl(&self, output: &Path, schema: bool, only: &[String]) -> Result<Failures> {
        let client = PortalClient::new(&self.config)?;
        let main_page = self.fetch_main_page(&client).await?;
        let (semester, mut courses) = read_menus(&main_page)?;

        if !only.is_empty() {
            for key in only {
                if !courses.iter().any(|c| &c.key == key) {
                    warn!(course_key = key.as_str(), "Requested course is not offered this semester");
                }
            }
            courses.retain(|c| only.contains(&c.key));
        }

        let writer = SqlWriter::create(output, schema.then(sql::schema), self.cancel.clone())
            .await
            .with_context(|| format!("Failed to create {}", output.display()))?;

        let pipeline = Pipeline::new(
            Arc::new(client),
            ExtractSchedule,
            PipelineConfig::from(&self.config),
        );
        let mut outcomes = pipeline.spawn(links(&semester, courses), self.cancel.clone());
        let mut failures = Failures::default();

        while let Some(outcome) = outcomes.next().await {
            let course = outcome.link.course;
            match outcome.result {
                Ok(page) => {
                    let block = Block {
                        course_key: course.key.clone(),
                        bytes: sql::emit(&course, &page.subjects),
                    };
                    if writer.write(block).await.is_err() {
                        break;
                    }
                    failures.record_unattached(&course, page.unattached_rows);
                    info!(
                        course_key = course.key.as_str(),
                        subjects = page.subjects.len(),
                        schedules = page.subjects.iter().map(|s| s.schedules.len()).sum::<usize>(),
                        "Course crawled"
                    );
                }
                Err(e) => failures.record(&course, &e),
            }
        }

        let summary = outcomes.shutdown().await;
        let stats = writer.finish().await.context("Failed to write SQL output")?;
        log_summary("Crawl", summary, &self.cancel);
        info!(blocks = stats.blocks, bytes = stats.bytes, path = %output.display(), "SQL written");
        Ok(failures)
    }

    async fn download(&self, cache_root: &Path) -> Result<Failures> {
        let cache = PageCache::for_today(cache_root)
            .await
            .context("Failed to create cache folder")?;
        let client = PortalClient::new(&self.config)?;

        let main_page = self.fetch_main_page(&client).await?;
        cache
            .store_main_page(&main_page)
            .await
            .context("Failed to store main page")?;

        let (semester, courses) = read_menus(&main_page)?;
        cache.write_mapping(&courses).await?;
        info!(dir = %cache.dir().display(), courses = courses.len(), "Downloading course pages");

        let pipeline = Pipeline::new(Arc::new(client), KeepRaw, PipelineConfig::from(&self.config));
        let mut outcomes = pipeline.spawn(links(&semester, courses), self.cancel.clone());
        let mut failures = Failures::default();

        while let Some(outcome) = outcomes.next().await {
            let course = outcome.link.course;
            let stored = match outcome.result {
                Ok(body) => cache
                    .store_course_page(&course, &body)
                    .await
                    .map_err(CrawlError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = stored {
                failures.record(&course, &e);
            }
        }

        log_summary("Download", outcomes.shutdown().await, &self.cancel);
        Ok(failures)
    }

    /// Extracts every cached course page concurrently into one SQL file.
    async fn parse(&self, dir: PathBuf, output: &Path, schema: bool) -> Result<Failures> {
        let cache = PageCache::open(dir);
        let mappings = cache.read_mapping().await?;
        let writer = SqlWriter::create(output, schema.then(sql::schema), self.cancel.clone())
            .await
            .with_context(|| format!("Failed to create {}", output.display()))?;

        let total = mappings.len();
        let start = Instant::now();
        let mut tasks = JoinSet::new();
        for mapping in mappings {
            let course = mapping.course();
            let path = cache.course_page_path(&course);
            tasks.spawn_blocking(move || {
                let result = extract_cached(&path, &course);
                (course, result)
            });
        }

        let mut failures = Failures::default();
        let mut done = 0usize;
        loop {
            let joined = tokio::select! {
                _ = self.cancel.cancelled() => break,
                joined = tasks.join_next() => match joined {
                    Some(joined) => joined,
                    None => break,
                },
            };

            let (course, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = ?e, "Extraction task panicked");
                    continue;
                }
            };
            done += 1;

            match result {
                Ok((bytes, unattached_rows)) => {
                    let block = Block {
                        course_key: course.key.clone(),
                        bytes,
                    };
                    if writer.write(block).await.is_err() {
                        break;
                    }
                    failures.record_unattached(&course, unattached_rows);
                    info!(course_key = course.key.as_str(), done, total, "Course parsed");
                }
                Err(e) => failures.record(&course, &e),
            }
        }

        tasks.shutdown().await;
        let stats = writer.finish().await.context("Failed to write SQL output")?;
        info!(
            done,
            total,
            failed = failures.failed.len(),
            blocks = stats.blocks,
            duration = fmt_duration(start.elapsed()),
            path = %output.display(),
            "Parse finished"
        );
        Ok(failures)
    }

    async fn inspect(&self, file: &Path) -> Result<()> {
        let body = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let (semester, courses) = read_menus(&body)?;

        println!("{} ({})", semester.text, semester.key);
        for course in &courses {
            println!("{:>20}  {:<24} {}", course.id(), course.key, course.text);
        }
        info!(courses = courses.len(), "Inspected main page");
        Ok(())
    }

    async fn fetch_main_page(&self, client: &PortalClient) -> Result<Vec<u8>> {
        let start = Instant::now();
        let body = client
            .fetch_main_page()
            .await
            .context("Failed to fetch the portal's main page")?;
        log_if_slow(start, SLOW_MAIN_PAGE, "fetch main page");
        Ok(body)
    }
}

/// Reads the selected semester and the course menu from a main page.
fn read_menus(body: &[u8]) -> Result<(AcademicSemester, Vec<Course>)> {
    let doc = parser::parse_document(body);
    let semester = parser::find_latest_semester(&doc).context("Main page has no selected semester")?;
    let courses = parser::find_courses(&doc);
    info!(
        semester = semester.text.as_str(),
        semester_key = semester.key.as_str(),
        courses = courses.len(),
        "Read portal menus"
    );
    Ok((semester, courses))
}

fn links(semester: &AcademicSemester, courses: Vec<Course>) -> Vec<CourseLink> {
    courses
        .into_iter()
        .map(|course| CourseLink::new(semester.clone(), course))
        .collect()
}

/// Emits the SQL block of a cached page, with its count of dropped rows.
fn extract_cached(path: &Path, course: &Course) -> Result<(Vec<u8>, usize), CrawlError> {
    let body = std::fs::read(path)?;
    let doc = parser::parse_document(&body);
    let page = parser::extract_course_page(&doc)?;
    Ok((sql::emit(course, &page.subjects), page.unattached_rows))
}

fn log_summary(what: &str, summary: CrawlSummary, cancel: &CancellationToken) {
    info!(
        completed = summary.completed,
        failed = summary.failed,
        duplicates = summary.duplicates,
        cancelled = cancel.is_cancelled(),
        "{what} finished"
    );
}
