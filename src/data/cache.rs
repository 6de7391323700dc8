//! Dated on-disk cache of raw portal pages.
//!
//! ```text
//! <root>/<YYYY-MM-DD>/main.html
//! <root>/<YYYY-MM-DD>/<course id>.html
//! <root>/<YYYY-MM-DD>/mapping.json
//! ```

use super::mapping::{self, CourseMapping};
use crate::parser::Course;
use anyhow::Context;
use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MAIN_PAGE: &str = "main.html";
pub const MAPPING_FILE: &str = "mapping.json";

#[derive(Debug, Clone)]
pub struct PageCache {
    dir: PathBuf,
}

impl PageCache {
    /// Creates (if needed) the folder for today's UTC date under `root`.
    pub async fn for_today(root: &Path) -> io::Result<Self> {
        let folder = Utc::now().format("%Y-%m-%d").to_string();
        Self::create(root.join(folder)).await
    }

    pub async fn create(dir: PathBuf) -> io::Result<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// An existing cache folder. Nothing is checked until something is read.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn main_page_path(&self) -> PathBuf {
        self.dir.join(MAIN_PAGE)
    }

    pub fn course_page_path(&self, course: &Course) -> PathBuf {
        self.dir.join(format!("{}.html", course.id()))
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.dir.join(MAPPING_FILE)
    }

    pub async fn store_main_page(&self, body: &[u8]) -> io::Result<()> {
        store(&self.main_page_path(), body).await
    }

    pub async fn store_course_page(&self, course: &Course, body: &[u8]) -> io::Result<()> {
        store(&self.course_page_path(course), body).await
    }

    pub async fn read_course_page(&self, course: &Course) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.course_page_path(course)).await
    }

    pub async fn write_mapping(&self, courses: &[Course]) -> anyhow::Result<()> {
        let mappings: Vec<_> = courses.iter().map(CourseMapping::new).collect();
        let json = mapping::to_json(&mappings).context("Failed to serialize course mapping")?;
        store(&self.mapping_path(), &json)
            .await
            .with_context(|| format!("Failed to write {}", self.mapping_path().display()))
    }

    pub async fn read_mapping(&self) -> anyhow::Result<Vec<CourseMapping>> {
        let path = self.mapping_path();
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        mapping::from_json(&text).with_context(|| format!("Invalid course mapping in {}", path.display()))
    }
}

async fn store(path: &Path, body: &[u8]) -> io::Result<()> {
    debug!(path = %path.display(), bytes = body.len(), "Storing page");
    tokio::fs::write(path, body).await
}
