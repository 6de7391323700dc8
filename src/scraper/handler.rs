//! What a worker does with a fetched course page.

use super::CrawlError;
use crate::parser::{self, CourseLink, CoursePage};

/// Turns a raw course-query response into the pipeline's output.
///
/// Runs synchronously on the worker task; the parsed document never
/// crosses an await point.
pub trait PageHandler: Send + Sync {
    type Output: Send + 'static;

    fn handle(&self, link: &CourseLink, body: Vec<u8>) -> Result<Self::Output, CrawlError>;
}

/// Extracts every subject and its timetable.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractSchedule;

impl PageHandler for ExtractSchedule {
    type Output = CoursePage;

    fn handle(&self, _link: &CourseLink, body: Vec<u8>) -> Result<CoursePage, CrawlError> {
        let doc = parser::parse_document(&body);
        Ok(parser::extract_course_page(&doc)?)
    }
}

/// Passes the response body through untouched, for the page cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepRaw;

impl PageHandler for KeepRaw {
    type Output = Vec<u8>;

    fn handle(&self, _link: &CourseLink, body: Vec<u8>) -> Result<Vec<u8>, CrawlError> {
        Ok(body)
    }
}
