//! Structural extraction from the schedule portal's HTML.

pub mod errors;
pub mod matchers;
pub mod menus;
pub mod models;
pub mod schedule;
pub mod walk;

pub use errors::ParseError;
pub use menus::{find_courses, find_latest_semester};
pub use models::{AcademicSemester, Course, CourseLink, Schedule, Subject};
pub use schedule::{CoursePage, extract_course_page, find_schedule};

use html_scraper::Html;

/// Parses a raw response body. Bytes that are not valid UTF-8 become U+FFFD
/// so one stray byte in a remark does not cost the whole course.
pub fn parse_document(bytes: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(bytes))
}
