//! Records extracted from the schedule portal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1 over the concatenated bytes of `parts`.
///
/// Course ids name cached pages on disk, so the function must never change.
pub fn fnv1_64(parts: &[&str]) -> u64 {
    parts
        .iter()
        .flat_map(|part| part.bytes())
        .fold(FNV_OFFSET_BASIS, |hash, byte| {
            hash.wrapping_mul(FNV_PRIME) ^ u64::from(byte)
        })
}

/// The academic semester currently selected on the portal's main page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicSemester {
    /// Opaque form value, e.g. `"2018;1"`.
    pub key: String,
    /// Display text, e.g. `"Acad Yr 2018 Semester 1"`.
    pub text: String,
}

impl AcademicSemester {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

impl PartialEq for AcademicSemester {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for AcademicSemester {}

/// A course-of-study option from the portal's course menu.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Course {
    pub key: String,
    pub text: String,
}

impl Course {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }

    /// Stable identifier derived from `key` alone.
    pub fn id(&self) -> u64 {
        fnv1_64(&[&self.key])
    }
}

/// One unit of crawl work: a course queried within a semester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseLink {
    pub semester: AcademicSemester,
    pub course: Course,
}

impl CourseLink {
    pub fn new(semester: AcademicSemester, course: Course) -> Self {
        Self { semester, course }
    }
}

impl fmt::Display for CourseLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "acadsem={}&r_course_yr={}",
            self.semester.key, self.course.key
        )
    }
}

/// A subject (module) offered under a course, with its timetable rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub title: String,
    /// Academic units exactly as printed, e.g. `"3.0 AU"`.
    pub au_raw: String,
    pub schedules: Vec<Schedule>,
}

impl PartialEq for Subject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subject {}

/// A single lecture/tutorial/lab row of a subject's timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub index: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub group: String,
    pub day: String,
    pub time_text: String,
    /// Only the time of day is meaningful.
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub venue: String,
    pub remark: String,
}

impl Schedule {
    /// Identifier over everything but `remark` and the parsed times.
    pub fn id(&self) -> u64 {
        fnv1_64(&[
            &self.index,
            &self.kind,
            &self.group,
            &self.day,
            &self.time_text,
            &self.venue,
        ])
    }
}
