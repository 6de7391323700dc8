#![allow(dead_code)]

use async_trait::async_trait;
use roomfinder::parser::{AcademicSemester, Course, CourseLink};
use roomfinder::portal::{CourseFetcher, PortalError};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

// --- portal markup ---

/// A main page with the given semester options (`(value, text, selected)`)
/// and course options (`(value, text)`).
pub fn main_page(semesters: &[(&str, &str, bool)], courses: &[(&str, &str)]) -> String {
    let semester_options: String = semesters
        .iter()
        .map(|(value, text, selected)| {
            let selected = if *selected { " selected" } else { "" };
            format!("<option value=\"{value}\"{selected}>{text}</option>")
        })
        .collect();
    let course_options: String = courses
        .iter()
        .map(|(value, text)| format!("<option value=\"{value}\">{text}</option>"))
        .collect();

    format!(
        r#"<html><head><title>Class Schedule</title></head><body>
<form name="frm" method="post" action="AUS_SCHEDULE.main_display1">
<table><tr><td>
<select name="acadsem" size="1">{semester_options}</select>
</td></tr><tr><td>
<select name="r_course_yr" size="1"><option value="">---Select an Option---</option>{course_options}</select>
</td></tr></table>
</form></body></html>"#
    )
}

/// The two-row table announcing a subject.
pub fn subject_header(id: &str, title: &str, au: &str) -> String {
    format!(
        r##"<table border="0">
<tr><td width="100"><b><font color="#0000FF">{id}</font></b></td><td width="500"><b><font color="#0000FF">{title}</font></b></td><td width="50"><b><font color="#0000FF">   {au}</font></b></td></tr>
<tr><td colspan="3"><b><font color="#FF00FF">Prerequisite:</font></b></td></tr>
</table>"##
    )
}

/// A timetable with the standard header row. Each row is seven cells.
pub fn schedule_table(rows: &[[&str; 7]]) -> String {
    let body: String = rows
        .iter()
        .map(|cells| {
            let tds: String = cells.iter().map(|c| format!("<td><b>{c}</b></td>")).collect();
            format!("<tr bgcolor=\"#EEEEEE\">{tds}</tr>\n")
        })
        .collect();
    format!(
        "<table border>\n<tr><th><b>INDEX</b></th><th><b>TYPE</b></th><th><b>GROUP</b></th><th><b>DAY</b></th><th><b>TIME</b></th><th><b>VENUE</b></th><th><b>REMARK</b></th></tr>\n{body}</table>"
    )
}

/// Wraps tables into a full course-query response.
pub fn course_page(tables: &[String]) -> String {
    format!(
        "<html><body><center><b>Class Schedule</b></center><hr size=2>\n{}\n</body></html>",
        tables.join("\n<br>\n")
    )
}

pub fn link(key: &str) -> CourseLink {
    CourseLink::new(
        AcademicSemester::new("2018;1", "Acad Yr 2018 Semester 1"),
        Course::new(key, format!("Course {key}")),
    )
}

// --- scripted portal ---

#[derive(Debug, Clone)]
pub enum Step {
    /// Answer with `body` after a delay.
    Respond(Duration, &'static str),
    /// Answer with a 500 after a delay.
    Fail(Duration),
    /// Never answer.
    Hang,
}

/// A fake portal answering each course key from a script, one step per call.
/// Keys without remaining steps answer immediately with an empty page.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, key: &str, steps: impl IntoIterator<Item = Step>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(key.to_string(), steps.into_iter().collect());
        self
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(k, _)| k == key).count()
    }
}

#[async_trait]
impl CourseFetcher for ScriptedFetcher {
    async fn fetch_course(&self, link: &CourseLink) -> Result<Vec<u8>, PortalError> {
        let key = link.course.key.clone();
        self.calls.lock().unwrap().push((key.clone(), Instant::now()));

        let step = self
            .script
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Respond(Duration::ZERO, "<html></html>"));

        match step {
            Step::Respond(after, body) => {
                tokio::time::sleep(after).await;
                Ok(body.as_bytes().to_vec())
            }
            Step::Fail(after) => {
                tokio::time::sleep(after).await;
                Err(PortalError::Status {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    url: format!("http://portal.test/{key}"),
                })
            }
            Step::Hang => std::future::pending().await,
        }
    }
}
