//! Classification of the course-query result tables and timetable parsing.
//!
//! A course query answers with a flat run of `<table>`s. A two-row "subject
//! header" table (code, title, AUs) is followed by the timetable of that
//! subject, recognizable only by its header row:
//!
//! ```text
//! INDEX | TYPE | GROUP | DAY | TIME | VENUE | REMARK
//! ```
//!
//! Nothing links the two tables except their order in the document. Rows of
//! one index share a single `INDEX` cell in the rendered page, so only the
//! first row of each index carries it.

use super::errors::ParseError;
use super::matchers::{ByTag, StopAt};
use super::models::{Schedule, Subject};
use super::walk::{collapsed_text, first_text, traverse};
use chrono::{DateTime, NaiveDate, Utc};
use html_scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::{debug, trace, warn};

/// Header row of a timetable, in order.
pub const SCHEDULE_SIGNATURE: [&str; 7] = ["INDEX", "TYPE", "GROUP", "DAY", "TIME", "VENUE", "REMARK"];

/// What a `<table>` on a course page holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Schedule,
    SubjectHeader,
    Other,
}

/// Classifies a `<table>` element by its header text and row count.
pub fn classify(table: ElementRef<'_>) -> TableKind {
    let headers: Vec<&str> = traverse(table, &ByTag("th"))
        .into_iter()
        .map(|th| first_text(th).unwrap_or_default())
        .collect();

    if headers == SCHEDULE_SIGNATURE {
        TableKind::Schedule
    } else if traverse(table, &ByTag("tr")).len() == 2 {
        TableKind::SubjectHeader
    } else {
        TableKind::Other
    }
}

/// Subjects of one course-query response.
#[derive(Debug, Default, Clone)]
pub struct CoursePage {
    pub subjects: Vec<Subject>,
    /// Timetable rows that had no subject header before them and were dropped.
    pub unattached_rows: usize,
}

/// Extracts every subject and its timetable from a course-query response.
///
/// Any malformed timetable row fails the whole page; a partially parsed
/// subject is never returned.
pub fn extract_course_page(doc: &Html) -> Result<CoursePage, ParseError> {
    let mut page = CoursePage::default();
    let mut pending: Option<Subject> = None;

    for table in traverse(doc.root_element(), &ByTag("table")) {
        match classify(table) {
            TableKind::Schedule => {
                let schedules = parse_schedule_rows(table)?;
                match pending.take() {
                    Some(mut subject) => {
                        trace!(
                            subject = subject.id.as_str(),
                            rows = schedules.len(),
                            "Attached timetable to subject"
                        );
                        subject.schedules = schedules;
                        page.subjects.push(subject);
                    }
                    None => {
                        warn!(
                            rows = schedules.len(),
                            "Timetable without a preceding subject header, skipping"
                        );
                        page.unattached_rows += schedules.len();
                    }
                }
            }
            TableKind::SubjectHeader => {
                let Some(subject) = parse_subject(table) else {
                    trace!("Two-row table without data cells, ignoring");
                    continue;
                };
                if let Some(previous) = pending.replace(subject) {
                    debug!(
                        subject = previous.id.as_str(),
                        "Subject header had no timetable, replaced"
                    );
                }
            }
            TableKind::Other => {}
        }
    }

    Ok(page)
}

/// [`extract_course_page`] without the count of dropped rows.
pub fn find_schedule(doc: &Html) -> Result<Vec<Subject>, ParseError> {
    extract_course_page(doc).map(|page| page.subjects)
}

/// Reads `id`, `title` and the raw AU text from the first row with data cells.
fn parse_subject(table: ElementRef<'_>) -> Option<Subject> {
    let row = traverse(table, &ByTag("tr"))
        .into_iter()
        .find(|row| !cells(*row).is_empty())?;

    let mut columns = cells(row).into_iter().map(collapsed_text);
    Some(Subject {
        id: columns.next().unwrap_or_default(),
        title: columns.next().unwrap_or_default(),
        au_raw: columns.next().unwrap_or_default(),
        schedules: Vec::new(),
    })
}

/// Data cells of a row, not descending into nested tables.
fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    traverse(row, &StopAt(ByTag("td")))
}

fn parse_schedule_rows(table: ElementRef<'_>) -> Result<Vec<Schedule>, ParseError> {
    let mut schedules = Vec::new();
    let mut carried_index: Option<String> = None;

    for (row_number, row) in traverse(table, &ByTag("tr")).into_iter().enumerate().skip(1) {
        let cells = cells(row);
        if cells.is_empty() {
            trace!(row = row_number, "Timetable row without data cells, skipping");
            continue;
        }

        let mut schedule = Schedule {
            index: String::new(),
            kind: String::new(),
            group: String::new(),
            day: String::new(),
            time_text: String::new(),
            time_start: DateTime::<Utc>::UNIX_EPOCH,
            time_end: DateTime::<Utc>::UNIX_EPOCH,
            venue: String::new(),
            remark: String::new(),
        };

        for (column, cell) in cells.into_iter().enumerate() {
            let text = collapsed_text(cell);
            match column {
                0 => {
                    if !text.is_empty() {
                        carried_index = Some(text);
                    }
                }
                1 => schedule.kind = text,
                2 => schedule.group = text,
                3 => schedule.day = text,
                4 => schedule.time_text = text,
                5 => schedule.venue = text,
                6 => schedule.remark = text,
                _ => warn!(
                    row = row_number,
                    column,
                    text = text.as_str(),
                    "Unexpected timetable column, ignoring"
                ),
            }
        }

        schedule.index = carried_index
            .clone()
            .ok_or(ParseError::MissingIndex { row: row_number })?;
        (schedule.time_start, schedule.time_end) = parse_time_range(&schedule.time_text)?;
        schedules.push(schedule);
    }

    Ok(schedules)
}

/// Parses `"HHMM-HHMM"` into two instants on a fixed calendar date.
///
/// Empty text (classes without a fixed slot) yields the Unix epoch for both.
pub fn parse_time_range(text: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), ParseError> {
    static TIME_RANGE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"^(\d{2})(\d{2})\s*-\s*(\d{2})(\d{2})$").unwrap()
    });

    if text.is_empty() {
        return Ok((DateTime::<Utc>::UNIX_EPOCH, DateTime::<Utc>::UNIX_EPOCH));
    }

    let invalid = || ParseError::InvalidTime {
        text: text.to_string(),
    };
    let caps = TIME_RANGE_RE.captures(text).ok_or_else(invalid)?;
    let start = time_of_day(&caps[1], &caps[2]).ok_or_else(invalid)?;
    let end = time_of_day(&caps[3], &caps[4]).ok_or_else(invalid)?;
    Ok((start, end))
}

fn time_of_day(hour: &str, minute: &str) -> Option<DateTime<Utc>> {
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    NaiveDate::from_ymd_opt(2018, 9, 12)?
        .and_hms_opt(hour, minute, 0)
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const HEADER: &str = "<tr><th><b>INDEX</b></th><th><b>TYPE</b></th><th><b>GROUP</b></th><th><b>DAY</b></th><th><b>TIME</b></th><th><b>VENUE</b></th><th><b>REMARK</b></th></tr>";

    fn row(cells: &[&str]) -> String {
        let tds: String = cells.iter().map(|c| format!("<td><b>{c}</b></td>")).collect();
        format!("<tr>{tds}</tr>")
    }

    fn schedule_table(rows: &[&[&str]]) -> String {
        let body: String = rows.iter().map(|r| row(r)).collect();
        format!("<table>{HEADER}{body}</table>")
    }

    fn first_table_kind(html: &str) -> TableKind {
        let doc = Html::parse_document(html);
        let table = traverse(doc.root_element(), &ByTag("table"))[0];
        classify(table)
    }

    fn rows_of(html: &str) -> Result<Vec<Schedule>, ParseError> {
        let doc = Html::parse_document(html);
        let table = traverse(doc.root_element(), &ByTag("table"))[0];
        parse_schedule_rows(table)
    }

    // --- classify ---

    #[test]
    fn test_classify_schedule_signature() {
        let html = schedule_table(&[&["00810", "LEC", "LE", "WED", "1830-2130", "LT19A", ""]]);
        assert_eq!(first_table_kind(&html), TableKind::Schedule);
    }

    #[test]
    fn test_classify_reordered_signature_is_not_schedule() {
        let html = "<table><tr><th>INDEX</th><th>GROUP</th><th>TYPE</th><th>DAY</th><th>TIME</th><th>VENUE</th><th>REMARK</th></tr><tr><td>1</td></tr><tr><td>2</td></tr></table>";
        assert_eq!(first_table_kind(html), TableKind::Other);
    }

    #[test]
    fn test_classify_extra_header_is_not_schedule() {
        let html = "<table><tr><th>INDEX</th><th>TYPE</th><th>GROUP</th><th>DAY</th><th>TIME</th><th>VENUE</th><th>REMARK</th><th>WEEKS</th></tr></table>";
        assert_eq!(first_table_kind(html), TableKind::Other);
    }

    #[test]
    fn test_classify_two_row_schedule_stays_schedule() {
        let html = schedule_table(&[&["00810", "LEC", "LE", "WED", "", "", ""]]);
        assert_eq!(first_table_kind(&html), TableKind::Schedule);
    }

    #[test]
    fn test_classify_subject_header() {
        let html = "<table><tr><td>AB0601</td><td>TITLE</td><td>3.0 AU</td></tr><tr><td>Prerequisite</td></tr></table>";
        assert_eq!(first_table_kind(html), TableKind::SubjectHeader);
    }

    #[test]
    fn test_classify_other() {
        let html = "<table><tr><td>a</td></tr><tr><td>b</td></tr><tr><td>c</td></tr></table>";
        assert_eq!(first_table_kind(html), TableKind::Other);
    }

    // --- parse_schedule_rows ---

    #[test]
    fn test_blank_index_inherits_previous() {
        let html = schedule_table(&[
            &["00810", "LEC/STUDIO", "LE", "WED", "1830-2130", "LT19A", ""],
            &["", "TUT", "T1", "MON", "0930-1030", "TR+12", "Teaching Wk2-13"],
        ]);
        let rows = rows_of(&html).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].index, "00810");
        assert_eq!(rows[1].remark, "Teaching Wk2-13");
    }

    #[test]
    fn test_new_index_replaces_carried_one() {
        let html = schedule_table(&[
            &["00810", "LEC", "LE", "WED", "", "", ""],
            &["", "TUT", "T1", "MON", "", "", ""],
            &["00811", "LEC", "LE", "THU", "", "", ""],
            &["", "TUT", "T2", "FRI", "", "", ""],
        ]);
        let indexes: Vec<_> = rows_of(&html)
            .unwrap()
            .into_iter()
            .map(|s| s.index)
            .collect();
        assert_eq!(indexes, vec!["00810", "00810", "00811", "00811"]);
    }

    #[test]
    fn test_blank_first_index_is_error() {
        let html = schedule_table(&[&["", "LEC", "LE", "WED", "1830-2130", "LT19A", ""]]);
        assert!(matches!(rows_of(&html), Err(ParseError::MissingIndex { row: 1 })));
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let html = schedule_table(&[&["00810", "LEC", "LE", "WED", "1830-2130", "LT19A", "", "extra"]]);
        let rows = rows_of(&html).unwrap();
        assert_eq!(rows[0].venue, "LT19A");
        assert_eq!(rows[0].remark, "");
    }

    #[test]
    fn test_invalid_time_fails_table() {
        let html = schedule_table(&[
            &["00810", "LEC", "LE", "WED", "1830-2130", "LT19A", ""],
            &["", "TUT", "T1", "MON", "9:30-10:30", "TR+12", ""],
        ]);
        assert!(matches!(rows_of(&html), Err(ParseError::InvalidTime { .. })));
    }

    #[test]
    fn test_empty_time_is_zero_instant() {
        let html = schedule_table(&[&["00810", "LEC", "LE", "", "", "", "Online"]]);
        let rows = rows_of(&html).unwrap();
        assert_eq!(rows[0].time_start, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(rows[0].time_end, DateTime::<Utc>::UNIX_EPOCH);
    }

    // --- parse_time_range ---

    #[test]
    fn test_parse_time_range_evening() {
        let (start, end) = parse_time_range("1830-2130").unwrap();
        assert_eq!((start.hour(), start.minute()), (18, 30));
        assert_eq!((end.hour(), end.minute()), (21, 30));
        assert_eq!(start.date_naive(), end.date_naive());
    }

    #[test]
    fn test_parse_time_range_empty() {
        let (start, end) = parse_time_range("").unwrap();
        assert_eq!(start, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(end, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_parse_time_range_rejects_malformed() {
        for text in ["1830", "1830-", "18:30-21:30", "183-2130", "ab30-2130", "2530-2600", "1860-1900"] {
            assert!(
                matches!(parse_time_range(text), Err(ParseError::InvalidTime { .. })),
                "expected InvalidTime for {text:?}"
            );
        }
    }
}
