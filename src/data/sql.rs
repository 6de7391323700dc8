//! SQL statements for one crawled course.

use crate::parser::{Course, Subject};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

/// Table definitions the emitted statements insert into.
pub fn schema() -> &'static str {
    include_str!("../../sql/init.sql")
}

/// Renders one self-contained transaction for `course`.
///
/// Each subject contributes one `subject` row per timetable row (carrying that
/// row's index) followed by the timetable rows themselves. Values are quoted
/// but not escaped: a `"` in the source text produces broken SQL.
pub fn emit(course: &Course, subjects: &[Subject]) -> Vec<u8> {
    let mut sql = String::new();
    sql.push_str("BEGIN TRANSACTION;\n");
    let _ = writeln!(sql, "-- Schedules for {}", course.text);

    for subject in subjects {
        for schedule in &subject.schedules {
            let _ = writeln!(
                sql,
                r#"INSERT INTO subject(id, schedule_index, title, rawAU) VALUES("{}","{}","{}","{}");"#,
                subject.id, schedule.index, subject.title, subject.au_raw
            );
        }
        for schedule in &subject.schedules {
            let _ = writeln!(
                sql,
                r#"INSERT INTO schedule(schedule_index, schedule_type, schedule_group, day, timeText, timeStart, timeEnd, venue, remark) VALUES("{}","{}","{}","{}","{}","{}","{}","{}","{}");"#,
                schedule.index,
                schedule.kind,
                schedule.group,
                schedule.day,
                schedule.time_text,
                timestamp(schedule.time_start),
                timestamp(schedule.time_end),
                schedule.venue,
                schedule.remark
            );
        }
    }

    sql.push_str("COMMIT;\n");
    sql.into_bytes()
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
