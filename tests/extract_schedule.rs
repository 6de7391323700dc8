//! Extraction against whole portal pages, from raw bytes to SQL.

mod helpers;

use helpers::{course_page, main_page, schedule_table, subject_header};
use roomfinder::data::sql;
use roomfinder::parser::{self, Course, ParseError};

fn communication_management() -> String {
    course_page(&[
        subject_header("AB0601", "COMMUNICATION MANAGEMENT FUNDAMENTALS", "3.0 AU"),
        schedule_table(&[
            ["00810", "LEC/STUDIO", "LE", "WED", "1830-2130", "LT19A", ""],
            ["", "SEM", "S1", "WED", "1330-1430", "LT19A", "Teaching Wk2-13"],
            ["00810", "SEM", "S1", "THU", "0930-1030", "TR+12", ""],
        ]),
    ])
}

#[test]
fn test_single_subject_end_to_end() {
    let doc = parser::parse_document(communication_management().as_bytes());
    let subjects = parser::find_schedule(&doc).unwrap();

    assert_eq!(subjects.len(), 1);
    let subject = &subjects[0];
    assert_eq!(subject.id, "AB0601");
    assert_eq!(subject.title, "COMMUNICATION MANAGEMENT FUNDAMENTALS");
    assert_eq!(subject.au_raw, "3.0 AU");
    assert_eq!(subject.schedules.len(), 3);
    assert!(subject.schedules.iter().all(|s| s.index == "00810"));
    assert_eq!(subject.schedules[1].remark, "Teaching Wk2-13");
    assert_eq!(subject.schedules[2].day, "THU");
}

#[test]
fn test_subjects_pair_with_following_timetable() {
    let html = course_page(&[
        subject_header("AB0601", "FIRST", "3.0 AU"),
        schedule_table(&[["00810", "LEC", "LE", "WED", "1830-2130", "LT19A", ""]]),
        subject_header("AB0602", "SECOND", "2.0 AU"),
        schedule_table(&[
            ["00900", "LEC", "LE", "MON", "0830-1030", "LT1", ""],
            ["00901", "TUT", "T1", "TUE", "1030-1130", "TR+1", ""],
        ]),
    ]);
    let doc = parser::parse_document(html.as_bytes());
    let subjects = parser::find_schedule(&doc).unwrap();

    let summary: Vec<(&str, usize)> = subjects
        .iter()
        .map(|s| (s.id.as_str(), s.schedules.len()))
        .collect();
    assert_eq!(summary, vec![("AB0601", 1), ("AB0602", 2)]);
}

#[test]
fn test_timetable_before_any_header_is_skipped() {
    let html = course_page(&[
        schedule_table(&[["00700", "LEC", "LE", "FRI", "", "", ""]]),
        subject_header("AB0601", "FIRST", "3.0 AU"),
        schedule_table(&[["00810", "LEC", "LE", "WED", "1830-2130", "LT19A", ""]]),
    ]);
    let doc = parser::parse_document(html.as_bytes());
    let page = parser::extract_course_page(&doc).unwrap();

    assert_eq!(page.subjects.len(), 1);
    assert_eq!(page.subjects[0].schedules[0].index, "00810");
    assert_eq!(page.unattached_rows, 1);
}

#[test]
fn test_latin1_remark_keeps_course() {
    let html = course_page(&[
        subject_header("AB0601", "COMMUNICATION MANAGEMENT FUNDAMENTALS", "3.0 AU"),
        schedule_table(&[
            ["00810", "LEC", "LE", "WED", "1830-2130", "LT19A", "Caf\u{e9}"],
            ["", "SEM", "S1", "THU", "0930-1030", "TR+12", ""],
        ]),
    ]);
    // Re-encode as ISO-8859-1: every char of the page is below U+0100.
    let latin1: Vec<u8> = html.chars().map(|c| c as u8).collect();
    assert!(std::str::from_utf8(&latin1).is_err());

    let doc = parser::parse_document(&latin1);
    let subjects = parser::find_schedule(&doc).unwrap();

    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0].schedules.len(), 2);
    assert_eq!(subjects[0].schedules[0].remark, "Caf\u{FFFD}");
    assert_eq!(subjects[0].schedules[1].index, "00810");
}

#[test]
fn test_header_without_timetable_is_replaced() {
    let html = course_page(&[
        subject_header("AB0600", "ORPHAN", "1.0 AU"),
        subject_header("AB0601", "FIRST", "3.0 AU"),
        schedule_table(&[["00810", "LEC", "LE", "WED", "", "", ""]]),
    ]);
    let doc = parser::parse_document(html.as_bytes());
    let subjects = parser::find_schedule(&doc).unwrap();

    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0].id, "AB0601");
}

#[test]
fn test_one_bad_row_fails_whole_course() {
    let html = course_page(&[
        subject_header("AB0601", "FIRST", "3.0 AU"),
        schedule_table(&[["00810", "LEC", "LE", "WED", "1830-2130", "LT19A", ""]]),
        subject_header("AB0602", "SECOND", "2.0 AU"),
        schedule_table(&[["00900", "LEC", "LE", "MON", "TBA", "LT1", ""]]),
    ]);
    let doc = parser::parse_document(html.as_bytes());

    assert!(matches!(
        parser::find_schedule(&doc),
        Err(ParseError::InvalidTime { text }) if text == "TBA"
    ));
}

#[test]
fn test_page_without_tables_has_no_subjects() {
    let doc = parser::parse_document(b"<html><body>No classes found</body></html>");
    assert!(parser::find_schedule(&doc).unwrap().is_empty());
}

#[test]
fn test_main_page_menus() {
    let html = main_page(
        &[
            ("2018;2", "Acad Yr 2018 Semester 2", false),
            ("2018;1", "Acad Yr 2018 Semester 1", true),
        ],
        &[("ADM;1;F;1", "ADM 1"), ("AERO;1;F;1", "AERO 1"), ("ADM;1;F;1", "ADM 1")],
    );
    let doc = parser::parse_document(html.as_bytes());

    let semester = parser::find_latest_semester(&doc).unwrap();
    assert_eq!(semester.key, "2018;1");
    assert_eq!(semester.text, "Acad Yr 2018 Semester 1");

    let keys: Vec<String> = parser::find_courses(&doc).into_iter().map(|c| c.key).collect();
    assert_eq!(keys, vec!["ADM;1;F;1", "AERO;1;F;1", "ADM;1;F;1"]);
}

#[test]
fn test_sql_for_crawled_course() {
    let doc = parser::parse_document(communication_management().as_bytes());
    let subjects = parser::find_schedule(&doc).unwrap();
    let out = String::from_utf8(sql::emit(&Course::new("ADM;1;F;1", "ADM 1"), &subjects)).unwrap();

    assert!(out.starts_with("BEGIN TRANSACTION;\n"));
    assert!(out.ends_with("COMMIT;\n"));
    assert_eq!(out.matches("INSERT INTO subject(").count(), 3);
    assert_eq!(out.matches("INSERT INTO schedule(").count(), 3);
    assert!(out.contains(r#""00810","LEC/STUDIO","LE","WED","1830-2130","2018-09-12T18:30:00Z","2018-09-12T21:30:00Z","LT19A","""#));
}
