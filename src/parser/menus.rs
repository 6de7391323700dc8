//! Extractors for the `<select>` menus on the portal's main page.

use super::errors::ParseError;
use super::matchers::{And, ByAttribute, ByTag, HasAttribute, NonBlankAttribute, StopAt};
use super::models::{AcademicSemester, Course};
use super::walk::{first_text, traverse};
use html_scraper::{ElementRef, Html};
use tracing::{debug, warn};

/// `name` of the semester menu, also the form key of the course query.
pub const SEMESTER_MENU: &str = "acadsem";

/// `name` of the course menu, also the form key of the course query.
pub const COURSE_MENU: &str = "r_course_yr";

/// The first `<select>` in document order whose `name` is `name`.
fn find_menu<'a>(doc: &'a Html, name: &'static str) -> Option<ElementRef<'a>> {
    traverse(
        doc.root_element(),
        &StopAt(And(ByTag("select"), ByAttribute::new("name", name))),
    )
    .into_iter()
    .next()
}

/// Finds the semester currently selected in the semester menu.
///
/// A missing menu and a menu with nothing selected are the same failure: the
/// current semester cannot be determined.
pub fn find_latest_semester(doc: &Html) -> Result<AcademicSemester, ParseError> {
    let menu = find_menu(doc, SEMESTER_MENU).ok_or(ParseError::NotFound("selected semester"))?;

    let option = traverse(
        menu,
        &StopAt(And(ByTag("option"), HasAttribute("selected"))),
    )
    .into_iter()
    .next()
    .ok_or(ParseError::NotFound("selected semester"))?;

    let key = option
        .value()
        .attr("value")
        .ok_or(ParseError::MissingAttribute {
            tag: "option",
            attribute: "value",
        })?;

    let semester = AcademicSemester::new(key, first_text(option).unwrap_or_default());
    debug!(key = semester.key.as_str(), text = semester.text.as_str(), "Found selected semester");
    Ok(semester)
}

/// Lists every course option with a non-blank value, in document order.
///
/// Blank-valued options are "select a course" placeholders. Duplicate values
/// are kept since the portal repeats some courses under different headings.
pub fn find_courses(doc: &Html) -> Vec<Course> {
    let Some(menu) = find_menu(doc, COURSE_MENU) else {
        warn!(menu = COURSE_MENU, "Course menu not found");
        return Vec::new();
    };

    let courses: Vec<Course> = traverse(menu, &And(ByTag("option"), NonBlankAttribute("value")))
        .into_iter()
        .filter_map(|option| {
            let key = option.value().attr("value")?;
            Some(Course::new(key, first_text(option).unwrap_or_default()))
        })
        .collect();

    debug!(count = courses.len(), "Found course options");
    courses
}
