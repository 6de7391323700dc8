//! `mapping.json`: which cached page belongs to which course.
//!
//! A JSON array of `{"Key", "Text", "Index"}` objects, indented with four
//! spaces, where `Index` is the course id that names the cached page.

use super::json::parse_json_with_context;
use crate::parser::Course;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseMapping {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Index")]
    pub index: u64,
}

impl CourseMapping {
    pub fn new(course: &Course) -> Self {
        Self {
            key: course.key.clone(),
            text: course.text.clone(),
            index: course.id(),
        }
    }

    pub fn course(&self) -> Course {
        Course::new(self.key.clone(), self.text.clone())
    }
}

pub fn to_json(mappings: &[CourseMapping]) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    mappings.serialize(&mut serializer)?;
    out.push(b'\n');
    Ok(out)
}

/// Parses a mapping file. Entries whose `Index` disagrees with their key are
/// kept; pages are always looked up by the id recomputed from the key.
pub fn from_json(text: &str) -> anyhow::Result<Vec<CourseMapping>> {
    let mappings: Vec<CourseMapping> = parse_json_with_context(text)?;
    for mapping in &mappings {
        let id = mapping.course().id();
        if mapping.index != id {
            warn!(
                course_key = mapping.key.as_str(),
                index = mapping.index,
                expected = id,
                "Mapping index does not match course key"
            );
        }
    }
    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_existing_files() {
        let course = Course::new("ADM;1;F;1", "ADM 1");
        let json = String::from_utf8(to_json(&[CourseMapping::new(&course)]).unwrap()).unwrap();

        let expected = format!(
            "[\n    {{\n        \"Key\": \"ADM;1;F;1\",\n        \"Text\": \"ADM 1\",\n        \"Index\": {}\n    }}\n]\n",
            course.id()
        );
        assert_eq!(json, expected);
    }

    #[test]
    fn test_reads_written_file() {
        let courses = [Course::new("A;1", "A 1"), Course::new("B;2", "B 2")];
        let mappings: Vec<_> = courses.iter().map(CourseMapping::new).collect();
        let json = String::from_utf8(to_json(&mappings).unwrap()).unwrap();

        let parsed = from_json(&json).unwrap();
        assert_eq!(parsed, mappings);
        assert_eq!(parsed[1].course(), courses[1]);
    }

    #[test]
    fn test_mismatched_index_is_kept() {
        let parsed = from_json(r#"[{"Key": "A;1", "Text": "A 1", "Index": 1}]"#).unwrap();
        assert_eq!(parsed[0].index, 1);
        assert_ne!(parsed[0].course().id(), 1);
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let err = from_json(r#"[{"Key": "A;1", "Index": 1}]"#).unwrap_err();
        assert!(err.to_string().contains("Text"), "{err}");
    }
}
