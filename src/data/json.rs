//! JSON decoding with readable errors for hand-edited files.

use anyhow::Result;

/// Deserializes `body`. On failure, the error names the serde path of the bad
/// value, the type mismatch, and shows a slice of the offending line.
pub fn parse_json_with_context<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    let jd = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(jd).map_err(|err| {
        let inner = err.inner();
        let (line, column) = (inner.line(), inner.column());
        let path = err.path().to_string();

        let msg = inner.to_string();
        let location = format!(" at line {line} column {column}");
        let msg = msg.strip_suffix(&location).unwrap_or(&msg);

        let mut described = String::new();
        if !path.is_empty() && path != "." {
            described.push_str(&format!("at path '{path}': "));
        }
        described.push_str(&format!(
            "{} (line {line} col {column})\n{}",
            describe_mismatch(msg),
            snippet(body, line, column, 20)
        ));
        anyhow::anyhow!(described)
    })
}

/// Rewrites `"invalid type: X, expected Y"` as `"expected Y, got X"`.
fn describe_mismatch(msg: &str) -> String {
    if let Some(rest) = msg.strip_prefix("invalid type: ")
        && let Some((actual, expected)) = rest.split_once(", expected ")
    {
        return format!("expected {}, got {}", expected.trim(), actual);
    }
    msg.to_string()
}

fn snippet(body: &str, line: usize, column: usize, width: usize) -> String {
    let target = body.lines().nth(line.saturating_sub(1)).unwrap_or("");
    if target.is_empty() {
        return "(empty line)".to_string();
    }

    let error_idx = column.saturating_sub(1).min(target.len());
    let start = floor_char_boundary(target, error_idx.saturating_sub(width / 2));
    let end = floor_char_boundary(target, (error_idx + width / 2).min(target.len()));
    let marker = " ".repeat(error_idx.saturating_sub(start)) + "^";

    format!("...{}...\n   {marker}", &target[start..end])
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
