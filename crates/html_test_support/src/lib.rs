//! Shared helpers for fixture-driven tests.

use std::fmt::Write;

pub mod fixtures;

const DIFF_CONTEXT: usize = 2;
const MISSING: &str = "<missing>";

/// Escape `text` the way tree snapshots quote their payloads.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch.is_ascii_control() => {
                let _ = write!(out, "\\u{{{:X}}}", ch as u32);
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Human-readable report of the first differing line, with context.
pub fn diff_lines(expected: &[String], actual: &[String]) -> String {
    let line = |lines: &[String], i: usize| lines.get(i).map_or(MISSING, String::as_str).to_owned();
    let max = expected.len().max(actual.len());
    let mut out = String::new();
    match (0..max).find(|&i| line(expected, i) != line(actual, i)) {
        Some(first) => {
            let start = first.saturating_sub(DIFF_CONTEXT);
            let end = (first + DIFF_CONTEXT + 1).min(max);
            let _ = writeln!(
                out,
                "first mismatch at line {} (showing {}..={}):",
                first + 1,
                start + 1,
                end
            );
            for i in start..end {
                let marker = if i == first { ">" } else { " " };
                let _ = writeln!(out, "{marker} {:>4}  expected: {}", i + 1, line(expected, i));
                let _ = writeln!(out, "{marker} {:>4}    actual: {}", i + 1, line(actual, i));
            }
        }
        None => {
            let _ = writeln!(out, "no differing line");
        }
    }
    let _ = writeln!(
        out,
        "expected {} lines, actual {} lines",
        expected.len(),
        actual.len()
    );
    out
}
