//! Diff rendering for fixture comparison.

/// Render a line diff between expected and actual output.
///
/// Control characters are escaped so a missing newline is visible.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let expected_lines: Vec<&str> = expected.split_inclusive('\n').collect();
    let actual_lines: Vec<&str> = actual.split_inclusive('\n').collect();
    let mut out = String::from("--- expected\n+++ actual\n");
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let e = expected_lines.get(i).copied();
        let a = actual_lines.get(i).copied();
        if e == a {
            continue;
        }
        out.push_str(&format!("@@ line {} @@\n", i + 1));
        if let Some(e) = e {
            out.push_str(&format!("-{}\n", e.escape_debug()));
        }
        if let Some(a) = a {
            out.push_str(&format!("+{}\n", a.escape_debug()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs() {
        assert_eq!(render_diff("a\n", "a\n"), "[identical]");
    }

    #[test]
    fn reports_changed_line() {
        let diff = render_diff("42\n", "43\n");
        assert!(diff.contains("@@ line 1 @@"));
        assert!(diff.contains("-42\\n"));
        assert!(diff.contains("+43\\n"));
    }

    #[test]
    fn reports_missing_newline_and_extra_lines() {
        let diff = render_diff("hello\n", "hello");
        assert!(diff.contains("-hello\\n"));
        assert!(diff.contains("+hello\n"));

        let diff = render_diff("a\n", "a\nb\n");
        assert!(diff.contains("@@ line 2 @@"));
        assert!(diff.contains("+b\\n"));
    }
}
