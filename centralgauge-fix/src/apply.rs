//! Applies a `(codeBefore, codeAfter)` pair to a file robustly, trying
//! progressively looser match strategies, per §4.8.

use std::path::Path;

use centralgauge_core::FixError;
use tracing::warn;

const HUNK_SEPARATOR_BARE: &str = "...";
const HUNK_SEPARATOR_COMMENT: &str = "// ...";

/// Applies `code_before` → `code_after` to the file at `path`, writing the
/// result back on success. Tries, in order: multi-hunk splitting (if a
/// `// ...` / `...` separator line is present), then for each resulting
/// hunk (or the whole pair, if single-hunk): exact match, then a
/// normalized-match precondition followed by fuzzy contiguous-line
/// matching. Returns the number of hunks actually applied.
pub fn apply_fix(path: &Path, code_before: &str, code_after: &str) -> Result<usize, FixError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| FixError::Read { path: path.to_path_buf(), source })?;

    let before_hunks = split_hunks(code_before);
    let after_hunks = split_hunks(code_after);

    let applied = if before_hunks.len() > 1 || after_hunks.len() > 1 {
        if before_hunks.len() != after_hunks.len() {
            return Err(FixError::HunkCountMismatch {
                before_hunks: before_hunks.len(),
                after_hunks: after_hunks.len(),
            });
        }
        apply_hunks(&content, &before_hunks, &after_hunks)
    } else {
        apply_single(&content, code_before, code_after).map(|(new_content, _)| (new_content, 1))
    };

    let Some((new_content, applied_count)) = applied else {
        return Err(FixError::NoMatch { path: path.to_path_buf() });
    };

    std::fs::write(path, new_content)
        .map_err(|source| FixError::Write { path: path.to_path_buf(), source })?;
    Ok(applied_count)
}

fn apply_hunks(
    content: &str,
    before_hunks: &[String],
    after_hunks: &[String],
) -> Option<(String, usize)> {
    let mut current = content.to_string();
    let mut applied_count = 0;
    for (index, (before, after)) in before_hunks.iter().zip(after_hunks.iter()).enumerate() {
        match apply_single(&current, before, after) {
            Some((new_content, _)) => {
                current = new_content;
                applied_count += 1;
            }
            None => warn!(hunk = index, "fix hunk did not match; leaving this hunk unapplied"),
        }
    }
    if applied_count == 0 {
        None
    } else {
        Some((current, applied_count))
    }
}

fn split_hunks(code: &str) -> Vec<String> {
    let mut hunks = Vec::new();
    let mut current = Vec::new();
    for line in code.lines() {
        let trimmed = line.trim();
        if trimmed == HUNK_SEPARATOR_BARE || trimmed == HUNK_SEPARATOR_COMMENT {
            hunks.push(current.join("\n"));
            current = Vec::new();
        } else {
            current.push(line);
        }
    }
    hunks.push(current.join("\n"));
    hunks
}

fn apply_single(content: &str, code_before: &str, code_after: &str) -> Option<(String, ())> {
    if let Some(index) = content.find(code_before) {
        let mut new_content = String::with_capacity(content.len());
        new_content.push_str(&content[..index]);
        new_content.push_str(code_after);
        new_content.push_str(&content[index + code_before.len()..]);
        return Some((new_content, ()));
    }

    if !normalized(content).contains(&normalized(code_before)) {
        return None;
    }

    fuzzy_replace(content, code_before, code_after).map(|new_content| (new_content, ()))
}

fn normalize_line(line: &str) -> String {
    line.trim().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalized(text: &str) -> String {
    text.lines().map(normalize_line).collect::<Vec<_>>().join("\n")
}

/// Scans `content` for a contiguous run of lines whose trimmed form
/// matches `code_before`'s trimmed lines, then rewrites it with
/// `code_after`, reapplying the matched block's first line's leading
/// indentation to every non-blank replacement line.
fn fuzzy_replace(content: &str, code_before: &str, code_after: &str) -> Option<String> {
    let content_lines: Vec<&str> = content.lines().collect();
    let before_lines: Vec<String> = code_before.lines().map(|l| l.trim().to_string()).collect();
    if before_lines.is_empty() {
        return None;
    }

    let window = before_lines.len();
    let start = (0..=content_lines.len().checked_sub(window)?).find(|&start| {
        (0..window).all(|k| content_lines[start + k].trim() == before_lines[k])
    })?;
    let end = start + window;

    let indent = leading_whitespace(content_lines[start]);
    let replacement: Vec<String> = code_after
        .lines()
        .map(|line| if line.trim().is_empty() { String::new() } else { format!("{indent}{}", line.trim_start()) })
        .collect();

    let mut new_lines: Vec<String> = content_lines[..start].iter().map(|l| l.to_string()).collect();
    new_lines.extend(replacement);
    new_lines.extend(content_lines[end..].iter().map(|l| l.to_string()));

    let trailing_newline = content.ends_with('\n');
    let mut joined = new_lines.join("\n");
    if trailing_newline {
        joined.push('\n');
    }
    Some(joined)
}

fn leading_whitespace(line: &str) -> String {
    line.chars().take_while(|c| c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_exact_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Codeunit1.al");
        std::fs::write(&path, "codeunit 50100 Thing\n{\n    trigger OnRun()\n    begin\n    end;\n}\n").unwrap();

        let applied = apply_fix(&path, "trigger OnRun()\n    begin\n    end;", "trigger OnRun()\n    begin\n        Message('hi');\n    end;").unwrap();
        assert_eq!(applied, 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Message('hi')"));
    }

    #[test]
    fn applies_fuzzy_match_preserving_indentation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Codeunit1.al");
        std::fs::write(&path, "codeunit 50100 Thing\n{\n        trigger OnRun()\n        begin\n        end;\n}\n").unwrap();

        // codeBefore has different (no) leading whitespace than the file.
        let applied = apply_fix(&path, "trigger OnRun()\nbegin\nend;", "trigger OnRun()\nbegin\n    Message('hi');\nend;").unwrap();
        assert_eq!(applied, 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("        trigger OnRun()"));
        assert!(content.contains("        Message('hi')") || content.contains("            Message('hi')"));
    }

    #[test]
    fn reports_no_match_when_codebefore_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Codeunit1.al");
        std::fs::write(&path, "codeunit 50100 Thing { }").unwrap();

        let result = apply_fix(&path, "this text does not appear", "replacement");
        assert!(matches!(result, Err(FixError::NoMatch { .. })));
    }

    #[test]
    fn rejects_mismatched_hunk_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Codeunit1.al");
        std::fs::write(&path, "a\nb\nc\n").unwrap();

        let result = apply_fix(&path, "a\n...\nb\n...\nc", "a\n...\nb");
        assert!(matches!(result, Err(FixError::HunkCountMismatch { before_hunks: 3, after_hunks: 2 })));
    }

    #[test]
    fn applies_multiple_hunks_independently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Codeunit1.al");
        std::fs::write(&path, "first line\nmiddle line\nlast line\n").unwrap();

        let applied = apply_fix(
            &path,
            "first line\n// ...\nlast line",
            "first line updated\n// ...\nlast line updated",
        )
        .unwrap();
        assert_eq!(applied, 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("first line updated"));
        assert!(content.contains("last line updated"));
    }
}
