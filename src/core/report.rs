// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Terminal rendering for diagnostics: a colored severity label, an arrow
// line naming file:line:column, and the offending source line with the
// token at the reported column marked.

use color_print::cformat;

use crate::core::assembler::error::{AsmRunReport, Diagnostic, Severity};

/// Render every diagnostic of a report, one block per diagnostic.
pub fn render(report: &AsmRunReport, use_color: bool) -> Vec<String> {
    report
        .diagnostics()
        .iter()
        .map(|diag| render_diagnostic(diag, report.file(), report.source_lines(), use_color))
        .collect()
}

pub fn render_diagnostic(
    diag: &Diagnostic,
    file: &str,
    lines: &[String],
    use_color: bool,
) -> String {
    let mut out = format!(
        "{}: {}",
        severity_label(diag.severity(), use_color),
        diag.kind()
    );
    if diag.line() == 0 {
        return out;
    }

    let pos = match diag.column() {
        Some(col) => format!("{file}:{}:{col}", diag.line()),
        None => format!("{file}:{}", diag.line()),
    };
    out.push('\n');
    if use_color {
        out.push_str(&cformat!("  <blue>--></> {}", pos));
    } else {
        out.push_str(&format!("  --> {pos}"));
    }

    if let Some(source) = lines.get(diag.line() as usize - 1) {
        let marked = mark_column(source, diag.column(), use_color);
        out.push('\n');
        if use_color {
            out.push_str(&cformat!(" <blue>{:>4} |</> {}", diag.line(), marked));
        } else {
            out.push_str(&format!(" {:>4} | {}", diag.line(), marked));
        }
    }
    out
}

fn severity_label(severity: Severity, use_color: bool) -> String {
    match (severity, use_color) {
        (Severity::Error, true) => cformat!("<red,bold>error</>"),
        (Severity::Error, false) => "error".to_string(),
        (Severity::Warning, true) => cformat!("<yellow,bold>warning</>"),
        (Severity::Warning, false) => "warning".to_string(),
    }
}

/// Mark the token starting at `column` (1-based). The token ends at the
/// first whitespace or punctuation byte so the marker covers one operand
/// or name rather than the rest of the line.
fn mark_column(line: &str, column: Option<usize>, use_color: bool) -> String {
    if !use_color || !line.is_ascii() {
        return line.to_string();
    }
    let col = match column {
        Some(col) if col >= 1 && col <= line.len() => col - 1,
        _ => return line.to_string(),
    };
    let tail = &line[col..];
    let token_len = tail
        .bytes()
        .position(|c| matches!(c, b' ' | b'\t' | b',' | b'(' | b')'))
        .unwrap_or(tail.len())
        .max(1);
    let (token, after) = tail.split_at(token_len.min(tail.len()));
    format!(
        "{}{}{after}",
        &line[..col],
        cformat!("<red,bold>{}</>", token)
    )
}

#[cfg(test)]
mod tests {
    use super::{render, render_diagnostic};
    use crate::core::assembler::error::{AsmRunReport, Diagnostic, DiagnosticKind};

    fn undefined(line: u32, col: usize) -> Diagnostic {
        Diagnostic::new(
            line,
            DiagnosticKind::UndefinedSymbol {
                name: "X".to_string(),
            },
        )
        .with_column(col)
    }

    #[test]
    fn renders_position_and_source_line() {
        let lines = vec!["stop".to_string(), "jmp X".to_string()];
        let block = render_diagnostic(&undefined(2, 5), "prog.as", &lines, false);
        assert_eq!(
            block,
            "error: Undefined symbol: X\n  --> prog.as:2:5\n    2 | jmp X"
        );
    }

    #[test]
    fn renders_warnings_with_their_own_label() {
        let diag = Diagnostic::new(
            1,
            DiagnosticKind::LabelIgnored {
                directive: "extern",
                name: "L".to_string(),
            },
        );
        let lines = vec!["L: .extern E".to_string()];
        let block = render_diagnostic(&diag, "prog.as", &lines, false);
        assert!(block.starts_with("warning: Label before .extern is ignored: L"));
        assert!(block.contains("  --> prog.as:1"));
    }

    #[test]
    fn file_level_diagnostics_render_as_a_single_line() {
        let diag = Diagnostic::new(
            0,
            DiagnosticKind::InputUnreadable {
                path: "x.as".to_string(),
            },
        );
        assert_eq!(
            render_diagnostic(&diag, "x.as", &[], false),
            "error: Cannot open input file: x.as"
        );
    }

    #[test]
    fn skips_the_source_line_when_out_of_range() {
        let block = render_diagnostic(&undefined(9, 1), "prog.as", &[], false);
        assert_eq!(block, "error: Undefined symbol: X\n  --> prog.as:9:1");
    }

    #[test]
    fn marks_the_token_when_colored() {
        let lines = vec!["jmp X".to_string()];
        let block = render_diagnostic(&undefined(1, 5), "prog.as", &lines, true);
        assert!(block.contains("jmp "));
        assert!(block.contains('X'));
        // Color escapes appear only in the colored rendering.
        assert!(block.contains('\u{1b}'));
    }

    #[test]
    fn render_walks_all_diagnostics_of_a_report() {
        let report = AsmRunReport::new(
            "prog.as".to_string(),
            vec![undefined(1, 5), undefined(2, 5)],
            vec!["jmp X".to_string(), "bne X".to_string()],
        );
        let blocks = render(&report, false);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("prog.as:1:5"));
        assert!(blocks[1].contains("bne X"));
    }
}
