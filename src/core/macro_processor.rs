// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Macro expander for mcr/endmcr definitions.
//
// Expansion is single-level: a body is stored verbatim and may not contain
// another definition. Expanded lines carry the line number of the use site
// so later diagnostics point at the invocation.

use indexmap::IndexMap;

use crate::core::assembler::error::{Diagnostic, DiagnosticKind};
use crate::core::isa;
use crate::core::text_utils::split_comment;

/// A line of the flattened stream, tagged with its original source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub line: u32,
    pub text: String,
}

#[derive(Debug)]
struct OpenDef {
    name: Option<String>,
    body: Vec<String>,
    line: u32,
}

#[derive(Debug, Default)]
pub struct MacroProcessor {
    macros: IndexMap<String, Vec<String>>,
}

impl MacroProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten the raw source. Errors are collected into `diagnostics`;
    /// offending constructs are dropped from the stream.
    pub fn expand(
        &mut self,
        lines: &[String],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<SourceLine> {
        let mut out = Vec::new();
        let mut current: Option<OpenDef> = None;

        for (idx, raw) in lines.iter().enumerate() {
            let line_num = idx as u32 + 1;
            let (code, _) = split_comment(raw);
            let tokens: Vec<&str> = code.split_whitespace().collect();

            if current.is_some() {
                match tokens.first() {
                    Some(&"endmcr") => {
                        if tokens.len() > 1 {
                            diagnostics
                                .push(Diagnostic::new(line_num, DiagnosticKind::ExtraAfterMacroEnd));
                        }
                        if let Some(def) = current.take() {
                            if let Some(name) = def.name {
                                self.macros.insert(name, def.body);
                            }
                        }
                    }
                    Some(&"mcr") => {
                        diagnostics.push(Diagnostic::new(
                            line_num,
                            DiagnosticKind::NestedMacroDefinition,
                        ));
                    }
                    _ => {
                        if let Some(def) = current.as_mut() {
                            def.body.push(raw.clone());
                        }
                    }
                }
                continue;
            }

            match tokens.first() {
                Some(&"mcr") => {
                    let mut name = None;
                    match tokens.get(1) {
                        None => {
                            diagnostics
                                .push(Diagnostic::new(line_num, DiagnosticKind::MissingMacroName));
                        }
                        Some(&candidate) => {
                            if tokens.len() > 2 {
                                diagnostics.push(Diagnostic::new(
                                    line_num,
                                    DiagnosticKind::ExtraAfterMacroName,
                                ));
                            }
                            if let Some(reason) = isa::ident_error(candidate) {
                                diagnostics.push(Diagnostic::new(
                                    line_num,
                                    DiagnosticKind::BadMacroName {
                                        name: candidate.to_string(),
                                        reason,
                                    },
                                ));
                            } else if self.macros.contains_key(candidate) {
                                diagnostics.push(Diagnostic::new(
                                    line_num,
                                    DiagnosticKind::MacroRedefined {
                                        name: candidate.to_string(),
                                    },
                                ));
                            } else {
                                name = Some(candidate.to_string());
                            }
                        }
                    }
                    current = Some(OpenDef {
                        name,
                        body: Vec::new(),
                        line: line_num,
                    });
                }
                Some(&"endmcr") => {
                    diagnostics.push(Diagnostic::new(line_num, DiagnosticKind::StrayMacroEnd));
                }
                Some(&first) if self.macros.contains_key(first) => {
                    if tokens.len() == 1 {
                        let body = &self.macros[first];
                        out.extend(body.iter().map(|text| SourceLine {
                            line: line_num,
                            text: text.clone(),
                        }));
                    } else {
                        diagnostics.push(Diagnostic::new(
                            line_num,
                            DiagnosticKind::MacroUseWithTokens {
                                name: first.to_string(),
                            },
                        ));
                    }
                }
                Some(&first)
                    if first.ends_with(':')
                        && tokens
                            .get(1)
                            .is_some_and(|name| self.macros.contains_key(*name)) =>
                {
                    diagnostics.push(Diagnostic::new(
                        line_num,
                        DiagnosticKind::MacroUseWithTokens {
                            name: tokens.get(1).copied().unwrap_or_default().to_string(),
                        },
                    ));
                }
                _ => out.push(SourceLine {
                    line: line_num,
                    text: raw.clone(),
                }),
            }
        }

        if let Some(def) = current {
            diagnostics.push(Diagnostic::new(
                def.line,
                DiagnosticKind::UnterminatedMacro { name: def.name },
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::{MacroProcessor, SourceLine};
    use crate::core::assembler::error::{has_errors, Diagnostic};

    fn expand(src: &str) -> (Vec<SourceLine>, Vec<Diagnostic>) {
        let lines: Vec<String> = src.lines().map(|s| s.to_string()).collect();
        let mut diagnostics = Vec::new();
        let mut mp = MacroProcessor::new();
        let out = mp.expand(&lines, &mut diagnostics);
        (out, diagnostics)
    }

    fn texts(lines: &[SourceLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn expands_a_macro_at_the_use_site() {
        let (out, diags) = expand("mcr m\nmov r1, r2\nadd #5, r1\nendmcr\nstop\nm\n");
        assert!(diags.is_empty());
        assert_eq!(texts(&out), vec!["stop", "mov r1, r2", "add #5, r1"]);
        // Expanded lines report the use-site line for diagnostics.
        assert_eq!(out[1].line, 6);
        assert_eq!(out[2].line, 6);
    }

    #[test]
    fn output_contains_no_macro_syntax() {
        let (out, diags) = expand("mcr m\nstop\nendmcr\nm\n");
        assert!(diags.is_empty());
        for line in &out {
            let first = line.text.split_whitespace().next().unwrap_or("");
            assert_ne!(first, "mcr");
            assert_ne!(first, "endmcr");
            assert_ne!(first, "m");
        }
    }

    #[test]
    fn expansion_is_idempotent() {
        let (out, diags) = expand("mcr m\nmov r1, r2\nendmcr\nm\nstop\n");
        assert!(diags.is_empty());
        let flattened: String = out
            .iter()
            .map(|l| l.text.clone())
            .collect::<Vec<_>>()
            .join("\n");
        let (again, diags) = expand(&flattened);
        assert!(diags.is_empty());
        assert_eq!(texts(&again), texts(&out));
    }

    #[test]
    fn use_line_may_carry_a_comment() {
        let (out, diags) = expand("mcr m\nstop\nendmcr\nm ; run it\n");
        assert!(diags.is_empty());
        assert_eq!(texts(&out), vec!["stop"]);
    }

    #[test]
    fn rejects_unterminated_definition() {
        let (_, diags) = expand("mcr m\nmov r1, r2\n");
        assert!(has_errors(&diags));
        assert!(diags[0].message().contains("Missing endmcr"));
        assert_eq!(diags[0].line(), 1);
    }

    #[test]
    fn rejects_reserved_and_duplicate_names() {
        let (_, diags) = expand("mcr mov\nendmcr\n");
        assert!(diags[0].message().contains("Reserved word"));
        let (_, diags) = expand("mcr m\nendmcr\nmcr m\nendmcr\n");
        assert!(diags[0].message().contains("Macro already defined"));
    }

    #[test]
    fn rejects_extra_tokens_on_definition_lines() {
        let (_, diags) = expand("mcr m extra\nendmcr\n");
        assert!(diags[0].message().contains("Extra text after macro name"));
        let (_, diags) = expand("mcr m\nendmcr extra\n");
        assert!(diags[0].message().contains("Extra text after endmcr"));
    }

    #[test]
    fn rejects_nested_definitions() {
        let (_, diags) = expand("mcr outer\nmcr inner\nendmcr\n");
        assert!(diags[0].message().contains("Nested macro definitions"));
    }

    #[test]
    fn rejects_macro_use_with_other_tokens() {
        let (_, diags) = expand("mcr m\nstop\nendmcr\nm r1\n");
        assert!(diags[0]
            .message()
            .contains("Macro use cannot be mixed with other tokens"));
        let (_, diags) = expand("mcr m\nstop\nendmcr\nLAB: m\n");
        assert!(diags[0]
            .message()
            .contains("Macro use cannot be mixed with other tokens"));
    }

    #[test]
    fn rejects_stray_endmcr() {
        let (_, diags) = expand("endmcr\n");
        assert!(diags[0].message().contains("without matching mcr"));
    }
}
