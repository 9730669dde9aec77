// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Diagnostics for the assembler pipeline.
//!
//! Every recoverable problem is a [`Diagnostic`]: a typed [`DiagnosticKind`]
//! anchored to the source position it points at. Severity is a property of
//! the kind, not of the reporting site; only the ignored-label notes are
//! warnings, everything else suppresses output.

use std::fmt;

use crate::core::isa::AddrMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Everything the assembler can complain about, across the three stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    // macro expansion
    UnterminatedMacro { name: Option<String> },
    MacroRedefined { name: String },
    BadMacroName { name: String, reason: &'static str },
    MissingMacroName,
    ExtraAfterMacroName,
    ExtraAfterMacroEnd,
    NestedMacroDefinition,
    StrayMacroEnd,
    MacroUseWithTokens { name: String },
    // tokenizing and line parsing
    Syntax { message: String },
    // layout (first pass)
    DuplicateSymbol { name: String },
    ExternShadowsLocal { name: String },
    LabelIgnored { directive: &'static str, name: String },
    IllegalAddressing {
        mode: AddrMode,
        position: &'static str,
        mnemonic: &'static str,
    },
    MemoryOverflow,
    // resolution (second pass)
    UndefinedSymbol { name: String },
    EntryUndefined { name: String },
    EntryExternal { name: String },
    // whole-file failures
    InputUnreadable { path: String },
    OutputFailed { message: String },
}

impl DiagnosticKind {
    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticKind::LabelIgnored { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedMacro { name: Some(name) } => {
                write!(f, "Missing endmcr for macro definition: {name}")
            }
            Self::UnterminatedMacro { name: None } => {
                write!(f, "Missing endmcr for macro definition")
            }
            Self::MacroRedefined { name } => write!(f, "Macro already defined: {name}"),
            Self::BadMacroName { name, reason } => write!(f, "{reason}: {name}"),
            Self::MissingMacroName => write!(f, "Missing macro name after mcr"),
            Self::ExtraAfterMacroName => write!(f, "Extra text after macro name"),
            Self::ExtraAfterMacroEnd => write!(f, "Extra text after endmcr"),
            Self::NestedMacroDefinition => {
                write!(f, "Nested macro definitions are not supported")
            }
            Self::StrayMacroEnd => write!(f, "Found endmcr without matching mcr"),
            Self::MacroUseWithTokens { name } => {
                write!(f, "Macro use cannot be mixed with other tokens: {name}")
            }
            Self::Syntax { message } => write!(f, "{message}"),
            Self::DuplicateSymbol { name } => write!(f, "Symbol defined more than once: {name}"),
            Self::ExternShadowsLocal { name } => {
                write!(f, "Cannot declare extern, symbol already defined: {name}")
            }
            Self::LabelIgnored { directive, name } => {
                write!(f, "Label before .{directive} is ignored: {name}")
            }
            Self::IllegalAddressing {
                mode,
                position,
                mnemonic,
            } => write!(
                f,
                "{} mode illegal as {position} for {mnemonic}",
                mode.describe()
            ),
            Self::MemoryOverflow => write!(f, "Program exceeds the 256-word memory image"),
            Self::UndefinedSymbol { name } => write!(f, "Undefined symbol: {name}"),
            Self::EntryUndefined { name } => {
                write!(f, "Entry declared for undefined symbol: {name}")
            }
            Self::EntryExternal { name } => {
                write!(f, "Entry cannot name an external symbol: {name}")
            }
            Self::InputUnreadable { path } => write!(f, "Cannot open input file: {path}"),
            Self::OutputFailed { message } => write!(f, "Cannot write output file: {message}"),
        }
    }
}

/// A diagnostic anchored to a 1-indexed line of the original source (the
/// use site for macro-expanded lines) and, where known, a column. Line 0
/// marks a whole-file diagnostic with no source position.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    line: u32,
    column: Option<usize>,
    kind: DiagnosticKind,
}

impl Diagnostic {
    pub fn new(line: u32, kind: DiagnosticKind) -> Self {
        Self {
            line,
            column: None,
            kind,
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> Option<usize> {
        self.column
    }

    pub fn kind(&self) -> &DiagnosticKind {
        &self.kind
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Gate for the second pass and for output emission.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|diag| diag.severity() == Severity::Error)
}

/// Outcome of assembling one input file: the diagnostics it produced and
/// the raw source they point into.
pub struct AsmRunReport {
    file: String,
    diagnostics: Vec<Diagnostic>,
    source_lines: Vec<String>,
}

impl AsmRunReport {
    pub fn new(file: String, diagnostics: Vec<Diagnostic>, source_lines: Vec<String>) -> Self {
        Self {
            file,
            diagnostics,
            source_lines,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn source_lines(&self) -> &[String] {
        &self.source_lines
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
            .count()
    }
}

/// Rejected command-line usage; aborts the run before any file is read.
#[derive(Debug)]
pub struct CliError {
    message: String,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}
