// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Assembler entry point and pass drivers.
//!
//! `run_one` takes a source file through the three stages: macro expansion,
//! a first pass that lays out code and data while collecting symbols, and a
//! second pass that resolves placeholders and emits the output files.

pub mod cli;


use std::fs::{self, File};
use std::io;

use clap::Parser;

use crate::core::assembler::error::{
    has_errors, AsmRunReport, CliError, Diagnostic, DiagnosticKind,
};
use crate::core::assembler::output::{self, EntryExport};
use crate::core::imagestore::{Are, ExternUse, ImageStore, StoreResult, Word};
use crate::core::isa::{self, OpcodeEntry};
use crate::core::macro_processor::{MacroProcessor, SourceLine};
use crate::core::parser as asm_parser;
use crate::core::parser::{
    Directive, JumpParam, JumpParamKind, Label, LineAst, Operand, OperandKind, ParseError,
};
use crate::core::symbol_table::{SymbolKind, SymbolTable, SymbolTableResult};
use crate::core::tokenizer::Span;

use cli::Cli;

// Re-export public types
pub use crate::core::assembler::error::{AsmRunReport as RunReport, CliError as RunError};
pub use cli::VERSION;

/// Run the assembler with command-line arguments. Each input produces its
/// own report; a failing file does not stop the ones after it.
pub fn run() -> Result<Vec<AsmRunReport>, CliError> {
    let cli = Cli::parse();
    cli::validate_cli(&cli)?;
    Ok(cli.files.iter().map(|base| run_one(base)).collect())
}

/// Assemble one source file given its base name (no extension).
pub fn run_one(base: &str) -> AsmRunReport {
    let input = cli::input_path(base);
    let text = match fs::read_to_string(&input) {
        Ok(text) => text,
        Err(_) => {
            let unreadable = Diagnostic::new(0, DiagnosticKind::InputUnreadable { path: input.clone() });
            return AsmRunReport::new(input, vec![unreadable], Vec::new());
        }
    };
    let raw_lines: Vec<String> = text.lines().map(|s| s.to_string()).collect();

    let mut diagnostics = Vec::new();
    let mut mp = MacroProcessor::new();
    let expanded = mp.expand(&raw_lines, &mut diagnostics);

    if !has_errors(&diagnostics) {
        let mut assembler = Assembler::new();
        assembler.pass1(&expanded);
        if !assembler.has_errors() {
            assembler.pass2();
        }
        let clean = !assembler.has_errors();
        diagnostics.extend(assembler.take_diagnostics());
        if clean {
            if let Err(err) = write_outputs(base, &assembler) {
                diagnostics.push(Diagnostic::new(
                    0,
                    DiagnosticKind::OutputFailed {
                        message: err.to_string(),
                    },
                ));
            }
        }
    }

    AsmRunReport::new(input, diagnostics, raw_lines)
}

fn write_outputs(base: &str, assembler: &Assembler) -> io::Result<()> {
    let ob = File::create(cli::output_path(base, "ob"))?;
    output::write_object(
        ob,
        &assembler.image().code_words(),
        &assembler.image().data_words(),
    )?;
    if !assembler.entries().is_empty() {
        let ent = File::create(cli::output_path(base, "ent"))?;
        output::write_entries(ent, assembler.entries())?;
    }
    if !assembler.extern_uses().is_empty() {
        let ext = File::create(cli::output_path(base, "ext"))?;
        output::write_externs(ext, assembler.extern_uses())?;
    }
    Ok(())
}

/// Position of an operand within an instruction, selecting which 3-bit
/// field of a register word it occupies.
#[derive(Debug, Clone, Copy)]
enum Position {
    Src,
    Dst,
}

struct PendingEntry {
    name: String,
    line: u32,
    col: usize,
}

/// Per-file assembler state.
pub struct Assembler {
    symbols: SymbolTable,
    image: ImageStore,
    pending_entries: Vec<PendingEntry>,
    entries: Vec<EntryExport>,
    extern_uses: Vec<ExternUse>,
    diagnostics: Vec<Diagnostic>,
    halted: bool,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            image: ImageStore::new(),
            pending_entries: Vec::new(),
            entries: Vec::new(),
            extern_uses: Vec::new(),
            diagnostics: Vec::new(),
            halted: false,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn image(&self) -> &ImageStore {
        &self.image
    }

    pub fn entries(&self) -> &[EntryExport] {
        &self.entries
    }

    pub fn extern_uses(&self) -> &[ExternUse] {
        &self.extern_uses
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    /// First pass: lay out code and data, collect symbols, emit
    /// placeholders for symbol references. Erroneous lines contribute no
    /// words; a memory overflow halts the file.
    pub fn pass1(&mut self, lines: &[SourceLine]) {
        for line in lines {
            if self.halted {
                break;
            }
            self.process_line(line);
        }
    }

    /// Second pass: relocate data symbols behind the code image, fold
    /// placeholders into operand words, and settle the deferred entries.
    pub fn pass2(&mut self) {
        let ic_final = self.image.ic();
        self.symbols.relocate_data(ic_final);

        let (uses, unresolved) = self.image.resolve_placeholders(&mut self.symbols);
        self.extern_uses = uses;
        for missing in unresolved {
            self.report(
                missing.line,
                missing.col,
                DiagnosticKind::UndefinedSymbol {
                    name: missing.symbol,
                },
            );
        }

        let pending = std::mem::take(&mut self.pending_entries);
        for entry in pending {
            let found = self
                .symbols
                .lookup(&entry.name)
                .map(|sym| (sym.kind, sym.value, sym.entry));
            match found {
                None => self.report(
                    entry.line,
                    entry.col,
                    DiagnosticKind::EntryUndefined { name: entry.name },
                ),
                Some((SymbolKind::External, _, _)) => self.report(
                    entry.line,
                    entry.col,
                    DiagnosticKind::EntryExternal { name: entry.name },
                ),
                Some((_, value, already_marked)) => {
                    if !already_marked {
                        self.symbols.mark_entry(&entry.name);
                        self.entries.push(EntryExport {
                            name: entry.name,
                            addr: value,
                        });
                    }
                }
            }
        }
    }

    fn process_line(&mut self, line: &SourceLine) {
        let mut parser = match asm_parser::Parser::from_line(&line.text, line.line) {
            Ok(parser) => parser,
            Err(err) => return self.parse_error(err),
        };
        match parser.parse_line() {
            Ok(LineAst::Empty) => {}
            Ok(LineAst::Directive {
                label,
                directive,
                span,
            }) => self.process_directive(line.line, label, directive, span),
            Ok(LineAst::Instruction {
                label,
                entry,
                operands,
                span,
            }) => self.process_instruction(line.line, label, entry, &operands, span),
            Err(err) => self.parse_error(err),
        }
    }

    fn process_directive(
        &mut self,
        line: u32,
        label: Option<Label>,
        directive: Directive,
        span: Span,
    ) {
        match directive {
            Directive::Data(values) => {
                if let Some(label) = &label {
                    if !self.define_symbol(label, self.image.dc(), SymbolKind::Data, line) {
                        return;
                    }
                }
                for value in values {
                    if !self.push_data_word(line, span, Word::Data(isa::data_word(value))) {
                        return;
                    }
                }
            }
            Directive::Str(bytes) => {
                if let Some(label) = &label {
                    if !self.define_symbol(label, self.image.dc(), SymbolKind::Data, line) {
                        return;
                    }
                }
                for byte in bytes {
                    if !self.push_data_word(line, span, Word::Data(u16::from(byte))) {
                        return;
                    }
                }
                let _ = self.push_data_word(line, span, Word::Data(0));
            }
            Directive::Extern {
                name,
                span: name_span,
            } => {
                if let Some(label) = &label {
                    self.report(
                        line,
                        label.span.col_start,
                        DiagnosticKind::LabelIgnored {
                            directive: "extern",
                            name: label.name.clone(),
                        },
                    );
                }
                let existing = self.symbols.lookup(&name).map(|sym| sym.kind);
                match existing {
                    Some(SymbolKind::External) => {}
                    Some(_) => self.report(
                        line,
                        name_span.col_start,
                        DiagnosticKind::ExternShadowsLocal { name },
                    ),
                    None => {
                        let _ = self
                            .symbols
                            .insert_unique(&name, 0, SymbolKind::External, line);
                    }
                }
            }
            Directive::Entry {
                name,
                span: name_span,
            } => {
                if let Some(label) = &label {
                    self.report(
                        line,
                        label.span.col_start,
                        DiagnosticKind::LabelIgnored {
                            directive: "entry",
                            name: label.name.clone(),
                        },
                    );
                }
                self.pending_entries.push(PendingEntry {
                    name,
                    line,
                    col: name_span.col_start,
                });
            }
        }
    }

    fn process_instruction(
        &mut self,
        line: u32,
        label: Option<Label>,
        entry: &'static OpcodeEntry,
        operands: &[Operand],
        span: Span,
    ) {
        if let Some(label) = &label {
            if !self.define_symbol(label, self.image.ic(), SymbolKind::Code, line) {
                return;
            }
        }

        let (src, dst) = match operands.len() {
            2 => (Some(&operands[0]), Some(&operands[1])),
            1 => (None, Some(&operands[0])),
            _ => (None, None),
        };

        if let Some(src) = src {
            let mode = src.kind.mode();
            if !entry.src_modes.contains(&mode) {
                return self.report(
                    line,
                    src.span.col_start,
                    DiagnosticKind::IllegalAddressing {
                        mode,
                        position: "source",
                        mnemonic: entry.mnemonic,
                    },
                );
            }
        }
        if let Some(dst) = dst {
            let mode = dst.kind.mode();
            if !entry.dst_modes.contains(&mode) {
                return self.report(
                    line,
                    dst.span.col_start,
                    DiagnosticKind::IllegalAddressing {
                        mode,
                        position: "destination",
                        mnemonic: entry.mnemonic,
                    },
                );
            }
        }

        let first = isa::encode_first_word(
            entry.opcode,
            src.map(|op| op.kind.mode()),
            dst.map(|op| op.kind.mode()),
            src.map(reg_field).unwrap_or(0),
            dst.map(reg_field).unwrap_or(0),
        );

        let mut words = vec![Word::Instruction(first)];
        match (src, dst) {
            (
                Some(Operand {
                    kind: OperandKind::Register(src_reg),
                    ..
                }),
                Some(Operand {
                    kind: OperandKind::Register(dst_reg),
                    ..
                }),
            ) => {
                // Two register operands share one additional word.
                words.push(Word::Operand {
                    value: isa::register_payload(*src_reg, *dst_reg),
                    are: Are::Absolute,
                });
            }
            _ => {
                if let Some(op) = src {
                    operand_words(line, op, Position::Src, &mut words);
                }
                if let Some(op) = dst {
                    operand_words(line, op, Position::Dst, &mut words);
                }
            }
        }

        for word in words {
            if !self.push_code_word(line, span, word) {
                return;
            }
        }
    }

    fn define_symbol(&mut self, label: &Label, value: u16, kind: SymbolKind, line: u32) -> bool {
        match self.symbols.insert_unique(&label.name, value, kind, line) {
            SymbolTableResult::Ok => true,
            SymbolTableResult::Duplicate => {
                self.report(
                    line,
                    label.span.col_start,
                    DiagnosticKind::DuplicateSymbol {
                        name: label.name.clone(),
                    },
                );
                false
            }
        }
    }

    fn push_code_word(&mut self, line: u32, span: Span, word: Word) -> bool {
        match self.image.push_code(word) {
            StoreResult::Ok => true,
            StoreResult::Overflow => {
                self.memory_overflow(line, span);
                false
            }
        }
    }

    fn push_data_word(&mut self, line: u32, span: Span, word: Word) -> bool {
        match self.image.push_data(word) {
            StoreResult::Ok => true,
            StoreResult::Overflow => {
                self.memory_overflow(line, span);
                false
            }
        }
    }

    fn memory_overflow(&mut self, line: u32, span: Span) {
        self.report(line, span.col_start, DiagnosticKind::MemoryOverflow);
        self.halted = true;
    }

    fn parse_error(&mut self, err: ParseError) {
        self.report(
            err.span.line,
            err.span.col_start,
            DiagnosticKind::Syntax {
                message: err.message,
            },
        );
    }

    fn report(&mut self, line: u32, column: usize, kind: DiagnosticKind) {
        self.diagnostics
            .push(Diagnostic::new(line, kind).with_column(column));
    }
}

fn reg_field(op: &Operand) -> u8 {
    match op.kind {
        OperandKind::Register(reg) => reg,
        _ => 0,
    }
}

fn register_word(reg: u8, pos: Position) -> Word {
    let value = match pos {
        Position::Src => isa::register_payload(reg, 0),
        Position::Dst => isa::register_payload(0, reg),
    };
    Word::Operand {
        value,
        are: Are::Absolute,
    }
}

fn operand_words(line: u32, op: &Operand, pos: Position, words: &mut Vec<Word>) {
    match &op.kind {
        OperandKind::Immediate(value) => words.push(Word::Operand {
            value: isa::immediate_payload(*value),
            are: Are::Absolute,
        }),
        OperandKind::Direct(name) => words.push(Word::Placeholder {
            symbol: name.clone(),
            line,
            col: op.span.col_start,
        }),
        OperandKind::Register(reg) => words.push(register_word(*reg, pos)),
        OperandKind::JumpParams { target, params } => {
            words.push(Word::Placeholder {
                symbol: target.clone(),
                line,
                col: op.span.col_start,
            });
            match (&params[0].kind, &params[1].kind) {
                (JumpParamKind::Register(first), JumpParamKind::Register(second)) => {
                    words.push(Word::Operand {
                        value: isa::register_payload(*first, *second),
                        are: Are::Absolute,
                    });
                }
                _ => {
                    param_word(line, &params[0], Position::Src, words);
                    param_word(line, &params[1], Position::Dst, words);
                }
            }
        }
    }
}

fn param_word(line: u32, param: &JumpParam, pos: Position, words: &mut Vec<Word>) {
    match &param.kind {
        JumpParamKind::Immediate(value) => words.push(Word::Operand {
            value: isa::immediate_payload(*value),
            are: Are::Absolute,
        }),
        JumpParamKind::Direct(name) => words.push(Word::Placeholder {
            symbol: name.clone(),
            line,
            col: param.span.col_start,
        }),
        JumpParamKind::Register(reg) => words.push(register_word(*reg, pos)),
    }
}
