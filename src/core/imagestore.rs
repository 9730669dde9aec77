// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Code and data images of tagged 14-bit words, with second-pass resolution.

use crate::core::isa::{CODE_BASE, MEMORY_WORDS, WORD_MASK};
use crate::core::symbol_table::{SymbolKind, SymbolTable};

/// The A/R/E tag carried in the low two bits of operand words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Are {
    Absolute,
    External,
    Relocatable,
}

impl Are {
    pub fn bits(self) -> u16 {
        match self {
            Are::Absolute => 0b00,
            Are::External => 0b01,
            Are::Relocatable => 0b10,
        }
    }
}

/// A memory word as laid out in the first pass. `Placeholder` marks an
/// operand word whose value waits on symbol resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word {
    Instruction(u16),
    Operand { value: u16, are: Are },
    Data(u16),
    Placeholder { symbol: String, line: u32, col: usize },
}

impl Word {
    /// Final 14-bit encoding. Placeholders are folded into `Operand` before
    /// any word is encoded; an unresolved one renders as zero.
    pub fn encode(&self) -> u16 {
        match self {
            Word::Instruction(word) => word & WORD_MASK,
            Word::Operand { value, are } => ((value & 0x0fff) << 2) | are.bits(),
            Word::Data(word) => word & WORD_MASK,
            Word::Placeholder { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum StoreResult {
    Ok,
    Overflow,
}

/// A use of an external symbol, recorded while resolving placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternUse {
    pub name: String,
    pub addr: u16,
}

/// A placeholder whose symbol was never defined.
#[derive(Debug, Clone)]
pub struct UnresolvedRef {
    pub symbol: String,
    pub line: u32,
    pub col: usize,
}

/// Append-only code and data images. Code addresses start at 100; data
/// words follow the code image after relocation in the second pass.
#[derive(Debug, Default)]
pub struct ImageStore {
    code: Vec<Word>,
    data: Vec<Word>,
}

impl ImageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The instruction counter: address of the next code word.
    pub fn ic(&self) -> u16 {
        CODE_BASE + self.code.len() as u16
    }

    /// The data counter: number of data words emitted so far.
    pub fn dc(&self) -> u16 {
        self.data.len() as u16
    }

    fn full(&self) -> bool {
        self.ic() + self.dc() >= MEMORY_WORDS
    }

    pub fn push_code(&mut self, word: Word) -> StoreResult {
        if self.full() {
            return StoreResult::Overflow;
        }
        self.code.push(word);
        StoreResult::Ok
    }

    pub fn push_data(&mut self, word: Word) -> StoreResult {
        if self.full() {
            return StoreResult::Overflow;
        }
        self.data.push(word);
        StoreResult::Ok
    }

    /// Fold every placeholder in the code image into an operand word.
    /// External symbols resolve to value 0 with the External tag and are
    /// recorded as uses; local symbols resolve to their (relocated) address
    /// with the Relocatable tag. Resolved symbols are marked referenced.
    /// Returns the extern uses in address order and any references that
    /// stayed unresolved.
    pub fn resolve_placeholders(
        &mut self,
        symbols: &mut SymbolTable,
    ) -> (Vec<ExternUse>, Vec<UnresolvedRef>) {
        let mut uses = Vec::new();
        let mut unresolved = Vec::new();
        for (ix, word) in self.code.iter_mut().enumerate() {
            let (symbol, line, col) = match word {
                Word::Placeholder { symbol, line, col } => (symbol.clone(), *line, *col),
                _ => continue,
            };
            let found = symbols.lookup(&symbol).map(|sym| (sym.kind, sym.value));
            match found {
                Some((SymbolKind::External, _)) => {
                    symbols.mark_referenced(&symbol);
                    uses.push(ExternUse {
                        name: symbol,
                        addr: CODE_BASE + ix as u16,
                    });
                    *word = Word::Operand {
                        value: 0,
                        are: Are::External,
                    };
                }
                Some((_, value)) => {
                    symbols.mark_referenced(&symbol);
                    *word = Word::Operand {
                        value,
                        are: Are::Relocatable,
                    };
                }
                None => unresolved.push(UnresolvedRef { symbol, line, col }),
            }
        }
        (uses, unresolved)
    }

    pub fn code_words(&self) -> Vec<u16> {
        self.code.iter().map(Word::encode).collect()
    }

    pub fn data_words(&self) -> Vec<u16> {
        self.data.iter().map(Word::encode).collect()
    }
}
