// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Parser for tokenized assembly source.

use crate::core::isa::{self, AddrMode, OpcodeEntry};
use crate::core::tokenizer::{Span, Token, TokenKind, TokenizeError, Tokenizer};

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Operand {
    pub kind: OperandKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum OperandKind {
    Immediate(i16),
    Direct(String),
    Register(u8),
    JumpParams { target: String, params: Vec<JumpParam> },
}

impl OperandKind {
    pub fn mode(&self) -> AddrMode {
        match self {
            OperandKind::Immediate(_) => AddrMode::Immediate,
            OperandKind::Direct(_) => AddrMode::Direct,
            OperandKind::JumpParams { .. } => AddrMode::JumpParams,
            OperandKind::Register(_) => AddrMode::Register,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JumpParam {
    pub kind: JumpParamKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum JumpParamKind {
    Immediate(i16),
    Direct(String),
    Register(u8),
}

#[derive(Debug, Clone)]
pub enum Directive {
    Data(Vec<i16>),
    Str(Vec<u8>),
    Entry { name: String, span: Span },
    Extern { name: String, span: Span },
}

#[derive(Debug, Clone)]
pub enum LineAst {
    Empty,
    Directive {
        label: Option<Label>,
        directive: Directive,
        span: Span,
    },
    Instruction {
        label: Option<Label>,
        entry: &'static OpcodeEntry,
        operands: Vec<Operand>,
        span: Span,
    },
}

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
}

impl Parser {
    pub fn from_line(line: &str, line_num: u32) -> Result<Self, ParseError> {
        let mut tokenizer = Tokenizer::new(line, line_num);
        let mut tokens = Vec::new();
        loop {
            let token = tokenizer.next_token().map_err(map_tokenize_error)?;
            let end = matches!(token.kind, TokenKind::End);
            tokens.push(token);
            if end {
                break;
            }
        }
        Ok(Self { tokens, index: 0 })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    pub fn parse_line(&mut self) -> Result<LineAst, ParseError> {
        let label = self.parse_label()?;

        let token = self.peek().clone();
        match token.kind {
            TokenKind::End => {
                if label.is_some() {
                    Err(ParseError {
                        message: "Missing directive or instruction after label".to_string(),
                        span: token.span,
                    })
                } else {
                    Ok(LineAst::Empty)
                }
            }
            TokenKind::Directive(name) => {
                self.advance();
                let directive = self.parse_directive(&name, token.span)?;
                self.expect_end()?;
                Ok(LineAst::Directive {
                    label,
                    directive,
                    span: token.span,
                })
            }
            TokenKind::Identifier(name) => {
                self.advance();
                let entry = isa::lookup_mnemonic(&name).ok_or_else(|| ParseError {
                    message: format!("Unknown mnemonic: {name}"),
                    span: token.span,
                })?;
                let operands = self.parse_operands(entry)?;
                Ok(LineAst::Instruction {
                    label,
                    entry,
                    operands,
                    span: token.span,
                })
            }
            _ => Err(ParseError {
                message: "Expected a directive or instruction".to_string(),
                span: token.span,
            }),
        }
    }

    /// A label is an identifier immediately followed by a colon, with no
    /// space between them.
    fn parse_label(&mut self) -> Result<Option<Label>, ParseError> {
        let first = self.peek().clone();
        let name = match &first.kind {
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Register(reg) => format!("r{reg}"),
            _ => return Ok(None),
        };
        let colon = match self.tokens.get(self.index + 1) {
            Some(token) if matches!(token.kind, TokenKind::Colon) => token.clone(),
            _ => return Ok(None),
        };
        if colon.span.col_start != first.span.col_end {
            return Ok(None);
        }
        if let Some(msg) = isa::ident_error(&name) {
            return Err(ParseError {
                message: format!("{msg}: {name}"),
                span: first.span,
            });
        }
        self.advance();
        self.advance();
        Ok(Some(Label {
            name,
            span: first.span,
        }))
    }

    fn parse_directive(&mut self, name: &str, span: Span) -> Result<Directive, ParseError> {
        match name {
            "data" => self.parse_data(span),
            "string" => {
                let token = self.advance();
                match token.kind {
                    TokenKind::String(bytes) => Ok(Directive::Str(bytes)),
                    _ => Err(ParseError {
                        message: "Expected a string after .string".to_string(),
                        span: token.span,
                    }),
                }
            }
            "entry" => {
                let (name, span) = self.parse_symbol_ref(".entry")?;
                Ok(Directive::Entry { name, span })
            }
            "extern" => {
                let (name, span) = self.parse_symbol_ref(".extern")?;
                Ok(Directive::Extern { name, span })
            }
            _ => Err(ParseError {
                message: format!("Unknown directive: .{name}"),
                span,
            }),
        }
    }

    fn parse_data(&mut self, span: Span) -> Result<Directive, ParseError> {
        let mut values = Vec::new();
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Number(value) => values.push(value),
                _ if values.is_empty() => {
                    return Err(ParseError {
                        message: "Missing value after .data".to_string(),
                        span: if matches!(token.kind, TokenKind::End) {
                            span
                        } else {
                            token.span
                        },
                    })
                }
                _ => {
                    return Err(ParseError {
                        message: "Expected a value after ','".to_string(),
                        span: token.span,
                    })
                }
            }
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::End => break,
                _ => {
                    return Err(ParseError {
                        message: "Expected ',' between .data values".to_string(),
                        span: self.peek().span,
                    })
                }
            }
        }
        Ok(Directive::Data(values))
    }

    fn parse_symbol_ref(&mut self, directive: &str) -> Result<(String, Span), ParseError> {
        let token = self.advance();
        let name = match token.kind {
            TokenKind::Identifier(name) => name,
            TokenKind::Register(reg) => format!("r{reg}"),
            _ => {
                return Err(ParseError {
                    message: format!("Expected a symbol name after {directive}"),
                    span: token.span,
                })
            }
        };
        if let Some(msg) = isa::ident_error(&name) {
            return Err(ParseError {
                message: format!("{msg}: {name}"),
                span: token.span,
            });
        }
        Ok((name, token.span))
    }

    fn parse_operands(&mut self, entry: &'static OpcodeEntry) -> Result<Vec<Operand>, ParseError> {
        let mut operands = Vec::new();
        for ix in 0..entry.operands {
            if ix > 0 {
                let token = self.peek().clone();
                match token.kind {
                    TokenKind::Comma => {
                        self.advance();
                    }
                    TokenKind::End => {
                        return Err(ParseError {
                            message: format!(
                                "Wrong number of operands for {}: expected {}",
                                entry.mnemonic, entry.operands
                            ),
                            span: token.span,
                        })
                    }
                    _ => {
                        return Err(ParseError {
                            message: "Expected ',' between operands".to_string(),
                            span: token.span,
                        })
                    }
                }
            }
            operands.push(self.parse_operand(entry)?);
        }
        let token = self.peek().clone();
        match token.kind {
            TokenKind::End => Ok(operands),
            TokenKind::Comma => Err(ParseError {
                message: format!("Too many operands for {}", entry.mnemonic),
                span: token.span,
            }),
            _ => Err(ParseError {
                message: "Unexpected text at end of line".to_string(),
                span: token.span,
            }),
        }
    }

    fn parse_operand(&mut self, entry: &'static OpcodeEntry) -> Result<Operand, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Hash => {
                let number = self.advance();
                match number.kind {
                    TokenKind::Number(value) => Ok(Operand {
                        kind: OperandKind::Immediate(value),
                        span: Span {
                            line: token.span.line,
                            col_start: token.span.col_start,
                            col_end: number.span.col_end,
                        },
                    }),
                    _ => Err(ParseError {
                        message: "Expected a number after '#'".to_string(),
                        span: number.span,
                    }),
                }
            }
            TokenKind::Number(_) => Err(ParseError {
                message: "Missing '#' before immediate value".to_string(),
                span: token.span,
            }),
            TokenKind::Register(reg) => Ok(Operand {
                kind: OperandKind::Register(reg),
                span: token.span,
            }),
            TokenKind::Identifier(name) => {
                if let Some(msg) = isa::ident_error(&name) {
                    return Err(ParseError {
                        message: format!("{msg}: {name}"),
                        span: token.span,
                    });
                }
                if matches!(self.peek().kind, TokenKind::OpenParen) {
                    self.parse_jump_params(name, token.span)
                } else {
                    Ok(Operand {
                        kind: OperandKind::Direct(name),
                        span: token.span,
                    })
                }
            }
            TokenKind::End => Err(ParseError {
                message: format!(
                    "Wrong number of operands for {}: expected {}",
                    entry.mnemonic, entry.operands
                ),
                span: token.span,
            }),
            _ => Err(ParseError {
                message: "Expected an operand".to_string(),
                span: token.span,
            }),
        }
    }

    fn parse_jump_params(&mut self, target: String, start: Span) -> Result<Operand, ParseError> {
        self.advance();
        let first = self.parse_jump_param()?;
        let comma = self.advance();
        if !matches!(comma.kind, TokenKind::Comma) {
            return Err(ParseError {
                message: "Expected ',' between jump parameters".to_string(),
                span: comma.span,
            });
        }
        let second = self.parse_jump_param()?;
        let close = self.advance();
        if !matches!(close.kind, TokenKind::CloseParen) {
            return Err(ParseError {
                message: "Expected ')' after jump parameters".to_string(),
                span: close.span,
            });
        }
        Ok(Operand {
            kind: OperandKind::JumpParams {
                target,
                params: vec![first, second],
            },
            span: Span {
                line: start.line,
                col_start: start.col_start,
                col_end: close.span.col_end,
            },
        })
    }

    fn parse_jump_param(&mut self) -> Result<JumpParam, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Hash => {
                let number = self.advance();
                match number.kind {
                    TokenKind::Number(value) => Ok(JumpParam {
                        kind: JumpParamKind::Immediate(value),
                        span: number.span,
                    }),
                    _ => Err(ParseError {
                        message: "Expected a number after '#'".to_string(),
                        span: number.span,
                    }),
                }
            }
            TokenKind::Register(reg) => Ok(JumpParam {
                kind: JumpParamKind::Register(reg),
                span: token.span,
            }),
            TokenKind::Identifier(name) => {
                if let Some(msg) = isa::ident_error(&name) {
                    return Err(ParseError {
                        message: format!("{msg}: {name}"),
                        span: token.span,
                    });
                }
                Ok(JumpParam {
                    kind: JumpParamKind::Direct(name),
                    span: token.span,
                })
            }
            _ => Err(ParseError {
                message: "Expected a jump parameter".to_string(),
                span: token.span,
            }),
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        let token = self.peek();
        if matches!(token.kind, TokenKind::End) {
            Ok(())
        } else {
            Err(ParseError {
                message: "Unexpected text at end of line".to_string(),
                span: token.span,
            })
        }
    }
}

fn map_tokenize_error(err: TokenizeError) -> ParseError {
    ParseError {
        message: err.message,
        span: err.span,
    }
}
