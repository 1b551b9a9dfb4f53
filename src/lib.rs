// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

//! A whole-program compiler for a small Rust-subset language targeting MIPS
//! assembly: a hand-rolled lexer (`lexrs`), canonical LR(1) tables built at
//! startup and cached on disk (`lr1_gen`), a table-driven parser that runs
//! semantic actions on every reduction, and a quadruple-to-MIPS backend.

pub mod attributes;
pub mod codegen;
pub mod error;
pub mod ir;
pub mod parser;
pub mod semantic;
pub mod tree;

pub use crate::codegen::CodeGenerator;
pub use crate::error::{BackendError, CompileError, SemanticError, SemanticErrorKind};
pub use crate::parser::{ParseOutcome, Parser};
pub use crate::semantic::SemanticAnalyzer;

use lexrs::{lexer, Lexer, TokenKind};
use lr1_gen::{Conflict, Grammar, ParseTables};

/// Builds tables for the built-in grammar (the same text as
/// `configs/grammar.cfg`).
pub fn builtin_tables() -> ParseTables {
    let (tables, _conflicts) =
        build_tables(&semantic::grammar_text()).expect("the built-in grammar is well formed");
    tables
}

/// Builds tables from grammar text, reporting resolved conflicts.
pub fn build_tables(grammar_text: &str) -> Result<(ParseTables, Vec<Conflict>), CompileError> {
    let grammar = Grammar::parse(grammar_text, &TokenKind::names())
        .map_err(|e| CompileError::Grammar(e.to_string()))?;
    let build = lr1_gen::generate(grammar, TokenKind::Eof.terminal_id());
    Ok((build.tables, build.conflicts))
}

/// Lex and parse, producing the CST, the quadruple program and the function
/// table.
pub fn analyze_text(text: &str, tables: &ParseTables) -> Result<ParseOutcome, CompileError> {
    let tokens = Lexer::new().tokenize(text);
    if let Some(unknown) = lexer::first_unknown(&tokens) {
        return Err(CompileError::Lexical {
            token: unknown.clone(),
        });
    }
    Parser::new(tables)?.parse(&tokens)
}

/// The whole pipeline: source text in, MIPS assembly out.
pub fn compile_text(text: &str, tables: &ParseTables) -> Result<String, CompileError> {
    let outcome = analyze_text(text, tables)?;
    let mut generator = CodeGenerator::new();
    let assembly = generator.generate(&outcome.code, &outcome.functions)?;
    Ok(assembly)
}
