// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

//! The table-driven shift/reduce driver. One stack carries the automaton
//! state, the concrete-syntax node and the semantic attributes side by side;
//! every reduction runs its semantic action before the goto push.

use crate::attributes::AttributeData;
use crate::error::{CompileError, SemanticError, SemanticErrorKind};
use crate::ir::Quadruple;
use crate::semantic::symbol::FunctionSig;
use crate::semantic::{self, SemanticAnalyzer};
use crate::tree::CstNode;
use lexrs::{Token, TokenKind};
use lr1_gen::{Action, ParseTables};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug)]
pub struct ParseOutcome {
    pub cst: CstNode,
    pub code: Vec<Quadruple>,
    pub functions: BTreeMap<String, FunctionSig>,
}

struct StackSlot {
    state: u32,
    cst: CstNode,
    attrs: AttributeData,
}

pub struct Parser<'a> {
    tables: &'a ParseTables,
}

impl<'a> Parser<'a> {
    /// Fails if the tables were generated from a grammar the semantic
    /// actions were not written against.
    pub fn new(tables: &'a ParseTables) -> Result<Self, CompileError> {
        semantic::check_grammar(&tables.grammar).map_err(CompileError::Grammar)?;
        Ok(Self { tables })
    }

    pub fn parse(&self, tokens: &[Token]) -> Result<ParseOutcome, CompileError> {
        let mut analyzer = SemanticAnalyzer::new();
        let stream: Vec<&Token> = tokens.iter().filter(|t| !t.kind.is_comment()).collect();
        debug_assert!(matches!(stream.last(), Some(t) if t.kind == TokenKind::Eof));

        let mut stack = vec![StackSlot {
            state: 0,
            cst: CstNode::internal("", Vec::new()),
            attrs: AttributeData::Default,
        }];
        let mut index = 0;
        loop {
            let state = stack.last().expect("stack is never empty").state;
            let lookahead = stream[index];
            match self.tables.action(state, lookahead.kind.terminal_id()) {
                None => return Err(self.syntax_error(state, lookahead)),
                Some(Action::Shift(next_state)) => {
                    let attrs = terminal_attrs(lookahead)?;
                    stack.push(StackSlot {
                        state: next_state,
                        cst: CstNode::leaf(lookahead),
                        attrs,
                    });
                    index += 1;
                }
                Some(Action::Reduce(production)) => {
                    let (lhs, rhs_len) = self.tables.production_data(production);
                    let popped = stack.split_off(stack.len() - rhs_len);
                    let mut children = Vec::with_capacity(rhs_len);
                    let mut rhs_attrs = Vec::with_capacity(rhs_len);
                    for slot in popped {
                        children.push(slot.cst);
                        rhs_attrs.push(slot.attrs);
                    }
                    let loc = rhs_attrs
                        .iter()
                        .find_map(|attrs| attrs.location())
                        .unwrap_or(lookahead.loc);
                    let attrs = analyzer.apply(production, rhs_attrs, &loc)?;
                    let lhs_name = self.tables.grammar.symbol_name(lhs).to_string();
                    let cst = CstNode::internal(&lhs_name, children);
                    let top_state = stack.last().expect("stack is never empty").state;
                    let next_state = self
                        .tables
                        .goto_state(top_state, lhs)
                        .unwrap_or_else(|| {
                            panic!("malformed goto table: ({}, {})", lhs_name, top_state)
                        });
                    stack.push(StackSlot {
                        state: next_state,
                        cst,
                        attrs,
                    });
                }
                Some(Action::Accept) => {
                    let top = stack.pop().expect("stack is never empty");
                    return Ok(ParseOutcome {
                        cst: top.cst,
                        code: top.attrs.code(),
                        functions: analyzer.functions(),
                    });
                }
            }
        }
    }

    fn syntax_error(&self, state: u32, token: &Token) -> CompileError {
        let expected: Vec<String> = self
            .tables
            .expected_terminals(state)
            .into_iter()
            .map(|id| TokenKind::ALL[id as usize].to_string())
            .collect();
        CompileError::Syntax {
            token: token.clone(),
            expected,
        }
    }
}

/// Attributes for a shifted terminal: the token itself, plus the parsed
/// value for integer literals.
fn terminal_attrs(token: &Token) -> Result<AttributeData, CompileError> {
    let value = if token.kind == TokenKind::IntegerConstant {
        let parsed = i32::from_str(&token.content).map_err(|_| {
            CompileError::Semantic(SemanticError::new(
                SemanticErrorKind::Type,
                &format!("integer literal \"{}\" is out of range", token.content),
                token.loc,
            ))
        })?;
        Some(parsed)
    } else {
        None
    };
    Ok(AttributeData::Token {
        token: token.clone(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::OpCode;
    use lazy_static::lazy_static;
    use lexrs::Lexer;

    lazy_static! {
        static ref TABLES: ParseTables = crate::builtin_tables();
    }

    fn parse(text: &str) -> Result<ParseOutcome, CompileError> {
        let tokens = Lexer::new().tokenize(text);
        Parser::new(&TABLES).unwrap().parse(&tokens)
    }

    #[test]
    fn empty_function_body_compiles() {
        let outcome = parse("fn f(){}").unwrap();
        let ops: Vec<OpCode> = outcome.code.iter().map(|q| q.op).collect();
        assert_eq!(ops, vec![OpCode::FuncBegin, OpCode::FuncEnd]);
        assert!(outcome.functions.contains_key("f"));
    }

    #[test]
    fn comments_are_filtered_before_parsing() {
        let outcome = parse("fn f(){ /* nothing /* at all */ here */ } // trailing").unwrap();
        assert_eq!(outcome.code.len(), 2);
    }

    #[test]
    fn unexpected_token_reports_the_expected_set() {
        let error = parse("fn f()").unwrap_err();
        match error {
            CompileError::Syntax { token, expected } => {
                assert_eq!(token.kind, TokenKind::Eof);
                assert!(!expected.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn semantic_errors_halt_the_parse() {
        let error = parse("fn f(){ let x: i32 = y; }").unwrap_err();
        assert!(matches!(error, CompileError::Semantic(_)));
    }

    #[test]
    fn the_cst_root_is_the_start_symbol() {
        let outcome = parse("fn f(){}").unwrap();
        assert_eq!(outcome.cst.symbol, "Program");
        assert!(outcome.cst.description().starts_with("Program\n"));
    }

    #[test]
    fn out_of_range_literal_is_rejected() {
        let error = parse("fn f(){ let x = 99999999999; }").unwrap_err();
        assert!(matches!(error, CompileError::Semantic(_)));
    }
}
