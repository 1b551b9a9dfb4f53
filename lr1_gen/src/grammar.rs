// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbols live in one dense id space: terminals first (`0..T`),
/// non-terminals next (`T..T+N`). The value `T` doubles as the epsilon
/// sentinel inside FIRST sets.
pub type SymbolId = u16;

pub const START_NAME: &str = "S'";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub ident: u32,
    pub left_hand_side: SymbolId,
    pub right_hand_side: Vec<SymbolId>,
}

impl Production {
    pub fn len(&self) -> usize {
        self.right_hand_side.len()
    }

    pub fn is_empty(&self) -> bool {
        self.right_hand_side.is_empty()
    }
}

#[derive(Debug)]
pub enum Error {
    NoProductions,
    MalformedRule(usize, String),
    LhsIsTerminal(usize, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoProductions => write!(f, "grammar file contains no productions"),
            Error::MalformedRule(line, text) => {
                write!(f, "line {}: malformed rule \"{}\"", line, text)
            }
            Error::LhsIsTerminal(line, name) => {
                write!(f, "line {}: \"{}\" is a terminal and cannot be a left hand side", line, name)
            }
        }
    }
}

lazy_static! {
    static ref RULE_CRE: Regex =
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*->\s*(.*?)\s*$").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grammar {
    pub terminals: Vec<String>,
    pub non_terminals: Vec<String>,
    pub productions: Vec<Production>,
}

impl Grammar {
    /// Two passes over the rule file: the first discovers every left hand
    /// side in file order (fixing non-terminal ids), the second builds the
    /// production records. The grammar is then augmented with `S' -> S`.
    pub fn parse(text: &str, terminals: &[String]) -> Result<Self, Error> {
        let mut grammar = Grammar {
            terminals: terminals.to_vec(),
            non_terminals: Vec::new(),
            productions: Vec::new(),
        };

        let mut rule_lines: Vec<(usize, String, String)> = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let captures = RULE_CRE
                .captures(trimmed)
                .ok_or_else(|| Error::MalformedRule(line_no, trimmed.to_string()))?;
            let lhs = captures[1].to_string();
            let rhs = captures[2].to_string();
            if grammar.terminals.contains(&lhs) {
                return Err(Error::LhsIsTerminal(line_no, lhs));
            }
            if !grammar.non_terminals.contains(&lhs) {
                grammar.non_terminals.push(lhs.clone());
            }
            rule_lines.push((line_no, lhs, rhs));
        }
        if rule_lines.is_empty() {
            return Err(Error::NoProductions);
        }

        for (_line_no, lhs, rhs) in &rule_lines {
            let ident = grammar.productions.len() as u32;
            let left_hand_side = grammar.non_terminal_id(lhs);
            let mut right_hand_side = Vec::new();
            if !rhs.eq_ignore_ascii_case("epsilon") {
                for name in rhs.split_whitespace() {
                    let id = if let Some(tid) = grammar.terminals.iter().position(|t| t == name) {
                        tid as SymbolId
                    } else {
                        if !grammar.non_terminals.contains(&name.to_string()) {
                            grammar.non_terminals.push(name.to_string());
                        }
                        grammar.non_terminal_id(name)
                    };
                    right_hand_side.push(id);
                }
            }
            grammar.productions.push(Production {
                ident,
                left_hand_side,
                right_hand_side,
            });
        }

        grammar.augment();
        Ok(grammar)
    }

    /// Appends `S' -> S` as the last production and `S'` as the last
    /// non-terminal, where `S` is the first rule's left hand side.
    fn augment(&mut self) {
        let start_symbol = self.productions[0].left_hand_side;
        self.non_terminals.push(START_NAME.to_string());
        let ident = self.productions.len() as u32;
        let left_hand_side = self.non_terminal_id(START_NAME);
        self.productions.push(Production {
            ident,
            left_hand_side,
            right_hand_side: vec![start_symbol],
        });
    }

    fn non_terminal_id(&self, name: &str) -> SymbolId {
        let index = self
            .non_terminals
            .iter()
            .position(|n| n == name)
            .expect("non terminal should have been registered");
        (self.terminals.len() + index) as SymbolId
    }

    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    pub fn epsilon_id(&self) -> SymbolId {
        self.terminals.len() as SymbolId
    }

    pub fn symbol_count(&self) -> usize {
        self.terminals.len() + self.non_terminals.len()
    }

    pub fn is_terminal(&self, id: SymbolId) -> bool {
        (id as usize) < self.terminals.len()
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        let id = id as usize;
        if id < self.terminals.len() {
            &self.terminals[id]
        } else {
            &self.non_terminals[id - self.terminals.len()]
        }
    }

    pub fn production(&self, ident: u32) -> &Production {
        &self.productions[ident as usize]
    }

    pub fn productions_for(&self, lhs: SymbolId) -> impl Iterator<Item = &Production> {
        self.productions
            .iter()
            .filter(move |p| p.left_hand_side == lhs)
    }

    pub fn augmented_production(&self) -> u32 {
        (self.productions.len() - 1) as u32
    }

    pub fn rule_string(&self, ident: u32) -> String {
        let production = self.production(ident);
        let lhs = self.symbol_name(production.left_hand_side);
        if production.is_empty() {
            format!("{} -> epsilon", lhs)
        } else {
            let rhs: Vec<&str> = production
                .right_hand_side
                .iter()
                .map(|&id| self.symbol_name(id))
                .collect();
            format!("{} -> {}", lhs, rhs.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminals() -> Vec<String> {
        ["c", "d", "Eof"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn loader_assigns_ids_in_file_order() {
        let grammar = Grammar::parse("S -> C C\nC -> c C\nC -> d\n", &terminals()).unwrap();
        assert_eq!(grammar.non_terminals, vec!["S", "C", START_NAME]);
        assert_eq!(grammar.productions.len(), 4);
        assert_eq!(grammar.rule_string(0), "S -> C C");
        assert_eq!(grammar.rule_string(3), "S' -> S");
        assert_eq!(grammar.production(1).right_hand_side, vec![0, 4]);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let text = "# a grammar\n\nS -> d\n  # trailing note\n";
        let grammar = Grammar::parse(text, &terminals()).unwrap();
        assert_eq!(grammar.productions.len(), 2);
    }

    #[test]
    fn epsilon_is_an_empty_rhs_case_insensitively() {
        let grammar = Grammar::parse("S -> A d\nA -> EPSILON\n", &terminals()).unwrap();
        assert!(grammar.production(1).is_empty());
    }

    #[test]
    fn rhs_only_non_terminals_are_registered() {
        let grammar = Grammar::parse("S -> B d\n", &terminals()).unwrap();
        assert_eq!(grammar.non_terminals, vec!["S", "B", START_NAME]);
        let b_id = grammar.production(0).right_hand_side[0];
        assert!(!grammar.is_terminal(b_id));
        assert_eq!(grammar.symbol_name(b_id), "B");
    }

    #[test]
    fn terminal_lhs_is_rejected() {
        assert!(matches!(
            Grammar::parse("c -> d\n", &terminals()),
            Err(Error::LhsIsTerminal(1, _))
        ));
    }
}
