// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::firsts::FirstSets;
use crate::grammar::{Grammar, SymbolId};
use crate::item::ItemSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Shift(u32),
    Reduce(u32),
    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Shift(state) => write!(f, "shift {}", state),
            Action::Reduce(production) => write!(f, "reduce {}", production),
            Action::Accept => write!(f, "accept"),
        }
    }
}

/// Everything the driver needs, and everything the cache persists:
/// (terminals, non_terminals, productions, firsts, states, gotos, action,
/// goto_table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseTables {
    pub grammar: Grammar,
    pub firsts: FirstSets,
    pub states: Vec<ItemSet>,
    /// All symbol transitions of the automaton, per state.
    pub gotos: Vec<BTreeMap<SymbolId, u32>>,
    pub action: Vec<BTreeMap<SymbolId, Action>>,
    /// Non-terminal transitions only.
    pub goto_table: Vec<BTreeMap<SymbolId, u32>>,
}

impl ParseTables {
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn action(&self, state: u32, terminal: SymbolId) -> Option<Action> {
        self.action[state as usize].get(&terminal).cloned()
    }

    /// `(lhs, rhs length)` for a reduction.
    pub fn production_data(&self, production: u32) -> (SymbolId, usize) {
        let production = self.grammar.production(production);
        (production.left_hand_side, production.len())
    }

    pub fn goto_state(&self, state: u32, non_terminal: SymbolId) -> Option<u32> {
        self.goto_table[state as usize].get(&non_terminal).cloned()
    }

    /// Terminals with an entry in a state's ACTION row, for syntax errors.
    pub fn expected_terminals(&self, state: u32) -> Vec<SymbolId> {
        self.action[state as usize].keys().cloned().collect()
    }

    pub fn rule_string(&self, production: u32) -> String {
        self.grammar.rule_string(production)
    }

    /// Human-readable dump of the grammar, the states with their items, and
    /// the ACTION/GOTO rows.
    pub fn description(&self) -> String {
        let mut text = String::new();
        text += "Terminals:\n";
        for (id, name) in self.grammar.terminals.iter().enumerate() {
            text += &format!("  {:3}: {}\n", id, name);
        }
        text += "Non terminals:\n";
        for (index, name) in self.grammar.non_terminals.iter().enumerate() {
            text += &format!("  {:3}: {}\n", index + self.grammar.terminal_count(), name);
        }
        text += "Productions:\n";
        for production in &self.grammar.productions {
            text += &format!("  {:3}: {}\n", production.ident, self.rule_string(production.ident));
        }
        for (index, state) in self.states.iter().enumerate() {
            text += &format!("\nState {}:\n", index);
            for item in state.iter() {
                text += &format!("  [{}]\n", item.description(&self.grammar));
            }
            for (terminal, action) in &self.action[index] {
                text += &format!(
                    "  on {}: {}\n",
                    self.grammar.symbol_name(*terminal),
                    action
                );
            }
            for (non_terminal, target) in &self.goto_table[index] {
                text += &format!(
                    "  goto {}: {}\n",
                    self.grammar.symbol_name(*non_terminal),
                    target
                );
            }
        }
        text
    }
}
