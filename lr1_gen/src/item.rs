// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::firsts::FirstSets;
use crate::grammar::{Grammar, SymbolId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// An LR(1) item: a production, a dot position and one lookahead terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Item {
    pub production: u32,
    pub dot: usize,
    pub lookahead: SymbolId,
}

impl Item {
    pub fn new(production: u32, dot: usize, lookahead: SymbolId) -> Self {
        Self {
            production,
            dot,
            lookahead,
        }
    }

    pub fn shifted(&self) -> Self {
        Self {
            production: self.production,
            dot: self.dot + 1,
            lookahead: self.lookahead,
        }
    }

    pub fn next_symbol(&self, grammar: &Grammar) -> Option<SymbolId> {
        grammar
            .production(self.production)
            .right_hand_side
            .get(self.dot)
            .cloned()
    }

    pub fn is_reducible(&self, grammar: &Grammar) -> bool {
        self.dot >= grammar.production(self.production).len()
    }

    pub fn rhs_tail<'a>(&self, grammar: &'a Grammar) -> &'a [SymbolId] {
        &grammar.production(self.production).right_hand_side[self.dot + 1..]
    }

    pub fn description(&self, grammar: &Grammar) -> String {
        let production = grammar.production(self.production);
        let mut string = format!("{}:", grammar.symbol_name(production.left_hand_side));
        if production.is_empty() {
            string += " . <empty>";
        } else {
            for (index, &symbol) in production.right_hand_side.iter().enumerate() {
                if index == self.dot {
                    string += &format!(" . {}", grammar.symbol_name(symbol));
                } else {
                    string += &format!(" {}", grammar.symbol_name(symbol));
                }
            }
            if self.dot >= production.len() {
                string += " .";
            }
        }
        string += &format!(", {}", grammar.symbol_name(self.lookahead));
        string
    }
}

/// A state of the automaton: an order-independent set of items. Two states
/// are the same state exactly when their (closed) item sets are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSet(BTreeSet<Item>);

impl From<Item> for ItemSet {
    fn from(item: Item) -> Self {
        let mut set = BTreeSet::new();
        set.insert(item);
        Self(set)
    }
}

impl ItemSet {
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Closes the set in place: for `[A -> α . B β, a]` with `B` a
    /// non-terminal, adds `[B -> . γ, b]` for every production of `B` and
    /// every `b ∈ FIRST(β a)`.
    pub fn close(&mut self, grammar: &Grammar, firsts: &FirstSets) {
        let mut queue: Vec<Item> = self.0.iter().cloned().collect();
        while let Some(item) = queue.pop() {
            let symbol = match item.next_symbol(grammar) {
                Some(symbol) if !grammar.is_terminal(symbol) => symbol,
                _ => continue,
            };
            let lookaheads = firsts.first_of_string(item.rhs_tail(grammar), item.lookahead);
            for production in grammar.productions_for(symbol) {
                for &lookahead in &lookaheads {
                    let new_item = Item::new(production.ident, 0, lookahead);
                    if self.0.insert(new_item) {
                        queue.push(new_item);
                    }
                }
            }
        }
    }

    /// The unclosed kernel reached by advancing the dot over `symbol`.
    pub fn goto_kernel(&self, grammar: &Grammar, symbol: SymbolId) -> ItemSet {
        let mut set = BTreeSet::new();
        for item in self.0.iter() {
            if item.next_symbol(grammar) == Some(symbol) {
                set.insert(item.shifted());
            }
        }
        ItemSet(set)
    }

    /// Symbols appearing immediately after a dot, with the items that would
    /// shift over them.
    pub fn transition_symbols(&self, grammar: &Grammar) -> BTreeMap<SymbolId, Vec<Item>> {
        let mut map: BTreeMap<SymbolId, Vec<Item>> = BTreeMap::new();
        for item in self.0.iter() {
            if let Some(symbol) = item.next_symbol(grammar) {
                map.entry(symbol).or_default().push(*item);
            }
        }
        map
    }

    pub fn reducible_items<'a>(&'a self, grammar: &'a Grammar) -> impl Iterator<Item = &'a Item> {
        self.0.iter().filter(move |item| item.is_reducible(grammar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> Grammar {
        let terminals: Vec<String> = ["c", "d", "Eof"].iter().map(|s| s.to_string()).collect();
        Grammar::parse("S -> C C\nC -> c C\nC -> d\n", &terminals).unwrap()
    }

    #[test]
    fn closure_of_the_start_item() {
        let grammar = grammar();
        let firsts = FirstSets::new(&grammar);
        let start = Item::new(grammar.augmented_production(), 0, 2);
        let mut set = ItemSet::from(start);
        set.close(&grammar, &firsts);
        // [S' -> . S, Eof], [S -> . C C, Eof], and [C -> . c C | . d, c/d]
        assert_eq!(set.len(), 6);
        assert!(set.iter().any(|i| i.production == 1 && i.lookahead == 0));
        assert!(set.iter().any(|i| i.production == 2 && i.lookahead == 1));
    }

    #[test]
    fn goto_kernel_advances_the_dot() {
        let grammar = grammar();
        let firsts = FirstSets::new(&grammar);
        let mut set = ItemSet::from(Item::new(grammar.augmented_production(), 0, 2));
        set.close(&grammar, &firsts);
        let kernel = set.goto_kernel(&grammar, 0); // over terminal `c`
        assert!(kernel.iter().all(|i| i.dot == 1 && i.production == 1));
        assert_eq!(kernel.len(), 2); // lookaheads c and d
    }

    #[test]
    fn item_description_marks_the_dot() {
        let grammar = grammar();
        let item = Item::new(0, 1, 2);
        assert_eq!(item.description(&grammar), "S: C . C, Eof");
    }
}
