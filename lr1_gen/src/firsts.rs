// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::grammar::{Grammar, SymbolId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// FIRST sets over the dense symbol-id space, one set per symbol.
/// Terminal sets are singletons. The epsilon sentinel (the terminal count)
/// marks nullability inside a set; it is a marker value, never an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstSets {
    sets: Vec<BTreeSet<SymbolId>>,
    epsilon: SymbolId,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let epsilon = grammar.epsilon_id();
        let mut sets: Vec<BTreeSet<SymbolId>> = Vec::with_capacity(grammar.symbol_count());
        for terminal in 0..grammar.terminal_count() {
            let mut set = BTreeSet::new();
            set.insert(terminal as SymbolId);
            sets.push(set);
        }
        for _ in 0..grammar.non_terminals.len() {
            sets.push(BTreeSet::new());
        }

        let mut changed = true;
        while changed {
            changed = false;
            for production in &grammar.productions {
                let lhs = production.left_hand_side as usize;
                let mut nullable_rhs = true;
                for &symbol in &production.right_hand_side {
                    let additions: Vec<SymbolId> = sets[symbol as usize]
                        .iter()
                        .filter(|&&t| t != epsilon && !sets[lhs].contains(&t))
                        .cloned()
                        .collect();
                    for t in additions {
                        sets[lhs].insert(t);
                        changed = true;
                    }
                    if !sets[symbol as usize].contains(&epsilon) {
                        nullable_rhs = false;
                        break;
                    }
                }
                if nullable_rhs && sets[lhs].insert(epsilon) {
                    changed = true;
                }
            }
        }
        Self { sets, epsilon }
    }

    pub fn first(&self, symbol: SymbolId) -> &BTreeSet<SymbolId> {
        &self.sets[symbol as usize]
    }

    pub fn is_nullable(&self, symbol: SymbolId) -> bool {
        self.sets[symbol as usize].contains(&self.epsilon)
    }

    /// `FIRST(symbols · lookahead)` for a terminal lookahead. The result
    /// contains only terminals: the lookahead is consulted exactly when the
    /// whole string is nullable.
    pub fn first_of_string(&self, symbols: &[SymbolId], lookahead: SymbolId) -> BTreeSet<SymbolId> {
        let mut result = BTreeSet::new();
        for &symbol in symbols {
            for &t in self.first(symbol) {
                if t != self.epsilon {
                    result.insert(t);
                }
            }
            if !self.is_nullable(symbol) {
                return result;
            }
        }
        result.insert(lookahead);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminals() -> Vec<String> {
        ["a", "b", "Eof"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn terminal_first_is_itself() {
        let grammar = Grammar::parse("S -> a\n", &terminals()).unwrap();
        let firsts = FirstSets::new(&grammar);
        assert_eq!(firsts.first(0).iter().collect::<Vec<_>>(), vec![&0]);
    }

    #[test]
    fn nullable_prefix_exposes_the_next_symbol() {
        let text = "S -> A B\nA -> epsilon\nA -> a\nB -> b\n";
        let grammar = Grammar::parse(text, &terminals()).unwrap();
        let firsts = FirstSets::new(&grammar);
        let s_id = (grammar.terminal_count()) as SymbolId; // S is the first non-terminal
        let a_id = s_id + 1;
        assert!(firsts.is_nullable(a_id));
        assert!(!firsts.is_nullable(s_id));
        // FIRST(S) = {a, b} because A can vanish.
        assert!(firsts.first(s_id).contains(&0));
        assert!(firsts.first(s_id).contains(&1));
    }

    #[test]
    fn first_of_string_falls_through_nullable_symbols() {
        let text = "S -> A B\nA -> epsilon\nA -> a\nB -> b\n";
        let grammar = Grammar::parse(text, &terminals()).unwrap();
        let firsts = FirstSets::new(&grammar);
        let a_id = grammar.terminal_count() as SymbolId + 1;
        let eof = 2;
        let set = firsts.first_of_string(&[a_id], eof);
        assert!(set.contains(&0));
        assert!(set.contains(&eof));
        let set = firsts.first_of_string(&[], eof);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![&eof]);
    }
}
