// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::firsts::FirstSets;
use crate::grammar::{Grammar, SymbolId};
use crate::item::{Item, ItemSet};
use crate::tables::{Action, ParseTables};
use std::collections::BTreeMap;

/// The canonical LR(1) collection: states plus their symbol transitions.
#[derive(Debug, Default)]
pub struct Automaton {
    pub states: Vec<ItemSet>,
    pub transitions: Vec<BTreeMap<SymbolId, u32>>,
}

impl Automaton {
    /// Worklist construction. State 0 is the closure of
    /// `[S' -> . S, Eof]`; states compare equal by item content.
    pub fn build(grammar: &Grammar, firsts: &FirstSets, eof: SymbolId) -> Self {
        let start_item = Item::new(grammar.augmented_production(), 0, eof);
        let mut start_state = ItemSet::from(start_item);
        start_state.close(grammar, firsts);

        let mut automaton = Automaton {
            states: vec![start_state],
            transitions: vec![BTreeMap::new()],
        };

        let mut index = 0;
        while index < automaton.states.len() {
            let symbols: Vec<SymbolId> = automaton.states[index]
                .transition_symbols(grammar)
                .keys()
                .cloned()
                .collect();
            for symbol in symbols {
                let mut kernel = automaton.states[index].goto_kernel(grammar, symbol);
                kernel.close(grammar, firsts);
                let target = match automaton.states.iter().position(|s| *s == kernel) {
                    Some(existing) => existing as u32,
                    None => {
                        automaton.states.push(kernel);
                        automaton.transitions.push(BTreeMap::new());
                        (automaton.states.len() - 1) as u32
                    }
                };
                automaton.transitions[index].insert(symbol, target);
            }
            index += 1;
        }
        automaton
    }
}

/// A conflict the table filler resolved, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    ShiftReduce {
        state: u32,
        terminal: String,
        dropped_production: String,
    },
    ReduceReduce {
        state: u32,
        terminal: String,
        kept_production: String,
        dropped_production: String,
    },
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Conflict::ShiftReduce {
                state,
                terminal,
                dropped_production,
            } => write!(
                f,
                "state {}: shift/reduce conflict on \"{}\": kept shift, dropped [{}]",
                state, terminal, dropped_production
            ),
            Conflict::ReduceReduce {
                state,
                terminal,
                kept_production,
                dropped_production,
            } => write!(
                f,
                "state {}: reduce/reduce conflict on \"{}\": kept [{}], dropped [{}]",
                state, terminal, kept_production, dropped_production
            ),
        }
    }
}

#[derive(Debug)]
pub struct TableBuild {
    pub tables: ParseTables,
    pub conflicts: Vec<Conflict>,
}

impl TableBuild {
    pub fn shift_reduce_count(&self) -> u32 {
        self.conflicts
            .iter()
            .filter(|c| matches!(c, Conflict::ShiftReduce { .. }))
            .count() as u32
    }

    pub fn reduce_reduce_count(&self) -> u32 {
        self.conflicts
            .iter()
            .filter(|c| matches!(c, Conflict::ReduceReduce { .. }))
            .count() as u32
    }
}

/// Builds the automaton and fills ACTION/GOTO. Conflict policy: shift over
/// reduce; for reduce/reduce keep the lower-numbered production. Every
/// resolution is recorded.
pub fn generate(grammar: Grammar, eof: SymbolId) -> TableBuild {
    let firsts = FirstSets::new(&grammar);
    let automaton = Automaton::build(&grammar, &firsts, eof);
    let augmented = grammar.augmented_production();

    let mut action: Vec<BTreeMap<SymbolId, Action>> = Vec::with_capacity(automaton.states.len());
    let mut goto_table: Vec<BTreeMap<SymbolId, u32>> = Vec::with_capacity(automaton.states.len());
    let mut conflicts = Vec::new();

    for (index, state) in automaton.states.iter().enumerate() {
        let mut action_row: BTreeMap<SymbolId, Action> = BTreeMap::new();
        let mut goto_row: BTreeMap<SymbolId, u32> = BTreeMap::new();

        for (&symbol, &target) in &automaton.transitions[index] {
            if grammar.is_terminal(symbol) {
                action_row.insert(symbol, Action::Shift(target));
            } else {
                goto_row.insert(symbol, target);
            }
        }

        for item in state.reducible_items(&grammar) {
            if item.production == augmented {
                if item.lookahead == eof {
                    action_row.insert(eof, Action::Accept);
                }
                continue;
            }
            match action_row.get(&item.lookahead).cloned() {
                None => {
                    action_row.insert(item.lookahead, Action::Reduce(item.production));
                }
                Some(Action::Shift(_)) => {
                    conflicts.push(Conflict::ShiftReduce {
                        state: index as u32,
                        terminal: grammar.symbol_name(item.lookahead).to_string(),
                        dropped_production: grammar.rule_string(item.production),
                    });
                }
                Some(Action::Reduce(existing)) if existing != item.production => {
                    let (kept, dropped) = if existing < item.production {
                        (existing, item.production)
                    } else {
                        (item.production, existing)
                    };
                    action_row.insert(item.lookahead, Action::Reduce(kept));
                    conflicts.push(Conflict::ReduceReduce {
                        state: index as u32,
                        terminal: grammar.symbol_name(item.lookahead).to_string(),
                        kept_production: grammar.rule_string(kept),
                        dropped_production: grammar.rule_string(dropped),
                    });
                }
                Some(_) => {}
            }
        }

        action.push(action_row);
        goto_table.push(goto_row);
    }

    let tables = ParseTables {
        grammar,
        firsts,
        states: automaton.states,
        gotos: automaton.transitions,
        action,
        goto_table,
    };
    TableBuild { tables, conflicts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Action;

    fn terminals(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Drives the generated tables over a terminal-id sentence.
    fn accepts(tables: &ParseTables, sentence: &[SymbolId]) -> bool {
        let mut stack: Vec<u32> = vec![0];
        let mut index = 0;
        loop {
            let state = *stack.last().unwrap();
            let terminal = sentence[index];
            match tables.action(state, terminal) {
                Some(Action::Shift(next)) => {
                    stack.push(next);
                    index += 1;
                }
                Some(Action::Reduce(production)) => {
                    let (lhs, len) = tables.production_data(production);
                    stack.truncate(stack.len() - len);
                    let top = *stack.last().unwrap();
                    match tables.goto_state(top, lhs) {
                        Some(next) => stack.push(next),
                        None => return false,
                    }
                }
                Some(Action::Accept) => return true,
                None => return false,
            }
        }
    }

    #[test]
    fn canonical_collection_for_the_classic_grammar() {
        // S -> C C; C -> c C; C -> d over {c, d} builds the well-known
        // ten-state canonical LR(1) collection.
        let grammar =
            Grammar::parse("S -> C C\nC -> c C\nC -> d\n", &terminals(&["c", "d", "Eof"])).unwrap();
        let build = generate(grammar, 2);
        assert_eq!(build.tables.state_count(), 10);
        assert!(build.conflicts.is_empty());
    }

    #[test]
    fn generated_tables_drive_a_parse() {
        let grammar =
            Grammar::parse("S -> C C\nC -> c C\nC -> d\n", &terminals(&["c", "d", "Eof"])).unwrap();
        let build = generate(grammar, 2);
        // c d d, d d, c c d c d accepted; d, c d rejected.
        assert!(accepts(&build.tables, &[0, 1, 1, 2]));
        assert!(accepts(&build.tables, &[1, 1, 2]));
        assert!(accepts(&build.tables, &[0, 0, 1, 0, 1, 2]));
        assert!(!accepts(&build.tables, &[1, 2]));
        assert!(!accepts(&build.tables, &[0, 1, 2]));
    }

    #[test]
    fn epsilon_productions_reduce_on_lookahead() {
        let grammar = Grammar::parse(
            "S -> A b\nA -> epsilon\nA -> a\n",
            &terminals(&["a", "b", "Eof"]),
        )
        .unwrap();
        let build = generate(grammar, 2);
        assert!(build.conflicts.is_empty());
        assert!(accepts(&build.tables, &[1, 2]));
        assert!(accepts(&build.tables, &[0, 1, 2]));
    }

    #[test]
    fn shift_wins_a_shift_reduce_conflict() {
        // E -> E p E is ambiguous; the policy keeps the shift so the
        // operator associates to the right.
        let grammar = Grammar::parse(
            "E -> E p E\nE -> x\n",
            &terminals(&["p", "x", "Eof"]),
        )
        .unwrap();
        let build = generate(grammar, 2);
        assert!(build.shift_reduce_count() > 0);
        assert!(accepts(&build.tables, &[1, 0, 1, 0, 1, 2]));
    }

    #[test]
    fn lower_production_wins_a_reduce_reduce_conflict() {
        let grammar = Grammar::parse(
            "S -> A\nS -> B\nA -> x\nB -> x\n",
            &terminals(&["x", "Eof"]),
        )
        .unwrap();
        let build = generate(grammar, 1);
        assert_eq!(build.reduce_reduce_count(), 1);
        // The x-state keeps the reduce for A -> x (production 2).
        let kept = build
            .tables
            .action
            .iter()
            .flat_map(|row| row.values())
            .find(|a| matches!(a, Action::Reduce(2)));
        assert!(kept.is_some());
        assert!(accepts(&build.tables, &[0, 1]));
    }

    #[test]
    fn rebuilding_the_same_grammar_is_deterministic() {
        let text = "S -> C C\nC -> c C\nC -> d\n";
        let names = terminals(&["c", "d", "Eof"]);
        let first = generate(Grammar::parse(text, &names).unwrap(), 2);
        let second = generate(Grammar::parse(text, &names).unwrap(), 2);
        let left = serde_json::to_string(&first.tables).unwrap();
        let right = serde_json::to_string(&second.tables).unwrap();
        assert_eq!(left, right);
    }
}
