// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

//! Canonical LR(1) table generation from a plain-text grammar file, with a
//! serialized table cache keyed on the grammar file's modification time.

pub mod cache;
pub mod firsts;
pub mod grammar;
pub mod item;
pub mod state;
pub mod tables;

pub use crate::firsts::FirstSets;
pub use crate::grammar::{Grammar, Production, SymbolId};
pub use crate::item::{Item, ItemSet};
pub use crate::state::{generate, Automaton, Conflict, TableBuild};
pub use crate::tables::{Action, ParseTables};
