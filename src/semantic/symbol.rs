// Copyright 2021 Peter Williams <pwil3058@gmail.com> <pwil3058@bigpond.net.au>

use crate::semantic::types::Type;
use lexrs::Location;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    Array,
    Tuple,
    Reference,
}

impl SymbolKind {
    /// The kind a binding of the given type gets.
    pub fn for_binding(ty: &Type) -> Self {
        match ty {
            Type::Array { .. } => SymbolKind::Array,
            Type::Tuple(_) => SymbolKind::Tuple,
            Type::Ref { .. } => SymbolKind::Reference,
            _ => SymbolKind::Variable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: Type,
    pub is_mutable: bool,
    pub loc: Location,
}

/// Signature information retained for calls and for code generation.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub params: Vec<ParamSpec>,
    pub return_type: Type,
}

/// Kind-specific payload. Function symbols carry their signature;
/// reference bindings remember what they borrow so the count can be
/// released on scope exit or rebinding.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolExtra {
    None,
    Function(FunctionSig),
    Borrow { target: String, mutable: bool },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Borrows {
    pub mutable: u32,
    pub immutable: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    pub scope_level: usize,
    pub is_mutable: bool,
    pub initialized: bool,
    pub line_declared: u32,
    pub extra: SymbolExtra,
    pub borrows: Borrows,
}

impl Symbol {
    pub fn new(
        name: &str,
        kind: SymbolKind,
        ty: Type,
        scope_level: usize,
        is_mutable: bool,
        initialized: bool,
        line_declared: u32,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ty,
            scope_level,
            is_mutable,
            initialized,
            line_declared,
            extra: SymbolExtra::None,
            borrows: Borrows::default(),
        }
    }

    pub fn signature(&self) -> Option<&FunctionSig> {
        match &self.extra {
            SymbolExtra::Function(sig) => Some(sig),
            _ => None,
        }
    }
}

/// A stack of scope frames, innermost last. Lookup searches outward;
/// insertion shadows any same-name entry in the current frame.
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<BTreeMap<String, Symbol>>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self {
            frames: vec![BTreeMap::new()],
        }
    }
}

impl ScopeStack {
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_level(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn enter(&mut self) {
        self.frames.push(BTreeMap::new());
    }

    /// Pops the innermost frame and releases any borrows its reference
    /// bindings still hold against symbols in outer frames.
    pub fn exit(&mut self) {
        debug_assert!(self.frames.len() > 1, "attempted to exit the global scope");
        if let Some(frame) = self.frames.pop() {
            for symbol in frame.values() {
                if let SymbolExtra::Borrow { target, mutable } = &symbol.extra {
                    self.release_borrow(target, *mutable);
                }
            }
        }
    }

    /// Inserts into the current frame, returning the symbol it shadows (if
    /// any) so the caller can release obsolete borrows.
    pub fn insert(&mut self, symbol: Symbol) -> Option<Symbol> {
        let frame = self.frames.last_mut().expect("scope stack is never empty");
        frame.insert(symbol.name.clone(), symbol)
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(name))
    }

    pub fn release_borrow(&mut self, target: &str, mutable: bool) {
        if let Some(symbol) = self.lookup_mut(target) {
            if mutable {
                symbol.borrows.mutable = symbol.borrows.mutable.saturating_sub(1);
            } else {
                symbol.borrows.immutable = symbol.borrows.immutable.saturating_sub(1);
            }
        }
    }

    /// The function symbols of the global frame, in declaration order of
    /// their names.
    pub fn functions(&self) -> BTreeMap<String, FunctionSig> {
        self.frames[0]
            .values()
            .filter_map(|symbol| {
                symbol
                    .signature()
                    .map(|sig| (symbol.name.clone(), sig.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(name: &str, level: usize) -> Symbol {
        Symbol::new(name, SymbolKind::Variable, Type::I32, level, false, true, 1)
    }

    #[test]
    fn lookup_finds_the_innermost_binding() {
        let mut scopes = ScopeStack::default();
        scopes.insert(variable("x", 0));
        scopes.enter();
        let mut inner = variable("x", 1);
        inner.is_mutable = true;
        scopes.insert(inner);
        assert!(scopes.lookup("x").unwrap().is_mutable);
        scopes.exit();
        assert!(!scopes.lookup("x").unwrap().is_mutable);
    }

    #[test]
    fn exit_decreases_depth_by_exactly_one() {
        let mut scopes = ScopeStack::default();
        scopes.enter();
        scopes.enter();
        let depth = scopes.depth();
        scopes.exit();
        assert_eq!(scopes.depth(), depth - 1);
    }

    #[test]
    fn same_frame_insertion_shadows() {
        let mut scopes = ScopeStack::default();
        assert!(scopes.insert(variable("x", 0)).is_none());
        assert!(scopes.insert(variable("x", 0)).is_some());
    }

    #[test]
    fn scope_exit_releases_borrows() {
        let mut scopes = ScopeStack::default();
        let mut borrowed = variable("x", 0);
        borrowed.is_mutable = true;
        scopes.insert(borrowed);
        scopes.enter();
        scopes.lookup_mut("x").unwrap().borrows.mutable += 1;
        let mut reference = variable("r", 1);
        reference.kind = SymbolKind::Reference;
        reference.extra = SymbolExtra::Borrow {
            target: "x".to_string(),
            mutable: true,
        };
        scopes.insert(reference);
        assert_eq!(scopes.lookup("x").unwrap().borrows.mutable, 1);
        scopes.exit();
        assert_eq!(scopes.lookup("x").unwrap().borrows.mutable, 0);
    }
}
