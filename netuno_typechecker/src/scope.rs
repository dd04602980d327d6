//! Lexical scopes and symbols.
//!
//! The resolver and the lowering engine each keep a [`ScopeStack`]
//! (innermost scope last); named types additionally carry a member [`Scope`]
//! of their own (`NtType::fields`). Insertion upgrades a weak entry of the
//! same name and otherwise fails on duplicates; lookup walks outward.

use crate::types::NtTypeRef;
use bitflags::bitflags;
use netuno_nir::{BlockId, FunctionId, ValueId};
use std::rc::Rc;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SymbolKind: u16 {
        const FUNCTION = 1;
        const SUBROUTINE = 2;
        const VARIABLE = 4;
        const CONSTANT = 8;
        const PARAM = 16;
        const TYPE = 32;
        const PUBLIC = 64;
        const PRIVATE = 128;
        const MODULE = 256;
    }
}

/// IR association of a symbol: variables bind their alloca value, functions
/// and subroutines their IR function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolValue {
    Value(ValueId),
    Function(FunctionId),
}

impl SymbolValue {
    pub fn as_value(self) -> Option<ValueId> {
        match self {
            SymbolValue::Value(value) => Some(value),
            SymbolValue::Function(_) => None,
        }
    }

    pub fn as_function(self) -> Option<FunctionId> {
        match self {
            SymbolValue::Function(function) => Some(function),
            SymbolValue::Value(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: Rc<str>,
    pub kind: SymbolKind,
    pub expr_type: Option<NtTypeRef>,
    pub value: Option<SymbolValue>,
    /// Weak entries are placeholders that a later non-weak definition of
    /// the same name may overwrite.
    pub weak: bool,
}

impl Symbol {
    pub fn new(name: impl Into<Rc<str>>, kind: SymbolKind, expr_type: NtTypeRef) -> Self {
        Self {
            name: name.into(),
            kind,
            expr_type: Some(expr_type),
            value: None,
            weak: false,
        }
    }

    pub fn weak(mut self) -> Self {
        self.weak = true;
        self
    }

    pub fn with_value(mut self, value: SymbolValue) -> Self {
        self.value = Some(value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    None,
    Breakable,
    Function,
    Method,
    Type,
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub kind: ScopeKind,
    symbols: Vec<Symbol>,
    /// Loop header block, set on breakable scopes by loop lowering.
    pub loop_block: Option<BlockId>,
    /// Loop exit block, set on breakable scopes by loop lowering.
    pub end_loop_block: Option<BlockId>,
    /// Return type observed for the scope, set by return lowering.
    pub return_type: Option<NtTypeRef>,
}

impl Default for ScopeKind {
    fn default() -> Self {
        ScopeKind::None
    }
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            symbols: Vec::new(),
            loop_block: None,
            end_loop_block: None,
            return_type: None,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| &*s.name == name)
    }

    /// Insert, upgrading an existing weak entry when the new one is not
    /// weak; returns false when a conflicting entry already exists.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        if let Some(existing) = self.symbols.iter_mut().find(|s| s.name == symbol.name) {
            if existing.weak && !symbol.weak {
                *existing = symbol;
                return true;
            }
            return false;
        }

        self.symbols.push(symbol);
        true
    }

    /// Overwrite an existing entry of the same name.
    pub fn update(&mut self, symbol: Symbol) -> bool {
        if let Some(existing) = self.symbols.iter_mut().find(|s| s.name == symbol.name) {
            *existing = symbol;
            return true;
        }
        false
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

/// The scope chain, innermost scope last. Index 0 is the global table the
/// driver seeds with the `console` module and the compiled file modules.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new(global: Scope) -> Self {
        Self {
            scopes: vec![global],
        }
    }

    pub fn push(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    pub fn pop(&mut self) -> Scope {
        debug_assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop().expect("scope stack is never empty")
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    pub fn current_ref(&self) -> &Scope {
        self.scopes.last().expect("scope stack is never empty")
    }

    pub fn global(&self) -> &Scope {
        &self.scopes[0]
    }

    /// Lookup walking from the innermost scope outward.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|s| s.lookup(name))
    }

    pub fn insert(&mut self, symbol: Symbol) -> bool {
        self.current().insert(symbol)
    }

    /// Insert into the scope enclosing the current one (where function
    /// symbols land while their body scope is open).
    pub fn insert_at_parent(&mut self, symbol: Symbol) -> bool {
        let index = self.scopes.len() - 2;
        self.scopes[index].insert(symbol)
    }

    /// Update the innermost entry of that name anywhere on the chain.
    pub fn update(&mut self, symbol: Symbol) -> bool {
        for scope in self.scopes.iter_mut().rev() {
            if scope.lookup(&symbol.name).is_some() {
                return scope.update(symbol);
            }
        }
        false
    }

    /// The innermost scope matching `predicate`, if any.
    pub fn innermost(&self, predicate: impl Fn(&Scope) -> bool) -> Option<&Scope> {
        self.scopes.iter().rev().find(|s| predicate(s))
    }

    pub fn innermost_mut(&mut self, predicate: impl Fn(&Scope) -> bool) -> Option<&mut Scope> {
        self.scopes.iter_mut().rev().find(|s| predicate(s))
    }

    /// The innermost function or method scope.
    pub fn function_scope(&self) -> Option<&Scope> {
        self.innermost(|s| matches!(s.kind, ScopeKind::Function | ScopeKind::Method))
    }

    pub fn function_scope_mut(&mut self) -> Option<&mut Scope> {
        self.innermost_mut(|s| matches!(s.kind, ScopeKind::Function | ScopeKind::Method))
    }

    /// The innermost breakable scope.
    pub fn breakable_scope(&self) -> Option<&Scope> {
        self.innermost(|s| s.kind == ScopeKind::Breakable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NtType, NtTypeKind};

    fn dummy_type() -> NtTypeRef {
        NtType::primitive(NtTypeKind::I32, "i32")
    }

    #[test]
    fn test_weak_symbols_are_upgraded() {
        let mut scope = Scope::new(ScopeKind::None);
        assert!(scope.insert(Symbol::new("f", SymbolKind::FUNCTION, dummy_type()).weak()));
        assert!(scope.lookup("f").unwrap().weak);

        // non-weak over weak upgrades
        assert!(scope.insert(Symbol::new("f", SymbolKind::FUNCTION, dummy_type())));
        assert!(!scope.lookup("f").unwrap().weak);

        // anything over non-weak fails
        assert!(!scope.insert(Symbol::new("f", SymbolKind::FUNCTION, dummy_type())));
        assert!(!scope.insert(Symbol::new("f", SymbolKind::FUNCTION, dummy_type()).weak()));
    }

    #[test]
    fn test_stack_lookup_is_innermost_first() {
        let mut global = Scope::new(ScopeKind::None);
        global.insert(Symbol::new("x", SymbolKind::VARIABLE, dummy_type()));

        let mut scopes = ScopeStack::new(global);
        scopes.push(ScopeKind::Function);
        scopes.insert(Symbol::new("x", SymbolKind::PARAM, dummy_type()));

        assert_eq!(scopes.lookup("x").unwrap().kind, SymbolKind::PARAM);
        scopes.pop();
        assert_eq!(scopes.lookup("x").unwrap().kind, SymbolKind::VARIABLE);
    }

    #[test]
    fn test_breakable_scope_search() {
        let mut scopes = ScopeStack::new(Scope::new(ScopeKind::None));
        scopes.push(ScopeKind::Function);
        assert!(scopes.breakable_scope().is_none());

        scopes.push(ScopeKind::Breakable);
        scopes.push(ScopeKind::None);
        assert!(scopes.breakable_scope().is_some());
    }

    #[test]
    fn test_insert_at_parent() {
        let mut scopes = ScopeStack::new(Scope::new(ScopeKind::None));
        scopes.push(ScopeKind::Function);
        assert!(scopes.insert_at_parent(Symbol::new("f", SymbolKind::FUNCTION, dummy_type())));
        scopes.pop();
        assert!(scopes.lookup("f").is_some());
    }
}
