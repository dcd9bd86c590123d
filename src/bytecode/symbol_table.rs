use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolScope {
    Global,
    Local,
}

impl fmt::Display for SymbolScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolScope::Global => write!(f, "GLOBAL"),
            SymbolScope::Local => write!(f, "LOCAL"),
        }
    }
}

/// Storage location of a named binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// Maps binding names to storage slots.
///
/// The outermost table hands out `Global` slots; tables created with
/// [`SymbolTable::new_enclosed`] hand out `Local` slots and fall back to
/// their outer table on lookup. A table can be kept across compiles so that
/// global slot numbers stay stable for a whole session.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,
    num_definitions: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_enclosed(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    /// Give back the outer table, if any.
    pub fn into_outer(self) -> Option<SymbolTable> {
        self.outer.map(|outer| *outer)
    }

    pub fn scope(&self) -> SymbolScope {
        if self.outer.is_some() {
            SymbolScope::Local
        } else {
            SymbolScope::Global
        }
    }

    /// Bind `name` to the next free slot of this scope.
    ///
    /// Redefining a name rebinds it to a fresh slot; the old slot is never
    /// handed out again.
    pub fn define(&mut self, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: self.scope(),
            index: self.num_definitions,
        };

        self.store.insert(name.to_string(), symbol.clone());
        self.num_definitions += 1;
        symbol
    }

    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        match self.store.get(name) {
            Some(symbol) => Some(symbol.clone()),
            None => self.outer.as_ref()?.resolve(name),
        }
    }

    /// Number of slots handed out in this scope.
    pub fn len(&self) -> usize {
        self.num_definitions
    }

    pub fn is_empty(&self) -> bool {
        self.num_definitions == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn global(name: &str, index: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            scope: SymbolScope::Global,
            index,
        }
    }

    fn local(name: &str, index: usize) -> Symbol {
        Symbol {
            name: name.to_string(),
            scope: SymbolScope::Local,
            index,
        }
    }

    #[test]
    fn test_define() {
        let mut table = SymbolTable::new();
        assert_eq!(table.define("a"), global("a", 0));
        assert_eq!(table.define("b"), global("b", 1));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_resolve_global() {
        let mut table = SymbolTable::new();
        table.define("a");
        table.define("b");

        assert_eq!(table.resolve("a"), Some(global("a", 0)));
        assert_eq!(table.resolve("b"), Some(global("b", 1)));
    }

    #[test]
    fn test_resolve_undefined() {
        let table = SymbolTable::new();
        assert_eq!(table.resolve("missing"), None);
    }

    #[test]
    fn test_redefine_takes_fresh_slot() {
        let mut table = SymbolTable::new();
        table.define("x");
        table.define("y");
        let redefined = table.define("x");

        assert_eq!(redefined, global("x", 2));
        assert_eq!(table.resolve("x"), Some(global("x", 2)));
        assert_eq!(table.resolve("y"), Some(global("y", 1)));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_enclosed_defines_locals() {
        let mut outer = SymbolTable::new();
        outer.define("a");

        let mut inner = SymbolTable::new_enclosed(outer);
        assert_eq!(inner.define("c"), local("c", 0));

        assert_eq!(inner.resolve("a"), Some(global("a", 0)));
        assert_eq!(inner.resolve("c"), Some(local("c", 0)));
        assert_eq!(inner.resolve("d"), None);
    }

    #[test]
    fn test_enclosed_shadows_outer() {
        let mut outer = SymbolTable::new();
        outer.define("a");

        let mut inner = SymbolTable::new_enclosed(outer);
        inner.define("a");

        assert_eq!(inner.resolve("a"), Some(local("a", 0)));
        let outer = inner.into_outer().unwrap();
        assert_eq!(outer.resolve("a"), Some(global("a", 0)));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut table = SymbolTable::new();
        table.define("a");

        let snapshot = table.clone();
        table.define("b");

        assert_eq!(snapshot.resolve("b"), None);
        assert_eq!(snapshot.len(), 1);
    }
}
