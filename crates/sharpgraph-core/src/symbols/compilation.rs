//! The compilation: every parsed tree plus the symbol table built over them.

use std::collections::HashMap;

use super::{Accessibility, Modifiers, Symbol, SymbolFacts, SymbolId, SymbolKind, TypeRef};
use crate::syntax::{CSharpParser, SyntaxError, SyntaxRef, SyntaxTree, TreeId};

/// Collects sources before the symbol table is built.
pub struct CompilationBuilder {
    parser: CSharpParser,
    trees: Vec<SyntaxTree>,
}

impl CompilationBuilder {
    /// Parse one source file into the compilation.
    pub fn add_source(&mut self, path: &str, source: &str) -> Result<TreeId, SyntaxError> {
        let id = TreeId(self.trees.len() as u32);
        let tree = self.parser.parse(id, path, source)?;
        self.trees.push(tree);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Declare, resolve and bind everything added so far.
    pub fn build(self) -> Compilation {
        Compilation::new(self.trees)
    }
}

/// Parsed trees with their declared and bound symbols.
pub struct Compilation {
    pub(super) trees: Vec<SyntaxTree>,
    pub(super) symbols: Vec<Symbol>,
    pub(super) global: SymbolId,
    /// `using` namespaces per tree, in source order.
    pub(super) usings: Vec<Vec<String>>,
    /// (parent namespace, name) -> namespace.
    pub(super) namespaces: HashMap<(SymbolId, String), SymbolId>,
    /// (container, name, arity) -> type.
    pub(super) types: HashMap<(SymbolId, String, usize), SymbolId>,
    pub(super) declared: HashMap<SyntaxRef, SymbolId>,
    pub(super) bound: HashMap<SyntaxRef, SymbolId>,
    pub(super) typed: HashMap<SyntaxRef, TypeRef>,
}

impl Compilation {
    pub fn builder() -> CompilationBuilder {
        CompilationBuilder {
            parser: CSharpParser::new(),
            trees: Vec::new(),
        }
    }

    /// Build a compilation from in-memory `(path, source)` pairs.
    pub fn from_sources<P: AsRef<str>, S: AsRef<str>>(
        sources: &[(P, S)],
    ) -> Result<Self, SyntaxError> {
        let mut builder = Self::builder();
        for (path, source) in sources {
            builder.add_source(path.as_ref(), source.as_ref())?;
        }
        Ok(builder.build())
    }

    fn new(trees: Vec<SyntaxTree>) -> Self {
        let global = Symbol {
            name: String::new(),
            container: None,
            accessibility: Accessibility::NotApplicable,
            modifiers: Modifiers::default(),
            declarations: Vec::new(),
            kind: SymbolKind::Namespace,
        };
        let mut compilation = Self {
            usings: vec![Vec::new(); trees.len()],
            trees,
            symbols: vec![global],
            global: SymbolId(0),
            namespaces: HashMap::new(),
            types: HashMap::new(),
            declared: HashMap::new(),
            bound: HashMap::new(),
            typed: HashMap::new(),
        };

        compilation.declare_all();
        compilation.resolve_signatures();
        compilation.resolve_overrides();
        compilation.bind_bodies();

        log::debug!(
            "compilation: {} trees, {} symbols, {} bound references",
            compilation.trees.len(),
            compilation.symbols.len(),
            compilation.bound.len()
        );
        compilation
    }

    pub fn trees(&self) -> &[SyntaxTree] {
        &self.trees
    }

    pub fn global_namespace(&self) -> SymbolId {
        self.global
    }

    /// Every symbol with its id.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    /// Look a type up by its display name, e.g. `Ns.Outer.Inner<T>`.
    pub fn find_type(&self, fqn: &str) -> Option<SymbolId> {
        self.symbols()
            .filter(|(_, s)| s.as_type().is_some())
            .map(|(id, _)| id)
            .find(|&id| self.type_fqn(id) == fqn)
    }

    /// Look a method up by its display key, e.g. `Ns.A.M(int)`.
    pub fn find_method(&self, fqn: &str) -> Option<SymbolId> {
        self.symbols()
            .filter(|(_, s)| s.as_method().is_some())
            .map(|(id, _)| id)
            .find(|&id| self.method_fqn(id) == fqn)
    }

    pub(super) fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    pub(super) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    /// Child namespace, created on first use.
    pub(super) fn namespace_child(&mut self, parent: SymbolId, name: &str) -> SymbolId {
        if let Some(&id) = self.namespaces.get(&(parent, name.to_string())) {
            return id;
        }
        let id = self.add_symbol(Symbol {
            name: name.to_string(),
            container: Some(parent),
            accessibility: Accessibility::NotApplicable,
            modifiers: Modifiers::default(),
            declarations: Vec::new(),
            kind: SymbolKind::Namespace,
        });
        self.namespaces.insert((parent, name.to_string()), id);
        id
    }

    /// Existing namespace reached by a dotted path from the global namespace.
    pub(super) fn lookup_namespace(&self, path: &str) -> Option<SymbolId> {
        self.lookup_namespace_from(self.global, path)
    }

    pub(super) fn lookup_namespace_from(&self, start: SymbolId, path: &str) -> Option<SymbolId> {
        path.split('.')
            .map(str::trim)
            .try_fold(start, |ns, part| self.namespaces.get(&(ns, part.to_string())).copied())
    }
}

impl SymbolFacts for Compilation {
    fn tree(&self, id: TreeId) -> Option<&SyntaxTree> {
        self.trees.get(id.0 as usize)
    }

    fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    fn declared_symbol(&self, node: SyntaxRef) -> Option<SymbolId> {
        self.declared.get(&node).copied()
    }

    fn symbol_info(&self, node: SyntaxRef) -> Option<SymbolId> {
        self.bound.get(&node).copied()
    }

    fn type_info(&self, node: SyntaxRef) -> Option<&TypeRef> {
        self.typed.get(&node)
    }
}
