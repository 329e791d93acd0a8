//! Declaration pass: namespaces, types and members for every tree.

use super::compilation::Compilation;
use super::{
    Accessibility, MethodKind, MethodSymbol, Modifiers, NamedType, Symbol, SymbolId, SymbolKind,
    TypeKind, TypeRef,
};
use crate::syntax::{NodeRef, SyntaxKind, SyntaxTree};

impl Compilation {
    pub(super) fn declare_all(&mut self) {
        let trees = std::mem::take(&mut self.trees);
        for (index, tree) in trees.iter().enumerate() {
            self.usings[index] = collect_usings(tree);
            self.declare_namespace_members(tree.root(), self.global);
        }
        self.trees = trees;
    }

    fn declare_namespace_members(&mut self, node: NodeRef<'_>, namespace: SymbolId) {
        let mut namespace = namespace;
        for child in node.children() {
            match child.kind() {
                SyntaxKind::NamespaceDeclaration => {
                    let inner = self.declare_namespace(child, namespace);
                    if let Some(body) = child.body().or_else(|| child.first_child_of_kind(SyntaxKind::DeclarationList)) {
                        self.declare_namespace_members(body, inner);
                    }
                }
                SyntaxKind::FileScopedNamespaceDeclaration => {
                    let inner = self.declare_namespace(child, namespace);
                    // Newer grammars nest the members; older ones leave them as siblings.
                    self.declare_namespace_members(child, inner);
                    namespace = inner;
                }
                SyntaxKind::DeclarationList => self.declare_namespace_members(child, namespace),
                kind if kind.is_type_declaration() => {
                    self.declare_type(child, namespace, None);
                }
                _ => {}
            }
        }
    }

    fn declare_namespace(&mut self, node: NodeRef<'_>, parent: SymbolId) -> SymbolId {
        let Some(name) = node.name() else {
            return parent;
        };
        let name: String = name.chars().filter(|c| !c.is_whitespace()).collect();
        let mut ns = parent;
        for part in name.split('.').filter(|p| !p.is_empty()) {
            ns = self.namespace_child(ns, part);
            let decl = node.syntax_ref();
            let symbol = self.symbol_mut(ns);
            if !symbol.declarations.contains(&decl) {
                symbol.declarations.push(decl);
            }
        }
        self.declared.insert(node.syntax_ref(), ns);
        ns
    }

    /// Declare a type (merging partial fragments) and everything inside it.
    fn declare_type(
        &mut self,
        node: NodeRef<'_>,
        namespace: SymbolId,
        containing_type: Option<SymbolId>,
    ) -> Option<SymbolId> {
        let name = node.name()?.to_string();
        let type_kind = match node.kind() {
            SyntaxKind::ClassDeclaration | SyntaxKind::RecordDeclaration => TypeKind::Class,
            SyntaxKind::StructDeclaration | SyntaxKind::RecordStructDeclaration => TypeKind::Struct,
            SyntaxKind::InterfaceDeclaration => TypeKind::Interface,
            SyntaxKind::EnumDeclaration => TypeKind::Enum,
            SyntaxKind::DelegateDeclaration => TypeKind::Delegate,
            _ => return None,
        };
        let type_parameters = type_parameter_names(node);
        let container = containing_type.unwrap_or(namespace);
        let keywords = node.modifiers();
        let modifiers = Modifiers::from_keywords(&keywords);
        let default_access = if containing_type.is_some() {
            Accessibility::Private
        } else {
            Accessibility::Internal
        };
        let written_access = Accessibility::from_modifiers(&keywords, Accessibility::NotApplicable);

        let key = (container, name.clone(), type_parameters.len());
        let id = match self.types.get(&key).copied() {
            Some(existing) => {
                let symbol = self.symbol_mut(existing);
                symbol.declarations.push(node.syntax_ref());
                symbol.modifiers = symbol.modifiers.union(modifiers);
                if written_access != Accessibility::NotApplicable {
                    symbol.accessibility = written_access;
                }
                existing
            }
            None => {
                let accessibility = if written_access == Accessibility::NotApplicable {
                    default_access
                } else {
                    written_access
                };
                let id = self.add_symbol(Symbol {
                    name,
                    container: Some(container),
                    accessibility,
                    modifiers,
                    declarations: vec![node.syntax_ref()],
                    kind: SymbolKind::Type(NamedType {
                        type_kind,
                        type_parameters,
                        base_type: None,
                        interfaces: Vec::new(),
                        members: Vec::new(),
                    }),
                });
                self.types.insert(key, id);
                if let Some(outer) = containing_type {
                    self.push_member(outer, id);
                }
                id
            }
        };
        self.declared.insert(node.syntax_ref(), id);

        let body = node
            .child_by_field("body")
            .or_else(|| node.first_child_of_kind(SyntaxKind::DeclarationList))
            .or_else(|| node.children().find(|c| c.grammar_kind() == "enum_member_declaration_list"));
        if let Some(body) = body {
            if type_kind == TypeKind::Enum {
                self.declare_enum_members(body, id);
            } else {
                self.declare_members(body, id, namespace, type_kind);
            }
        }
        Some(id)
    }

    fn declare_members(
        &mut self,
        body: NodeRef<'_>,
        owner: SymbolId,
        namespace: SymbolId,
        owner_kind: TypeKind,
    ) {
        let default_access = if owner_kind == TypeKind::Interface {
            Accessibility::Public
        } else {
            Accessibility::Private
        };
        for member in body.children() {
            let kind = member.kind();
            if kind.is_type_declaration() {
                self.declare_type(member, namespace, Some(owner));
                continue;
            }
            let keywords = member.modifiers();
            let accessibility = Accessibility::from_modifiers(&keywords, default_access);
            let mut modifiers = Modifiers::from_keywords(&keywords);

            match kind {
                SyntaxKind::MethodDeclaration
                | SyntaxKind::ConstructorDeclaration
                | SyntaxKind::DestructorDeclaration => {
                    let method_kind = match kind {
                        SyntaxKind::ConstructorDeclaration => MethodKind::Constructor,
                        SyntaxKind::DestructorDeclaration => MethodKind::Destructor,
                        _ => MethodKind::Ordinary,
                    };
                    if owner_kind == TypeKind::Interface
                        && member.body().is_none()
                        && !modifiers.is_static
                    {
                        modifiers.is_abstract = true;
                    }
                    // Constructors and destructors are named after the type.
                    let name = match method_kind {
                        MethodKind::Ordinary => {
                            member_name(member, member.name().unwrap_or_default())
                        }
                        MethodKind::Constructor => ".ctor".to_string(),
                        MethodKind::Destructor => "Finalize".to_string(),
                    };
                    let accessibility = if method_kind == MethodKind::Destructor {
                        Accessibility::Protected
                    } else {
                        accessibility
                    };
                    let id = self.add_symbol(Symbol {
                        name,
                        container: Some(owner),
                        accessibility,
                        modifiers,
                        declarations: vec![member.syntax_ref()],
                        kind: SymbolKind::Method(MethodSymbol {
                            method_kind,
                            type_parameters: type_parameter_names(member),
                            parameters: Vec::new(),
                            return_type: None,
                            overridden: None,
                        }),
                    });
                    self.declared.insert(member.syntax_ref(), id);
                    self.push_member(owner, id);
                }
                SyntaxKind::FieldDeclaration | SyntaxKind::EventFieldDeclaration => {
                    let Some(declaration) = member.first_child_of_kind(SyntaxKind::VariableDeclaration) else {
                        continue;
                    };
                    let placeholder = TypeRef::Unresolved(String::new());
                    let mut first = None;
                    for declarator in declaration.children_of_kind(SyntaxKind::VariableDeclarator) {
                        let Some(name) = declarator.name() else {
                            continue;
                        };
                        let value_kind = if kind == SyntaxKind::FieldDeclaration {
                            SymbolKind::Field(placeholder.clone())
                        } else {
                            SymbolKind::Event(placeholder.clone())
                        };
                        let id = self.add_symbol(Symbol {
                            name: name.to_string(),
                            container: Some(owner),
                            accessibility,
                            modifiers,
                            declarations: vec![declarator.syntax_ref()],
                            kind: value_kind,
                        });
                        self.declared.insert(declarator.syntax_ref(), id);
                        self.push_member(owner, id);
                        first.get_or_insert(id);
                    }
                    if let Some(first) = first {
                        self.declared.insert(member.syntax_ref(), first);
                    }
                }
                SyntaxKind::PropertyDeclaration | SyntaxKind::EventDeclaration => {
                    let Some(name) = member.name() else {
                        continue;
                    };
                    let placeholder = TypeRef::Unresolved(String::new());
                    let value_kind = if kind == SyntaxKind::PropertyDeclaration {
                        SymbolKind::Property(placeholder)
                    } else {
                        SymbolKind::Event(placeholder)
                    };
                    let id = self.add_symbol(Symbol {
                        name: member_name(member, name),
                        container: Some(owner),
                        accessibility,
                        modifiers,
                        declarations: vec![member.syntax_ref()],
                        kind: value_kind,
                    });
                    self.declared.insert(member.syntax_ref(), id);
                    self.push_member(owner, id);
                }
                _ => {}
            }
        }
    }

    fn declare_enum_members(&mut self, body: NodeRef<'_>, owner: SymbolId) {
        for member in body.children_of_kind(SyntaxKind::EnumMemberDeclaration) {
            let Some(name) = member.name() else {
                continue;
            };
            let id = self.add_symbol(Symbol {
                name: name.to_string(),
                container: Some(owner),
                accessibility: Accessibility::Public,
                modifiers: Modifiers {
                    is_static: true,
                    ..Modifiers::default()
                },
                declarations: vec![member.syntax_ref()],
                kind: SymbolKind::Field(TypeRef::named(owner)),
            });
            self.declared.insert(member.syntax_ref(), id);
            self.push_member(owner, id);
        }
    }

    fn push_member(&mut self, owner: SymbolId, member: SymbolId) {
        if let SymbolKind::Type(named) = &mut self.symbol_mut(owner).kind {
            named.members.push(member);
        }
    }
}

/// Names declared in a `<T, U>` list.
/// Member name, prefixed with the interface for an explicit implementation (`I2.Foo`).
fn member_name(member: NodeRef<'_>, name: &str) -> String {
    let specifier = member
        .children()
        .find(|c| c.grammar_kind() == "explicit_interface_specifier");
    match specifier {
        Some(spec) => {
            let interface: String = spec.text().chars().filter(|c| !c.is_whitespace()).collect();
            format!("{}.{}", interface.trim_end_matches('.'), name)
        }
        None => name.to_string(),
    }
}

pub(super) fn type_parameter_names(node: NodeRef<'_>) -> Vec<String> {
    node.first_child_of_kind(SyntaxKind::TypeParameterList)
        .map(|list| {
            list.children_of_kind(SyntaxKind::TypeParameter)
                .filter_map(|p| p.name().or_else(|| p.children().last().map(|n| n.text())))
                .map(|n| n.trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Namespaces imported with plain `using` directives anywhere in the file.
fn collect_usings(tree: &SyntaxTree) -> Vec<String> {
    tree.root()
        .descendants()
        .filter(|n| n.kind() == SyntaxKind::UsingDirective)
        .filter(|n| n.child_by_field("name").is_none())
        .filter(|n| {
            let text = n.text().trim_start();
            let text = text.strip_prefix("global").unwrap_or(text).trim_start();
            !text.starts_with("using static")
        })
        .filter_map(|n| {
            n.children()
                .find(|c| matches!(c.kind(), SyntaxKind::IdentifierName | SyntaxKind::QualifiedName))
        })
        .map(|n| n.text().chars().filter(|c| !c.is_whitespace()).collect())
        .collect()
}
