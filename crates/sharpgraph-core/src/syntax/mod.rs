//! Owned C# syntax trees.
//!
//! Source files are parsed with tree-sitter (see [`CSharpParser`]) and lowered into an
//! arena of [`SyntaxNode`]s. Node ids are assigned in pre-order, so the subtree of a node
//! is the contiguous id range `id + 1 .. end`. Comments are not nodes; their byte spans are
//! kept on the tree so text can be rendered with or without them.

mod treesitter;

pub use treesitter::CSharpParser;

use std::ops::Range;
use thiserror::Error;

/// Errors raised while turning source text into a [`SyntaxTree`].
#[derive(Debug, Error)]
pub enum SyntaxError {
    #[error("Failed to set language: {0}")]
    Language(String),

    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },
}

/// Index of a tree inside a compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(pub u32);

/// Index of a node inside its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Compilation-wide address of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyntaxRef {
    pub tree: TreeId,
    pub node: NodeId,
}

/// Node kinds the extractor and binder care about. Everything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    CompilationUnit,
    NamespaceDeclaration,
    FileScopedNamespaceDeclaration,
    UsingDirective,
    DeclarationList,

    ClassDeclaration,
    StructDeclaration,
    InterfaceDeclaration,
    RecordDeclaration,
    RecordStructDeclaration,
    EnumDeclaration,
    DelegateDeclaration,

    MethodDeclaration,
    ConstructorDeclaration,
    DestructorDeclaration,
    OperatorDeclaration,
    FieldDeclaration,
    EventFieldDeclaration,
    EventDeclaration,
    PropertyDeclaration,
    EnumMemberDeclaration,

    BaseList,
    Modifier,
    TypeParameterList,
    TypeParameter,
    ParameterList,
    Parameter,
    VariableDeclaration,
    VariableDeclarator,

    Block,
    ArrowExpressionClause,
    LocalFunctionStatement,
    LambdaExpression,
    ImplicitParameter,
    ForEachStatement,
    CatchDeclaration,
    DeclarationExpression,
    DeclarationPattern,

    /// Name token of a declaration (class name, variable name, parameter name...).
    Identifier,
    /// A simple name used as an expression or type reference.
    IdentifierName,
    GenericName,
    QualifiedName,
    PredefinedType,
    ImplicitType,
    NullableType,
    ArrayType,

    InvocationExpression,
    MemberAccessExpression,
    ObjectCreationExpression,
    CastExpression,
    ArgumentList,
    Argument,
    ThisExpression,
    BaseExpression,

    Other,
}

impl SyntaxKind {
    /// Type declarations that introduce a named type symbol.
    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            Self::ClassDeclaration
                | Self::StructDeclaration
                | Self::InterfaceDeclaration
                | Self::RecordDeclaration
                | Self::RecordStructDeclaration
                | Self::EnumDeclaration
                | Self::DelegateDeclaration
        )
    }

    /// Declarations with a `{ ... }` member list: everything but enums and delegates.
    pub fn is_member_container(self) -> bool {
        matches!(
            self,
            Self::ClassDeclaration
                | Self::StructDeclaration
                | Self::InterfaceDeclaration
                | Self::RecordDeclaration
                | Self::RecordStructDeclaration
        )
    }

    /// Method-like declarations with a parameter list and optional body.
    pub fn is_base_method(self) -> bool {
        matches!(
            self,
            Self::MethodDeclaration | Self::ConstructorDeclaration | Self::DestructorDeclaration
        )
    }
}

/// A lowered syntax node.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    pub grammar_kind: &'static str,
    /// Field name under which the parent holds this node.
    pub field: Option<&'static str>,
    pub span: Range<usize>,
    pub line: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// One past the last descendant id.
    pub end: NodeId,
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    id: TreeId,
    path: String,
    source: String,
    nodes: Vec<SyntaxNode>,
    comments: Vec<Range<usize>>,
}

impl SyntaxTree {
    pub(crate) fn from_parts(
        id: TreeId,
        path: String,
        source: String,
        nodes: Vec<SyntaxNode>,
        comments: Vec<Range<usize>>,
    ) -> Self {
        Self {
            id,
            path,
            source,
            nodes,
            comments,
        }
    }

    pub fn id(&self) -> TreeId {
        self.id
    }

    /// File path with `/` separators.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The compilation unit. Trees always have at least the root node.
    pub fn root(&self) -> NodeRef<'_> {
        self.node(NodeId(0))
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// Resolve a compilation-wide reference if it points into this tree.
    pub fn get(&self, r: SyntaxRef) -> Option<NodeRef<'_>> {
        if r.tree == self.id && (r.node.0 as usize) < self.nodes.len() {
            Some(self.node(r.node))
        } else {
            None
        }
    }

    fn data(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.0 as usize]
    }

    /// Render `range` of the source with every comment inside it removed.
    pub fn text_without_comments(&self, range: Range<usize>) -> String {
        let mut out = String::with_capacity(range.len());
        let mut cursor = range.start;
        for comment in &self.comments {
            if comment.end <= range.start || comment.start >= range.end {
                continue;
            }
            let start = comment.start.max(range.start);
            if start > cursor {
                out.push_str(&self.source[cursor..start]);
            }
            cursor = cursor.max(comment.end.min(range.end));
        }
        if cursor < range.end {
            out.push_str(&self.source[cursor..range.end]);
        }
        out
    }
}

/// Borrowed handle to a node of a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("kind", &self.kind())
            .field("grammar_kind", &self.grammar_kind())
            .field("span", &self.span())
            .finish()
    }
}

impl<'t> NodeRef<'t> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn syntax_ref(&self) -> SyntaxRef {
        SyntaxRef {
            tree: self.tree.id,
            node: self.id,
        }
    }

    pub fn kind(&self) -> SyntaxKind {
        self.tree.data(self.id).kind
    }

    pub fn grammar_kind(&self) -> &'static str {
        self.tree.data(self.id).grammar_kind
    }

    pub fn field(&self) -> Option<&'static str> {
        self.tree.data(self.id).field
    }

    pub fn span(&self) -> Range<usize> {
        self.tree.data(self.id).span.clone()
    }

    /// 1-based line of the first byte.
    pub fn line(&self) -> usize {
        self.tree.data(self.id).line
    }

    pub fn text(&self) -> &'t str {
        &self.tree.source[self.span()]
    }

    pub fn text_without_comments(&self) -> String {
        self.tree.text_without_comments(self.span())
    }

    pub fn parent(&self) -> Option<NodeRef<'t>> {
        self.tree.data(self.id).parent.map(|id| self.tree.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        let tree = self.tree;
        tree.data(self.id).children.iter().map(move |&id| tree.node(id))
    }

    pub fn child_by_field(&self, field: &str) -> Option<NodeRef<'t>> {
        self.children().find(|c| c.field() == Some(field))
    }

    pub fn first_child_of_kind(&self, kind: SyntaxKind) -> Option<NodeRef<'t>> {
        self.children().find(|c| c.kind() == kind)
    }

    pub fn children_of_kind(&self, kind: SyntaxKind) -> impl Iterator<Item = NodeRef<'t>> + 't {
        self.children().filter(move |c| c.kind() == kind)
    }

    /// Every node below this one, in pre-order.
    pub fn descendants(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        let tree = self.tree;
        let end = tree.data(self.id).end.0;
        (self.id.0 + 1..end).map(move |id| tree.node(NodeId(id)))
    }

    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    /// Whether `other` lies in this node's subtree (or is this node).
    pub fn contains(&self, other: NodeRef<'_>) -> bool {
        let end = self.tree.data(self.id).end.0;
        self.tree.id == other.tree.id && other.id.0 >= self.id.0 && other.id.0 < end
    }

    /// Modifier keywords (`public`, `static`, `partial`...) in source order.
    pub fn modifiers(&self) -> Vec<&'t str> {
        self.children_of_kind(SyntaxKind::Modifier)
            .map(|m| m.text().trim())
            .collect()
    }

    /// Name token of a declaration.
    pub fn name(&self) -> Option<&'t str> {
        self.child_by_field("name")
            .or_else(|| self.first_child_of_kind(SyntaxKind::Identifier))
            .map(|n| n.text())
    }

    /// The block or arrow clause of a member declaration.
    pub fn body(&self) -> Option<NodeRef<'t>> {
        self.child_by_field("body").or_else(|| {
            self.children()
                .find(|c| matches!(c.kind(), SyntaxKind::Block | SyntaxKind::ArrowExpressionClause))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SyntaxTree {
        CSharpParser::new()
            .parse(TreeId(0), "Sample.cs", source)
            .unwrap()
    }

    #[test]
    fn test_descendants_are_preorder_and_contiguous() {
        let tree = parse("class A { void M() { int x = 1; } }");
        let root = tree.root();
        let all: Vec<_> = root.descendants().collect();
        assert_eq!(all.len(), tree.len() - 1);
        let class = all
            .iter()
            .find(|n| n.kind() == SyntaxKind::ClassDeclaration)
            .unwrap();
        let method = class
            .descendants()
            .find(|n| n.kind() == SyntaxKind::MethodDeclaration)
            .unwrap();
        assert!(class.contains(method));
        assert!(!method.contains(*class));
    }

    #[test]
    fn test_text_without_comments() {
        let tree = parse("enum Color { /* first */ Red, // second\n Green }");
        let decl = tree
            .root()
            .descendants()
            .find(|n| n.kind() == SyntaxKind::EnumDeclaration)
            .unwrap();
        let text = decl.text_without_comments();
        assert!(!text.contains("first"));
        assert!(!text.contains("second"));
        assert!(text.contains("Red"));
        assert!(text.contains("Green"));
    }

    #[test]
    fn test_declaration_names_are_not_identifier_names() {
        let tree = parse("class A { Widget w; void M(int p) { w.Spin(); } }");
        let names: Vec<_> = tree
            .root()
            .descendants()
            .filter(|n| n.kind() == SyntaxKind::IdentifierName)
            .map(|n| n.text())
            .collect();
        assert!(names.contains(&"Widget"));
        assert!(names.contains(&"w"));
        assert!(names.contains(&"Spin"));
        assert!(!names.contains(&"A"));
        assert!(!names.contains(&"M"));
        assert!(!names.contains(&"p"));
    }

    #[test]
    fn test_modifiers_and_body() {
        let tree = parse("public abstract class A { protected virtual void M() { } }");
        let class = tree
            .root()
            .descendants()
            .find(|n| n.kind() == SyntaxKind::ClassDeclaration)
            .unwrap();
        assert_eq!(class.modifiers(), vec!["public", "abstract"]);
        assert_eq!(class.name(), Some("A"));
        let method = class
            .descendants()
            .find(|n| n.kind() == SyntaxKind::MethodDeclaration)
            .unwrap();
        assert_eq!(method.body().map(|b| b.kind()), Some(SyntaxKind::Block));
    }
}
