//! Tree-sitter front end: parses C# and lowers the concrete tree into a [`SyntaxTree`].

use tree_sitter::{Language, Node, Parser as TSParser, Tree};

use super::{NodeId, SyntaxError, SyntaxKind, SyntaxNode, SyntaxTree, TreeId};

/// Parents whose `name`/`left` identifier is a declared name rather than a reference.
const DECLARING_PARENTS: &[&str] = &[
    "namespace_declaration",
    "file_scoped_namespace_declaration",
    "class_declaration",
    "struct_declaration",
    "interface_declaration",
    "record_declaration",
    "record_struct_declaration",
    "enum_declaration",
    "delegate_declaration",
    "method_declaration",
    "constructor_declaration",
    "destructor_declaration",
    "property_declaration",
    "event_declaration",
    "enum_member_declaration",
    "variable_declarator",
    "parameter",
    "type_parameter",
    "local_function_statement",
    "catch_declaration",
    "declaration_expression",
    "foreach_statement",
    "from_clause",
    "let_clause",
    "join_clause",
    "query_continuation",
];

/// Parents under which any identifier is a name token.
const TOKEN_PARENTS: &[&str] = &[
    "generic_name",
    "type_parameter",
    "single_variable_designation",
    "implicit_parameter",
    "tuple_element",
    "labeled_statement",
    "extern_alias_directive",
];

/// C# parser using tree-sitter.
pub struct CSharpParser {
    language: Language,
}

impl CSharpParser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_c_sharp::LANGUAGE.into(),
        }
    }

    /// Parse source code into a tree-sitter tree.
    fn parse_tree(&self, path: &str, content: &str) -> Result<Tree, SyntaxError> {
        let mut parser = TSParser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| SyntaxError::Language(e.to_string()))?;

        parser.parse(content, None).ok_or_else(|| SyntaxError::Parse {
            path: path.to_string(),
            message: "Failed to parse content".to_string(),
        })
    }

    /// Parse `source` and lower it into an owned tree.
    pub fn parse(&self, id: TreeId, path: &str, source: &str) -> Result<SyntaxTree, SyntaxError> {
        let tree = self.parse_tree(path, source)?;
        let root = tree.root_node();
        if root.has_error() {
            log::debug!("{}: source contains syntax errors, extracting what parsed", path);
        }

        let mut nodes: Vec<SyntaxNode> = Vec::new();
        let mut comments = Vec::new();
        let mut stack: Vec<(Node, Option<NodeId>, Option<&'static str>)> = vec![(root, None, None)];

        while let Some((node, parent, field)) = stack.pop() {
            if node.kind() == "comment" {
                comments.push(node.byte_range());
                continue;
            }

            let id = NodeId(nodes.len() as u32);
            let parent_kind = parent.map(|p| nodes[p.0 as usize].grammar_kind);
            nodes.push(SyntaxNode {
                kind: lower_kind(node, parent_kind, field),
                grammar_kind: node.kind(),
                field,
                span: node.byte_range(),
                line: node.start_position().row + 1,
                parent,
                children: Vec::new(),
                end: id,
            });
            if let Some(p) = parent {
                nodes[p.0 as usize].children.push(id);
            }

            let mut kept = Vec::new();
            let mut cursor = node.walk();
            if cursor.goto_first_child() {
                loop {
                    let child = cursor.node();
                    let child_field = cursor.field_name();
                    if !child.is_missing() && (child.is_named() || child_field.is_some()) {
                        kept.push((child, Some(id), child_field));
                    }
                    if !cursor.goto_next_sibling() {
                        break;
                    }
                }
            }
            stack.extend(kept.into_iter().rev());
        }

        // Subtrees are contiguous in pre-order: a node ends where its last child ends.
        for i in (0..nodes.len()).rev() {
            let end = match nodes[i].children.last() {
                Some(last) => nodes[last.0 as usize].end,
                None => NodeId(i as u32 + 1),
            };
            nodes[i].end = end;
        }

        comments.sort_by_key(|c| c.start);

        Ok(SyntaxTree::from_parts(
            id,
            path.replace('\\', "/"),
            source.to_string(),
            nodes,
            comments,
        ))
    }
}

impl Default for CSharpParser {
    fn default() -> Self {
        Self::new()
    }
}

fn lower_kind(node: Node, parent_kind: Option<&str>, field: Option<&str>) -> SyntaxKind {
    match node.kind() {
        "compilation_unit" => SyntaxKind::CompilationUnit,
        "namespace_declaration" => SyntaxKind::NamespaceDeclaration,
        "file_scoped_namespace_declaration" => SyntaxKind::FileScopedNamespaceDeclaration,
        "using_directive" => SyntaxKind::UsingDirective,
        "declaration_list" => SyntaxKind::DeclarationList,

        "class_declaration" => SyntaxKind::ClassDeclaration,
        "struct_declaration" => SyntaxKind::StructDeclaration,
        "interface_declaration" => SyntaxKind::InterfaceDeclaration,
        "record_struct_declaration" => SyntaxKind::RecordStructDeclaration,
        "record_declaration" => {
            if has_token(node, "struct") {
                SyntaxKind::RecordStructDeclaration
            } else {
                SyntaxKind::RecordDeclaration
            }
        }
        "enum_declaration" => SyntaxKind::EnumDeclaration,
        "delegate_declaration" => SyntaxKind::DelegateDeclaration,

        "method_declaration" => SyntaxKind::MethodDeclaration,
        "constructor_declaration" => SyntaxKind::ConstructorDeclaration,
        "destructor_declaration" => SyntaxKind::DestructorDeclaration,
        "operator_declaration" | "conversion_operator_declaration" => SyntaxKind::OperatorDeclaration,
        "field_declaration" => SyntaxKind::FieldDeclaration,
        "event_field_declaration" => SyntaxKind::EventFieldDeclaration,
        "event_declaration" => SyntaxKind::EventDeclaration,
        "property_declaration" => SyntaxKind::PropertyDeclaration,
        "enum_member_declaration" => SyntaxKind::EnumMemberDeclaration,

        "base_list" => SyntaxKind::BaseList,
        "modifier" => SyntaxKind::Modifier,
        "type_parameter_list" => SyntaxKind::TypeParameterList,
        "type_parameter" => SyntaxKind::TypeParameter,
        "parameter_list" | "bracketed_parameter_list" => SyntaxKind::ParameterList,
        "parameter" => SyntaxKind::Parameter,
        "variable_declaration" => SyntaxKind::VariableDeclaration,
        "variable_declarator" => SyntaxKind::VariableDeclarator,

        "block" => SyntaxKind::Block,
        "arrow_expression_clause" => SyntaxKind::ArrowExpressionClause,
        "local_function_statement" => SyntaxKind::LocalFunctionStatement,
        "lambda_expression" | "anonymous_method_expression" => SyntaxKind::LambdaExpression,
        "implicit_parameter" => SyntaxKind::ImplicitParameter,
        "foreach_statement" => SyntaxKind::ForEachStatement,
        "catch_declaration" => SyntaxKind::CatchDeclaration,
        "declaration_expression" => SyntaxKind::DeclarationExpression,
        "declaration_pattern" => SyntaxKind::DeclarationPattern,

        "identifier" => lower_identifier(parent_kind, field),
        "generic_name" => SyntaxKind::GenericName,
        "qualified_name" => SyntaxKind::QualifiedName,
        "predefined_type" => SyntaxKind::PredefinedType,
        "implicit_type" => SyntaxKind::ImplicitType,
        "nullable_type" => SyntaxKind::NullableType,
        "array_type" => SyntaxKind::ArrayType,

        "invocation_expression" => SyntaxKind::InvocationExpression,
        "member_access_expression" => SyntaxKind::MemberAccessExpression,
        "object_creation_expression" => SyntaxKind::ObjectCreationExpression,
        "cast_expression" => SyntaxKind::CastExpression,
        "argument_list" => SyntaxKind::ArgumentList,
        "argument" => SyntaxKind::Argument,
        "this_expression" | "this" => SyntaxKind::ThisExpression,
        "base_expression" | "base" => SyntaxKind::BaseExpression,

        _ => SyntaxKind::Other,
    }
}

fn lower_identifier(parent_kind: Option<&str>, field: Option<&str>) -> SyntaxKind {
    let Some(parent) = parent_kind else {
        return SyntaxKind::IdentifierName;
    };
    if TOKEN_PARENTS.contains(&parent) {
        return SyntaxKind::Identifier;
    }
    if DECLARING_PARENTS.contains(&parent) && matches!(field, Some("name") | Some("left")) {
        return SyntaxKind::Identifier;
    }
    if parent == "lambda_expression" && field == Some("parameters") {
        return SyntaxKind::Identifier;
    }
    SyntaxKind::IdentifierName
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| !c.is_named() && c.kind() == token);
    found
}
