use std::collections::HashSet;

use tree_sitter::{Node, Tree};

use super::node::{AstNode, Location, NodeKind};

/// Builds the trimmed AST for one translation unit from the frontend's
/// concrete syntax tree.
///
/// Call expressions are classified against `log_names` in the same pass
/// that builds the tree, so `has_logging` propagates bottom-up without a
/// second traversal.
pub struct AstBuilder<'a> {
    source: &'a str,
    log_names: &'a HashSet<String>,
}

/// Traversal context carried down the declaration walk.
#[derive(Clone, Default)]
struct Scope {
    prefix: String,
    in_class: bool,
}

impl Scope {
    fn nested(&self, name: &str, in_class: bool) -> Self {
        let prefix = if name.is_empty() {
            self.prefix.clone()
        } else {
            format!("{}{}::", self.prefix, name)
        };
        Self {
            prefix,
            in_class: in_class || self.in_class,
        }
    }
}

impl<'a> AstBuilder<'a> {
    #[must_use]
    pub const fn new(source: &'a str, log_names: &'a HashSet<String>) -> Self {
        Self { source, log_names }
    }

    /// Produces the synthetic `Unknown` root aggregating all top-level
    /// declarations.
    #[must_use]
    pub fn build(&self, tree: &Tree) -> AstNode {
        let root = tree.root_node();
        let mut out = AstNode::new(NodeKind::Unknown, "translation_unit", location_of(root));
        self.visit_decls(root, &Scope::default(), &mut out);
        out
    }

    fn visit_decls(&self, node: Node<'_>, scope: &Scope, parent: &mut AstNode) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit_decl(child, scope, parent);
        }
    }

    fn visit_decl(&self, node: Node<'_>, scope: &Scope, parent: &mut AstNode) {
        match node.kind() {
            "namespace_definition" => {
                let name = node
                    .child_by_field_name("name")
                    .map(|n| self.text_of(n))
                    .unwrap_or_default();
                let nested = scope.nested(&name, false);
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_decls(body, &nested, parent);
                }
            }
            // extern "C" blocks are transparent: their declarations belong
            // to the enclosing context, and empty or nested blocks are
            // valid without producing nodes of their own.
            "linkage_specification" => {
                if let Some(body) = node.child_by_field_name("body") {
                    if body.kind() == "declaration_list" {
                        self.visit_decls(body, scope, parent);
                    } else {
                        self.visit_decl(body, scope, parent);
                    }
                }
            }
            "class_specifier" | "struct_specifier" => {
                if let Some(body) = node.child_by_field_name("body") {
                    let name = node
                        .child_by_field_name("name")
                        .map(|n| self.text_of(n))
                        .unwrap_or_default();
                    let nested = scope.nested(&name, true);
                    self.visit_decls(body, &nested, parent);
                }
            }
            "template_declaration" => self.visit_decls(node, scope, parent),
            "function_definition" => self.visit_function(node, scope, parent),
            "declaration" | "field_declaration" => {
                if let Some(spec) = class_body_child(node) {
                    self.visit_decl(spec, scope, parent);
                } else if find_function_declarator(node).is_some() {
                    let name = self.declarator_name(node);
                    let decl =
                        AstNode::new(NodeKind::FunctionDecl, scope.prefix.clone() + &name, location_of(node))
                            .with_text(self.text_of(node));
                    parent.push_child(decl);
                } else {
                    let mut decl = AstNode::new(
                        NodeKind::VarDecl,
                        self.declarator_name(node),
                        location_of(node),
                    )
                    .with_text(self.text_of(node));
                    self.visit_exprs(node, &mut decl);
                    parent.push_child(decl);
                }
            }
            "comment" | "preproc_include" | "preproc_def" => {}
            _ => self.visit_decls(node, scope, parent),
        }
    }

    fn visit_function(&self, node: Node<'_>, scope: &Scope, parent: &mut AstNode) {
        let name = self.declarator_name(node);
        let kind = if scope.in_class || name.contains("::") {
            NodeKind::Method
        } else {
            NodeKind::Function
        };

        let mut function = AstNode::new(kind, scope.prefix.clone() + &name, location_of(node))
            .with_text(self.text_of(node));
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_stmt(body, &mut function);
        }
        parent.push_child(function);
    }

    /// Resolves the declarator name of a function definition or
    /// declaration, unwrapping pointer and reference declarators.
    fn declarator_name(&self, node: Node<'_>) -> String {
        let Some(mut decl) = node.child_by_field_name("declarator") else {
            return String::new();
        };
        loop {
            match decl.kind() {
                "pointer_declarator" | "reference_declarator" | "init_declarator" => {
                    match decl.child_by_field_name("declarator") {
                        Some(inner) => decl = inner,
                        None => break,
                    }
                }
                "function_declarator" => match decl.child_by_field_name("declarator") {
                    Some(inner) => decl = inner,
                    None => break,
                },
                _ => break,
            }
        }
        self.text_of(decl)
    }

    fn visit_stmt(&self, node: Node<'_>, parent: &mut AstNode) {
        match node.kind() {
            "compound_statement" => {
                let mut block =
                    AstNode::new(NodeKind::CompoundStmt, "", location_of(node));
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit_stmt(child, &mut block);
                }
                parent.push_child(block);
            }
            "if_statement" => self.visit_if(node, parent),
            "switch_statement" => self.visit_switch(node, parent),
            "for_statement" | "for_range_loop" => {
                self.visit_loop(node, NodeKind::For, parent);
            }
            "while_statement" => self.visit_loop(node, NodeKind::While, parent),
            "do_statement" => self.visit_loop(node, NodeKind::Do, parent),
            "try_statement" => self.visit_try(node, parent),
            "expression_statement" | "return_statement" | "throw_statement" => {
                self.visit_exprs(node, parent);
            }
            "declaration" => {
                let mut decl = AstNode::new(
                    NodeKind::VarDecl,
                    self.declarator_name(node),
                    location_of(node),
                )
                .with_text(self.text_of(node));
                self.visit_exprs(node, &mut decl);
                parent.push_child(decl);
            }
            "comment" => {}
            kind if kind.ends_with("expression") => self.visit_exprs(node, parent),
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit_stmt(child, parent);
                }
            }
        }
    }

    fn visit_if(&self, node: Node<'_>, parent: &mut AstNode) {
        let guard = node
            .child_by_field_name("condition")
            .map(|n| self.text_of(n))
            .unwrap_or_default();
        let mut branch =
            AstNode::new(NodeKind::If, guard, location_of(node)).with_text(self.text_of(node));

        if let Some(condition) = node.child_by_field_name("condition") {
            self.visit_exprs(condition, &mut branch);
        }
        if let Some(consequence) = node.child_by_field_name("consequence") {
            self.visit_stmt(consequence, &mut branch);
        }
        if let Some(alternative) = node.child_by_field_name("alternative") {
            let mut other =
                AstNode::new(NodeKind::Else, "else", location_of(alternative));
            if alternative.kind() == "else_clause" {
                let mut cursor = alternative.walk();
                for child in alternative.named_children(&mut cursor) {
                    self.visit_stmt(child, &mut other);
                }
            } else {
                self.visit_stmt(alternative, &mut other);
            }
            branch.push_child(other);
        }
        parent.push_child(branch);
    }

    fn visit_switch(&self, node: Node<'_>, parent: &mut AstNode) {
        let guard = node
            .child_by_field_name("condition")
            .map(|n| self.text_of(n))
            .unwrap_or_default();
        let mut switch =
            AstNode::new(NodeKind::Switch, guard, location_of(node)).with_text(self.text_of(node));

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for child in body.named_children(&mut cursor) {
                if child.kind() == "case_statement" {
                    self.visit_case(child, &mut switch);
                } else {
                    self.visit_stmt(child, &mut switch);
                }
            }
        }
        parent.push_child(switch);
    }

    fn visit_case(&self, node: Node<'_>, parent: &mut AstNode) {
        // A `default:` label has no value; it only counts when present in
        // the source, which is exactly when this node exists.
        let value = node.child_by_field_name("value");
        let guard = value.map_or_else(|| "default".to_string(), |n| self.text_of(n));
        let mut case =
            AstNode::new(NodeKind::Case, guard, location_of(node)).with_text(self.text_of(node));

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if value.is_some_and(|v| v.id() == child.id()) {
                continue;
            }
            self.visit_stmt(child, &mut case);
        }
        parent.push_child(case);
    }

    fn visit_loop(&self, node: Node<'_>, kind: NodeKind, parent: &mut AstNode) {
        let mut looped =
            AstNode::new(kind, "", location_of(node)).with_text(self.text_of(node));
        let body = node.child_by_field_name("body");
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            let is_statement =
                body.is_some_and(|b| b.id() == child.id()) || child.kind().ends_with("statement");
            if is_statement {
                self.visit_stmt(child, &mut looped);
            } else {
                self.visit_exprs(child, &mut looped);
            }
        }
        parent.push_child(looped);
    }

    fn visit_try(&self, node: Node<'_>, parent: &mut AstNode) {
        let mut tried =
            AstNode::new(NodeKind::Try, "try", location_of(node)).with_text(self.text_of(node));
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_stmt(body, &mut tried);
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "catch_clause" {
                let mut handler =
                    AstNode::new(NodeKind::Catch, "catch", location_of(child))
                        .with_text(self.text_of(child));
                if let Some(body) = child.child_by_field_name("body") {
                    self.visit_stmt(body, &mut handler);
                }
                tried.push_child(handler);
            }
        }
        parent.push_child(tried);
    }

    /// Walks an expression subtree, emitting `CallExpr`/`LogCallExpr`
    /// nodes. Stream-style chains (`qDebug() << "msg"`) collapse into one
    /// log-call node carrying the whole chain text so message extraction
    /// sees the streamed literal.
    fn visit_exprs(&self, node: Node<'_>, parent: &mut AstNode) {
        match node.kind() {
            "call_expression" => self.visit_call(node, parent),
            "binary_expression" => {
                if !self.visit_shift_chain(node, parent) {
                    let mut cursor = node.walk();
                    for child in node.named_children(&mut cursor) {
                        self.visit_exprs(child, parent);
                    }
                }
            }
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit_exprs(child, parent);
                }
            }
        }
    }

    fn visit_call(&self, node: Node<'_>, parent: &mut AstNode) {
        let name = node
            .child_by_field_name("function")
            .map(|f| self.callee_name(f))
            .unwrap_or_default();

        let kind = if self.is_log_name(&name) {
            NodeKind::LogCallExpr
        } else {
            NodeKind::CallExpr
        };
        let mut call = AstNode::new(kind, name, location_of(node)).with_text(self.text_of(node));
        call.has_logging = kind == NodeKind::LogCallExpr;

        if let Some(arguments) = node.child_by_field_name("arguments") {
            let mut cursor = arguments.walk();
            for child in arguments.named_children(&mut cursor) {
                self.visit_exprs(child, &mut call);
            }
        }
        parent.push_child(call);
    }

    /// Collapses a `<<` chain rooted at a recognized log call. Returns
    /// false when the chain does not start with a known log function, in
    /// which case the caller falls back to generic recursion.
    fn visit_shift_chain(&self, node: Node<'_>, parent: &mut AstNode) -> bool {
        let mut current = node;
        let mut streamed = Vec::new();
        loop {
            let operator = current
                .child_by_field_name("operator")
                .map(|o| self.text_of(o));
            if current.kind() != "binary_expression" || operator.as_deref() != Some("<<") {
                break;
            }
            let (Some(left), Some(right)) = (
                current.child_by_field_name("left"),
                current.child_by_field_name("right"),
            ) else {
                break;
            };
            streamed.push(right);
            current = left;
        }

        if current.kind() != "call_expression" {
            return false;
        }
        let name = current
            .child_by_field_name("function")
            .map(|f| self.callee_name(f))
            .unwrap_or_default();
        if !self.is_log_name(&name) {
            return false;
        }

        let mut call = AstNode::new(NodeKind::LogCallExpr, name, location_of(current))
            .with_text(self.text_of(node));
        call.has_logging = true;
        if let Some(arguments) = current.child_by_field_name("arguments") {
            let mut cursor = arguments.walk();
            for child in arguments.named_children(&mut cursor) {
                self.visit_exprs(child, &mut call);
            }
        }
        for operand in streamed.into_iter().rev() {
            self.visit_exprs(operand, &mut call);
        }
        parent.push_child(call);
        true
    }

    fn callee_name(&self, function: Node<'_>) -> String {
        match function.kind() {
            "field_expression" => function
                .child_by_field_name("field")
                .map(|f| self.text_of(f))
                .unwrap_or_default(),
            "template_function" => function
                .child_by_field_name("name")
                .map(|f| self.text_of(f))
                .unwrap_or_default(),
            _ => self.text_of(function),
        }
    }

    fn is_log_name(&self, name: &str) -> bool {
        if self.log_names.contains(name) {
            return true;
        }
        name.rsplit("::")
            .next()
            .is_some_and(|last| self.log_names.contains(last))
    }

    fn text_of(&self, node: Node<'_>) -> String {
        node.utf8_text(self.source.as_bytes())
            .unwrap_or_default()
            .to_string()
    }
}

/// A class or struct specifier with a body nested directly inside a
/// declaration (`class A { ... } instance;`).
fn class_body_child<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).find(|child| {
        matches!(child.kind(), "class_specifier" | "struct_specifier")
            && child.child_by_field_name("body").is_some()
    })
}

/// Finds the function declarator of a declaration, if any, unwrapping
/// pointer/reference/init wrappers.
fn find_function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node.child_by_field_name("declarator")?;
    loop {
        match current.kind() {
            "function_declarator" => return Some(current),
            "pointer_declarator" | "reference_declarator" | "init_declarator" => {
                current = current.child_by_field_name("declarator")?;
            }
            _ => return None,
        }
    }
}

/// Converts frontend positions into 1-based locations; an unrepresentable
/// position yields the zeroed "unknown" location instead of dropping the
/// node.
fn location_of(node: Node<'_>) -> Location {
    let start = node.start_position();
    let end = node.end_position();
    Location::with_end(
        pos(start.row),
        pos(start.column),
        pos(end.row),
        pos(end.column),
    )
}

fn pos(value: usize) -> u32 {
    u32::try_from(value + 1).unwrap_or(0)
}

#[cfg(test)]
#[path = "visitor_tests.rs"]
mod tests;
