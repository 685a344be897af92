use serde::Serialize;

/// Maximum number of bytes of source text stored on a node.
pub const MAX_NODE_TEXT: usize = 512;

/// Kind of a trimmed AST node. Fixed after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Function,
    Method,
    FunctionDecl,
    CallExpr,
    LogCallExpr,
    VarDecl,
    CompoundStmt,
    If,
    Else,
    Switch,
    Case,
    For,
    While,
    Do,
    Try,
    Catch,
    Branch,
    Loop,
    Expression,
    Statement,
    Declaration,
    TryCatch,
    Unknown,
}

impl NodeKind {
    /// Function-like definitions counted by function coverage.
    #[must_use]
    pub const fn is_function(self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }

    /// Branch elements counted by branch coverage.
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(self, Self::If | Self::Else | Self::Switch | Self::Case)
    }

    /// Exception elements counted by exception coverage.
    #[must_use]
    pub const fn is_exception(self) -> bool {
        matches!(self, Self::Try | Self::Catch)
    }

    /// Branch kinds that carry a guard expression. Only these can become
    /// key paths; an `else` has no guard of its own.
    #[must_use]
    pub const fn has_guard(self) -> bool {
        matches!(self, Self::If | Self::Switch | Self::Case)
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::FunctionDecl => "function declaration",
            Self::CallExpr => "call",
            Self::LogCallExpr => "log call",
            Self::VarDecl => "variable declaration",
            Self::CompoundStmt => "block",
            Self::If => "if branch",
            Self::Else => "else branch",
            Self::Switch => "switch",
            Self::Case => "case branch",
            Self::For => "for loop",
            Self::While => "while loop",
            Self::Do => "do loop",
            Self::Try => "try block",
            Self::Catch => "catch handler",
            Self::Branch => "branch",
            Self::Loop => "loop",
            Self::Expression => "expression",
            Self::Statement => "statement",
            Self::Declaration => "declaration",
            Self::TryCatch => "try/catch",
            Self::Unknown => "unknown",
        }
    }
}

/// Source position, 1-based. Zero line/column means the frontend reported
/// no usable location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl Location {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self {
            line,
            column,
            end_line: 0,
            end_column: 0,
        }
    }

    #[must_use]
    pub const fn with_end(line: u32, column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            line,
            column,
            end_line,
            end_column,
        }
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.line == 0
    }
}

/// A trimmed AST node. Children are exclusively owned, ordered in
/// source-text order; `Clone` produces the deep copy the cache hands out.
///
/// The enclosing file is not stored on nodes; per-file trees are keyed by
/// path wherever they travel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode {
    pub kind: NodeKind,
    pub name: String,
    pub location: Location,
    pub text: String,
    pub has_logging: bool,
    pub children: Vec<AstNode>,
}

impl AstNode {
    #[must_use]
    pub fn new(kind: NodeKind, name: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            name: name.into(),
            location,
            text: String::new(),
            has_logging: false,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = truncate_text(&text.into());
        self
    }

    /// Appends a child, propagating `has_logging` upward (post-order
    /// invariant: a node has logging iff it is a log call or any
    /// descendant is).
    pub fn push_child(&mut self, child: Self) {
        self.has_logging |= child.has_logging;
        self.children.push(child);
    }

    /// Pre-order traversal over the node and all descendants.
    pub fn walk(&self, visit: &mut impl FnMut(&Self)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Number of nodes in the subtree, used as the complexity estimate for
    /// function tasks.
    #[must_use]
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(Self::subtree_size)
            .sum::<usize>()
    }

    /// Estimated heap memory of the subtree, used by the cache byte cap.
    #[must_use]
    pub fn estimated_memory(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.name.len()
            + self.text.len()
            + self
                .children
                .iter()
                .map(Self::estimated_memory)
                .sum::<usize>()
    }

    /// Checks the post-order `has_logging` invariant over the subtree.
    #[must_use]
    pub fn logging_flag_consistent(&self) -> bool {
        let derived = self.kind == NodeKind::LogCallExpr
            || self.children.iter().any(|c| c.has_logging);
        if self.has_logging != derived {
            return false;
        }
        self.children.iter().all(Self::logging_flag_consistent)
    }
}

/// Truncates node text to `MAX_NODE_TEXT` bytes on a char boundary.
#[must_use]
pub fn truncate_text(text: &str) -> String {
    if text.len() <= MAX_NODE_TEXT {
        return text.to_string();
    }
    let mut end = MAX_NODE_TEXT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
