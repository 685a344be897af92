use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::error::{DlogcoverError, Result};
use crate::language::Language;

/// Parses one translation unit with the grammar matching `language`.
/// Compiler arguments may force the language via `-x c` / `-x c++`
/// (either as one token or two); they are otherwise ignored by this
/// frontend.
///
/// Identical inputs yield equivalent trees. A tree whose root contains a
/// syntax error is reported as a `Parse` error carrying the first error
/// location; there are no warnings at this layer.
///
/// # Errors
/// `Parse` when the frontend rejects the input or the tree contains a
/// syntax error.
pub fn parse_translation_unit(
    path: &Path,
    content: &str,
    args: &[String],
    language: Language,
) -> Result<Tree> {
    let language = language_from_args(args).unwrap_or(language);
    let grammar = match language {
        Language::C => tree_sitter_c::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
    };

    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| DlogcoverError::parse(path.to_path_buf(), e.to_string()))?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| DlogcoverError::parse(path.to_path_buf(), "frontend returned no tree"))?;

    if tree.root_node().has_error() {
        let location = first_error(tree.root_node());
        return Err(DlogcoverError::Parse {
            path: path.to_path_buf(),
            message: "syntax error".to_string(),
            line: location,
        });
    }

    Ok(tree)
}

fn language_from_args(args: &[String]) -> Option<Language> {
    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        let value = if arg == "-x" {
            iter.peek().map(|s| s.as_str())
        } else {
            arg.strip_prefix("-x")
        };
        match value {
            Some("c") => return Some(Language::C),
            Some("c++") => return Some(Language::Cpp),
            _ => {}
        }
    }
    None
}

#[allow(clippy::cast_possible_truncation)]
fn first_error(node: Node<'_>) -> Option<u32> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row as u32 + 1);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error()
            && let Some(line) = first_error(child)
        {
            return Some(line);
        }
    }
    None
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
