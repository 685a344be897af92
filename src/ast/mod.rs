pub mod cache;
pub mod node;
pub mod parser;
pub mod visitor;

pub use cache::{AstCache, CacheStats};
pub use node::{AstNode, Location, NodeKind};
pub use parser::parse_translation_unit;
pub use visitor::AstBuilder;
