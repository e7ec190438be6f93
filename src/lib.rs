//! Schema-dialect compiler for GraphQL SDL.
//!
//! The input schema declares the same logical types twice, once from the
//! hand-authored source files and once from the storage engine's generated
//! dump. The compiler parses the whole document into an order-preserving
//! syntax tree, reconciles the duplicates, resolves single-interface
//! inheritance, propagates marker directives between types and their
//! derived inputs, and regenerates schema text for one of two targets:
//!
//! * [`Dialect::Generator`] — interfaces become plain types, object types
//!   absorb interface fields, hook markers expand into pre/post operation
//!   directives, storage-native directives are stripped.
//! * [`Dialect::Storage`] — only storage-native directives survive, and
//!   types shed the fields their interface already declares.
//!
//! ```
//! use sdl_dialect::Dialect;
//! use sdl_dialect::Pipeline;
//!
//! let compiled = Pipeline::new(Dialect::Generator)
//!     .compile("interface Node {\n  id: ID!\n}")
//!     .expect("valid schema");
//! assert_eq!(compiled.output, "\n\n\ntype Node {\n  id: ID!\n}");
//! ```

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod cst;
pub mod dialect;
pub mod error;
pub mod format;
pub mod inline;
pub mod parser;
pub mod registry;

pub use crate::cst::NodeId;
pub use crate::cst::SyntaxTree;
pub use crate::dialect::Dialect;
pub use crate::error::CompileError;
pub use crate::registry::Registry;

/// One compilation run: parse, apply the dialect's semantic passes, and
/// format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline {
    dialect: Dialect,
}

/// Everything a finished run produced. `output` is the reformatted schema
/// text; the tree, document handle and registry stay available for
/// inspection and debug dumps.
pub struct Compiled {
    pub output: String,
    pub tree: SyntaxTree,
    pub document: NodeId,
    pub registry: Registry,
}

impl Pipeline {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn compile(&self, source: &str) -> Result<Compiled, CompileError> {
        let definitions = parser::parse_document(source)?;
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let document =
            parser::lower_document(&mut tree, &mut registry, self.dialect, &definitions)?;
        let output = format::format(&tree, document, registry.extra_directives());
        Ok(Compiled {
            output,
            tree,
            document,
            registry,
        })
    }
}

/// Convenience wrapper when only the reformatted text matters.
pub fn compile_schema(source: &str, dialect: Dialect) -> Result<String, CompileError> {
    Pipeline::new(dialect).compile(source).map(|c| c.output)
}
