//! Dialect targets and their declaration semantics.
//!
//! The compiler reconciles a schema assembled from two sources: the
//! hand-authored files carrying generator conventions (hooks, marker
//! directives, derived inputs) and the storage engine's generated schema
//! carrying its native directives. Each output dialect keeps one side's
//! vocabulary and reshapes declarations accordingly.

use std::sync::LazyLock;

use regex::Regex;

use crate::cst::NodeId;
use crate::cst::SyntaxTree;
use crate::error::CompileError;
use crate::registry::declared_name;
use crate::registry::Category;
use crate::registry::DirectivePattern;
use crate::registry::Registry;

/// Directives native to the storage engine. The generator dialect drops
/// them; the storage dialect keeps nothing else.
pub const STORAGE_DIRECTIVES: [&str; 13] = [
    "id",
    "search",
    "hasInverse",
    "remote",
    "custom",
    "auth",
    "lambda",
    "generate",
    "secret",
    "dgraph",
    "default",
    "cacheControl",
    "withSubscription",
];

static W_ADD_ALTER: LazyLock<DirectivePattern> = LazyLock::new(|| {
    DirectivePattern::new(Regex::new(r"^w_(add|alter)").expect("valid regex"), None)
});
static X_ADD_ALTER: LazyLock<DirectivePattern> = LazyLock::new(|| {
    DirectivePattern::new(Regex::new(r"^x_(add|alter)").expect("valid regex"), None)
});
static W_NOT_ADD: LazyLock<DirectivePattern> = LazyLock::new(|| {
    DirectivePattern::new(
        Regex::new(r"^w_").expect("valid regex"),
        Some(Regex::new(r"^w_add").expect("valid regex")),
    )
});
static X_NOT_ADD: LazyLock<DirectivePattern> = LazyLock::new(|| {
    DirectivePattern::new(
        Regex::new(r"^x_").expect("valid regex"),
        Some(Regex::new(r"^x_add").expect("valid regex")),
    )
});
static W_ANY: LazyLock<DirectivePattern> =
    LazyLock::new(|| DirectivePattern::new(Regex::new(r"^w_").expect("valid regex"), None));
static X_ANY: LazyLock<DirectivePattern> =
    LazyLock::new(|| DirectivePattern::new(Regex::new(r"^x_").expect("valid regex"), None));

const DIRECTIVE_SOURCES: [Category; 2] = [Category::Types, Category::Interfaces];

/// Verdict of a semantics hook on a freshly lowered declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Output for the code generator: interfaces flattened into types,
    /// hooks expanded, marker directives stripped or propagated onto
    /// derived inputs.
    #[default]
    Generator,
    /// Output for the storage engine: only its native directives survive,
    /// and types shed the fields their interface already declares.
    Storage,
}

impl Dialect {
    /// Directive filter applied during lowering, wherever a directive
    /// occurs. Dropped directives leave an empty token behind.
    pub fn keep_directive(self, name: &str) -> bool {
        match self {
            Dialect::Generator => !STORAGE_DIRECTIVES.contains(&name),
            Dialect::Storage => STORAGE_DIRECTIVES.contains(&name),
        }
    }

    /// Whether field-level `x_*`/`w_*` markers are stripped from kept
    /// declarations.
    fn filters_markers(self) -> bool {
        matches!(self, Dialect::Generator)
    }

    /// Runs this dialect's semantics for one completed declaration.
    pub fn handle_definition(
        self,
        production: &str,
        tree: &mut SyntaxTree,
        registry: &mut Registry,
        node: NodeId,
    ) -> Result<Disposition, CompileError> {
        match production {
            "interface_type_definition" => self.interface(tree, registry, node),
            "object_type_definition" => self.object(tree, registry, node),
            "input_object_type_definition" => self.input(tree, registry, node),
            "enum_type_definition" => {
                let name = declared_name(tree, node, "enum")?;
                Ok(keep_if(registry.note_enum(&name)))
            }
            "union_type_definition" => {
                let name = declared_name(tree, node, "union")?;
                Ok(keep_if(registry.note_union(&name)))
            }
            _ => Ok(Disposition::Keep),
        }
    }

    fn interface(
        self,
        tree: &mut SyntaxTree,
        registry: &mut Registry,
        node: NodeId,
    ) -> Result<Disposition, CompileError> {
        let name = declared_name(tree, node, "interface")?;
        if registry.contains(Category::Interfaces, &name) {
            registry.update_fields(tree, Category::Interfaces, &name, node)?;
            return Ok(Disposition::Drop);
        }
        registry.populate(
            tree,
            Category::Interfaces,
            &name,
            node,
            self.filters_markers(),
        )?;
        if self == Dialect::Generator {
            // The generator has no use for interfaces once their fields
            // are flattened into the implementing types.
            let keyword = tree.token("type");
            tree.record_set(node, "_cst", keyword);
        }
        Ok(Disposition::Keep)
    }

    fn object(
        self,
        tree: &mut SyntaxTree,
        registry: &mut Registry,
        node: NodeId,
    ) -> Result<Disposition, CompileError> {
        let name = declared_name(tree, node, "type")?;
        if registry.contains(Category::Types, &name) {
            registry.update_fields(tree, Category::Types, &name, node)?;
            return Ok(Disposition::Drop);
        }
        match self {
            Dialect::Generator => {
                registry.inherit_interface(tree, &name, node)?;
                registry.populate(tree, Category::Types, &name, node, true)?;
                tree.record_remove(node, "_implements");
                if matches!(name.as_str(), "Query" | "Mutation") {
                    registry.copy_hook_directives(
                        tree,
                        &DIRECTIVE_SOURCES,
                        &name,
                        Category::Types,
                    )?;
                }
            }
            Dialect::Storage => {
                registry.populate(tree, Category::Types, &name, node, false)?;
                registry.inherit_interface_for_merge(tree, &name, node)?;
            }
        }
        Ok(Disposition::Keep)
    }

    /// Input declarations derive from a base type by naming convention;
    /// the generator dialect propagates that type's marker directives onto
    /// them. The storage dialect leaves inputs untouched.
    fn input(
        self,
        tree: &mut SyntaxTree,
        registry: &mut Registry,
        node: NodeId,
    ) -> Result<Disposition, CompileError> {
        if self == Dialect::Storage {
            return Ok(Disposition::Keep);
        }
        let name = declared_name(tree, node, "input")?;
        if registry.contains(Category::Inputs, &name) {
            return Ok(Disposition::Drop);
        }
        registry.populate(tree, Category::Inputs, &name, node, false)?;

        if let Some(base) = name
            .strip_prefix("Add")
            .and_then(|rest| rest.strip_suffix("Input"))
        {
            // Add inputs are allowed by default, so unconditional markers
            // stay behind and argument-carrying ones travel.
            if !base.is_empty() {
                self.copy(tree, registry, base, &name, &W_ADD_ALTER, false, false)?;
                self.copy(tree, registry, base, &name, &X_ADD_ALTER, false, true)?;
            }
        } else if let Some(base) = name.strip_suffix("Patch") {
            if !base.is_empty() {
                self.copy(tree, registry, base, &name, &W_NOT_ADD, false, false)?;
                self.copy(tree, registry, base, &name, &X_NOT_ADD, true, false)?;
            }
        } else if let Some(base) = name.strip_suffix("Filter") {
            if !base.is_empty() && !registry.is_union(base) {
                self.copy(tree, registry, base, &name, &W_ANY, false, false)?;
            }
        } else if let Some(base) = name.strip_suffix("Ref") {
            if !base.is_empty() && !registry.is_union(base) {
                self.copy(tree, registry, base, &name, &W_ANY, false, false)?;
                self.copy(tree, registry, base, &name, &X_ANY, false, false)?;
            }
        }
        Ok(Disposition::Keep)
    }

    #[allow(clippy::too_many_arguments)]
    fn copy(
        self,
        tree: &mut SyntaxTree,
        registry: &mut Registry,
        base: &str,
        input_name: &str,
        pattern: &DirectivePattern,
        set_default: bool,
        require_arguments: bool,
    ) -> Result<(), CompileError> {
        registry.copy_directives(
            tree,
            base,
            &DIRECTIVE_SOURCES,
            input_name,
            Category::Inputs,
            pattern,
            set_default,
            require_arguments,
        )
    }
}

fn keep_if(fresh: bool) -> Disposition {
    if fresh {
        Disposition::Keep
    } else {
        Disposition::Drop
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::lower_document;
    use crate::parser::parse_document;

    fn lower(source: &str, dialect: Dialect) -> (SyntaxTree, Registry, NodeId) {
        let definitions = parse_document(source).expect("valid schema");
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let doc = lower_document(&mut tree, &mut registry, dialect, &definitions)
            .expect("lowers");
        (tree, registry, doc)
    }

    fn definition_node(tree: &SyntaxTree, doc: NodeId, index: usize) -> NodeId {
        let wrapper = tree.seq_items(doc)[index];
        let entries = tree.record_entries(wrapper).expect("wrapper record");
        *entries.first().expect("one key").1
    }

    #[test]
    fn generator_rewrites_interfaces_to_types() {
        let (tree, _, doc) = lower("interface Node {\n  id: ID!\n}", Dialect::Generator);
        let node = definition_node(&tree, doc, 0);
        let keyword = tree.record_get(node, "_cst").expect("keyword");
        assert_eq!(tree.token_text(keyword), Some("type"));
        assert!(tree.record_get(node, "_implements").is_none());
    }

    #[test]
    fn storage_keeps_interfaces_and_implements_clauses() {
        let (tree, _, doc) = lower(
            "interface Node {\n  id: ID!\n}\ntype Widget implements Node {\n  name: String\n}",
            Dialect::Storage,
        );
        let interface = definition_node(&tree, doc, 0);
        let keyword = tree.record_get(interface, "_cst").expect("keyword");
        assert_eq!(tree.token_text(keyword), Some("interface"));
        let widget = definition_node(&tree, doc, 1);
        assert!(tree.record_get(widget, "_implements").is_some());
    }

    #[test]
    fn duplicate_enums_and_unions_drop_silently() {
        let (tree, _, doc) = lower(
            "enum Color {\n  RED\n}\nenum Color {\n  RED\n  GREEN\n}\nunion Item = Post\nunion Item = Post | Comment",
            Dialect::Storage,
        );
        let items = tree.seq_items(doc);
        assert_eq!(items.len(), 4);
        assert!(!tree.is_empty_token(items[0]));
        assert!(tree.is_empty_token(items[1]));
        assert!(!tree.is_empty_token(items[2]));
        assert!(tree.is_empty_token(items[3]));
    }

    #[test]
    fn directive_filtering_is_dialect_symmetric() {
        let dialect = Dialect::Generator;
        assert!(dialect.keep_directive("deprecated"));
        assert!(dialect.keep_directive("hook_"));
        assert!(!dialect.keep_directive("search"));

        let dialect = Dialect::Storage;
        assert!(!dialect.keep_directive("deprecated"));
        assert!(!dialect.keep_directive("hook_"));
        assert!(dialect.keep_directive("search"));
    }
}
