//! Declaration registry and the semantic passes that run against it.
//!
//! The registry shadows the syntax tree with category tables (interfaces,
//! types, inputs) keyed by declaration name, in first-seen order. Each
//! entry keeps node handles back into the tree, so a pass can look a
//! declaration up by name and then splice fields or directives into the
//! original declaration, wherever in the document it appeared.

use std::sync::LazyLock;

use indexmap::IndexMap;
use indexmap::IndexSet;
use regex::Regex;
use tracing::warn;

use crate::cst::NodeId;
use crate::cst::SyntaxTree;
use crate::error::CompileError;

/// Type-level marker directive consumed by hook propagation. The name is
/// the bare prefix; propagated copies get the operation and type name
/// appended.
pub const HOOK_DIRECTIVE: &str = "hook_";

/// Argument names a pre-hook directive may attach to.
pub const INPUT_NAMES: [&str; 2] = ["input", "filter"];

/// Field injected into a type whose fields were all hoisted to its
/// interface; the storage engine rejects empty type bodies.
pub const PLACEHOLDER_FIELD: &str = "_VOID";

/// Synthesized marker protecting a patch-input field that ended up with
/// no directives at all.
pub const READ_ONLY_DIRECTIVE: &str = "x_patch_ro";

static HOOK_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(query|get|add|update|delete)(\w*)").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Interfaces,
    Types,
    Inputs,
}

/// A recorded directive occurrence: its name plus the handle of the
/// directive record in the tree.
#[derive(Debug, Clone)]
pub struct DirectiveRef {
    pub name: String,
    pub node: NodeId,
}

/// One field of a registered declaration. `node` is the wrapper record
/// holding the field, so the field can be moved between declarations
/// wholesale.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub name: String,
    pub args: Option<NodeId>,
    pub directives: Vec<DirectiveRef>,
    pub node: NodeId,
}

#[derive(Debug, Clone)]
pub struct TypeEntry {
    pub fields: Vec<FieldEntry>,
    pub directives: Vec<DirectiveRef>,
    pub implements: Option<String>,
    pub node: NodeId,
}

/// Name filter for directive propagation. The storage-authored schemas
/// use prefixes with carve-outs (`w_*` except `w_add*`), which a single
/// regex cannot express without lookahead, hence the explicit exclusion.
#[derive(Debug)]
pub struct DirectivePattern {
    include: Regex,
    exclude: Option<Regex>,
}

impl DirectivePattern {
    pub fn new(include: Regex, exclude: Option<Regex>) -> Self {
        Self { include, exclude }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.include.is_match(name)
            && self.exclude.as_ref().map_or(true, |e| !e.is_match(name))
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    interfaces: IndexMap<String, TypeEntry>,
    types: IndexMap<String, TypeEntry>,
    inputs: IndexMap<String, TypeEntry>,
    enums: IndexSet<String>,
    unions: IndexSet<String>,
    extra_directives: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, category: Category) -> &IndexMap<String, TypeEntry> {
        match category {
            Category::Interfaces => &self.interfaces,
            Category::Types => &self.types,
            Category::Inputs => &self.inputs,
        }
    }

    fn table_mut(&mut self, category: Category) -> &mut IndexMap<String, TypeEntry> {
        match category {
            Category::Interfaces => &mut self.interfaces,
            Category::Types => &mut self.types,
            Category::Inputs => &mut self.inputs,
        }
    }

    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.table(category).contains_key(name)
    }

    pub fn entry(&self, category: Category, name: &str) -> Option<&TypeEntry> {
        self.table(category).get(name)
    }

    /// Registers an enum name; false means it was already seen.
    pub fn note_enum(&mut self, name: &str) -> bool {
        self.enums.insert(name.to_owned())
    }

    /// Registers a union name; false means it was already seen.
    pub fn note_union(&mut self, name: &str) -> bool {
        self.unions.insert(name.to_owned())
    }

    pub fn is_union(&self, name: &str) -> bool {
        self.unions.contains(name)
    }

    /// Directive definitions synthesized by hook propagation, emitted at
    /// the top of the output document.
    pub fn extra_directives(&self) -> &[String] {
        &self.extra_directives
    }

    fn push_extra_directive(&mut self, definition: String) {
        if !self.extra_directives.contains(&definition) {
            self.extra_directives.push(definition);
        }
    }

    /// Records a declaration into its category table. Hook marker
    /// directives are recorded, then removed from the declaration so they
    /// never reach the output. With `filter_directives`, `x_*` and `w_*`
    /// field directives are likewise recorded then stripped.
    pub fn populate(
        &mut self,
        tree: &mut SyntaxTree,
        category: Category,
        name: &str,
        node: NodeId,
        filter_directives: bool,
    ) -> Result<(), CompileError> {
        let mut entry = TypeEntry {
            fields: Vec::new(),
            directives: Vec::new(),
            implements: None,
            node,
        };

        if let Some(dirs) = tree.record_get(node, "_directives") {
            let mut hooks = Vec::new();
            for (index, dir) in tree.seq_items(dirs).to_vec().into_iter().enumerate() {
                if tree.is_empty_token(dir) {
                    continue;
                }
                let Some(dir_name) = directive_name(tree, dir) else {
                    continue;
                };
                if dir_name == HOOK_DIRECTIVE {
                    hooks.push(index);
                }
                entry.directives.push(DirectiveRef {
                    name: dir_name,
                    node: dir,
                });
            }
            tree.seq_remove_indices(dirs, hooks);
        }

        if let Some(implements) = tree.record_get(node, "_implements") {
            let items = tree.seq_items(implements);
            if items.len() > 2 {
                return Err(CompileError::MultipleInterfaces {
                    type_name: name.to_owned(),
                });
            }
            if let Some(&interface) = items.get(1) {
                entry.implements = declared_name_of(tree, interface).map(str::to_owned);
            }
        }

        let body = body_fields(tree, name, node)?;
        for wrapper in tree.seq_items(body).to_vec() {
            if let Some(field) = record_field(tree, wrapper, filter_directives)? {
                entry.fields.push(field);
            }
        }

        self.table_mut(category).insert(name.to_owned(), entry);
        Ok(())
    }

    /// Merges a duplicate declaration into the registered original. New
    /// fields move into the original declaration's body; fields already
    /// known (directly or through the implemented interface) may
    /// contribute an argument list the original lacked, spliced in right
    /// after the field name.
    pub fn update_fields(
        &mut self,
        tree: &mut SyntaxTree,
        category: Category,
        name: &str,
        node: NodeId,
    ) -> Result<(), CompileError> {
        let dup_body = body_fields(tree, name, node)?;
        let dup_wrappers = tree.seq_items(dup_body).to_vec();

        let (target_node, implements, mut known) = match self.table(category).get(name) {
            Some(entry) => (
                entry.node,
                entry.implements.clone(),
                entry
                    .fields
                    .iter()
                    .map(|f| f.name.clone())
                    .collect::<IndexSet<_>>(),
            ),
            None => {
                warn!("Type `{name}` unknown");
                return Ok(());
            }
        };
        if category != Category::Interfaces {
            if let Some(interface) = &implements {
                if let Some(entry) = self.interfaces.get(interface) {
                    known.extend(entry.fields.iter().map(|f| f.name.clone()));
                }
            }
        }
        let target_body = body_fields(tree, name, target_node)?;

        let mut additions = Vec::new();
        let mut arg_grafts: Vec<(String, NodeId)> = Vec::new();
        for wrapper in dup_wrappers {
            let Some(field) = tree.record_get(wrapper, "field") else {
                continue;
            };
            let field_name = declared_name(tree, field, "field")?;
            if !known.contains(&field_name) && field_name != PLACEHOLDER_FIELD {
                tree.seq_push(target_body, wrapper);
                // Merged fields keep their directives as declared; the
                // marker filter applies to first registrations only.
                if let Some(entry) = record_field(tree, wrapper, false)? {
                    additions.push(entry);
                }
                known.insert(field_name);
            } else if let Some(new_args) = tree.record_get(field, "args") {
                arg_grafts.push((field_name, new_args));
            }
        }

        if let Some(entry) = self.table_mut(category).get_mut(name) {
            entry.fields.extend(additions);
            for (field_name, new_args) in arg_grafts {
                let Some(field_entry) =
                    entry.fields.iter_mut().find(|f| f.name == field_name)
                else {
                    continue;
                };
                if field_entry.args.is_some() {
                    continue;
                }
                let Some(field) = tree.record_get(field_entry.node, "field") else {
                    continue;
                };
                let index = tree.record_index_of(field, "_name").map_or(0, |i| i + 1);
                tree.record_insert_at(field, index, "args", new_args)?;
                field_entry.args = Some(new_args);
            }
        }
        Ok(())
    }

    /// Copies the implemented interface's fields into a type that does not
    /// already declare them. Runs before the type is registered, so the
    /// copied fields are recorded (and directive-filtered) along with the
    /// type's own. A copy whose directive list came back empty inherits
    /// the interface field's recorded directives, shared rather than
    /// copied, which restores the filtered `x_*`/`w_*` markers for later
    /// propagation passes.
    pub fn inherit_interface(
        &self,
        tree: &mut SyntaxTree,
        type_name: &str,
        node: NodeId,
    ) -> Result<(), CompileError> {
        let Some(interface) = implemented_interface(tree, type_name, node)? else {
            return Ok(());
        };
        let Some(entry) = self.interfaces.get(&interface) else {
            return Err(CompileError::UnknownInterface {
                type_name: type_name.to_owned(),
                interface,
            });
        };
        let interface_fields: Vec<(String, NodeId, Vec<NodeId>)> = entry
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    f.node,
                    f.directives.iter().map(|d| d.node).collect(),
                )
            })
            .collect();

        let body = body_fields(tree, type_name, node)?;
        let mut present: IndexSet<String> = IndexSet::new();
        for &wrapper in tree.seq_items(body) {
            if let Some(field) = tree.record_get(wrapper, "field") {
                if let Some(name) = declared_name_of(tree, field) {
                    present.insert(name.to_owned());
                }
            }
        }

        for (name, wrapper, directives) in interface_fields {
            if present.contains(&name) {
                continue;
            }
            let copy = tree.deep_copy(wrapper);
            tree.seq_push(body, copy);
            present.insert(name);

            if directives.is_empty() {
                continue;
            }
            let Some(field) = tree.record_get(copy, "field") else {
                continue;
            };
            if !has_effective_directives(tree, field) {
                let seq = tree.sequence(directives);
                tree.record_set(field, "_directives", seq);
            }
        }
        Ok(())
    }

    /// The storage engine wants the opposite of [`inherit_interface`]: a
    /// type must not re-declare fields its interface owns. Shared fields
    /// are removed; a type emptied by the removal gets a placeholder
    /// field, the engine rejects empty bodies.
    pub fn inherit_interface_for_merge(
        &self,
        tree: &mut SyntaxTree,
        type_name: &str,
        node: NodeId,
    ) -> Result<(), CompileError> {
        let Some(interface) = implemented_interface(tree, type_name, node)? else {
            return Ok(());
        };
        let Some(entry) = self.interfaces.get(&interface) else {
            return Err(CompileError::UnknownInterface {
                type_name: type_name.to_owned(),
                interface,
            });
        };
        let interface_names: IndexSet<&str> =
            entry.fields.iter().map(|f| f.name.as_str()).collect();

        let body = body_fields(tree, type_name, node)?;
        let mut remove = Vec::new();
        for (index, &wrapper) in tree.seq_items(body).iter().enumerate() {
            if let Some(field) = tree.record_get(wrapper, "field") {
                if let Some(name) = declared_name_of(tree, field) {
                    if interface_names.contains(name) {
                        remove.push(index);
                    }
                }
            }
        }
        tree.seq_remove_indices(body, remove);

        if tree.seq_items(body).is_empty() {
            let placeholder = placeholder_field(tree)?;
            tree.seq_push(body, placeholder);
        }
        Ok(())
    }

    /// Propagates field directives from a type or interface onto an input
    /// whose name derives from it. Fields are matched by name; matching
    /// directives are attached by handle, shared with the source field.
    /// With `set_default`, a destination field that still has no
    /// directives afterwards gets the synthesized read-only marker.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_directives(
        &self,
        tree: &mut SyntaxTree,
        source_name: &str,
        source_categories: &[Category],
        dest_name: &str,
        dest_category: Category,
        pattern: &DirectivePattern,
        set_default: bool,
        require_arguments: bool,
    ) -> Result<(), CompileError> {
        let source_fields = source_categories
            .iter()
            .find_map(|&category| self.table(category).get(source_name))
            .map(|entry| &entry.fields);
        let Some(source_fields) = source_fields else {
            warn!("Type `{source_name}` unknown");
            return Ok(());
        };
        let Some(dest) = self.table(dest_category).get(dest_name) else {
            return Ok(());
        };

        let mut copies: Vec<(NodeId, NodeId)> = Vec::new();
        let mut defaults: Vec<NodeId> = Vec::new();
        for dest_field in &dest.fields {
            let Some(field) = tree.record_get(dest_field.node, "field") else {
                continue;
            };
            let mut copied = false;
            if let Some(source_field) =
                source_fields.iter().find(|f| f.name == dest_field.name)
            {
                for directive in &source_field.directives {
                    if pattern.matches(&directive.name)
                        && (!require_arguments
                            || directive_has_arguments(tree, directive.node))
                    {
                        copies.push((field, directive.node));
                        copied = true;
                    }
                }
            }
            if set_default && !copied && !has_effective_directives(tree, field) {
                defaults.push(field);
            }
        }

        for (field, directive) in copies {
            append_directive(tree, field, directive);
        }
        for field in defaults {
            let marker = read_only_marker(tree)?;
            append_directive(tree, field, marker);
        }
        Ok(())
    }

    /// Expands type-level hook markers into per-operation hook directives
    /// on the root operation fields. A field named `<op><Type>` whose type
    /// carries the marker gets a pre-hook on its input or filter argument
    /// and, for mutations, a post-hook on the field itself. Definitions
    /// for the synthesized directives accumulate in `extra_directives`.
    pub fn copy_hook_directives(
        &mut self,
        tree: &mut SyntaxTree,
        source_categories: &[Category],
        dest_name: &str,
        dest_category: Category,
    ) -> Result<(), CompileError> {
        let dest_fields: Vec<(String, NodeId)> = match self.table(dest_category).get(dest_name)
        {
            Some(entry) => entry
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.node))
                .collect(),
            None => return Ok(()),
        };

        for &source_category in source_categories {
            for (field_name, wrapper) in &dest_fields {
                let Some(caps) = HOOK_FIELD.captures(field_name) else {
                    continue;
                };
                let op = &caps[1];
                let type_name = &caps[2];
                if type_name.is_empty() {
                    continue;
                }
                let hooks: Vec<NodeId> = match self.table(source_category).get(type_name) {
                    Some(entry) => entry
                        .directives
                        .iter()
                        .filter(|d| d.name == HOOK_DIRECTIVE)
                        .map(|d| d.node)
                        .collect(),
                    None => continue,
                };
                if hooks.is_empty() {
                    continue;
                }
                let Some(field) = tree.record_get(*wrapper, "field") else {
                    continue;
                };
                let Some(args) = tree.record_get(field, "args") else {
                    continue;
                };

                for hook in hooks {
                    let pre_name = format!("{HOOK_DIRECTIVE}{op}{type_name}Input");
                    let pre = tree.deep_copy(hook);
                    rename_directive(tree, pre, &pre_name)?;
                    if let Some(index) = input_argument_index(tree, args) {
                        tree.seq_insert(args, index + 1, pre);
                    }
                    self.push_extra_directive(format!(
                        "directive @{pre_name} on ARGUMENT_DEFINITION"
                    ));

                    if matches!(op, "add" | "update" | "delete") {
                        let post_name = format!("{HOOK_DIRECTIVE}{op}{type_name}");
                        let post = tree.deep_copy(hook);
                        rename_directive(tree, post, &post_name)?;
                        let dirs = match tree.record_get(field, "_directives") {
                            Some(dirs) => dirs,
                            None => {
                                let dirs = tree.sequence(Vec::new());
                                tree.record_set(field, "_directives", dirs);
                                dirs
                            }
                        };
                        let len = tree.seq_items(dirs).len();
                        tree.seq_insert(dirs, len.saturating_sub(1), post);
                        self.push_extra_directive(format!(
                            "directive @{post_name} on FIELD_DEFINITION"
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Reads the `name` token under a declaration's or field's `_name` key.
fn declared_name_of(tree: &SyntaxTree, node: NodeId) -> Option<&str> {
    let name = tree.record_get(node, "_name").or(Some(node))?;
    let token = tree.record_get(name, "name")?;
    tree.token_text(token)
}

pub(crate) fn declared_name(
    tree: &SyntaxTree,
    node: NodeId,
    construct: &'static str,
) -> Result<String, CompileError> {
    tree.record_get(node, "_name")
        .and_then(|name| tree.record_get(name, "name"))
        .and_then(|token| tree.token_text(token))
        .map(str::to_owned)
        .ok_or(CompileError::MissingName { construct })
}

fn directive_name(tree: &SyntaxTree, directive: NodeId) -> Option<String> {
    let name = tree.record_get(directive, "_name")?;
    let token = tree.record_get(name, "name")?;
    tree.token_text(token).map(str::to_owned)
}

/// Resolves a declaration's single implemented interface, if any. More
/// than one is a hard error; inheritance is single only.
fn implemented_interface(
    tree: &SyntaxTree,
    type_name: &str,
    node: NodeId,
) -> Result<Option<String>, CompileError> {
    let Some(implements) = tree.record_get(node, "_implements") else {
        return Ok(None);
    };
    let items = tree.seq_items(implements);
    if items.len() > 2 {
        return Err(CompileError::MultipleInterfaces {
            type_name: type_name.to_owned(),
        });
    }
    let Some(&interface) = items.get(1) else {
        return Ok(None);
    };
    Ok(declared_name_of(tree, interface).map(str::to_owned))
}

/// Returns the inner field sequence of a braced body, dropping comment
/// wrappers on the way.
fn body_fields(
    tree: &mut SyntaxTree,
    type_name: &str,
    node: NodeId,
) -> Result<NodeId, CompileError> {
    let malformed = || CompileError::MalformedFields {
        type_name: type_name.to_owned(),
    };
    let fields = tree.record_get(node, "_fields").ok_or_else(malformed)?;
    let items = tree.seq_items(fields);
    if items.len() != 3 {
        return Err(malformed());
    }
    let inner = items[1];
    let mut comments = Vec::new();
    for (index, &wrapper) in tree.seq_items(inner).iter().enumerate() {
        let named = tree
            .record_get(wrapper, "field")
            .and_then(|field| tree.record_get(field, "_name"))
            .is_some();
        if !named {
            comments.push(index);
        }
    }
    tree.seq_remove_indices(inner, comments);
    Ok(inner)
}

/// Builds the registry entry for one field wrapper. `x_*` and `w_*`
/// directives are always recorded; they leave the tree only when
/// `filter_directives` is set.
fn record_field(
    tree: &mut SyntaxTree,
    wrapper: NodeId,
    filter_directives: bool,
) -> Result<Option<FieldEntry>, CompileError> {
    let Some(field) = tree.record_get(wrapper, "field") else {
        return Ok(None);
    };
    let name = declared_name(tree, field, "field")?;
    let args = tree.record_get(field, "args");

    let mut directives = Vec::new();
    if let Some(dirs) = tree.record_get(field, "_directives") {
        let mut filtered = Vec::new();
        for (index, dir) in tree.seq_items(dirs).to_vec().into_iter().enumerate() {
            if tree.is_empty_token(dir) {
                continue;
            }
            let Some(dir_name) = directive_name(tree, dir) else {
                continue;
            };
            if dir_name.starts_with("x_") || dir_name.starts_with("w_") {
                filtered.push(index);
            }
            directives.push(DirectiveRef {
                name: dir_name,
                node: dir,
            });
        }
        if filter_directives {
            tree.seq_remove_indices(dirs, filtered);
        }
    }

    Ok(Some(FieldEntry {
        name,
        args,
        directives,
        node: wrapper,
    }))
}

/// True when the field carries at least one non-empty directive node.
fn has_effective_directives(tree: &SyntaxTree, field: NodeId) -> bool {
    match tree.record_get(field, "_directives") {
        Some(dirs) => tree
            .seq_items(dirs)
            .iter()
            .any(|&item| !tree.is_empty_token(item)),
        None => false,
    }
}

fn directive_has_arguments(tree: &SyntaxTree, directive: NodeId) -> bool {
    match tree.record_get(directive, "args") {
        Some(args) => tree.seq_items(args).len() > 2,
        None => false,
    }
}

fn append_directive(tree: &mut SyntaxTree, field: NodeId, directive: NodeId) {
    let dirs = match tree.record_get(field, "_directives") {
        Some(dirs) => dirs,
        None => {
            let dirs = tree.sequence(Vec::new());
            tree.record_set(field, "_directives", dirs);
            dirs
        }
    };
    tree.seq_push(dirs, directive);
}

fn rename_directive(
    tree: &mut SyntaxTree,
    directive: NodeId,
    name: &str,
) -> Result<(), CompileError> {
    let token = tree.token(name);
    let record = tree.record(vec![("name".to_owned(), token)])?;
    tree.record_set(directive, "_name", record);
    Ok(())
}

/// Index of the first argument wrapper named `input` or `filter` in a
/// flat argument sequence.
fn input_argument_index(tree: &SyntaxTree, args: NodeId) -> Option<usize> {
    tree.seq_items(args).iter().position(|&item| {
        tree.record_get(item, "field")
            .and_then(|field| declared_name_of(tree, field))
            .is_some_and(|name| INPUT_NAMES.contains(&name))
    })
}

fn read_only_marker(tree: &mut SyntaxTree) -> Result<NodeId, CompileError> {
    let at = tree.token("@");
    let token = tree.token(READ_ONLY_DIRECTIVE);
    let name = tree.record(vec![("name".to_owned(), token)])?;
    tree.record(vec![
        ("_cst__bb".to_owned(), at),
        ("_name".to_owned(), name),
    ])
}

fn placeholder_field(tree: &mut SyntaxTree) -> Result<NodeId, CompileError> {
    let name_token = tree.token(PLACEHOLDER_FIELD);
    let name = tree.record(vec![("name".to_owned(), name_token)])?;
    let colon = tree.token(":");
    let type_token = tree.token("String");
    let type_name = tree.record(vec![("name".to_owned(), type_token)])?;
    let type_seq = tree.sequence(vec![type_name]);
    let field = tree.record(vec![
        ("_name".to_owned(), name),
        ("_colon".to_owned(), colon),
        ("_type".to_owned(), type_seq),
    ])?;
    tree.record(vec![("field".to_owned(), field)])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::parse_document;
    use crate::parser::Raw;

    fn intern(tree: &mut SyntaxTree, raw: &Raw) -> NodeId {
        match raw {
            Raw::Token(text) => tree.token(text.clone()),
            Raw::Seq(items) => {
                let ids = items.iter().map(|item| intern(tree, item)).collect();
                tree.sequence(ids)
            }
            Raw::Record(entries) | Raw::Directive(entries) => {
                let lowered = entries
                    .iter()
                    .map(|(key, value)| (key.clone(), intern(tree, value)))
                    .collect();
                tree.record(lowered).expect("no duplicate keys")
            }
        }
    }

    fn declaration(tree: &mut SyntaxTree, source: &str) -> (String, NodeId) {
        let mut doc = parse_document(source).expect("valid schema");
        assert_eq!(doc.len(), 1, "one declaration expected");
        let (_, raw) = doc.remove(0);
        let node = intern(tree, &raw);
        let name = declared_name(tree, node, "declaration").expect("named");
        (name, node)
    }

    fn field_names(tree: &SyntaxTree, body: NodeId) -> Vec<String> {
        tree.seq_items(body)
            .iter()
            .filter_map(|&wrapper| {
                let field = tree.record_get(wrapper, "field")?;
                declared_name_of(tree, field).map(str::to_owned)
            })
            .collect()
    }

    #[test]
    fn populate_records_and_strips_hook_markers() {
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let (name, node) =
            declaration(&mut tree, "type Widget @hook_ @auth {\n  id: ID!\n}");
        registry
            .populate(&mut tree, Category::Types, &name, node, true)
            .expect("populates");

        let entry = registry.entry(Category::Types, "Widget").expect("registered");
        let recorded: Vec<&str> = entry.directives.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(recorded, vec!["hook_", "auth"]);

        let dirs = tree.record_get(node, "_directives").expect("directives");
        assert_eq!(tree.seq_items(dirs).len(), 1);
    }

    #[test]
    fn populate_filters_marker_directives_but_remembers_them() {
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let (name, node) = declaration(
            &mut tree,
            "type Post {\n  title: String @w_meta @deprecated\n}",
        );
        registry
            .populate(&mut tree, Category::Types, &name, node, true)
            .expect("populates");

        let entry = registry.entry(Category::Types, "Post").expect("registered");
        let recorded: Vec<&str> = entry.fields[0]
            .directives
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(recorded, vec!["w_meta", "deprecated"]);

        let field = tree
            .record_get(entry.fields[0].node, "field")
            .expect("field record");
        let dirs = tree.record_get(field, "_directives").expect("directives");
        assert_eq!(tree.seq_items(dirs).len(), 1);
    }

    #[test]
    fn duplicate_declaration_contributes_new_fields_and_arguments() {
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let (name, first) = declaration(&mut tree, "type Query {\n  getWidget: Widget\n}");
        registry
            .populate(&mut tree, Category::Types, &name, first, true)
            .expect("populates");
        let (_, second) = declaration(
            &mut tree,
            "type Query {\n  getWidget(input: WidgetRef!): Widget\n  listWidgets: [Widget]\n}",
        );
        registry
            .update_fields(&mut tree, Category::Types, &name, second)
            .expect("merges");

        let entry = registry.entry(Category::Types, "Query").expect("registered");
        let names: Vec<&str> = entry.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["getWidget", "listWidgets"]);
        assert!(entry.fields[0].args.is_some(), "argument list adopted");

        let body = body_fields(&mut tree, &name, first).expect("body");
        assert_eq!(field_names(&tree, body), vec!["getWidget", "listWidgets"]);

        let field = tree
            .record_get(entry.fields[0].node, "field")
            .expect("field record");
        assert_eq!(tree.record_index_of(field, "args"), Some(1));
    }

    #[test]
    fn doublon_fields_keep_their_marker_directives() {
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let (name, first) = declaration(&mut tree, "type Widget {\n  name: String\n}");
        registry
            .populate(&mut tree, Category::Types, &name, first, true)
            .expect("populates");
        let (_, second) =
            declaration(&mut tree, "type Widget {\n  owner: String @w_meta\n}");
        registry
            .update_fields(&mut tree, Category::Types, &name, second)
            .expect("merges");

        let entry = registry.entry(Category::Types, "Widget").expect("registered");
        let recorded: Vec<&str> = entry.fields[1]
            .directives
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(recorded, vec!["w_meta"]);

        // The marker stays in the tree, not just in the registry.
        let field = tree
            .record_get(entry.fields[1].node, "field")
            .expect("field record");
        let dirs = tree.record_get(field, "_directives").expect("directives");
        assert_eq!(tree.seq_items(dirs).len(), 1);
    }

    #[test]
    fn types_inherit_missing_interface_fields_and_their_directives() {
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let (iface, node) = declaration(
            &mut tree,
            "interface Node {\n  id: ID!\n  owner: String @x_patch_ro\n}",
        );
        registry
            .populate(&mut tree, Category::Interfaces, &iface, node, true)
            .expect("populates");

        let (type_name, type_node) =
            declaration(&mut tree, "type Widget implements Node {\n  name: String\n}");
        registry
            .inherit_interface(&mut tree, &type_name, type_node)
            .expect("inherits");

        let body = body_fields(&mut tree, &type_name, type_node).expect("body");
        assert_eq!(field_names(&tree, body), vec!["name", "id", "owner"]);

        // The filtered marker on `owner` came back with the copy.
        let owner = tree.seq_items(body)[2];
        let field = tree.record_get(owner, "field").expect("field record");
        assert!(has_effective_directives(&tree, field));
    }

    #[test]
    fn unknown_interface_is_fatal() {
        let mut tree = SyntaxTree::new();
        let registry = Registry::new();
        let (type_name, node) =
            declaration(&mut tree, "type Widget implements Node {\n  name: String\n}");
        let err = registry
            .inherit_interface(&mut tree, &type_name, node)
            .expect_err("unknown interface");
        assert!(matches!(err, CompileError::UnknownInterface { .. }));
    }

    #[test]
    fn storage_merge_removes_shared_fields_and_placeholders_empty_types() {
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let (iface, node) = declaration(&mut tree, "interface Node {\n  id: ID!\n}");
        registry
            .populate(&mut tree, Category::Interfaces, &iface, node, false)
            .expect("populates");

        let (type_name, type_node) = declaration(
            &mut tree,
            "type Widget implements Node {\n  id: ID!\n  name: String\n}",
        );
        registry
            .inherit_interface_for_merge(&mut tree, &type_name, type_node)
            .expect("merges");
        let body = body_fields(&mut tree, &type_name, type_node).expect("body");
        assert_eq!(field_names(&tree, body), vec!["name"]);

        let (empty_name, empty_node) =
            declaration(&mut tree, "type Ghost implements Node {\n  id: ID!\n}");
        registry
            .inherit_interface_for_merge(&mut tree, &empty_name, empty_node)
            .expect("merges");
        let body = body_fields(&mut tree, &empty_name, empty_node).expect("body");
        assert_eq!(field_names(&tree, body), vec![PLACEHOLDER_FIELD]);
    }

    #[test]
    fn copy_directives_honors_pattern_and_default_marker() {
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let (type_name, type_node) = declaration(
            &mut tree,
            "type Widget {\n  name: String @w_meta @x_alter(role: \"admin\")\n  owner: String\n}",
        );
        registry
            .populate(&mut tree, Category::Types, &type_name, type_node, true)
            .expect("populates");
        let (input_name, input_node) = declaration(
            &mut tree,
            "input WidgetPatch {\n  name: String\n  owner: String\n}",
        );
        registry
            .populate(&mut tree, Category::Inputs, &input_name, input_node, false)
            .expect("populates");

        let pattern = DirectivePattern::new(
            Regex::new(r"^w_").expect("valid regex"),
            Some(Regex::new(r"^w_add").expect("valid regex")),
        );
        registry
            .copy_directives(
                &mut tree,
                "Widget",
                &[Category::Types, Category::Interfaces],
                "WidgetPatch",
                Category::Inputs,
                &pattern,
                true,
                false,
            )
            .expect("copies");

        let entry = registry.entry(Category::Inputs, "WidgetPatch").expect("input");
        let name_field = tree
            .record_get(entry.fields[0].node, "field")
            .expect("field record");
        let dirs = tree.record_get(name_field, "_directives").expect("copied");
        assert_eq!(tree.seq_items(dirs).len(), 1);

        // No source directive matched `owner`, so it gets the read-only marker.
        let owner_field = tree
            .record_get(entry.fields[1].node, "field")
            .expect("field record");
        let dirs = tree.record_get(owner_field, "_directives").expect("default");
        let marker = tree.seq_items(dirs)[0];
        assert_eq!(directive_name(&tree, marker).as_deref(), Some(READ_ONLY_DIRECTIVE));
    }

    #[test]
    fn unknown_copy_source_is_a_no_op() {
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let (input_name, input_node) =
            declaration(&mut tree, "input GhostPatch {\n  name: String\n}");
        registry
            .populate(&mut tree, Category::Inputs, &input_name, input_node, false)
            .expect("populates");
        let pattern =
            DirectivePattern::new(Regex::new(r"^w_").expect("valid regex"), None);
        registry
            .copy_directives(
                &mut tree,
                "Ghost",
                &[Category::Types, Category::Interfaces],
                "GhostPatch",
                Category::Inputs,
                &pattern,
                false,
                false,
            )
            .expect("warns and continues");
    }

    #[test]
    fn hook_markers_expand_to_pre_and_post_directives() {
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let (type_name, type_node) =
            declaration(&mut tree, "type Widget @hook_ {\n  name: String\n}");
        registry
            .populate(&mut tree, Category::Types, &type_name, type_node, true)
            .expect("populates");
        let (query_name, query_node) = declaration(
            &mut tree,
            "type Mutation {\n  addWidget(input: AddWidgetInput!, upsert: Boolean): Widget\n}",
        );
        registry
            .populate(&mut tree, Category::Types, &query_name, query_node, true)
            .expect("populates");

        registry
            .copy_hook_directives(
                &mut tree,
                &[Category::Types, Category::Interfaces],
                "Mutation",
                Category::Types,
            )
            .expect("expands hooks");

        assert_eq!(
            registry.extra_directives(),
            &[
                "directive @hook_addWidgetInput on ARGUMENT_DEFINITION".to_owned(),
                "directive @hook_addWidget on FIELD_DEFINITION".to_owned(),
            ]
        );

        let entry = registry.entry(Category::Types, "Mutation").expect("registered");
        let field = tree
            .record_get(entry.fields[0].node, "field")
            .expect("field record");

        // Pre-hook lands right after the `input` argument, before `upsert`.
        let args = tree.record_get(field, "args").expect("arguments");
        let pre = tree.seq_items(args)[2];
        assert_eq!(
            directive_name(&tree, pre).as_deref(),
            Some("hook_addWidgetInput")
        );

        let dirs = tree.record_get(field, "_directives").expect("post hook");
        let post = tree.seq_items(dirs)[0];
        assert_eq!(directive_name(&tree, post).as_deref(), Some("hook_addWidget"));
    }
}
