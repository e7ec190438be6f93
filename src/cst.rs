//! Order-preserving, mutable syntax tree.
//!
//! Every node lives in a [`SyntaxTree`] arena and is addressed by a
//! [`NodeId`]. Passes that need to reach back into an earlier declaration
//! (doublon merges, directive propagation) store ids, never references, so
//! a subtree can be deep-copied or spliced without aliasing the original.
//!
//! Record keys may carry a two-part encoding `base__code` with
//! `code ∈ {bb, ba, bs}` ("blank before / after / surrounding"). The code
//! is formatting metadata consumed only by the formatter; structural
//! lookups always use the full key.

use indexmap::IndexMap;

use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Ordered field-name → child mapping. Keys are unique; iteration
    /// order is declaration order and is load-bearing for both inheritance
    /// lookups and text regeneration.
    Record(IndexMap<String, NodeId>),
    /// Ordered list of children (field lists, argument lists, directive
    /// lists, union members).
    Sequence(Vec<NodeId>),
    /// Terminal text. The empty token is the no-op placeholder left behind
    /// by dropped declarations and filtered directives.
    Token(String),
}

#[derive(Debug, Default)]
pub struct SyntaxTree {
    nodes: Vec<NodeKind>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(kind);
        id
    }

    pub fn token(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Token(text.into()))
    }

    /// The no-op placeholder: contributes no text and is skipped by every
    /// structural lookup.
    pub fn empty_token(&mut self) -> NodeId {
        self.token("")
    }

    pub fn sequence(&mut self, items: Vec<NodeId>) -> NodeId {
        self.alloc(NodeKind::Sequence(items))
    }

    pub fn record(
        &mut self,
        entries: Vec<(String, NodeId)>,
    ) -> Result<NodeId, CompileError> {
        let mut map = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            if map.insert(key.clone(), value).is_some() {
                return Err(CompileError::DuplicateKey { key });
            }
        }
        Ok(self.alloc(NodeKind::Record(map)))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0 as usize]
    }

    pub fn token_text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Token(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_empty_token(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Token(text) if text.is_empty())
    }

    /// Splits a record key into its base name and optional blank code.
    pub fn key_parts(key: &str) -> (&str, Option<&str>) {
        match key.split_once("__") {
            Some((base, code @ ("bb" | "ba" | "bs"))) => (base, Some(code)),
            _ => (key, None),
        }
    }

    pub fn record_entries(&self, id: NodeId) -> Option<&IndexMap<String, NodeId>> {
        match self.kind(id) {
            NodeKind::Record(map) => Some(map),
            _ => None,
        }
    }

    /// Reads a named field. `None` distinguishes "absent" from
    /// "present but empty"; a non-record node has no fields.
    pub fn record_get(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.record_entries(id)?.get(key).copied()
    }

    pub fn record_index_of(&self, id: NodeId, key: &str) -> Option<usize> {
        self.record_entries(id)?.get_index_of(key)
    }

    /// Replaces a field's value in place, preserving the iteration order of
    /// all other fields. A new key is appended at the end.
    pub fn record_set(&mut self, id: NodeId, key: &str, value: NodeId) {
        if let NodeKind::Record(map) = &mut self.nodes[id.0 as usize] {
            map.insert(key.to_owned(), value);
        }
    }

    /// Inserts a new field at a declared position, shifting later fields.
    /// Inserting an already-present key would corrupt the record and fails
    /// loudly.
    pub fn record_insert_at(
        &mut self,
        id: NodeId,
        index: usize,
        key: &str,
        value: NodeId,
    ) -> Result<(), CompileError> {
        if let NodeKind::Record(map) = &mut self.nodes[id.0 as usize] {
            if map.contains_key(key) {
                return Err(CompileError::DuplicateKey {
                    key: key.to_owned(),
                });
            }
            map.shift_insert(index.min(map.len()), key.to_owned(), value);
        }
        Ok(())
    }

    /// Removes a field, closing the gap so remaining keys keep their
    /// relative order.
    pub fn record_remove(&mut self, id: NodeId, key: &str) {
        if let NodeKind::Record(map) = &mut self.nodes[id.0 as usize] {
            map.shift_remove(key);
        }
    }

    pub fn seq_items(&self, id: NodeId) -> &[NodeId] {
        match self.kind(id) {
            NodeKind::Sequence(items) => items,
            _ => &[],
        }
    }

    pub fn seq_push(&mut self, id: NodeId, item: NodeId) {
        if let NodeKind::Sequence(items) = &mut self.nodes[id.0 as usize] {
            items.push(item);
        }
    }

    pub fn seq_insert(&mut self, id: NodeId, index: usize, item: NodeId) {
        if let NodeKind::Sequence(items) = &mut self.nodes[id.0 as usize] {
            items.insert(index.min(items.len()), item);
        }
    }

    /// Removes several elements in one operation. Indices are applied from
    /// highest to lowest so the remaining indices stay valid.
    pub fn seq_remove_indices(&mut self, id: NodeId, mut indices: Vec<usize>) {
        indices.sort_unstable();
        indices.dedup();
        if let NodeKind::Sequence(items) = &mut self.nodes[id.0 as usize] {
            for index in indices.into_iter().rev() {
                if index < items.len() {
                    items.remove(index);
                }
            }
        }
    }

    /// Copies a whole subtree into fresh nodes, so later mutation of the
    /// copy never perturbs the source declaration.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        match self.kind(id).clone() {
            NodeKind::Token(text) => self.token(text),
            NodeKind::Sequence(items) => {
                let copied = items.into_iter().map(|item| self.deep_copy(item)).collect();
                self.sequence(copied)
            }
            NodeKind::Record(map) => {
                let mut entries = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    let copy = self.deep_copy(value);
                    entries.insert(key, copy);
                }
                self.alloc(NodeKind::Record(entries))
            }
        }
    }
}
