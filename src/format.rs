//! Output formatter.
//!
//! Walks the document tree and regenerates SDL text from the tokens
//! alone; no pretty-printer layer decides layout. Spacing is driven by
//! record keys: blank codes on the key, the `name` spacing rules, and a
//! newline per field or definition. Output is assembled as a list of
//! string pieces because several rules reach back and amend an earlier
//! piece (indentation of the first field fixes the space before the
//! opening brace).

use crate::cst::NodeId;
use crate::cst::NodeKind;
use crate::cst::SyntaxTree;

/// Comment marker the storage engine interprets; the only comment kind
/// that survives into output.
pub const AUTH_COMMENT: &str = "# Dgraph.Authorization";

/// Renders a lowered document. `extras` are synthesized directive
/// definitions, emitted verbatim at the top.
pub fn format(tree: &SyntaxTree, document: NodeId, extras: &[String]) -> String {
    let mut out: Vec<String> = vec!["\n".to_owned()];
    for extra in extras {
        out.push(format!("{extra}\n"));
    }
    let walker = Walker { tree };
    walker.walk(document, &mut out, None, None, false);
    out.concat()
}

struct Walker<'a> {
    tree: &'a SyntaxTree,
}

impl Walker<'_> {
    fn walk(
        &self,
        node: NodeId,
        out: &mut Vec<String>,
        prev: Option<NodeId>,
        next: Option<NodeId>,
        ignore_nl: bool,
    ) {
        match self.tree.kind(node) {
            NodeKind::Token(text) => {
                if text.is_empty() {
                    return;
                }
                if text == "}" {
                    out.push("\n}".to_owned());
                } else {
                    out.push(text.clone());
                }
            }
            NodeKind::Sequence(items) => {
                let mut prev = prev;
                let mut next = next;
                for (index, &item) in items.iter().enumerate() {
                    if index + 1 < items.len() {
                        next = Some(items[index + 1]);
                    }
                    if index > 0 {
                        prev = Some(items[index - 1]);
                    }
                    self.walk(item, out, prev, next, ignore_nl);
                }
            }
            NodeKind::Record(map) => {
                let entries: Vec<(&String, NodeId)> =
                    map.iter().map(|(k, &v)| (k, v)).collect();
                let multi = entries.len() > 1;
                let mut prev = prev;
                let mut next = next;
                let mut ignore_nl = ignore_nl;

                for (ith, &(key, value)) in entries.iter().enumerate() {
                    if multi {
                        if ith > 0 {
                            prev = Some(entries[ith - 1].1);
                        }
                        if ith + 1 < entries.len() {
                            next = Some(entries[ith + 1].1);
                        }
                    }

                    let (base, code) = SyntaxTree::key_parts(key);

                    // Blank codes apply before any rule-name handling.
                    let mut override_text: Option<String> = None;
                    match code {
                        Some("bb") => {
                            if last(out) != " " {
                                out.push(" ".to_owned());
                            }
                        }
                        Some("ba") => {
                            if let Some(text) = self.tree.token_text(value) {
                                if !text.is_empty() {
                                    override_text = Some(format!("{text} "));
                                }
                            }
                        }
                        Some("bs") => {
                            if let Some(text) = self.tree.token_text(value) {
                                if !text.is_empty() {
                                    override_text = Some(if last(out) == " " {
                                        format!("{text} ")
                                    } else {
                                        format!(" {text} ")
                                    });
                                }
                            }
                        }
                        _ => {}
                    }

                    if base == "comment" || base == "doc" {
                        if let Some(text) = self.tree.token_text(value) {
                            if text.starts_with(AUTH_COMMENT) {
                                out.push("\n".to_owned());
                                out.push("\n".to_owned());
                                out.push(text.to_owned());
                            }
                        }
                        continue;
                    } else if base == "args" {
                        ignore_nl = true;
                    } else if base == "name" {
                        self.emit_name(out, value, prev, next);
                        continue;
                    } else if base.starts_with('_') {
                        // No separator; the value speaks for itself.
                    } else if base.ends_with("_definition") {
                        out.push("\n".to_owned());
                        out.push("\n".to_owned());
                    } else if !ignore_nl {
                        out.push("\n".to_owned());
                    }

                    match override_text {
                        Some(text) => out.push(text),
                        None => self.walk(value, out, prev, next, ignore_nl),
                    }
                }
            }
        }
    }

    /// Spacing around a bare name, decided from the neighboring tokens.
    fn emit_name(
        &self,
        out: &mut Vec<String>,
        value: NodeId,
        prev: Option<NodeId>,
        next: Option<NodeId>,
    ) {
        let Some(text) = self.tree.token_text(value) else {
            return;
        };
        if text.is_empty() {
            return;
        }

        if last(out) == "\n" {
            // Field indentation; the piece before the opening brace also
            // earns the space the brace rule could not add.
            if self.leading_text(prev) == Some("{") {
                if let Some(index) = out.len().checked_sub(3) {
                    if let Some(piece) = out.get_mut(index) {
                        if !piece.ends_with(' ') {
                            piece.push(' ');
                        }
                    }
                }
            }
            out.push("  ".to_owned());
        } else if !matches!(last(out), "[" | "(" | "@") {
            out.push(" ".to_owned());
        } else if self.leading_text(prev) == Some("[") {
            if let Some(index) = out.len().checked_sub(2) {
                if let Some(piece) = out.get_mut(index) {
                    piece.push(' ');
                }
            }
        }

        let mut text = text.to_owned();
        if matches!(self.leading_text(next), Some("{") | Some("implements")) {
            text.push(' ');
        }
        out.push(text);
    }

    /// The token a neighbor leads with: the token itself, or the first
    /// item of a sequence when that item is a token.
    fn leading_text(&self, node: Option<NodeId>) -> Option<&str> {
        let node = node?;
        match self.tree.kind(node) {
            NodeKind::Token(text) => Some(text.as_str()),
            NodeKind::Sequence(items) => {
                items.first().and_then(|&item| self.tree.token_text(item))
            }
            NodeKind::Record(_) => None,
        }
    }
}

fn last(out: &[String]) -> &str {
    out.last().map(String::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dialect::Dialect;
    use crate::parser::lower_document;
    use crate::parser::parse_document;
    use crate::registry::Registry;

    fn render(source: &str, dialect: Dialect) -> String {
        let definitions = parse_document(source).expect("valid schema");
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let document = lower_document(&mut tree, &mut registry, dialect, &definitions)
            .expect("lowers");
        format(&tree, document, registry.extra_directives())
    }

    #[test]
    fn renders_a_plain_type() {
        let output = render("type Node {\n  id: ID!\n}", Dialect::Storage);
        assert_eq!(output, "\n\n\ntype Node {\n  id: ID!\n}");
    }

    #[test]
    fn renders_implements_defaults_lists_and_unions() {
        let output = render(
            "interface Node {\n  id: ID!\n}\ntype Widget implements Node @dgraph(type: \"W\") {\n  tags: [String]\n  limit(n: Int = 10): Int\n}\nunion Item = Post | Comment",
            Dialect::Storage,
        );
        assert_eq!(
            output,
            "\n\n\ninterface Node {\n  id: ID!\n}\n\ntype Widget implements Node @dgraph(type: \"W\") {\n  tags: [String]\n  limit(n: Int = 10): Int\n}\n\nunion Item = Post | Comment"
        );
    }

    #[test]
    fn keeps_authorization_comments_only() {
        let output = render(
            "# plain comment\n# Dgraph.Authorization {\"Header\":\"X-Auth\"}\ntype T {\n  id: ID\n}",
            Dialect::Storage,
        );
        assert_eq!(
            output,
            "\n\n\n# Dgraph.Authorization {\"Header\":\"X-Auth\"}\n\ntype T {\n  id: ID\n}"
        );
    }

    #[test]
    fn dropped_directives_leave_no_residue() {
        let output = render(
            "type T {\n  name: String @search @deprecated\n}",
            Dialect::Generator,
        );
        assert_eq!(output, "\n\n\ntype T {\n  name: String @deprecated\n}");
    }

    #[test]
    fn synthesized_directive_definitions_lead_the_document() {
        let definitions = parse_document("scalar DateTime").expect("valid schema");
        let mut tree = SyntaxTree::new();
        let mut registry = Registry::new();
        let document =
            lower_document(&mut tree, &mut registry, Dialect::Generator, &definitions)
                .expect("lowers");
        let extras = vec!["directive @hook_addWidget on FIELD_DEFINITION".to_owned()];
        let output = format(&tree, document, &extras);
        assert_eq!(
            output,
            "\ndirective @hook_addWidget on FIELD_DEFINITION\n\n\nscalar DateTime"
        );
    }
}
