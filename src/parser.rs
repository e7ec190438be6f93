//! SDL parser and lowering pass.
//!
//! Grammar rules are hand-written nom parsers, one function per production
//! with the rule quoted above it. Parsing builds an owned [`Raw`] tree;
//! [`lower_document`] then interns that tree into a [`SyntaxTree`] arena in
//! source order, consulting the active [`Dialect`]'s semantics hooks as
//! each applied directive and each top-level declaration completes. A hook
//! may keep a node, or drop it (duplicate declarations, dialect-filtered
//! directives), in which case an empty token takes its place and
//! contributes no output text.

use nom::bytes::complete::take_while;
use nom::bytes::complete::take_while1;
use nom::character::complete::char as nom_char;
use nom::character::complete::one_of;
use nom::combinator::map;
use nom::combinator::opt;
use nom::combinator::recognize;
use nom::error::Error as NomError;
use nom::error::ErrorKind;
use nom::multi::many0;
use nom::sequence::pair;
use nom::sequence::preceded;
use nom::sequence::tuple;
use nom::IResult;

use crate::cst::NodeId;
use crate::cst::SyntaxTree;
use crate::dialect::Dialect;
use crate::dialect::Disposition;
use crate::error::CompileError;
use crate::registry::Registry;

/// Nesting ceiling for type annotations and literal values. Exceeding it
/// is a fatal error rather than a silent truncation or a stack overflow.
pub const MAX_DEPTH: usize = 128;

type PResult<'a, T> = IResult<&'a str, T, NomError<&'a str>>;

/// Parser output before interning: an order-preserving tree of records,
/// sequences and terminal tokens. Applied directives keep their own
/// variant so the lowering pass can run the dialect's directive filter
/// wherever one occurs.
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Token(String),
    Seq(Vec<Raw>),
    Record(Vec<(String, Raw)>),
    Directive(Vec<(String, Raw)>),
}

impl Raw {
    fn token(text: impl Into<String>) -> Raw {
        Raw::Token(text.into())
    }

    /// A bare name, shaped as the one-key record the formatter's spacing
    /// rules key on.
    fn name(text: &str) -> Raw {
        Raw::Record(vec![("name".to_owned(), Raw::token(text))])
    }

    /// A keyword or punctuation token that wants a blank before it.
    fn blank_before(text: &str) -> Raw {
        Raw::Record(vec![("_cst__bb".to_owned(), Raw::token(text))])
    }
}

fn nom_error(input: &str) -> nom::Err<NomError<&str>> {
    nom::Err::Error(NomError::new(input, ErrorKind::Tag))
}

fn too_deep<T>(input: &str) -> PResult<'_, T> {
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::TooLarge)))
}

/// Insignificant separators: whitespace and commas.
fn skip_ws(input: &str) -> &str {
    input.trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n' | ','))
}

fn sp(input: &str) -> PResult<'_, &str> {
    take_while(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n' | ','))(input)
}

fn ident(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn punct<'a>(c: char) -> impl FnMut(&'a str) -> PResult<'a, char> {
    move |input| preceded(sp, nom_char(c))(input)
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (rest, word) = preceded(sp, ident)(input)?;
        if word == kw {
            Ok((rest, word))
        } else {
            Err(nom_error(input))
        }
    }
}

// name ::= /[_A-Za-z][_0-9A-Za-z]*/
fn name_record(input: &str) -> PResult<'_, Raw> {
    map(preceded(sp, ident), Raw::name)(input)
}

// comment ::= '#' /[^\n]*/
fn comment(input: &str) -> PResult<'_, &str> {
    preceded(
        sp,
        recognize(pair(nom_char('#'), take_while(|c| c != '\n'))),
    )(input)
}

// int_value / float_value ::= '-'? digits ('.' digits)? (('e'|'E') sign? digits)?
//
// The whole match is recognized as one joined token; nested repetition
// structure never reaches the tree.
fn number(input: &str) -> PResult<'_, &str> {
    recognize(tuple((
        opt(nom_char('-')),
        take_while1(|c: char| c.is_ascii_digit()),
        opt(pair(nom_char('.'), take_while1(|c: char| c.is_ascii_digit()))),
        opt(tuple((
            one_of("eE"),
            opt(one_of("+-")),
            take_while1(|c: char| c.is_ascii_digit()),
        ))),
    )))(input)
}

// string_value ::= '"""' ... '"""' | '"' (escape | char)* '"'
//
// Returned with quotes intact; escape sequences are not interpreted, the
// formatter re-emits the literal byte for byte.
fn string_literal(input: &str) -> PResult<'_, &str> {
    if let Some(rest) = input.strip_prefix("\"\"\"") {
        return match rest.find("\"\"\"") {
            Some(pos) => {
                let end = 3 + pos + 3;
                Ok((&input[end..], &input[..end]))
            }
            None => Err(nom::Err::Failure(NomError::new(input, ErrorKind::Tag))),
        };
    }
    if !input.starts_with('"') {
        return Err(nom_error(input));
    }
    let bytes = input.as_bytes();
    let mut idx = 1;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 2,
            b'"' => return Ok((&input[idx + 1..], &input[..idx + 1])),
            b'\n' => break,
            _ => idx += 1,
        }
    }
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Tag)))
}

// value ::= list_value | object_value | string_value | number | name
fn value(input: &str, depth: usize) -> PResult<'_, Raw> {
    if depth > MAX_DEPTH {
        return too_deep(input);
    }
    let i = skip_ws(input);
    match i.chars().next() {
        // list_value ::= '[' value* ']'
        Some('[') => {
            let mut items = vec![Raw::token("[")];
            let mut rest = &i[1..];
            loop {
                let peek = skip_ws(rest);
                if peek.starts_with(']') {
                    rest = &peek[1..];
                    break;
                }
                if peek.is_empty() {
                    return Err(nom::Err::Failure(NomError::new(rest, ErrorKind::Tag)));
                }
                let (next, item) = value(rest, depth + 1)?;
                items.push(item);
                rest = next;
            }
            items.push(Raw::token("]"));
            Ok((rest, Raw::Seq(items)))
        }
        // object_value ::= '{' (name ':' value)* '}'
        Some('{') => {
            let mut items = vec![Raw::token("{")];
            let mut rest = &i[1..];
            loop {
                let peek = skip_ws(rest);
                if peek.starts_with('}') {
                    rest = &peek[1..];
                    break;
                }
                if peek.is_empty() {
                    return Err(nom::Err::Failure(NomError::new(rest, ErrorKind::Tag)));
                }
                let (next, field) = object_value_field(rest, depth)?;
                items.push(field);
                rest = next;
            }
            items.push(Raw::token("}"));
            Ok((rest, Raw::Seq(items)))
        }
        Some('"') => {
            let (rest, text) = string_literal(i)?;
            Ok((rest, Raw::name(text)))
        }
        Some(c) if c == '-' || c.is_ascii_digit() => {
            let (rest, text) = number(i)?;
            Ok((rest, Raw::name(text)))
        }
        Some('$') => {
            let (rest, text) = recognize(pair(nom_char('$'), ident))(i)?;
            Ok((rest, Raw::name(text)))
        }
        _ => name_record(i),
    }
}

fn object_value_field(input: &str, depth: usize) -> PResult<'_, Raw> {
    let (input, name) = name_record(input)?;
    let (input, _) = punct(':')(input)?;
    let (input, val) = value(input, depth + 1)?;
    let field = Raw::Record(vec![
        ("_name".to_owned(), name),
        ("_colon".to_owned(), Raw::token(":")),
        ("_value".to_owned(), val),
    ]);
    Ok((input, Raw::Record(vec![("field".to_owned(), field)])))
}

// type ::= ('[' type ']' | name) '!'?
fn type_annotation(input: &str, depth: usize) -> PResult<'_, Vec<Raw>> {
    if depth > MAX_DEPTH {
        return too_deep(input);
    }
    let i = skip_ws(input);
    let (rest, mut parts) = if let Some(inner) = i.strip_prefix('[') {
        let (rest, nested) = type_annotation(inner, depth + 1)?;
        let (rest, _) = punct(']')(rest)?;
        let mut parts = vec![Raw::token("[")];
        parts.extend(nested);
        parts.push(Raw::token("]"));
        (rest, parts)
    } else {
        let (rest, name) = name_record(i)?;
        (rest, vec![name])
    };
    let (rest, bang) = opt(punct('!'))(rest)?;
    if bang.is_some() {
        parts.push(Raw::token("!"));
    }
    Ok((rest, parts))
}

// directive ::= '@' name arguments?
fn directive(input: &str) -> PResult<'_, Raw> {
    let (input, _) = punct('@')(input)?;
    let (input, name) = name_record(input)?;
    let (input, args) = opt(directive_arguments)(input)?;
    let mut entries = vec![
        ("_cst__bb".to_owned(), Raw::token("@")),
        ("_name".to_owned(), name),
    ];
    if let Some(args) = args {
        entries.push(("args".to_owned(), args));
    }
    Ok((input, Raw::Directive(entries)))
}

fn directives0(input: &str) -> PResult<'_, Vec<Raw>> {
    many0(directive)(input)
}

// arguments ::= '(' (name ':' value)* ')'
fn directive_arguments(input: &str) -> PResult<'_, Raw> {
    let (input, _) = punct('(')(input)?;
    let (input, mut args) = many0(|i| object_value_field(i, 0))(input)?;
    let (input, _) = punct(')')(input)?;
    let mut items = vec![Raw::token("(")];
    items.append(&mut args);
    items.push(Raw::token(")"));
    Ok((input, Raw::Seq(items)))
}

// arguments_definition ::= '(' field* ')'
//
// Argument declarations reuse the field production, so the registry can
// treat an argument list exactly like a field list.
fn arguments_definition(input: &str) -> PResult<'_, Raw> {
    let (input, _) = punct('(')(input)?;
    let (input, mut args) = many0(field_wrapper)(input)?;
    let (input, _) = punct(')')(input)?;
    let mut items = vec![Raw::token("(")];
    items.append(&mut args);
    items.push(Raw::token(")"));
    Ok((input, Raw::Seq(items)))
}

// field ::= name arguments_definition? (':' type ('=' value)?)? directive*
//
// Enum values parse as colon-less fields, which keeps every braced body a
// uniform list of field wrappers.
fn field(input: &str) -> PResult<'_, Raw> {
    let (input, name) = name_record(input)?;
    let (input, args) = opt(arguments_definition)(input)?;
    let mut entries = vec![("_name".to_owned(), name)];
    if let Some(args) = args {
        entries.push(("args".to_owned(), args));
    }
    let (input, colon) = opt(punct(':'))(input)?;
    let mut input = input;
    if colon.is_some() {
        entries.push(("_colon".to_owned(), Raw::token(":")));
        let (rest, ty) = type_annotation(input, 0)?;
        entries.push(("_type".to_owned(), Raw::Seq(ty)));
        let (rest, default) = opt(default_value)(rest)?;
        if let Some(default) = default {
            entries.push(("_default".to_owned(), default));
        }
        input = rest;
    }
    let (input, dirs) = directives0(input)?;
    if !dirs.is_empty() {
        entries.push(("_directives".to_owned(), Raw::Seq(dirs)));
    }
    Ok((input, Raw::Record(entries)))
}

// default ::= '=' value
fn default_value(input: &str) -> PResult<'_, Raw> {
    let (input, _) = punct('=')(input)?;
    let (input, val) = value(input, 0)?;
    Ok((input, Raw::Seq(vec![Raw::blank_before("="), val])))
}

fn field_wrapper(input: &str) -> PResult<'_, Raw> {
    map(field, |f| Raw::Record(vec![("field".to_owned(), f)]))(input)
}

fn field_item(input: &str) -> PResult<'_, Raw> {
    if let Ok((rest, text)) = comment(input) {
        let inner = Raw::Record(vec![("comment".to_owned(), Raw::token(text))]);
        return Ok((rest, Raw::Record(vec![("field".to_owned(), inner)])));
    }
    field_wrapper(input)
}

// fields ::= '{' (field | comment)* '}'
fn fields_block(input: &str) -> PResult<'_, Raw> {
    let (input, _) = punct('{')(input)?;
    let (input, items) = many0(field_item)(input)?;
    let (input, _) = punct('}')(input)?;
    Ok((
        input,
        Raw::Seq(vec![Raw::token("{"), Raw::Seq(items), Raw::token("}")]),
    ))
}

// implements ::= 'implements' name ('&' name)*
//
// More than one interface parses, so the registry can reject it with a
// proper error instead of a parse failure.
fn implements_clause(input: &str) -> PResult<'_, Raw> {
    let (input, _) = keyword("implements")(input)?;
    let (input, first) = name_record(input)?;
    let (input, others) = many0(preceded(punct('&'), name_record))(input)?;
    let mut items = vec![Raw::token("implements"), first];
    for other in others {
        items.push(Raw::blank_before("&"));
        items.push(other);
    }
    Ok((input, Raw::Seq(items)))
}

// object_type_definition    ::= 'type' name implements? directive* fields
// interface_type_definition ::= 'interface' name implements? directive* fields
// input_object_type_definition ::= 'input' name directive* fields
// enum_type_definition      ::= 'enum' name directive* fields
fn object_like<'a>(input: &'a str, kw: &str, allow_implements: bool) -> PResult<'a, Raw> {
    let (input, name) = name_record(input)?;
    let (input, implements) = if allow_implements {
        opt(implements_clause)(input)?
    } else {
        (input, None)
    };
    let (input, dirs) = directives0(input)?;
    let (input, fields) = fields_block(input)?;
    let mut entries = vec![
        ("_cst".to_owned(), Raw::token(kw)),
        ("_name".to_owned(), name),
    ];
    if let Some(implements) = implements {
        entries.push(("_implements".to_owned(), implements));
    }
    if !dirs.is_empty() {
        entries.push(("_directives".to_owned(), Raw::Seq(dirs)));
    }
    entries.push(("_fields".to_owned(), fields));
    Ok((input, Raw::Record(entries)))
}

// union_type_definition ::= 'union' name directive* '=' name ('|' name)*
fn union_definition(input: &str) -> PResult<'_, Raw> {
    let (input, name) = name_record(input)?;
    let (input, dirs) = directives0(input)?;
    let (input, _) = punct('=')(input)?;
    let (input, first) = name_record(input)?;
    let (input, others) = many0(preceded(punct('|'), name_record))(input)?;
    let mut members = vec![Raw::blank_before("="), first];
    for other in others {
        members.push(Raw::blank_before("|"));
        members.push(other);
    }
    let mut entries = vec![
        ("_cst".to_owned(), Raw::token("union")),
        ("_name".to_owned(), name),
    ];
    if !dirs.is_empty() {
        entries.push(("_directives".to_owned(), Raw::Seq(dirs)));
    }
    entries.push(("_members".to_owned(), Raw::Seq(members)));
    Ok((input, Raw::Record(entries)))
}

// scalar_type_definition ::= 'scalar' name directive*
fn scalar_definition(input: &str) -> PResult<'_, Raw> {
    let (input, name) = name_record(input)?;
    let (input, dirs) = directives0(input)?;
    let mut entries = vec![
        ("_cst".to_owned(), Raw::token("scalar")),
        ("_name".to_owned(), name),
    ];
    if !dirs.is_empty() {
        entries.push(("_directives".to_owned(), Raw::Seq(dirs)));
    }
    Ok((input, Raw::Record(entries)))
}

// schema_definition ::= 'schema' directive* fields
fn schema_definition(input: &str) -> PResult<'_, Raw> {
    let (input, dirs) = directives0(input)?;
    let (input, fields) = fields_block(input)?;
    let mut entries = vec![("_cst".to_owned(), Raw::token("schema"))];
    if !dirs.is_empty() {
        entries.push(("_directives".to_owned(), Raw::Seq(dirs)));
    }
    entries.push(("_fields".to_owned(), fields));
    Ok((input, Raw::Record(entries)))
}

// directive_definition ::=
//     'directive' '@' name arguments_definition? 'repeatable'? 'on'
//     name ('|' name)*
fn directive_definition(input: &str) -> PResult<'_, Raw> {
    let (input, _) = punct('@')(input)?;
    let (input, name) = name_record(input)?;
    let (input, args) = opt(arguments_definition)(input)?;
    let (input, repeatable) = opt(keyword("repeatable"))(input)?;
    let (input, _) = keyword("on")(input)?;
    let (input, first) = name_record(input)?;
    let (input, others) = many0(preceded(punct('|'), name_record))(input)?;

    let mut decl = vec![
        ("_cst__bb".to_owned(), Raw::token("@")),
        ("_name".to_owned(), name),
    ];
    if let Some(args) = args {
        decl.push(("args".to_owned(), args));
    }
    let mut locations = vec![first];
    for other in others {
        locations.push(Raw::blank_before("|"));
        locations.push(other);
    }
    let mut entries = vec![
        ("_cst".to_owned(), Raw::token("directive")),
        ("_decl".to_owned(), Raw::Record(decl)),
    ];
    if repeatable.is_some() {
        entries.push(("_repeatable".to_owned(), Raw::blank_before("repeatable")));
    }
    entries.push(("_on".to_owned(), Raw::blank_before("on")));
    entries.push(("_locations".to_owned(), Raw::Seq(locations)));
    Ok((input, Raw::Record(entries)))
}

// document ::= (comment | definition)*
fn definition(input: &str) -> PResult<'_, (String, Raw)> {
    if skip_ws(input).starts_with('#') {
        let (rest, text) = comment(input)?;
        return Ok((rest, ("comment".to_owned(), Raw::token(text))));
    }
    let (after, kw) = preceded(sp, ident)(input)?;
    let (rest, (production, node)) = match kw {
        "type" => {
            let (rest, node) = object_like(after, "type", true)?;
            (rest, ("object_type_definition", node))
        }
        "interface" => {
            let (rest, node) = object_like(after, "interface", true)?;
            (rest, ("interface_type_definition", node))
        }
        "input" => {
            let (rest, node) = object_like(after, "input", false)?;
            (rest, ("input_object_type_definition", node))
        }
        "enum" => {
            let (rest, node) = object_like(after, "enum", false)?;
            (rest, ("enum_type_definition", node))
        }
        "union" => {
            let (rest, node) = union_definition(after)?;
            (rest, ("union_type_definition", node))
        }
        "scalar" => {
            let (rest, node) = scalar_definition(after)?;
            (rest, ("scalar_type_definition", node))
        }
        "schema" => {
            let (rest, node) = schema_definition(after)?;
            (rest, ("schema_definition", node))
        }
        "directive" => {
            let (rest, node) = directive_definition(after)?;
            (rest, ("directive_definition", node))
        }
        _ => return Err(nom_error(input)),
    };
    Ok((rest, (production.to_owned(), node)))
}

/// Parses a whole document into `(production, node)` pairs, one per
/// top-level declaration, in source order.
pub fn parse_document(source: &str) -> Result<Vec<(String, Raw)>, CompileError> {
    let mut definitions = Vec::new();
    let mut rest = source;
    loop {
        if skip_ws(rest).is_empty() {
            break;
        }
        match definition(rest) {
            Ok((next, item)) => {
                definitions.push(item);
                rest = next;
            }
            Err(err) => return Err(convert_error(source, err)),
        }
    }
    Ok(definitions)
}

fn convert_error(source: &str, err: nom::Err<NomError<&str>>) -> CompileError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            if e.code == ErrorKind::TooLarge {
                return CompileError::RecursionLimit { limit: MAX_DEPTH };
            }
            let offset = source.len() - e.input.len();
            let snippet: String = e.input.trim_start().chars().take(24).collect();
            CompileError::Parse {
                message: format!("unexpected input near `{snippet}`"),
                offset,
            }
        }
        nom::Err::Incomplete(_) => CompileError::Parse {
            message: "unexpected end of input".to_owned(),
            offset: source.len(),
        },
    }
}

/// Interns a parsed document into the arena, driving the dialect's
/// semantics hooks in declaration order. Dropped declarations leave an
/// empty token in the document sequence.
pub fn lower_document(
    tree: &mut SyntaxTree,
    registry: &mut Registry,
    dialect: Dialect,
    definitions: &[(String, Raw)],
) -> Result<NodeId, CompileError> {
    let mut items = Vec::with_capacity(definitions.len());
    for (production, raw) in definitions {
        let node = lower(tree, dialect, raw)?;
        match dialect.handle_definition(production, tree, registry, node)? {
            Disposition::Keep => {
                let wrapper = tree.record(vec![(production.clone(), node)])?;
                items.push(wrapper);
            }
            Disposition::Drop => items.push(tree.empty_token()),
        }
    }
    Ok(tree.sequence(items))
}

fn lower(tree: &mut SyntaxTree, dialect: Dialect, raw: &Raw) -> Result<NodeId, CompileError> {
    match raw {
        Raw::Token(text) => Ok(tree.token(text.clone())),
        Raw::Seq(items) => {
            let mut ids = Vec::with_capacity(items.len());
            for item in items {
                ids.push(lower(tree, dialect, item)?);
            }
            Ok(tree.sequence(ids))
        }
        Raw::Record(entries) => lower_record(tree, dialect, entries),
        Raw::Directive(entries) => {
            let id = lower_record(tree, dialect, entries)?;
            let name = crate::registry::declared_name(tree, id, "directive")?;
            if dialect.keep_directive(&name) {
                Ok(id)
            } else {
                Ok(tree.empty_token())
            }
        }
    }
}

fn lower_record(
    tree: &mut SyntaxTree,
    dialect: Dialect,
    entries: &[(String, Raw)],
) -> Result<NodeId, CompileError> {
    let mut lowered = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        lowered.push((key.clone(), lower(tree, dialect, value)?));
    }
    tree.record(lowered)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record_key<'a>(raw: &'a Raw, key: &str) -> Option<&'a Raw> {
        match raw {
            Raw::Record(entries) | Raw::Directive(entries) => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    #[test]
    fn parses_a_type_with_fields_and_directives() {
        let doc = parse_document(
            "type Widget implements Node @auth {\n  id: ID!\n  tags: [String]\n}",
        )
        .expect("valid schema");
        assert_eq!(doc.len(), 1);
        let (production, node) = &doc[0];
        assert_eq!(production, "object_type_definition");
        assert_eq!(
            record_key(node, "_cst"),
            Some(&Raw::Token("type".to_owned()))
        );
        let implements = record_key(node, "_implements").expect("implements clause");
        match implements {
            Raw::Seq(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], Raw::Token("implements".to_owned()));
                assert_eq!(items[1], Raw::name("Node"));
            }
            other => panic!("unexpected implements shape: {other:?}"),
        }
        assert!(record_key(node, "_directives").is_some());
        assert!(record_key(node, "_fields").is_some());
    }

    #[test]
    fn implements_is_only_parsed_where_allowed() {
        let doc = parse_document("input WidgetRef {\n  id: ID\n}").expect("valid schema");
        assert_eq!(doc[0].0, "input_object_type_definition");
        // Inputs have no implements clause; the keyword is a parse error.
        assert!(parse_document("input WidgetRef implements Node {\n  id: ID\n}").is_err());
    }

    #[test]
    fn literals_collapse_into_single_tokens() {
        let doc = parse_document("type T {\n  f(limit: Int = 10): Float\n}")
            .expect("valid schema");
        let (_, node) = &doc[0];
        // The default value 10 must be one joined token, not a nested
        // digit-by-digit structure.
        let printed = format!("{node:?}");
        assert!(printed.contains("\"10\""), "{printed}");
    }

    #[test]
    fn deeply_nested_types_hit_the_recursion_ceiling() {
        let mut source = String::from("type T {\n  f: ");
        for _ in 0..(MAX_DEPTH + 2) {
            source.push('[');
        }
        source.push_str("ID");
        for _ in 0..(MAX_DEPTH + 2) {
            source.push(']');
        }
        source.push_str("\n}");
        let err = parse_document(&source).expect_err("too deep");
        assert!(matches!(err, CompileError::RecursionLimit { .. }));
    }

    #[test]
    fn unknown_top_level_keyword_is_a_parse_error() {
        let err = parse_document("widget Oops {}").expect_err("bad keyword");
        match err {
            CompileError::Parse { offset, .. } => assert_eq!(offset, 0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn comments_survive_as_document_items() {
        let doc = parse_document("# Dgraph.Authorization {...}\ntype T {\n  id: ID\n}")
            .expect("valid schema");
        assert_eq!(doc.len(), 2);
        assert_eq!(doc[0].0, "comment");
        assert_eq!(
            doc[0].1,
            Raw::Token("# Dgraph.Authorization {...}".to_owned())
        );
    }
}
