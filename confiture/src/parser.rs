//! Recursive-descent parser and include expansion (spec.md §4.2).
//!
//! The grammar is small (~12 productions) and the source has exactly the
//! properties that make hand-written recursive descent preferable to a
//! combinator or generator library here: a mutable "newline missing" guard
//! that spans the whole parse, and recursive re-entrant parsing for
//! `include` expansion. Both read far more directly as a token cursor with
//! plain control flow than as parser combinators.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use crate::error::ParsingError;
use crate::lexer::{self, Token, TokenKind};
use crate::tree::{ExpandedChild, Payload, Position, Section, SectionId, Tree, Value};

/// Recursion bound shared by section nesting and include nesting
/// (spec.md §5: "recommended ≥ 64").
pub const MAX_NESTING_DEPTH: usize = 64;

/// Resolves an `include` pattern to the parsed top sections of every file it
/// matches (spec.md §6, "External opener hook").
pub trait ExternalOpener: fmt::Debug {
    /// Returns `(name, source)` pairs, one per file the pattern matched, in
    /// the opener's natural order.
    fn open(&self, pattern: &str) -> Result<Vec<(String, String)>, ParsingError>;
}

/// The default [`ExternalOpener`]: globs `pattern` against the process's
/// current working directory and reads each match as UTF-8 text.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobOpener;

impl ExternalOpener for GlobOpener {
    fn open(&self, pattern: &str) -> Result<Vec<(String, String)>, ParsingError> {
        let paths = glob::glob(pattern).map_err(|err| ParsingError::InvalidIncludePattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        let mut out = Vec::new();
        for entry in paths {
            let path: PathBuf = entry.map_err(|err| ParsingError::IncludeOpenFailed {
                path: err.path().display().to_string(),
                reason: err.error().to_string(),
            })?;
            let content = fs::read_to_string(&path).map_err(|err| ParsingError::IncludeOpenFailed {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
            out.push((path.display().to_string(), content));
        }
        Ok(out)
    }
}

/// Parses `source` (attributing positions to `file`) into a raw [`Tree`],
/// resolving any `include` directives through `opener`.
pub fn parse(source: &str, file: &str, opener: &dyn ExternalOpener) -> Result<Tree, ParsingError> {
    parse_at_depth(source, file, opener, 0)
}

/// Convenience entry point using the default filesystem+glob opener.
pub fn parse_with_default_opener(source: &str, file: &str) -> Result<Tree, ParsingError> {
    parse(source, file, &GlobOpener)
}

fn parse_at_depth(source: &str, file: &str, opener: &dyn ExternalOpener, depth: usize) -> Result<Tree, ParsingError> {
    let tokens = lexer::tokenize(source, file)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        opener,
        last_child_line: None,
        depth,
    };
    let mut tree = Tree::new();
    let root = tree.alloc(Section::new("__top__", None, Position::sentinel()));
    parser.parse_section_content(&mut tree, root)?;
    parser.expect_eof()?;
    Ok(tree)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    opener: &'a dyn ExternalOpener,
    last_child_line: Option<usize>,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn is_value_start(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Text(_) | TokenKind::Yes | TokenKind::No | TokenKind::Int(_) | TokenKind::Float(_)
        )
    }

    fn unexpected_token_error(&self) -> ParsingError {
        let token = self.peek();
        if matches!(token.kind, TokenKind::Eof) {
            ParsingError::UnexpectedEof
        } else {
            ParsingError::UnexpectedToken {
                token: token.kind.to_string(),
                position: token.position.clone(),
            }
        }
    }

    fn expect_assign(&mut self) -> Result<(), ParsingError> {
        if matches!(self.peek().kind, TokenKind::Assign) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected_token_error())
        }
    }

    fn expect_lbrace(&mut self) -> Result<(), ParsingError> {
        if matches!(self.peek().kind, TokenKind::LBrace) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected_token_error())
        }
    }

    fn expect_rbrace(&mut self) -> Result<(), ParsingError> {
        match self.peek().kind {
            TokenKind::RBrace => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Err(ParsingError::UnexpectedEof),
            _ => Err(self.unexpected_token_error()),
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParsingError> {
        if matches!(self.peek().kind, TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.unexpected_token_error())
        }
    }

    fn expect_text(&mut self) -> Result<String, ParsingError> {
        match self.peek().kind.clone() {
            TokenKind::Text(value) => {
                self.advance();
                Ok(value)
            }
            _ => Err(self.unexpected_token_error()),
        }
    }

    fn check_depth(&self, position: &Position) -> Result<(), ParsingError> {
        if self.depth > MAX_NESTING_DEPTH {
            Err(ParsingError::NestingTooDeep {
                max_depth: MAX_NESTING_DEPTH,
                position: position.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Parses a single scalar (`value` in spec.md §4.2): a string, boolean,
    /// or number possibly scaled by a unit suffix.
    fn parse_scalar(&mut self) -> Result<Payload, ParsingError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Text(value) => Ok(Payload::Str(value)),
            TokenKind::Yes => Ok(Payload::Bool(true)),
            TokenKind::No => Ok(Payload::Bool(false)),
            TokenKind::Int(n) => Ok(self.apply_unit_to_int(n)),
            TokenKind::Float(n) => Ok(self.apply_unit_to_float(n)),
            other => Err(ParsingError::UnexpectedToken {
                token: other.to_string(),
                position: token.position,
            }),
        }
    }

    fn apply_unit_to_int(&mut self, n: i64) -> Payload {
        if let TokenKind::Unit(multiplier) = self.peek().kind {
            self.advance();
            let scaled = i128::from(n) * multiplier;
            match i64::try_from(scaled) {
                Ok(scaled) => Payload::Int(scaled),
                Err(_) => Payload::Float(n as f64 * multiplier as f64),
            }
        } else {
            Payload::Int(n)
        }
    }

    fn apply_unit_to_float(&mut self, n: f64) -> Payload {
        if let TokenKind::Unit(multiplier) = self.peek().kind {
            self.advance();
            Payload::Float(n * multiplier as f64)
        } else {
            Payload::Float(n)
        }
    }

    /// Parses the right-hand side of an assignment: a single scalar, or a
    /// comma-separated `list` (trailing commas allowed, per spec.md §4.2).
    fn parse_assignment_value(&mut self) -> Result<Payload, ParsingError> {
        let first = self.parse_scalar()?;
        if !matches!(self.peek().kind, TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        loop {
            self.advance(); // consume ','
            if self.is_value_start() {
                items.push(self.parse_scalar()?);
                if matches!(self.peek().kind, TokenKind::Comma) {
                    continue;
                }
            }
            break;
        }
        Ok(Payload::List(items))
    }

    /// Parses `section_args`: one or more comma-separated values, always
    /// materialized as a `<args>` list value even for a single argument.
    fn parse_section_args(&mut self) -> Result<Value, ParsingError> {
        let position = self.peek().position.clone();
        let mut items = vec![self.parse_scalar()?];
        while matches!(self.peek().kind, TokenKind::Comma) {
            self.advance();
            items.push(self.parse_scalar()?);
        }
        Ok(Value::new("<args>", Payload::List(items), position))
    }

    fn register_value(&self, tree: &mut Tree, parent: SectionId, value: Value) -> Result<(), ParsingError> {
        let section = tree.section(parent).name.clone();
        let name = value.name.clone();
        let position = value.position.clone();
        tree.section_mut(parent)
            .register_value(value)
            .map_err(|_| ParsingError::DuplicateChildName { section, name, position })
    }

    fn register_subsection(
        &self,
        tree: &mut Tree,
        parent: SectionId,
        name: String,
        id: SectionId,
    ) -> Result<(), ParsingError> {
        let section = tree.section(parent).name.clone();
        let position = tree.section(id).position.clone();
        tree.section_mut(parent)
            .register_subsection(name.clone(), id)
            .map_err(|_| ParsingError::DuplicateChildName { section, name, position })
    }

    /// Parses `NAME '=' value|list`, registers it under `parent`, and
    /// returns its name and position for the newline-missing guard.
    fn parse_assignment(&mut self, tree: &mut Tree, parent: SectionId) -> Result<(String, Position), ParsingError> {
        let name_token = self.advance();
        let name = match name_token.kind {
            TokenKind::Name(name) => name,
            other => {
                return Err(ParsingError::UnexpectedToken {
                    token: other.to_string(),
                    position: name_token.position,
                });
            }
        };
        self.expect_assign()?;
        let position = self.peek().position.clone();
        let payload = self.parse_assignment_value()?;
        let value = Value::new(name, payload, position);
        let (name, position) = (value.name.clone(), value.position.clone());
        self.register_value(tree, parent, value)?;
        Ok((name, position))
    }

    /// Parses `NAME [section_args] '{' section_content '}'`, registers it
    /// under `parent`, and returns its name and position.
    fn parse_section(&mut self, tree: &mut Tree, parent: SectionId) -> Result<(String, Position), ParsingError> {
        let name_token = self.advance();
        let name = match name_token.kind {
            TokenKind::Name(name) => name,
            other => {
                return Err(ParsingError::UnexpectedToken {
                    token: other.to_string(),
                    position: name_token.position,
                });
            }
        };
        let position = name_token.position;

        let args = if matches!(self.peek().kind, TokenKind::LBrace) {
            None
        } else if self.is_value_start() {
            Some(self.parse_section_args()?)
        } else {
            return Err(self.unexpected_token_error());
        };

        self.expect_lbrace()?;
        self.depth += 1;
        self.check_depth(&position)?;

        let mut section = Section::new(name.clone(), Some(parent), position.clone());
        section.args = args;
        let id = tree.alloc(section);

        self.parse_section_content(tree, id)?;
        self.expect_rbrace()?;
        self.depth -= 1;

        self.register_subsection(tree, parent, name.clone(), id)?;
        Ok((name, position))
    }

    /// Parses `INCLUDE TEXT`, expanding each matched file's flattened
    /// top-level children into `parent`. Does not participate in the
    /// newline-missing guard: the reference grammar only runs that check on
    /// direct `assignment`/`section` reductions.
    fn parse_include(&mut self, tree: &mut Tree, parent: SectionId) -> Result<(), ParsingError> {
        let include_position = self.peek().position.clone();
        self.advance(); // consume INCLUDE
        let pattern = self.expect_text()?;
        self.depth += 1;
        self.check_depth(&include_position)?;

        for (external_name, external_source) in self.opener.open(&pattern)? {
            let included = parse_at_depth(&external_source, &external_name, self.opener, self.depth)?;
            let root = included.root();
            for child in included.section(root).expanded_children() {
                match child {
                    ExpandedChild::Value(value) => {
                        self.register_value(tree, parent, value.clone())?;
                    }
                    ExpandedChild::Subsection(name, id) => {
                        let grafted = graft_section(&included, id, tree, Some(parent));
                        self.register_subsection(tree, parent, name.to_string(), grafted)?;
                    }
                }
            }
        }

        self.depth -= 1;
        Ok(())
    }

    /// Parses `section_content`, registering every child into `parent` as
    /// it is recognized, until `}` or end of input.
    fn parse_section_content(&mut self, tree: &mut Tree, parent: SectionId) -> Result<(), ParsingError> {
        loop {
            match &self.peek().kind {
                TokenKind::Eof | TokenKind::RBrace => return Ok(()),
                TokenKind::Include => self.parse_include(tree, parent)?,
                TokenKind::Name(_) => {
                    let (name, position) = if matches!(self.peek_at(1).kind, TokenKind::Assign) {
                        self.parse_assignment(tree, parent)?
                    } else {
                        self.parse_section(tree, parent)?
                    };
                    let end_line = self.peek().position.line;
                    if self.last_child_line == Some(end_line) {
                        return Err(ParsingError::NewlineMissing { token: name, position });
                    }
                    self.last_child_line = Some(end_line);
                }
                _ => return Err(self.unexpected_token_error()),
            }
        }
    }
}

/// Deep-copies the subtree rooted at `src_id` (in `src`) into `dst`, under
/// `new_parent`, allocating fresh [`SectionId`]s. Used to graft an included
/// file's subsections into the including tree's arena.
fn graft_section(src: &Tree, src_id: SectionId, dst: &mut Tree, new_parent: Option<SectionId>) -> SectionId {
    let source = src.section(src_id);
    let mut grafted = Section::new(source.name.clone(), new_parent, source.position.clone());
    grafted.args = source.args.clone();
    let new_id = dst.alloc(grafted);

    for value in source.values() {
        dst.section_mut(new_id)
            .register_value(value.clone())
            .expect("source tree is internally consistent");
    }
    for (name, ids) in source.subsection_groups() {
        for &child_id in ids {
            let grafted_child = graft_section(src, child_id, dst, Some(new_id));
            dst.section_mut(new_id)
                .register_subsection(name.to_string(), grafted_child)
                .expect("source tree is internally consistent");
        }
    }
    new_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(source: &str) -> Tree {
        parse_with_default_opener(source, "<test>").expect("parse should succeed")
    }

    #[test]
    fn comment_and_boolean() {
        let tree = parse_str("daemon = yes  # comment\n# comment\n");
        let root = tree.root();
        assert_eq!(tree.section(root).get("daemon").unwrap().payload, Payload::Bool(true));
    }

    #[test]
    fn list_normal_forms() {
        for source in ["x = 1,2,3\n", "x = 1,2,3,\n", "x = 1,\n2,\n3\n", "x = 1,\n2,\n3,\n"] {
            let tree = parse_str(source);
            let root = tree.root();
            let value = tree.section(root).get("x").unwrap();
            assert_eq!(
                value.payload,
                Payload::List(vec![Payload::Int(1), Payload::Int(2), Payload::Int(3)])
            );
        }
        let tree = parse_str("x = 1,\n");
        let root = tree.root();
        assert_eq!(tree.section(root).get("x").unwrap().payload, Payload::List(vec![Payload::Int(1)]));
    }

    #[test]
    fn section_args() {
        let tree = parse_str("s 'a' {}\n");
        let root = tree.root();
        let ids = tree.section(root).subsections("s");
        assert_eq!(ids.len(), 1);
        let section = tree.section(ids[0]);
        assert_eq!(section.args.as_ref().unwrap().payload, Payload::List(vec![Payload::Str("a".into())]));

        let tree = parse_str("s 'a','b' {}\n");
        let root = tree.root();
        let ids = tree.section(root).subsections("s");
        let section = tree.section(ids[0]);
        assert_eq!(
            section.args.as_ref().unwrap().payload,
            Payload::List(vec![Payload::Str("a".into()), Payload::Str("b".into())])
        );
    }

    #[test]
    fn unit_semantics() {
        let tree = parse_str("x = 4 Ki\n");
        let root = tree.root();
        assert_eq!(tree.section(root).get("x").unwrap().payload, Payload::Int(4096));

        let tree = parse_str("x = 1.5 M\n");
        let root = tree.root();
        assert_eq!(tree.section(root).get("x").unwrap().payload, Payload::Float(1_500_000.0));
    }

    #[test]
    fn newline_missing_guard() {
        let err = parse_with_default_opener("a = 1 b = 2", "<test>").unwrap_err();
        match err {
            ParsingError::NewlineMissing { token, .. } => assert_eq!(token, "b"),
            other => panic!("expected NewlineMissing, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_section_is_unexpected_eof() {
        let err = parse_with_default_opener("section {\n", "<test>").unwrap_err();
        assert!(matches!(err, ParsingError::UnexpectedEof));
    }

    #[test]
    fn duplicate_value_name_is_rejected() {
        let err = parse_with_default_opener("a = 1\na = 2\n", "<test>").unwrap_err();
        assert!(matches!(err, ParsingError::DuplicateChildName { .. }));
    }

    #[test]
    fn nested_sections_preserve_order_and_parent() {
        let tree = parse_str("outer {\n  inner 'x' {\n    k = 1\n  }\n  inner 'y' {\n    k = 2\n  }\n}\n");
        let root = tree.root();
        let outer_ids = tree.section(root).subsections("outer");
        assert_eq!(outer_ids.len(), 1);
        let outer = tree.section(outer_ids[0]);
        let inner_ids = outer.subsections("inner");
        assert_eq!(inner_ids.len(), 2);
        assert_eq!(tree.section(inner_ids[0]).parent, Some(outer_ids[0]));
        assert_eq!(tree.section(inner_ids[0]).get("k").unwrap().payload, Payload::Int(1));
        assert_eq!(tree.section(inner_ids[1]).get("k").unwrap().payload, Payload::Int(2));
    }
}
