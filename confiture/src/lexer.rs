//! Tokenizer for Confiture source text (spec.md §4.1).
//!
//! The lexer runs once per [`crate::parser::Parser`] and realizes the whole
//! token sequence ahead of time; the parser still only ever consults the
//! current token plus one token of lookahead, so this stays a faithful
//! (if eager) reimplementation of the "lazy token sequence" spec.md
//! describes.

use std::fmt;

use crate::error::ParsingError;
use crate::tree::Position;
use crate::units;

/// The kind and payload of a single token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `=`
    Assign,
    /// `,`
    Comma,
    /// An identifier that is not one of the reserved words below.
    Name(String),
    /// A single- or double-quoted string, already unescaped.
    Text(String),
    /// An integer literal, before any unit suffix is applied.
    Int(i64),
    /// A float literal, before any unit suffix is applied.
    Float(f64),
    /// `yes`
    Yes,
    /// `no`
    No,
    /// `include`
    Include,
    /// A unit keyword (`k`, `Ki`, `M`, ...), carrying its multiplier.
    Unit(i128),
    /// End of input.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Name(name) => write!(f, "{name}"),
            TokenKind::Text(text) => write!(f, "{text}"),
            TokenKind::Int(n) => write!(f, "{n}"),
            TokenKind::Float(n) => write!(f, "{n}"),
            TokenKind::Yes => write!(f, "yes"),
            TokenKind::No => write!(f, "no"),
            TokenKind::Include => write!(f, "include"),
            TokenKind::Unit(_) => write!(f, "<unit>"),
            TokenKind::Eof => write!(f, "<eof>"),
        }
    }
}

/// One lexed token, with the position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token's kind and payload.
    pub kind: TokenKind,
    /// Where the token starts.
    pub position: Position,
}

/// Tokenizes `source`, attributing positions to `file`.
pub fn tokenize(source: &str, file: &str) -> Result<Vec<Token>, ParsingError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;
    let mut line = 1usize;
    let mut column = 1usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' => {
                i += 1;
                column += 1;
            }
            '\n' => {
                while i < chars.len() && chars[i] == '\n' {
                    i += 1;
                    line += 1;
                }
                column = 1;
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '{' => {
                tokens.push(Token {
                    kind: TokenKind::LBrace,
                    position: Position::new(file, line, column),
                });
                i += 1;
                column += 1;
            }
            '}' => {
                tokens.push(Token {
                    kind: TokenKind::RBrace,
                    position: Position::new(file, line, column),
                });
                i += 1;
                column += 1;
            }
            '=' => {
                tokens.push(Token {
                    kind: TokenKind::Assign,
                    position: Position::new(file, line, column),
                });
                i += 1;
                column += 1;
            }
            ',' => {
                tokens.push(Token {
                    kind: TokenKind::Comma,
                    position: Position::new(file, line, column),
                });
                i += 1;
                column += 1;
            }
            '"' | '\'' => {
                let position = Position::new(file, line, column);
                let quote = c;
                i += 1;
                column += 1;
                let mut value = String::new();
                let mut terminated = false;
                while i < chars.len() {
                    let ch = chars[i];
                    if ch == '\\' && i + 1 < chars.len() && chars[i + 1] == quote {
                        value.push(quote);
                        i += 2;
                        column += 2;
                        continue;
                    }
                    if ch == quote {
                        i += 1;
                        column += 1;
                        terminated = true;
                        break;
                    }
                    if ch == '\n' {
                        value.push('\n');
                        line += 1;
                        column = 1;
                        i += 1;
                        continue;
                    }
                    value.push(ch);
                    i += 1;
                    column += 1;
                }
                if !terminated {
                    return Err(ParsingError::IllegalCharacter {
                        character: quote,
                        position,
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::Text(value),
                    position,
                });
            }
            '-' | '+' if peek_digit(&chars, i + 1) => {
                let position = Position::new(file, line, column);
                let (kind, consumed) = scan_number(&chars, i)?;
                i += consumed;
                column += consumed;
                tokens.push(Token { kind, position });
            }
            c if c.is_ascii_digit() => {
                let position = Position::new(file, line, column);
                let (kind, consumed) = scan_number(&chars, i)?;
                i += consumed;
                column += consumed;
                tokens.push(Token { kind, position });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let position = Position::new(file, line, column);
                let start = i;
                let mut j = i;
                while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_' || chars[j] == '-') {
                    j += 1;
                }
                let text: String = chars[start..j].iter().collect();
                let consumed = j - start;
                i = j;
                column += consumed;
                let kind = match text.as_str() {
                    "yes" => TokenKind::Yes,
                    "no" => TokenKind::No,
                    "include" => TokenKind::Include,
                    other => match units::lookup(other) {
                        Some(multiplier) => TokenKind::Unit(multiplier),
                        None => TokenKind::Name(text),
                    },
                };
                tokens.push(Token { kind, position });
            }
            other => {
                return Err(ParsingError::IllegalCharacter {
                    character: other,
                    position: Position::new(file, line, column),
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: Position::new(file, line, column),
    });
    Ok(tokens)
}

fn peek_digit(chars: &[char], at: usize) -> bool {
    chars.get(at).is_some_and(|c| c.is_ascii_digit())
}

/// Scans `[-+]?[0-9]+(\.[0-9]+)?` starting at `start`, returning the token
/// and the number of `char`s consumed.
fn scan_number(chars: &[char], start: usize) -> Result<(TokenKind, usize), ParsingError> {
    let mut j = start;
    if chars[j] == '-' || chars[j] == '+' {
        j += 1;
    }
    let digits_start = j;
    while j < chars.len() && chars[j].is_ascii_digit() {
        j += 1;
    }
    let mut is_float = false;
    if chars.get(j) == Some(&'.') && chars.get(j + 1).is_some_and(|c| c.is_ascii_digit()) {
        is_float = true;
        j += 1;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
    }
    let text: String = chars[start..j].iter().collect();
    let kind = if is_float {
        TokenKind::Float(text.parse::<f64>().expect("regex-validated float literal"))
    } else {
        match text.parse::<i64>() {
            Ok(n) => TokenKind::Int(n),
            Err(_) => {
                // Falls back to a float so oversized integer literals remain
                // representable rather than failing the whole parse; there
                // is no dedicated "integer too large" token in spec.md.
                TokenKind::Float(text.parse::<f64>().expect("regex-validated integer literal"))
            }
        }
    };
    let _ = digits_start;
    Ok((kind, j - start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, "<test>")
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexer_fidelity_table() {
        assert_eq!(kinds("name"), vec![TokenKind::Name("name".into()), TokenKind::Eof]);
        assert_eq!(kinds("\"test\""), vec![TokenKind::Text("test".into()), TokenKind::Eof]);
        assert_eq!(kinds("'test'"), vec![TokenKind::Text("test".into()), TokenKind::Eof]);
        assert_eq!(
            kinds("'te\\'st'"),
            vec![TokenKind::Text("te'st".into()), TokenKind::Eof]
        );
        assert_eq!(kinds("42"), vec![TokenKind::Int(42), TokenKind::Eof]);
        assert_eq!(kinds("42.1"), vec![TokenKind::Float(42.1), TokenKind::Eof]);
        assert_eq!(kinds("+42"), vec![TokenKind::Int(42), TokenKind::Eof]);
        assert_eq!(kinds("-42.1"), vec![TokenKind::Float(-42.1), TokenKind::Eof]);
        assert_eq!(kinds("{"), vec![TokenKind::LBrace, TokenKind::Eof]);
        assert_eq!(kinds("}"), vec![TokenKind::RBrace, TokenKind::Eof]);
        assert_eq!(kinds("="), vec![TokenKind::Assign, TokenKind::Eof]);
        assert_eq!(kinds("yes"), vec![TokenKind::Yes, TokenKind::Eof]);
        assert_eq!(kinds("no"), vec![TokenKind::No, TokenKind::Eof]);
        assert_eq!(kinds("Ki"), vec![TokenKind::Unit(1024), TokenKind::Eof]);
    }

    #[test]
    fn comment_and_boolean() {
        let tokens = kinds("daemon = yes  # comment\n# comment\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Name("daemon".into()),
                TokenKind::Assign,
                TokenKind::Yes,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn illegal_character_reports_position() {
        let err = tokenize("x = @", "<test>").unwrap_err();
        match err {
            ParsingError::IllegalCharacter { character, position } => {
                assert_eq!(character, '@');
                assert_eq!(position.line, 1);
                assert_eq!(position.column, 5);
            }
            other => panic!("expected IllegalCharacter, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_string_is_illegal() {
        let err = tokenize("x = \"unterminated", "<test>").unwrap_err();
        assert!(matches!(err, ParsingError::IllegalCharacter { character: '"', .. }));
    }
}
