use std::iter::Peekable;
use std::str::CharIndices;

use trellis_core::error::{Error, ParseErrorKind, Result};
use trellis_core::location::SourceLocation;

use crate::location_at;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Kind {
    Ident(String),
    Str(String),
    Int(i64),
    True,
    False,
    Emit,
    Dot,
    Comma,
    Colon,
    DoubleColon,
    LParen,
    RParen,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: Kind,
    /// Byte offset into the source
    pub(crate) offset: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit() || c == '-'
}

pub(crate) struct Lexer<'src> {
    src: &'src str,
    chars: Peekable<CharIndices<'src>>,
    location: &'src SourceLocation,
}

impl<'src> Lexer<'src> {
    pub(crate) fn new(src: &'src str, location: &'src SourceLocation) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            location,
        }
    }

    pub(crate) fn location(&self, offset: usize) -> SourceLocation {
        location_at(self.src, offset, self.location)
    }

    fn error(&self, kind: ParseErrorKind, offset: usize, message: impl Into<String>) -> Error {
        Error::parse(kind, self.location(offset), message)
    }

    fn next_if(&mut self, f: impl Fn(char) -> bool) -> Option<char> {
        self.chars.next_if(|(_, c)| f(*c)).map(|(_, c)| c)
    }

    pub(crate) fn next_token(&mut self) -> Result<Token> {
        while self.next_if(char::is_whitespace).is_some() {}

        let Some((offset, c)) = self.chars.next() else {
            return Ok(Token {
                kind: Kind::Eof,
                offset: self.src.len(),
            });
        };

        let kind = match c {
            '.' => Kind::Dot,
            ',' => Kind::Comma,
            '(' => Kind::LParen,
            ')' => Kind::RParen,
            ':' => match self.next_if(|c| c == ':') {
                Some(_) => Kind::DoubleColon,
                None => Kind::Colon,
            },
            '\'' => self.string(offset)?,
            '-' | '0'..='9' => self.number(c, offset)?,
            c if is_ident_start(c) => self.ident(offset),
            c => {
                return Err(self.error(
                    ParseErrorKind::UnexpectedToken,
                    offset,
                    format!("Unexpected character '{c}'"),
                ))
            }
        };

        Ok(Token { kind, offset })
    }

    fn string(&mut self, start: usize) -> Result<Kind> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\'')) => return Ok(Kind::Str(text)),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, c)) => text.push(c),
                    None => break,
                },
                Some((_, c)) => text.push(c),
                None => break,
            }
        }

        Err(self.error(ParseErrorKind::UnterminatedString, start, "Unterminated string"))
    }

    fn number(&mut self, first: char, start: usize) -> Result<Kind> {
        let negative = first == '-';
        let first_digit = match negative {
            true => match self.next_if(|c| c.is_ascii_digit()) {
                Some(c) => c,
                None => {
                    return Err(self.error(
                        ParseErrorKind::UnexpectedToken,
                        start,
                        "Expected a number after '-'",
                    ))
                }
            },
            false => first,
        };

        let is_hex = first_digit == '0' && self.next_if(|c| c == 'x' || c == 'X').is_some();
        let radix = if is_hex { 16 } else { 10 };

        let mut digits = String::new();
        if negative {
            digits.push('-');
        }
        if !is_hex {
            digits.push(first_digit);
        }
        while let Some(c) = self.next_if(|c| c.is_digit(radix)) {
            digits.push(c);
        }

        let trailing = self.next_if(|c| c.is_ascii_alphanumeric() || c == '_');
        let missing_digits = is_hex && digits.trim_start_matches('-').is_empty();
        if trailing.is_some() || missing_digits {
            let end = self.chars.peek().map(|(i, _)| *i).unwrap_or(self.src.len());
            return Err(self.error(
                ParseErrorKind::InvalidNumber,
                start,
                format!("Invalid number '{}'", &self.src[start..end]),
            ));
        }

        i64::from_str_radix(&digits, radix).map(Kind::Int).map_err(|err| {
            self.error(
                ParseErrorKind::InvalidNumber,
                start,
                format!("Invalid number '{digits}': {err}"),
            )
        })
    }

    fn ident(&mut self, start: usize) -> Kind {
        let mut end = start + 1;
        while let Some((offset, c)) = self.chars.next_if(|(_, c)| is_ident_char(*c)) {
            end = offset + c.len_utf8();
        }

        match &self.src[start..end] {
            "true" => Kind::True,
            "false" => Kind::False,
            "emit" => Kind::Emit,
            ident => Kind::Ident(ident.to_string()),
        }
    }
}
