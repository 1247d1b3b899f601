use trellis_core::error::{Error, ParseErrorKind, Result};
use trellis_core::expression::Expression;
use trellis_core::location::SourceLocation;
use trellis_core::values::Value;

use crate::lexer::{Kind, Lexer, Token};

/// Parse a single expression:
///
/// ```text
/// expression := STRING | INT | 'true' | 'false' | path | emit
/// path       := IDENT ('.' IDENT)*
/// emit       := 'emit' (path ':')? IDENT ('::' IDENT)? '(' (expression (',' expression)* ','?)? ')'
/// ```
pub fn parse_expression(source: &str, location: &SourceLocation) -> Result<Expression> {
    let mut parser = Parser::new(source, location)?;
    let expression = parser.expression()?;

    if parser.current.kind != Kind::Eof {
        return Err(parser.error(
            ParseErrorKind::ExpectedEof,
            format!("Unexpected {} after the expression", describe(&parser.current.kind)),
        ));
    }

    Ok(expression)
}

fn describe(kind: &Kind) -> String {
    match kind {
        Kind::Ident(ident) => format!("'{ident}'"),
        Kind::Str(_) => "string".to_string(),
        Kind::Int(i) => format!("'{i}'"),
        Kind::True => "'true'".to_string(),
        Kind::False => "'false'".to_string(),
        Kind::Emit => "'emit'".to_string(),
        Kind::Dot => "'.'".to_string(),
        Kind::Comma => "','".to_string(),
        Kind::Colon => "':'".to_string(),
        Kind::DoubleColon => "'::'".to_string(),
        Kind::LParen => "'('".to_string(),
        Kind::RParen => "')'".to_string(),
        Kind::Eof => "end of input".to_string(),
    }
}

struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, location: &'src SourceLocation) -> Result<Self> {
        let mut lexer = Lexer::new(source, location);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn advance(&mut self) -> Result<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn location(&self) -> SourceLocation {
        self.lexer.location(self.current.offset)
    }

    fn error(&self, kind: ParseErrorKind, message: impl Into<String>) -> Error {
        Error::parse(kind, self.location(), message)
    }

    fn unexpected(&self, expected: &str) -> Error {
        self.error(
            ParseErrorKind::UnexpectedToken,
            format!("Expected {expected}, found {}", describe(&self.current.kind)),
        )
    }

    fn ident(&mut self, expected: &str) -> Result<(String, SourceLocation)> {
        let location = self.location();
        let Kind::Ident(ident) = &self.current.kind else {
            return Err(self.unexpected(expected));
        };
        let ident = ident.clone();
        self.advance()?;
        Ok((ident, location))
    }

    fn expect(&mut self, kind: Kind, expected: &str) -> Result<()> {
        if self.current.kind != kind {
            return Err(self.unexpected(expected));
        }
        self.advance()?;
        Ok(())
    }

    fn expression(&mut self) -> Result<Expression> {
        let location = self.location();
        let constant = match &self.current.kind {
            Kind::Str(s) => Value::from(s.as_str()),
            Kind::Int(i) => Value::Int(*i),
            Kind::True => Value::Bool(true),
            Kind::False => Value::Bool(false),
            Kind::Emit => return self.emit(),
            Kind::Ident(_) => return self.path(),
            _ => return Err(self.unexpected("an expression")),
        };

        self.advance()?;
        Ok(Expression::constant(location, constant))
    }

    fn path(&mut self) -> Result<Expression> {
        let (name, location) = self.ident("a name")?;
        let mut expression = Expression::property(location, None, name);

        while self.current.kind == Kind::Dot {
            self.advance()?;
            let (name, location) = self.ident("a property name after '.'")?;
            expression = Expression::property(location, Some(expression), name);
        }

        Ok(expression)
    }

    fn emit(&mut self) -> Result<Expression> {
        let location = self.location();
        self.advance()?;

        // `emit base.path:signal` or `emit signal`
        let mut segments = vec![self.ident("a signal name after 'emit'")?];
        while self.current.kind == Kind::Dot {
            self.advance()?;
            segments.push(self.ident("a property name after '.'")?);
        }

        let (base, signal) = match self.current.kind {
            Kind::Colon => {
                self.advance()?;
                let (signal, _) = self.ident("a signal name after ':'")?;
                let base = segments
                    .into_iter()
                    .fold(None, |base, (name, location)| {
                        Some(Expression::property(location, base, name))
                    });
                (base, signal)
            }
            _ if segments.len() == 1 => {
                let (signal, _) = segments.remove(0);
                (None, signal)
            }
            _ => return Err(self.unexpected("':' before the signal name")),
        };

        let detail = match self.current.kind {
            Kind::DoubleColon => {
                self.advance()?;
                Some(self.ident("a signal detail after '::'")?.0)
            }
            _ => None,
        };

        self.expect(Kind::LParen, "'(' after the signal name")?;
        let mut args = vec![];
        while self.current.kind != Kind::RParen {
            args.push(self.expression()?);
            match self.current.kind {
                Kind::Comma => {
                    self.advance()?;
                }
                Kind::RParen => break,
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
        self.advance()?;

        Ok(Expression::signal(location, base, signal, detail, args))
    }
}
