use trellis_core::binding::{Binding, BindingBuilder};
use trellis_core::error::{Error, ParseErrorKind, Result};
use trellis_core::location::SourceLocation;

use crate::{location_at, parse_expression};

fn closing(open: char) -> char {
    match open {
        '[' => ']',
        _ => '}',
    }
}

/// Parse the text of an attribute into a binding.
///
/// Text is taken literally, except for `[expression]` (one-way) and
/// `{expression}` (two-way) segments. A `\` makes the next character literal.
pub fn parse_binding(source: &str, location: &SourceLocation) -> Result<Binding> {
    let mut builder = BindingBuilder::new();
    let mut text = String::new();
    let mut chars = source.char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => text.push(escaped),
                None => text.push('\\'),
            },
            '[' | '{' => {
                let end = find_closing(source, offset, c, location)?;
                if !text.is_empty() {
                    builder = builder.add_constant(std::mem::take(&mut text));
                }

                let start = offset + 1;
                let expression = parse_expression(&source[start..end], &location_at(source, start, location))?;
                builder = builder.add_expression(expression, c == '{');

                // Skip over the segment
                for (next, _) in chars.by_ref() {
                    if next == end {
                        break;
                    }
                }
            }
            ']' | '}' => {
                return Err(Error::parse(
                    ParseErrorKind::MismatchedBracket,
                    location_at(source, offset, location),
                    format!("Unmatched '{c}'"),
                ))
            }
            c => text.push(c),
        }
    }

    if !text.is_empty() {
        builder = builder.add_constant(text);
    }

    Ok(builder.build(location.clone()))
}

/// Byte offset of the bracket closing the segment opened at `open_offset`.
/// Brackets inside quoted strings do not count.
fn find_closing(source: &str, open_offset: usize, open: char, location: &SourceLocation) -> Result<usize> {
    let close = closing(open);
    let mut in_string = false;
    let mut chars = source[open_offset + 1..].char_indices();

    while let Some((offset, c)) = chars.next() {
        let offset = open_offset + 1 + offset;
        match c {
            '\\' if in_string => {
                chars.next();
            }
            '\'' => in_string = !in_string,
            _ if in_string => {}
            c if c == close => return Ok(offset),
            '[' | '{' | ']' | '}' => {
                return Err(Error::parse(
                    ParseErrorKind::MismatchedBracket,
                    location_at(source, offset, location),
                    format!("Unexpected '{c}' inside '{open}{close}'"),
                ))
            }
            _ => {}
        }
    }

    Err(Error::parse(
        ParseErrorKind::MismatchedBracket,
        location_at(source, open_offset, location),
        format!("'{open}' is never closed"),
    ))
}

#[cfg(test)]
mod test {
    use trellis_core::binding::BindingPart;
    use trellis_core::expression::ExpressionContext;
    use trellis_core::testing::test_object;
    use trellis_core::values::{Value, ValueType};

    use super::*;

    fn parse(src: &str) -> Result<Binding> {
        parse_binding(src, &SourceLocation::new(Some("test.ui"), 2, 10))
    }

    fn eval(src: &str) -> Value {
        let context = ExpressionContext::with_scope(test_object());
        parse(src)
            .unwrap()
            .evaluate(ValueType::Any, &context, false)
            .unwrap()
            .into_value()
    }

    #[test]
    fn literal_text() {
        let binding = parse("hello world").unwrap();
        assert!(binding.is_constant());
        assert_eq!(eval("hello world"), Value::from("hello world"));
        assert_eq!(eval(""), Value::from(""));
    }

    #[test]
    fn escapes() {
        assert_eq!(eval(r"a\[b\]\{c\}\\"), Value::from(r"a[b]{c}\"));
    }

    #[test]
    fn single_expression_keeps_its_type() {
        assert_eq!(eval("[value]"), Value::Int(10));
        assert_eq!(eval("[ inner.value ]"), Value::from("string"));
    }

    #[test]
    fn mixed_text() {
        assert_eq!(eval("v=[value], s={inner.value}!"), Value::from("v=10, s=string!"));
    }

    #[test]
    fn two_way_segments() {
        let binding = parse("{value}").unwrap();
        let [BindingPart::Expression { bidirectional, .. }] = binding.parts() else {
            panic!("expected a single expression part");
        };
        assert!(*bidirectional);

        let binding = parse("[value]").unwrap();
        let [BindingPart::Expression { bidirectional, .. }] = binding.parts() else {
            panic!("expected a single expression part");
        };
        assert!(!*bidirectional);
    }

    #[test]
    fn brackets_inside_strings() {
        assert_eq!(eval("['a]b{c']"), Value::from("a]b{c"));
        assert_eq!(eval(r"['it\'s ]']"), Value::from("it's ]"));
    }

    #[test]
    fn mismatched_brackets() {
        for src in ["[value", "[value}", "{value]", "value]", "a}", "[[value]]"] {
            let err = parse(src).unwrap_err();
            assert_eq!(err.parse_kind(), Some(ParseErrorKind::MismatchedBracket), "{src}");
        }
    }

    #[test]
    fn expression_errors_are_located() {
        let err = parse("ab [inner.]").unwrap_err();
        assert_eq!(err.parse_kind(), Some(ParseErrorKind::UnexpectedToken));
        assert_eq!(err.location().map(|l| (l.line(), l.column())), Some((2, 20)));
    }
}
