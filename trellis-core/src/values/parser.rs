use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::RwLock;

use super::{Value, ValueType};
use crate::error::{Error, Result, ValueParserErrorKind};

static DEFAULT_PARSER: OnceLock<ValueParser> = OnceLock::new();

pub type ParseFn = fn(&str) -> Result<Value>;

/// Turns text (and values of other types) into values of a requested type.
pub struct ValueParser {
    parsers: RwLock<HashMap<ValueType, ParseFn>>,
}

impl ValueParser {
    pub fn new() -> Self {
        Self {
            parsers: RwLock::new(HashMap::new()),
        }
    }

    /// Parser with the bool, int and float parsers registered.
    pub fn with_defaults() -> Self {
        let parser = Self::new();
        parser.register(ValueType::Bool, parse_bool);
        parser.register(ValueType::Int, parse_int);
        parser.register(ValueType::Float, parse_float);
        parser
    }

    /// The process-wide parser used by [`Value::convert`].
    pub fn global() -> &'static ValueParser {
        DEFAULT_PARSER.get_or_init(Self::with_defaults)
    }

    pub fn register(&self, value_type: ValueType, parse: ParseFn) {
        self.parsers.write().insert(value_type, parse);
    }

    pub fn try_parse(&self, text: &str, value_type: ValueType) -> Result<Value> {
        if matches!(value_type, ValueType::String | ValueType::Any) {
            return Ok(Value::String(text.to_string()));
        }

        let parse = self.parsers.read().get(&value_type).copied();
        match parse {
            Some(parse) => parse(text),
            None => Err(no_match(ValueType::String, value_type)),
        }
    }

    pub fn try_transform(&self, value: Value, value_type: ValueType) -> Result<Value> {
        if value_type == ValueType::Any || value.value_type() == value_type {
            return Ok(value);
        }

        match (value, value_type) {
            (Value::Int(i), ValueType::Float) => Ok(Value::Float(i as f64)),
            (Value::Float(f), ValueType::Int) if f.fract() == 0.0 => Ok(Value::Int(f as i64)),
            (Value::Bool(b), ValueType::Int) => Ok(Value::Int(b as i64)),
            (Value::Int(i), ValueType::Bool) => Ok(Value::Bool(i != 0)),
            (Value::Empty, ValueType::Object) => Ok(Value::Empty),
            (value @ (Value::Empty | Value::Bool(_) | Value::Int(_) | Value::Float(_)), ValueType::String) => {
                Ok(Value::String(value.to_string()))
            }
            (Value::String(text), value_type) => self.try_parse(&text, value_type),
            (value, value_type) => Err(no_match(value.value_type(), value_type)),
        }
    }
}

impl Default for ValueParser {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn no_match(from: ValueType, to: ValueType) -> Error {
    Error::ValueParser {
        kind: ValueParserErrorKind::NoMatch,
        message: format!("Type '{to}' cannot be produced from '{from}'"),
    }
}

fn bad_value(text: &str, value_type: ValueType) -> Error {
    Error::ValueParser {
        kind: ValueParserErrorKind::BadValue,
        message: format!("'{text}' is not a valid {value_type}"),
    }
}

fn parse_bool(text: &str) -> Result<Value> {
    match text.trim() {
        "true" | "yes" | "1" => Ok(Value::Bool(true)),
        "false" | "no" | "0" => Ok(Value::Bool(false)),
        _ => Err(bad_value(text, ValueType::Bool)),
    }
}

fn parse_int(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let parsed = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    };

    match parsed {
        Ok(i) if negative => Ok(Value::Int(-i)),
        Ok(i) => Ok(Value::Int(i)),
        Err(_) => Err(bad_value(text, ValueType::Int)),
    }
}

fn parse_float(text: &str) -> Result<Value> {
    text.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| bad_value(text, ValueType::Float))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_registered_types() {
        let parser = ValueParser::with_defaults();
        assert_eq!(parser.try_parse("true", ValueType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(parser.try_parse("-0x10", ValueType::Int).unwrap(), Value::Int(-16));
        assert_eq!(parser.try_parse("2.5", ValueType::Float).unwrap(), Value::Float(2.5));
        assert_eq!(parser.try_parse("x", ValueType::String).unwrap(), Value::from("x"));
    }

    #[test]
    fn bad_value_and_no_match() {
        let parser = ValueParser::with_defaults();
        let Err(Error::ValueParser { kind, .. }) = parser.try_parse("abc", ValueType::Int) else {
            panic!("expected a parser error")
        };
        assert_eq!(kind, ValueParserErrorKind::BadValue);

        let parser = ValueParser::new();
        let Err(Error::ValueParser { kind, .. }) = parser.try_parse("1", ValueType::Int) else {
            panic!("expected a parser error")
        };
        assert_eq!(kind, ValueParserErrorKind::NoMatch);
    }

    #[test]
    fn transform() {
        let parser = ValueParser::with_defaults();
        assert_eq!(parser.try_transform(Value::Int(2), ValueType::Float).unwrap(), Value::Float(2.0));
        assert_eq!(parser.try_transform(Value::Int(2), ValueType::String).unwrap(), Value::from("2"));
        assert_eq!(parser.try_transform(Value::from("12"), ValueType::Int).unwrap(), Value::Int(12));
        assert!(parser.try_transform(Value::Float(1.5), ValueType::Int).is_err());
        assert!(parser.try_transform(Value::Bool(true), ValueType::Object).is_err());
    }

    #[test]
    fn custom_parser() {
        fn shouty(text: &str) -> Result<Value> {
            Ok(Value::Bool(text == "YES"))
        }

        let parser = ValueParser::new();
        parser.register(ValueType::Bool, shouty);
        assert_eq!(parser.try_parse("YES", ValueType::Bool).unwrap(), Value::Bool(true));
    }
}
