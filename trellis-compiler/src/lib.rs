//! Text syntax for expressions and bindings.
use trellis_core::location::SourceLocation;

pub use self::binding::parse_binding;
pub use self::parser::parse_expression;

mod binding;
mod lexer;
mod parser;

/// Location of the byte `offset` of `source`, where `source` starts at `base`.
pub(crate) fn location_at(source: &str, offset: usize, base: &SourceLocation) -> SourceLocation {
    let before = &source[..offset];
    let lines = before.matches('\n').count();
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let columns = before[line_start..].chars().count();
    base.offset(lines as u32, columns as u32)
}
