//! Simple query string syntax.
//!
//! | Syntax          | Flag         | Meaning                         |
//! |-----------------|--------------|---------------------------------|
//! | `a + b`         | `AND`        | both terms                      |
//! | `a \| b`        | `OR`         | either term                     |
//! | `-a`            | `NOT`        | documents without the term      |
//! | `"a b"`         | `PHRASE`     | terms in sequence               |
//! | `"a b"~2`       | `NEAR`       | phrase with slop                |
//! | `wor*`          | `PREFIX`     | terms starting with `wor`       |
//! | `word~1`        | `FUZZY`      | terms within an edit distance   |
//! | `(a \| b) + c`  | `PRECEDENCE` | grouping                        |
//! | `a\+b`          | `ESCAPE`     | literal operator character      |
//! | `a b`           | `WHITESPACE` | separate terms                  |
//!
//! Disabled syntax is stripped before parsing (see [`strip_disabled_syntax`]),
//! so a query string never fails to parse.

mod flags;
mod parser;
mod strip;

pub use flags::SimpleQueryFlags;
pub use parser::{
    DEFAULT_FUZZY_EDIT_DISTANCE, MAX_FUZZY_EDIT_DISTANCE, QueryStringNode, parse,
};
pub use strip::strip_disabled_syntax;

use fathom_core::BooleanOperator;

/// Strips disabled syntax from `query`, then parses it.
pub fn parse_with_flags(
    query: &str,
    flags: SimpleQueryFlags,
    default_operator: BooleanOperator,
) -> Option<QueryStringNode> {
    parse(&strip_disabled_syntax(query, flags), flags, default_operator)
}
