//! Removal of disabled operator syntax.
//!
//! Each disabled operator is handled on its own: its token is replaced by a
//! space, so the words around it stay separate terms. Characters inside a
//! quoted phrase are literal and are never touched while phrases are enabled.
//! A backslash is never removed; with escaping disabled it is an ordinary
//! character of the term it belongs to.

use super::flags::SimpleQueryFlags;

/// Flags whose syntax can be stripped.
const STRIPPABLE: SimpleQueryFlags = SimpleQueryFlags::AND
    .union(SimpleQueryFlags::OR)
    .union(SimpleQueryFlags::NOT)
    .union(SimpleQueryFlags::PHRASE)
    .union(SimpleQueryFlags::NEAR)
    .union(SimpleQueryFlags::PREFIX)
    .union(SimpleQueryFlags::PRECEDENCE)
    .union(SimpleQueryFlags::FUZZY);

/// Drops the syntax of every operator disabled in `flags` from `query`.
pub fn strip_disabled_syntax(query: &str, flags: SimpleQueryFlags) -> String {
    if flags.contains(STRIPPABLE) {
        return query.to_string();
    }

    let chars: Vec<char> = query.chars().collect();
    let escape = flags.contains(SimpleQueryFlags::ESCAPE);
    let mut out = String::with_capacity(query.len());
    let mut at_term_start = true;
    let mut after_term = false;
    let mut after_phrase = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' if escape => {
                out.push(c);
                if let Some(&next) = chars.get(i + 1) {
                    out.push(next);
                    i += 1;
                }
                at_term_start = false;
                after_term = true;
                after_phrase = false;
            }
            '"' => {
                let closing = if flags.contains(SimpleQueryFlags::PHRASE) {
                    closing_quote(&chars, i + 1, escape)
                } else {
                    None
                };
                match closing {
                    Some(end) => {
                        out.extend(&chars[i..=end]);
                        i = end;
                        after_phrase = true;
                    }
                    None => {
                        out.push(kept(c, flags, SimpleQueryFlags::PHRASE));
                        after_phrase = false;
                    }
                }
                at_term_start = closing.is_none();
                after_term = false;
            }
            '+' | '|' | '(' | ')' => {
                let flag = match c {
                    '+' => SimpleQueryFlags::AND,
                    '|' => SimpleQueryFlags::OR,
                    _ => SimpleQueryFlags::PRECEDENCE,
                };
                out.push(kept(c, flags, flag));
                at_term_start = true;
                after_term = false;
                after_phrase = false;
            }
            '-' if at_term_start => {
                out.push(kept(c, flags, SimpleQueryFlags::NOT));
            }
            '~' if after_term || after_phrase => {
                let flag = if after_phrase {
                    SimpleQueryFlags::NEAR
                } else {
                    SimpleQueryFlags::FUZZY
                };
                let mut end = i + 1;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                if flags.contains(flag) {
                    out.extend(&chars[i..end]);
                } else {
                    out.push(' ');
                }
                i = end;
                at_term_start = true;
                after_term = false;
                after_phrase = false;
                continue;
            }
            '*' if after_term && ends_token(chars.get(i + 1)) => {
                out.push(kept(c, flags, SimpleQueryFlags::PREFIX));
                after_term = false;
            }
            c if c.is_whitespace() => {
                out.push(c);
                at_term_start = true;
                after_term = false;
                after_phrase = false;
            }
            c => {
                out.push(c);
                at_term_start = false;
                after_term = true;
                after_phrase = false;
            }
        }
        i += 1;
    }

    out
}

/// `c` if `flag` is enabled, otherwise a separating space.
fn kept(c: char, flags: SimpleQueryFlags, flag: SimpleQueryFlags) -> char {
    if flags.contains(flag) { c } else { ' ' }
}

/// Index of the quote closing a phrase whose content starts at `from`.
pub(crate) fn closing_quote(chars: &[char], from: usize, escape: bool) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        match chars[i] {
            '\\' if escape => i += 2,
            '"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn ends_token(next: Option<&char>) -> bool {
    match next {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '+' | '|' | '(' | ')' | '"'),
    }
}

// ============================================================================
// Tests
// ============================================================================
