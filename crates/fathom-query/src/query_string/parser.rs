//! Parser for the simple query string syntax.
//!
//! The syntax is deliberately forgiving: there is no parse error. Operators
//! apply left to right, so `a + b | c` reads as `(a AND b) OR c`, and bare
//! terms are joined by the default operator.

use fathom_core::BooleanOperator;

use super::flags::SimpleQueryFlags;
use super::strip::closing_quote;

/// Edit distance used for `term~` without digits.
pub const DEFAULT_FUZZY_EDIT_DISTANCE: u8 = 2;

/// Largest edit distance a fuzzy term may request.
pub const MAX_FUZZY_EDIT_DISTANCE: u8 = 2;

/// A parsed simple query string.
///
/// Leaves hold raw text: analysis is the backend's job, because only the
/// backend knows the analyzer attached to each target field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStringNode {
    /// A term to analyze.
    Term(String),
    /// A prefix, without its trailing `*`.
    Prefix(String),
    /// A term matched within an edit distance.
    Fuzzy {
        /// Term text.
        term: String,
        /// Maximum edit distance, at most [`MAX_FUZZY_EDIT_DISTANCE`].
        max_edit_distance: u8,
    },
    /// A phrase to analyze.
    Phrase {
        /// Phrase text, without quotes.
        text: String,
        /// Allowed position moves.
        slop: u32,
    },
    /// Documents not matching the inner node.
    Not(Box<QueryStringNode>),
    /// Documents matching every clause.
    And(Vec<QueryStringNode>),
    /// Documents matching any clause.
    Or(Vec<QueryStringNode>),
}

/// Parses `query`, returning `None` when it holds no term at all.
pub fn parse(
    query: &str,
    flags: SimpleQueryFlags,
    default_operator: BooleanOperator,
) -> Option<QueryStringNode> {
    let mut parser = Parser {
        chars: query.chars().collect(),
        pos: 0,
        flags,
        default_operator,
    };
    parser.parse_sequence(false)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    flags: SimpleQueryFlags,
    default_operator: BooleanOperator,
}

/// Accumulated state of one operator sequence.
#[derive(Default)]
struct Sequence {
    top: Option<QueryStringNode>,
    operator: Option<BooleanOperator>,
    previous: Option<BooleanOperator>,
    negations: usize,
}

impl Sequence {
    fn attach(&mut self, branch: Option<QueryStringNode>, default_operator: BooleanOperator) {
        let Some(mut branch) = branch else {
            return;
        };
        if self.negations % 2 == 1 {
            branch = QueryStringNode::Not(Box::new(branch));
        }
        self.negations = 0;

        let Some(top) = self.top.take() else {
            self.top = Some(branch);
            self.operator = None;
            return;
        };

        let operator = self.operator.take().unwrap_or(default_operator);
        let same = self.previous == Some(operator);
        self.top = Some(match (top, operator) {
            (QueryStringNode::And(mut clauses), BooleanOperator::And) if same => {
                clauses.push(branch);
                QueryStringNode::And(clauses)
            }
            (QueryStringNode::Or(mut clauses), BooleanOperator::Or) if same => {
                clauses.push(branch);
                QueryStringNode::Or(clauses)
            }
            (top, BooleanOperator::And) => QueryStringNode::And(vec![top, branch]),
            (top, BooleanOperator::Or) => QueryStringNode::Or(vec![top, branch]),
        });
        self.previous = Some(operator);
    }
}

impl Parser {
    fn enabled(&self, flag: SimpleQueryFlags) -> bool {
        self.flags.contains(flag)
    }

    fn parse_sequence(&mut self, nested: bool) -> Option<QueryStringNode> {
        let mut sequence = Sequence::default();

        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            let precedence = self.enabled(SimpleQueryFlags::PRECEDENCE);

            if c == '(' && precedence {
                self.pos += 1;
                let group = self.parse_sequence(true);
                sequence.attach(group, self.default_operator);
            } else if c == ')' && precedence {
                self.pos += 1;
                if nested {
                    break;
                }
            } else if c == '"' && self.enabled(SimpleQueryFlags::PHRASE) {
                let phrase = self.consume_phrase();
                sequence.attach(phrase, self.default_operator);
            } else if c == '+' && self.enabled(SimpleQueryFlags::AND) {
                self.pos += 1;
                sequence.operator = Some(BooleanOperator::And);
            } else if c == '|' && self.enabled(SimpleQueryFlags::OR) {
                self.pos += 1;
                sequence.operator = Some(BooleanOperator::Or);
            } else if c == '-' && self.enabled(SimpleQueryFlags::NOT) {
                self.pos += 1;
                sequence.negations += 1;
            } else if c.is_whitespace() && self.enabled(SimpleQueryFlags::WHITESPACE) {
                self.pos += 1;
            } else {
                let token = self.consume_token();
                sequence.attach(token, self.default_operator);
            }
        }

        sequence.top
    }

    fn consume_phrase(&mut self) -> Option<QueryStringNode> {
        let escape = self.enabled(SimpleQueryFlags::ESCAPE);
        let start = self.pos + 1;
        let Some(end) = closing_quote(&self.chars, start, escape) else {
            // Unterminated: the quote only separates terms.
            self.pos += 1;
            return None;
        };

        let mut text = String::new();
        let mut i = start;
        while i < end {
            if escape && self.chars[i] == '\\' && i + 1 < end {
                i += 1;
            }
            text.push(self.chars[i]);
            i += 1;
        }
        self.pos = end + 1;

        let mut slop = 0;
        if self.enabled(SimpleQueryFlags::NEAR) && self.peek() == Some('~') {
            self.pos += 1;
            slop = self.consume_number().unwrap_or(0);
        }

        if text.trim().is_empty() {
            return None;
        }
        Some(QueryStringNode::Phrase { text, slop })
    }

    fn consume_token(&mut self) -> Option<QueryStringNode> {
        let escape = self.enabled(SimpleQueryFlags::ESCAPE);
        let fuzzy = self.enabled(SimpleQueryFlags::FUZZY);
        let mut text = String::new();
        let mut last_escaped = false;

        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            if escape && c == '\\' {
                self.pos += 1;
                if let Some(next) = self.peek() {
                    text.push(next);
                    self.pos += 1;
                    last_escaped = true;
                }
                continue;
            }
            if self.ends_token(c) || (fuzzy && c == '~') {
                break;
            }
            text.push(c);
            last_escaped = false;
            self.pos += 1;
        }

        let mut edit_distance = None;
        if fuzzy && self.peek() == Some('~') {
            self.pos += 1;
            let requested = self
                .consume_number()
                .map_or(DEFAULT_FUZZY_EDIT_DISTANCE, |n| {
                    u8::try_from(n).unwrap_or(MAX_FUZZY_EDIT_DISTANCE)
                });
            edit_distance = Some(requested.min(MAX_FUZZY_EDIT_DISTANCE));
        }

        if text.is_empty() {
            return None;
        }

        if let Some(max_edit_distance) = edit_distance {
            if max_edit_distance == 0 {
                return Some(QueryStringNode::Term(text));
            }
            return Some(QueryStringNode::Fuzzy {
                term: text,
                max_edit_distance,
            });
        }

        if self.enabled(SimpleQueryFlags::PREFIX) && !last_escaped && text.ends_with('*') {
            text.pop();
            if text.is_empty() {
                return None;
            }
            return Some(QueryStringNode::Prefix(text));
        }

        Some(QueryStringNode::Term(text))
    }

    fn ends_token(&self, c: char) -> bool {
        (c == '"' && self.enabled(SimpleQueryFlags::PHRASE))
            || (c == '|' && self.enabled(SimpleQueryFlags::OR))
            || (c == '+' && self.enabled(SimpleQueryFlags::AND))
            || ((c == '(' || c == ')') && self.enabled(SimpleQueryFlags::PRECEDENCE))
            || (c.is_whitespace() && self.enabled(SimpleQueryFlags::WHITESPACE))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn consume_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        Some(digits.parse().unwrap_or(u32::MAX))
    }
}

// ============================================================================
// Tests
// ============================================================================
