//! Operator flags of the simple query string syntax.

bitflags::bitflags! {
    /// Operators enabled in a simple query string.
    ///
    /// All operators are enabled by default. A disabled operator is not an
    /// error: its syntax is dropped from the query before parsing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SimpleQueryFlags: u16 {
        /// `+` combines terms with AND.
        const AND = 1 << 0;
        /// `|` combines terms with OR.
        const OR = 1 << 1;
        /// A leading `-` negates a term.
        const NOT = 1 << 2;
        /// `"..."` delimits a phrase.
        const PHRASE = 1 << 3;
        /// `~N` after a phrase sets its slop.
        const NEAR = 1 << 4;
        /// A trailing `*` makes a prefix query.
        const PREFIX = 1 << 5;
        /// `(` and `)` group sub-queries.
        const PRECEDENCE = 1 << 6;
        /// `\` escapes the next character.
        const ESCAPE = 1 << 7;
        /// Whitespace separates terms.
        const WHITESPACE = 1 << 8;
        /// `~N` after a term makes a fuzzy query.
        const FUZZY = 1 << 9;
    }
}

impl Default for SimpleQueryFlags {
    fn default() -> Self {
        Self::all()
    }
}

impl SimpleQueryFlags {
    /// Names of the enabled flags, in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}
