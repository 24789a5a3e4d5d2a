//! Named analyzers and normalizers.
//!
//! The registry only describes analysis chains; backends turn the
//! definitions into their own tokenizer pipelines. An explicit analyzer
//! override in a predicate must name an entry of this registry.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Name of the analyzer that keeps the whole input as a single token.
///
/// Skipping analysis on a text predicate is implemented as an override to
/// this analyzer.
pub const KEYWORD_ANALYZER: &str = "keyword";

/// Name of the analyzer used when a text field does not declare one.
pub const DEFAULT_ANALYZER: &str = "default";

/// A stop word list shipped with the search engine.
///
/// Backends resolve the marker to their own list for the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopWordLanguage {
    /// English.
    English,
    /// French.
    French,
    /// German.
    German,
    /// Spanish.
    Spanish,
}

/// How an analyzer splits its input into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenizerKind {
    /// Splits on any non alphanumeric character.
    Standard,
    /// Splits on whitespace only.
    Whitespace,
    /// Emits the whole input as one token.
    Keyword,
}

/// An analysis chain: a tokenizer followed by token filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerDefinition {
    tokenizer: TokenizerKind,
    lowercase: bool,
    stop_language: Option<StopWordLanguage>,
    stop_words: Vec<String>,
}

impl AnalyzerDefinition {
    /// Creates a chain with the given tokenizer and no filters.
    pub fn new(tokenizer: TokenizerKind) -> Self {
        Self {
            tokenizer,
            lowercase: false,
            stop_language: None,
            stop_words: Vec::new(),
        }
    }

    /// Adds a lowercase filter.
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    /// Adds the built-in stop word filter of `language`.
    pub fn language_stop_words(mut self, language: StopWordLanguage) -> Self {
        self.stop_language = Some(language);
        self
    }

    /// Adds a stop word filter with an explicit word list.
    pub fn stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words.extend(words.into_iter().map(Into::into));
        self
    }

    /// The tokenizer of this chain.
    pub fn tokenizer(&self) -> TokenizerKind {
        self.tokenizer
    }

    /// Whether tokens are lowercased.
    pub fn lowercases(&self) -> bool {
        self.lowercase
    }

    /// Language of the built-in stop word list removed by this chain.
    pub fn stop_word_language(&self) -> Option<StopWordLanguage> {
        self.stop_language
    }

    /// Explicit stop words removed by this chain, in declaration order.
    pub fn stop_word_list(&self) -> &[String] {
        &self.stop_words
    }

    /// Applies the token-level filters to `text` without tokenizing it.
    ///
    /// Prefix and fuzzy terms are normalized this way: they must keep their
    /// shape, but their case must match the indexed terms.
    pub fn normalize(&self, text: &str) -> String {
        if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        }
    }
}

/// A normalizer: filters applied to a keyword value as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizerDefinition {
    lowercase: bool,
}

impl NormalizerDefinition {
    /// A normalizer that lowercases its input.
    pub fn lowercase() -> Self {
        Self { lowercase: true }
    }

    /// Whether values are lowercased.
    pub fn lowercases(&self) -> bool {
        self.lowercase
    }

    /// Normalizes a keyword value.
    pub fn normalize(&self, text: &str) -> String {
        if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        }
    }
}

/// Registry of named analyzers and normalizers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRegistry {
    analyzers: BTreeMap<String, AnalyzerDefinition>,
    normalizers: BTreeMap<String, NormalizerDefinition>,
}

impl Default for AnalysisRegistry {
    fn default() -> Self {
        let standard = AnalyzerDefinition::new(TokenizerKind::Standard).lowercase();
        Self::empty()
            .with_analyzer(DEFAULT_ANALYZER, standard.clone())
            .with_analyzer("standard", standard.clone())
            .with_analyzer(
                "standard_english",
                standard.language_stop_words(StopWordLanguage::English),
            )
            .with_analyzer(
                "whitespace",
                AnalyzerDefinition::new(TokenizerKind::Whitespace),
            )
            .with_analyzer(
                "whitespace_lowercase",
                AnalyzerDefinition::new(TokenizerKind::Whitespace).lowercase(),
            )
            .with_normalizer("lowercase", NormalizerDefinition::lowercase())
    }
}

impl AnalysisRegistry {
    /// A registry holding only the keyword analyzer.
    pub fn empty() -> Self {
        let mut analyzers = BTreeMap::new();
        analyzers.insert(
            KEYWORD_ANALYZER.to_string(),
            AnalyzerDefinition::new(TokenizerKind::Keyword),
        );
        Self {
            analyzers,
            normalizers: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) an analyzer.
    pub fn with_analyzer(mut self, name: impl Into<String>, definition: AnalyzerDefinition) -> Self {
        self.analyzers.insert(name.into(), definition);
        self
    }

    /// Registers (or replaces) a normalizer.
    pub fn with_normalizer(
        mut self,
        name: impl Into<String>,
        definition: NormalizerDefinition,
    ) -> Self {
        self.normalizers.insert(name.into(), definition);
        self
    }

    /// Looks up an analyzer.
    pub fn analyzer(&self, name: &str) -> Option<&AnalyzerDefinition> {
        self.analyzers.get(name)
    }

    /// Looks up a normalizer.
    pub fn normalizer(&self, name: &str) -> Option<&NormalizerDefinition> {
        self.normalizers.get(name)
    }

    /// Looks up an analyzer named by a predicate override.
    pub fn resolve_analyzer(&self, name: &str) -> Result<&AnalyzerDefinition> {
        self.analyzer(name)
            .ok_or_else(|| Error::UnresolvableAnalyzerName {
                name: name.to_string(),
            })
    }

    /// All analyzers, sorted by name.
    pub fn analyzers(&self) -> impl Iterator<Item = (&str, &AnalyzerDefinition)> {
        self.analyzers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All normalizers, sorted by name.
    pub fn normalizers(&self) -> impl Iterator<Item = (&str, &NormalizerDefinition)> {
        self.normalizers.iter().map(|(k, v)| (k.as_str(), v))
    }
}
