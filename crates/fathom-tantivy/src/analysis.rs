//! Tantivy tokenizer pipelines built from the analysis registry.
//!
//! Every registered analyzer becomes a [`TextAnalyzer`] named
//! `fathom_analyzer_<name>`, every normalizer a raw-token pipeline named
//! `fathom_normalizer_<name>`. The same pipelines analyze documents at write
//! time and query text at compile time, so both sides always agree.

use std::collections::HashMap;
use std::sync::Arc;

use fathom_core::{
    AnalysisRegistry, AnalyzerDefinition, DEFAULT_ANALYZER, Error, Result, StopWordLanguage,
    TokenizerKind,
};
use tantivy::tokenizer::{
    Language, LowerCaser, RawTokenizer, SimpleTokenizer, StopWordFilter, TextAnalyzer,
    TokenStream, Tokenizer, TokenizerManager, WhitespaceTokenizer,
};

/// Tantivy's built-in tokenizer keeping the whole value as one token.
pub const RAW_TOKENIZER: &str = "raw";

/// Name of the Tantivy tokenizer implementing analyzer `name`.
pub fn analyzer_tokenizer_name(name: &str) -> String {
    format!("fathom_analyzer_{name}")
}

/// Name of the Tantivy tokenizer implementing normalizer `name`, or the raw
/// tokenizer when there is none.
pub fn normalizer_tokenizer_name(name: Option<&str>) -> String {
    match name {
        Some(name) => format!("fathom_normalizer_{name}"),
        None => RAW_TOKENIZER.to_string(),
    }
}

/// One token of analyzed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    /// Position in the token stream.
    pub position: usize,
    /// Token text.
    pub text: String,
}

/// Analysis pipelines of one backend.
#[derive(Clone)]
pub struct Analyzers {
    registry: Arc<AnalysisRegistry>,
    analyzers: HashMap<String, TextAnalyzer>,
    normalizers: HashMap<String, TextAnalyzer>,
}

impl Analyzers {
    /// Builds one pipeline per analyzer and normalizer of `registry`.
    ///
    /// Fails when an analyzer asks for a stop word language Tantivy has no
    /// list for.
    pub fn from_registry(registry: Arc<AnalysisRegistry>) -> Result<Self> {
        let analyzers = registry
            .analyzers()
            .map(|(name, definition)| {
                let analyzer = match definition.tokenizer() {
                    TokenizerKind::Standard => pipeline(SimpleTokenizer::default(), definition),
                    TokenizerKind::Whitespace => {
                        pipeline(WhitespaceTokenizer::default(), definition)
                    }
                    TokenizerKind::Keyword => pipeline(RawTokenizer::default(), definition),
                }?;
                Ok((name.to_string(), analyzer))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        let normalizers = registry
            .normalizers()
            .map(|(name, definition)| {
                let mut builder = TextAnalyzer::builder(RawTokenizer::default()).dynamic();
                if definition.lowercases() {
                    builder = builder.filter_dynamic(LowerCaser);
                }
                (name.to_string(), builder.build())
            })
            .collect();
        Ok(Self {
            registry,
            analyzers,
            normalizers,
        })
    }

    /// Registers every pipeline with an index.
    pub fn register(&self, manager: &TokenizerManager) {
        for (name, analyzer) in &self.analyzers {
            manager.register(&analyzer_tokenizer_name(name), analyzer.clone());
        }
        for (name, normalizer) in &self.normalizers {
            manager.register(&normalizer_tokenizer_name(Some(name)), normalizer.clone());
        }
        log::debug!(
            "Registered {} analyzers and {} normalizers",
            self.analyzers.len(),
            self.normalizers.len()
        );
    }

    /// Runs analyzer `name` over `text`; `None` selects the default analyzer.
    pub fn tokens(&self, name: Option<&str>, text: &str) -> Result<Vec<AnalyzedToken>> {
        let name = name.unwrap_or(DEFAULT_ANALYZER);
        let mut analyzer = self
            .analyzers
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnresolvableAnalyzerName {
                name: name.to_string(),
            })?;
        let mut tokens = Vec::new();
        let mut stream = analyzer.token_stream(text);
        stream.process(&mut |token| {
            if !token.text.is_empty() {
                tokens.push(AnalyzedToken {
                    position: token.position,
                    text: token.text.clone(),
                });
            }
        });
        Ok(tokens)
    }

    /// Applies the token filters of analyzer `name` to `text` as a whole.
    pub fn normalize_with_analyzer(&self, name: Option<&str>, text: &str) -> Result<String> {
        let name = name.unwrap_or(DEFAULT_ANALYZER);
        Ok(self.registry.resolve_analyzer(name)?.normalize(text))
    }

    /// Applies normalizer `name` to a keyword value; no normalizer keeps it.
    pub fn normalize_keyword(&self, name: Option<&str>, text: &str) -> Result<String> {
        match name {
            None => Ok(text.to_string()),
            Some(name) => self
                .registry
                .normalizer(name)
                .map(|n| n.normalize(text))
                .ok_or_else(|| Error::config(format!("unknown normalizer '{name}'"))),
        }
    }
}

impl std::fmt::Debug for Analyzers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzers")
            .field("analyzers", &self.analyzers.len())
            .field("normalizers", &self.normalizers.len())
            .finish()
    }
}

/// Builds `tokenizer → [lowercase] → [language stop words] → [stop words]`.
fn pipeline<T: Tokenizer>(tokenizer: T, definition: &AnalyzerDefinition) -> Result<TextAnalyzer> {
    let mut builder = TextAnalyzer::builder(tokenizer).dynamic();
    if definition.lowercases() {
        builder = builder.filter_dynamic(LowerCaser);
    }
    if let Some(language) = definition.stop_word_language() {
        let filter = StopWordFilter::new(tantivy_language(language)).ok_or_else(|| {
            Error::config(format!("no built-in stop word list for {language:?}"))
        })?;
        builder = builder.filter_dynamic(filter);
    }
    if !definition.stop_word_list().is_empty() {
        builder = builder.filter_dynamic(StopWordFilter::remove(
            definition.stop_word_list().to_vec(),
        ));
    }
    Ok(builder.build())
}

fn tantivy_language(language: StopWordLanguage) -> Language {
    match language {
        StopWordLanguage::English => Language::English,
        StopWordLanguage::French => Language::French,
        StopWordLanguage::German => Language::German,
        StopWordLanguage::Spanish => Language::Spanish,
    }
}

// ============================================================================
// Tests
// ============================================================================
