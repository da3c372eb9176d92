//! Cross-script team name resolution.
//!
//! Lookup order: static dictionary, then the translation collaborator
//! (memoized), then the input unchanged. The result is only a matching key.

use tracing::debug;

use super::normalize::Script;
use super::translate::{CachedTranslator, Translate};
use crate::cache::TeamDictionary;

/// Where a resolved name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    Dictionary,
    Translator,
    /// Nothing better was available; the input is returned as-is
    Original,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub text: String,
    pub source: NameSource,
}

/// Bridges team names between the two scripts.
pub struct NameResolver {
    dictionary: TeamDictionary,
    translator: Option<CachedTranslator<Box<dyn Translate>>>,
}

impl NameResolver {
    /// Dictionary-only resolver
    pub fn new(dictionary: TeamDictionary) -> Self {
        Self {
            dictionary,
            translator: None,
        }
    }

    /// Attach a translation adapter. It is wrapped in a per-run memo.
    pub fn with_translator(mut self, translator: Box<dyn Translate>) -> Self {
        self.translator = Some(CachedTranslator::new(translator));
        self
    }

    pub fn has_translator(&self) -> bool {
        self.translator.is_some()
    }

    /// Calls that reached the translation adapter (memo misses)
    pub fn translator_invocations(&self) -> usize {
        self.translator
            .as_ref()
            .map(|t| t.invocations())
            .unwrap_or(0)
    }

    pub fn dictionary(&self) -> &TeamDictionary {
        &self.dictionary
    }

    /// Best-effort equivalent of `name` in the other script. Never fails.
    pub fn to_other_script(&self, name: &str) -> String {
        self.resolve(name).text
    }

    pub fn resolve(&self, name: &str) -> ResolvedName {
        let trimmed = name.trim();
        let original = ResolvedName {
            text: trimmed.to_string(),
            source: NameSource::Original,
        };
        if trimmed.is_empty() || !trimmed.chars().any(|c| c.is_alphabetic()) {
            return original;
        }

        if let Some(found) = self.dictionary.lookup(trimmed) {
            return ResolvedName {
                text: found.to_string(),
                source: NameSource::Dictionary,
            };
        }

        let Some(translator) = &self.translator else {
            return original;
        };

        let source = Script::detect(trimmed);
        match translator.translate(trimmed, source, source.other()) {
            Ok(translated) => {
                let translated = translated.trim();
                if translated.is_empty() || translated == trimmed {
                    original
                } else {
                    ResolvedName {
                        text: translated.to_string(),
                        source: NameSource::Translator,
                    }
                }
            }
            Err(e) => {
                debug!("using original name {:?}: {:#}", trimmed, e);
                original
            }
        }
    }
}
