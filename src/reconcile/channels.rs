//! Broadcaster name canonicalization.
//!
//! Free-text channel mentions ("beIN Sports1", "BEIN SPORTS HD 1",
//! "bein sports  1 (geo)") are collapsed onto stable keys (`bein-1`) by one
//! ordered rule table. First match wins:
//!
//! 1. Clean display cosmetics (emoji, bracketed geo/online tags, glued "HD")
//! 2. Family patterns, each optionally capturing a channel number
//! 3. Curated allow-list fragments (substring on the folded alphanumeric form)
//! 4. Everything else is rejected
//!
//! Family patterns run before the allow-list because a flagship name can also
//! contain a generic fragment.

use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::normalize::{collapse_whitespace, is_pictograph};
use super::types::CanonicalChannel;

/// Placeholder for the captured channel number in display templates.
const NUMBER_PLACEHOLDER: &str = "{n}";

/// Bracketed tags that carry no identity ("(geo)", "[online]", "(HD)").
const COSMETIC_TAGS: &[&str] = &[
    "geo", "geo/r", "r", "online", "live", "backup", "multi", "web", "stream", "hd", "fhd",
    "uhd", "sd", "4k", "audio", "eng", "en", "ar", "arabic",
];

/// Picture-quality suffixes ignored when deriving allow-list keys.
const QUALITY_SUFFIXES: &[&str] = &["hd", "fhd", "uhd", "sd", "4k", "hevc"];

/// One row of the broadcaster rule table, as stored in the JSON config.
///
/// A pattern with a named group `n` is a numbered family: its display template
/// must contain `{n}` and the key becomes `<key>-<n>`. A pattern without that
/// group is a fixed broadcaster with a single key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRuleSpec {
    /// Stable key (or key prefix for numbered families)
    pub key: String,
    /// Display name (template for numbered families)
    pub display: String,
    /// Regex matched against the lowercased, cleaned mention
    pub pattern: String,
    /// Number assumed when the mention has none (unnumbered form is an alias of it)
    #[serde(default)]
    pub default_number: Option<u32>,
    /// Inclusive range of channel numbers that exist; others are rejected
    #[serde(default)]
    pub numbers: Option<[u32; 2]>,
}

/// Versioned, human-editable broadcaster configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub version: u32,
    /// Ordered family rules (first match wins)
    pub families: Vec<ChannelRuleSpec>,
    /// Name fragments accepted verbatim when no family matches
    pub allowed_fragments: Vec<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            version: 1,
            families: build_default_families(),
            allowed_fragments: [
                "Al Kass",
                "Shahid",
                "On Time Sports",
                "Dubai Sports",
                "Sharjah Sports",
                "KSA Sports",
                "Arryadia",
                "Iraqi Sports",
                "Oman Sports",
                "Kuwait Sport",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ChannelConfig {
    /// Load the rule table from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading channel rules from {}", path.display()))?;
        let config: ChannelConfig = serde_json::from_str(&contents)
            .with_context(|| format!("parsing channel rules in {}", path.display()))?;
        tracing::debug!(
            version = config.version,
            families = config.families.len(),
            fragments = config.allowed_fragments.len(),
            "Loaded channel rules"
        );
        Ok(config)
    }

    /// Save the rule table as pretty JSON.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum RuleKind {
    Fixed,
    Numbered {
        default_number: Option<u32>,
        range: Option<(u32, u32)>,
    },
}

#[derive(Debug, Clone)]
struct ChannelRule {
    key: String,
    display: String,
    pattern: Regex,
    kind: RuleKind,
}

impl ChannelRule {
    fn compile(spec: &ChannelRuleSpec) -> Result<Self> {
        let pattern = Regex::new(&spec.pattern)
            .with_context(|| format!("invalid pattern for channel family '{}'", spec.key))?;
        let numbered = pattern.capture_names().flatten().any(|name| name == "n");
        let has_placeholder = spec.display.contains(NUMBER_PLACEHOLDER);

        if spec.key.trim().is_empty() {
            bail!("channel family with pattern '{}' has an empty key", spec.pattern);
        }
        if numbered != has_placeholder {
            bail!(
                "channel family '{}': display '{}' must contain {} exactly when the pattern captures (?P<n>...)",
                spec.key,
                spec.display,
                NUMBER_PLACEHOLDER
            );
        }
        if let Some([lo, hi]) = spec.numbers {
            if lo > hi {
                bail!("channel family '{}': empty number range {}..={}", spec.key, lo, hi);
            }
        }

        let kind = if numbered {
            RuleKind::Numbered {
                default_number: spec.default_number,
                range: spec.numbers.map(|[lo, hi]| (lo, hi)),
            }
        } else {
            RuleKind::Fixed
        };

        Ok(Self {
            key: spec.key.clone(),
            display: spec.display.clone(),
            pattern,
            kind,
        })
    }

    /// Build the canonical channel for a pattern hit. `None` means the family
    /// matched but the number is not one of its channels.
    fn resolve(&self, caps: &Captures<'_>) -> Option<CanonicalChannel> {
        let (default_number, range) = match &self.kind {
            RuleKind::Fixed => {
                return Some(CanonicalChannel {
                    key: self.key.clone(),
                    display_name: self.display.clone(),
                    family: Some(self.key.clone()),
                    number: None,
                })
            }
            RuleKind::Numbered {
                default_number,
                range,
            } => (*default_number, *range),
        };

        let number = match caps.name("n") {
            Some(m) => Some(m.as_str().parse::<u32>().ok()?),
            None => default_number,
        };

        match number {
            Some(n) => {
                if let Some((lo, hi)) = range {
                    if n < lo || n > hi {
                        return None;
                    }
                }
                Some(CanonicalChannel {
                    key: format!("{}-{}", self.key, n),
                    display_name: self.display.replace(NUMBER_PLACEHOLDER, &n.to_string()),
                    family: Some(self.key.clone()),
                    number: Some(n),
                })
            }
            None => Some(CanonicalChannel {
                key: self.key.clone(),
                display_name: collapse_whitespace(&self.display.replace(NUMBER_PLACEHOLDER, "")),
                family: Some(self.key.clone()),
                number: None,
            }),
        }
    }
}

/// Maps free-text broadcaster mentions to canonical channels.
///
/// Built once from a [`ChannelConfig`]; read-only afterwards.
#[derive(Debug, Clone)]
pub struct ChannelCanonicalizer {
    rules: Vec<ChannelRule>,
    fragments: Vec<String>,
}

impl ChannelCanonicalizer {
    pub fn new(config: &ChannelConfig) -> Result<Self> {
        let rules = config
            .families
            .iter()
            .map(ChannelRule::compile)
            .collect::<Result<Vec<_>>>()?;

        let mut fragments: Vec<String> = config
            .allowed_fragments
            .iter()
            .map(|f| fragment_key(f))
            .filter(|f| !f.is_empty())
            .collect();
        fragments.sort();
        fragments.dedup();

        Ok(Self { rules, fragments })
    }

    /// Canonicalizer over the built-in rule table.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&ChannelConfig::default())
    }

    /// Canonicalize one mention, or `None` if it is not an allowed broadcaster.
    pub fn canonicalize(&self, mention: &str) -> Option<CanonicalChannel> {
        let cleaned = clean_display(mention);
        if cleaned.is_empty() {
            return None;
        }

        let folded = match_form(&cleaned);
        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(&folded) {
                return rule.resolve(&caps);
            }
        }

        let key = fragment_key(&cleaned);
        if key.is_empty() {
            return None;
        }
        if self.fragments.iter().any(|fragment| key.contains(fragment.as_str())) {
            return Some(CanonicalChannel {
                key,
                display_name: cleaned,
                family: None,
                number: None,
            });
        }

        None
    }

    /// Canonicalize a channel the primary feed declared itself. Recognized
    /// names get their canonical form; anything else is kept as its own key
    /// with the cleaned text as display. Only blank input yields `None`.
    pub fn canonicalize_declared(&self, mention: &str) -> Option<CanonicalChannel> {
        if let Some(channel) = self.canonicalize(mention) {
            return Some(channel);
        }
        let cleaned = clean_display(mention);
        let key = fragment_key(&cleaned);
        if key.is_empty() {
            return None;
        }
        Some(CanonicalChannel {
            key,
            display_name: cleaned,
            family: None,
            number: None,
        })
    }

    /// Canonicalize a list of mentions, keeping accepted channels in order and
    /// dropping later duplicates of a key.
    pub fn canonicalize_all<'a, I>(&self, mentions: I) -> Vec<CanonicalChannel>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut out: Vec<CanonicalChannel> = Vec::new();
        for mention in mentions {
            if let Some(channel) = self.canonicalize(mention) {
                if !out.iter().any(|c| c.key == channel.key) {
                    out.push(channel);
                }
            }
        }
        out
    }

    pub fn family_count(&self) -> usize {
        self.rules.len()
    }
}

/// Remove display cosmetics without touching identity: emoji, cosmetic
/// bracketed tags, glued "HD" suffixes, redundant whitespace.
///
/// Idempotent: cleaning a cleaned string returns it unchanged.
pub fn clean_display(mention: &str) -> String {
    let without_pictographs: String = mention.chars().filter(|c| !is_pictograph(*c)).collect();

    let without_tags = bracket_re().replace_all(&without_pictographs, |caps: &Captures<'_>| {
        let inner = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim().to_lowercase())
            .unwrap_or_default();
        if COSMETIC_TAGS.contains(&inner.as_str()) {
            " ".to_string()
        } else {
            caps[0].to_string()
        }
    });

    let spaced = glued_quality_re().replace_all(&without_tags, "$1 $2");
    let spaced = trailing_quality_re().replace(&spaced, "$1 $2");

    collapse_whitespace(&spaced)
        .trim_matches(|c: char| c == '-' || c == '|' || c == ',' || c.is_whitespace())
        .to_string()
}

/// Lowercased text the family patterns run against: marks stripped,
/// Arabic-Indic digits folded to ASCII, punctuation other than `+ ! . -`
/// turned into spaces.
fn match_form(cleaned: &str) -> String {
    let folded: String = cleaned
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
            '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
            _ => c,
        })
        .collect::<String>()
        .to_lowercase();

    let kept: String = folded
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || matches!(c, '+' | '!' | '.' | '-') {
                c
            } else {
                ' '
            }
        })
        .collect();

    collapse_whitespace(&kept)
}

/// Key for allow-listed and declared channels: the match form with quality
/// suffixes dropped and only letters and digits kept. Unlike team names,
/// channel names keep their articles ("Al Kass" and "Alkass" are one key).
fn fragment_key(cleaned: &str) -> String {
    match_form(&strip_quality_suffix(cleaned))
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn strip_quality_suffix(cleaned: &str) -> String {
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while tokens.len() > 1 {
        let last = tokens[tokens.len() - 1].to_lowercase();
        if QUALITY_SUFFIXES.contains(&last.as_str()) {
            tokens.pop();
        } else {
            break;
        }
    }
    tokens.join(" ")
}

fn bracket_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^()]*)\)|\[([^\[\]]*)\]").expect("static bracket pattern"))
}

/// "1HD" -> "1 HD"
fn glued_quality_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d)(f?hd|uhd)\b").expect("static quality pattern"))
}

/// "masrHD" -> "masr HD", only at the very end of the mention
fn trailing_quality_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z])(HD)$").expect("static trailing quality pattern"))
}

/// Helper to add a numbered family row
fn numbered(
    key: &str,
    display: &str,
    pattern: &str,
    default_number: Option<u32>,
    numbers: [u32; 2],
) -> ChannelRuleSpec {
    ChannelRuleSpec {
        key: key.to_string(),
        display: display.to_string(),
        pattern: pattern.to_string(),
        default_number,
        numbers: Some(numbers),
    }
}

/// Helper to add a fixed broadcaster row
fn fixed(key: &str, display: &str, pattern: &str) -> ChannelRuleSpec {
    ChannelRuleSpec {
        key: key.to_string(),
        display: display.to_string(),
        pattern: pattern.to_string(),
        default_number: None,
        numbers: None,
    }
}

/// Build the default broadcaster rule table.
///
/// Number groups are greedy digit runs, so "ESPN 10" is an out-of-range ESPN
/// channel rather than the bare brand.
///
/// Order matters: MAX (numbered, then bare) before plain beIN, Portuguese DAZN before generic DAZN,
/// MBC Drama+ before MBC Drama.
fn build_default_families() -> Vec<ChannelRuleSpec> {
    vec![
        // beIN
        numbered(
            "bein-max",
            "beIN SPORTS MAX {n}",
            r"(?:\bbein|بي\s*ان)\s*(?:sports?|سبورتس?)\s*max\s*(?P<n>\d+)\b",
            None,
            [1, 6],
        ),
        fixed(
            "bein-max",
            "beIN SPORTS MAX",
            r"(?:\bbein|بي\s*ان)\s*(?:sports?|سبورتس?)\s*max\b",
        ),
        numbered(
            "bein",
            "beIN SPORTS {n}",
            r"(?:\bbein|بي\s*ان)\s*(?:sports?|سبورتس?)\s*(?:(?:hd|arabic|ar|mena|english|en)\s*)*(?P<n>\d+)?\b",
            None,
            [1, 9],
        ),
        // DAZN
        numbered(
            "dazn-pt",
            "DAZN {n} Portugal",
            r"\bdazn\s*(?P<n>\d+)\s*(?:portugal|pt)\b",
            None,
            [1, 6],
        ),
        numbered("dazn", "DAZN {n}", r"\bdazn\s*(?P<n>\d+)?\b", None, [1, 6]),
        // ESPN
        numbered("espn", "ESPN {n}", r"\bespn\s*(?P<n>\d+)?\b", None, [1, 7]),
        // Russian Match!
        numbered(
            "match-futbol",
            "Match! Futbol {n}",
            r"\bmatch!?\s*futbol\s*(?P<n>\d+)\b",
            None,
            [1, 3],
        ),
        fixed("match-premier", "Match! Premier", r"\bmatch!?\s*premier\b"),
        fixed("match-tv", "Match! TV", r"^match!?\s*tv\b"),
        // Portuguese Sport TV
        numbered("sport-tv", "Sport TV {n}", r"\bsport\s*tv\s*(?P<n>\d+)\b", None, [1, 6]),
        // Sky
        fixed(
            "sky-main-event",
            "Sky Sports Main Event",
            r"\bsky\s*sports?\s*main\s*event\b",
        ),
        fixed(
            "sky-premier-league",
            "Sky Sports Premier League",
            r"\bsky\s*sports?\s*premier\s*league\b",
        ),
        // TNT
        numbered("tnt-sports", "TNT Sports {n}", r"^tnt\s*sports?\s*(?P<n>\d+)?\b", None, [1, 4]),
        // Gulf
        numbered(
            "ssc",
            "SSC {n}",
            r"(?:^ssc|^اس\s*اس\s*سي)\s*(?:sport\s*)?(?P<n>\d+)?\b",
            None,
            [1, 7],
        ),
        numbered(
            "thmanyah",
            "Thmanyah {n}",
            r"(?:^thmanyah|^ثماني[ةه])\s*(?P<n>\d+)?\b",
            Some(1),
            [1, 3],
        ),
        numbered(
            "ad-sports",
            "Abu Dhabi Sports {n}",
            r"(?:\babu\s*dhabi|\bابو\s*ظبي)\s*(?:sports?|الرياضي[ةه])\s*(?P<n>\d+)?\b",
            Some(1),
            [1, 2],
        ),
        numbered(
            "starzplay",
            "STARZPLAY Sports {n}",
            r"(?:\bstarz\s*play|ستارز\s*بلاي)\s*(?:sports?\s*)?(?P<n>\d+)?\b",
            Some(1),
            [1, 2],
        ),
        // MBC
        numbered("mbc-masr", "MBC Masr {n}", r"\bmbc\s*masr\s*(?P<n>\d+)?\b", Some(1), [1, 2]),
        fixed("mbc-action", "MBC Action", r"\bmbc\s*action\b"),
        fixed("mbc-drama-plus", "MBC Drama+", r"\bmbc\s*drama\s*(?:\+|plus\b)"),
        fixed("mbc-drama", "MBC Drama", r"\bmbc\s*drama\b"),
        // Iran / Tajikistan
        fixed("varzish-tj", "Varzish TV Tajikistan", r"\bvarzish\b"),
        fixed("varzesh-ir", "IRIB Varzesh", r"\bvarzesh\b"),
        fixed("irib-tv3", "IRIB TV3", r"\birib\b.*\b(?:tv\s*3|channel\s*3)\b"),
        fixed(
            "football-tj",
            "Football HD Tajikistan",
            r"\bfootball\s*hd\b.*\b(?:tjk|tajik)",
        ),
        fixed("persiana-sports", "Persiana Sports", r"\bpersiana\b"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon() -> ChannelCanonicalizer {
        ChannelCanonicalizer::with_defaults().expect("default rules compile")
    }

    fn key_of(c: &ChannelCanonicalizer, s: &str) -> Option<String> {
        c.canonicalize(s).map(|ch| ch.key)
    }

    #[test]
    fn test_bein_spellings_collapse() {
        let c = canon();
        for s in [
            "beIN Sports 1 HD",
            "BEIN SPORTS1",
            "bein sports  1 (geo)",
            "BEIN SPORTS HD 1",
            "beIN Sports 1HD",
            "beIN SPORTS 1 [online]",
            "⚽ beIN SPORTS 1",
            "بي إن سبورت 1",
        ] {
            assert_eq!(key_of(&c, s), Some("bein-1".to_string()), "for {:?}", s);
        }
        let ch = c.canonicalize("bein sports 3 hd").unwrap();
        assert_eq!(ch.display_name, "beIN SPORTS 3");
        assert_eq!(ch.family.as_deref(), Some("bein"));
        assert_eq!(ch.number, Some(3));
    }

    #[test]
    fn test_bein_max_is_its_own_family() {
        let c = canon();
        assert_eq!(key_of(&c, "beIN SPORTS MAX 4 HD"), Some("bein-max-4".to_string()));
        assert_ne!(key_of(&c, "beIN SPORTS MAX 4"), key_of(&c, "beIN SPORTS 4"));
    }

    #[test]
    fn test_number_out_of_range_is_rejected() {
        let c = canon();
        assert_eq!(key_of(&c, "beIN Sports 12"), None);
        assert_eq!(key_of(&c, "Match! Futbol 7"), None);
        assert_eq!(key_of(&c, "SSC 9"), None);
        // Multi-digit numbers are read whole, never truncated to the bare brand
        assert_eq!(key_of(&c, "ESPN 10"), None);
        assert_eq!(key_of(&c, "DAZN 12"), None);
        assert_eq!(key_of(&c, "beIN Sports 123"), None);
        assert_eq!(key_of(&c, "beIN SPORTS MAX 12"), None);
        assert_eq!(key_of(&c, "TNT Sports 10 HD"), None);
        assert_eq!(key_of(&c, "ESPN"), Some("espn".to_string()));
    }

    #[test]
    fn test_bare_bein_max_keeps_its_brand() {
        let c = canon();
        let bare = c.canonicalize("beIN SPORTS MAX HD").expect("bare MAX accepted");
        assert_eq!(bare.key, "bein-max");
        assert_eq!(bare.display_name, "beIN SPORTS MAX");
        assert_eq!(bare.number, None);
        assert_ne!(key_of(&c, "beIN SPORTS MAX"), key_of(&c, "beIN SPORTS"));
        assert_ne!(key_of(&c, "beIN SPORTS MAX"), key_of(&c, "beIN SPORTS MAX 1"));
        assert_eq!(key_of(&c, "beIN SPORTS MAX"), key_of(&c, &bare.display_name));
    }

    #[test]
    fn test_unnumbered_default_and_distinct() {
        let c = canon();
        // Thmanyah: unnumbered is an alias of channel 1
        assert_eq!(key_of(&c, "Thmanyah"), key_of(&c, "Thmanyah 1 HD"));
        assert_eq!(key_of(&c, "STARZPLAY Sports"), Some("starzplay-1".to_string()));
        assert_eq!(key_of(&c, "MBC masrHD"), Some("mbc-masr-1".to_string()));
        assert_eq!(key_of(&c, "MBC masr2HD"), Some("mbc-masr-2".to_string()));
        // ESPN / TNT: unnumbered is its own channel
        assert_eq!(key_of(&c, "ESPN"), Some("espn".to_string()));
        assert_eq!(key_of(&c, "ESPN 2 Brazil"), Some("espn-2".to_string()));
        assert_eq!(key_of(&c, "TNT Sports HD"), Some("tnt-sports".to_string()));
        assert_eq!(key_of(&c, "TNT Sports 2 HD"), Some("tnt-sports-2".to_string()));
        let espn = c.canonicalize("ESPN").unwrap();
        assert_eq!(espn.display_name, "ESPN");
        assert_eq!(espn.number, None);
    }

    #[test]
    fn test_family_order() {
        let c = canon();
        assert_eq!(key_of(&c, "DAZN 3 Portugal HD"), Some("dazn-pt-3".to_string()));
        assert_eq!(key_of(&c, "DAZN 3"), Some("dazn-3".to_string()));
        assert_eq!(key_of(&c, "MBC Drama+ HD"), Some("mbc-drama-plus".to_string()));
        assert_eq!(key_of(&c, "MBC Drama"), Some("mbc-drama".to_string()));
        assert_eq!(key_of(&c, "MATCH! Premier HD"), Some("match-premier".to_string()));
        assert_eq!(key_of(&c, "Match! TV Russia"), Some("match-tv".to_string()));
        assert_eq!(key_of(&c, "Sport TV1 Portugal HD"), Some("sport-tv-1".to_string()));
        assert_eq!(key_of(&c, "ssc1 hd"), Some("ssc-1".to_string()));
        assert_eq!(key_of(&c, "Sky Sport Premier League HD"), Some("sky-premier-league".to_string()));
        assert_eq!(key_of(&c, "IRIB Varzesh HD"), Some("varzesh-ir".to_string()));
        assert_eq!(key_of(&c, "Football HD (tjk)"), Some("football-tj".to_string()));
        assert_eq!(key_of(&c, "Abu Dhabi Sport 2"), Some("ad-sports-2".to_string()));
    }

    #[test]
    fn test_allow_list_fragments() {
        let c = canon();
        let ch = c.canonicalize("Alkass One HD").expect("allowed fragment");
        assert_eq!(ch.key, "alkassone");
        assert_eq!(ch.display_name, "Alkass One HD");
        assert!(ch.family.is_none());

        // Quality suffix does not split keys
        assert_eq!(key_of(&c, "Shahid MBC"), key_of(&c, "Shahid MBC HD"));

        // Spacing around the article does not split keys either
        assert_eq!(key_of(&c, "Al Kass One"), Some("alkassone".to_string()));
        assert_eq!(key_of(&c, "Al-Kass One HD"), Some("alkassone".to_string()));
        let mentions: Vec<String> = vec!["Al Kass One".into(), "Alkass One HD".into()];
        assert_eq!(c.canonicalize_all(&mentions).len(), 1);
    }

    #[test]
    fn test_unknown_channels_rejected() {
        let c = canon();
        for s in ["Canal+ Sport", "RAI 1", "Fox Sports 1", "", "   ", "(geo)", "🔥🔥"] {
            assert_eq!(key_of(&c, s), None, "should reject {:?}", s);
        }
    }

    #[test]
    fn test_canonicalize_declared_keeps_unknown() {
        let c = canon();
        let ch = c.canonicalize_declared("Canal+ Sport").expect("declared kept");
        assert_eq!(ch.display_name, "Canal+ Sport");
        assert_eq!(ch.key, "canalsport");
        assert_eq!(c.canonicalize_declared("   "), None);
        assert_eq!(
            c.canonicalize_declared("beIN Sports 2 HD").map(|c| c.key),
            Some("bein-2".to_string())
        );
    }

    #[test]
    fn test_canonicalization_idempotent_on_display() {
        let c = canon();
        let samples = [
            "beIN Sports 1 HD", "BEIN SPORTS MAX 2", "beIN SPORTS", "DAZN 2 Portugal HD", "DAZN 5",
            "ESPN", "ESPN 3 Brazil", "MATCH! Futbol 1", "MATCH! Premier HD", "Match! TV Russia",
            "Sport TV2 Portugal HD", "Sky Sports Main Event HD", "Sky Sport Premier League HD",
            "TNT Sports HD", "TNT Sports 1 HD", "ssc2 hd", "SSC", "Thmanyah", "Thmanyah 3",
            "Abu Dhabi Sport 1", "STARZPLAY Sports 2", "MBC masr2HD", "MBC Action HD",
            "MBC Drama+", "MBC Drama", "Varzish TV", "IRIB Varzesh HD", "IRIB TV3",
            "Football HD (tjk)", "Persiana Sport HD", "Shahid MBC", "Alkass One HD",
            "Dubai Sports 1 (geo)",
        ];
        for s in samples {
            let first = c.canonicalize(s).unwrap_or_else(|| panic!("should accept {:?}", s));
            let again = c
                .canonicalize(&first.display_name)
                .unwrap_or_else(|| panic!("display {:?} should re-canonicalize", first.display_name));
            assert_eq!(first.key, again.key, "key drift for {:?}", s);
        }
    }

    #[test]
    fn test_canonicalize_all_dedups_in_order() {
        let c = canon();
        let mentions: Vec<String> = vec![
            "beIN Sports 1 HD".into(),
            "Fox Sports".into(),
            "SSC 1".into(),
            "BEIN SPORTS1".into(),
            "bein sports  1 (geo)".into(),
        ];
        let out = c.canonicalize_all(&mentions);
        let keys: Vec<&str> = out.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["bein-1", "ssc-1"]);
    }

    #[test]
    fn test_clean_display() {
        assert_eq!(clean_display("beIN Sports 1HD"), "beIN Sports 1 HD");
        assert_eq!(clean_display("bein sports  1 (geo)"), "bein sports 1");
        assert_eq!(clean_display("MBC masrHD"), "MBC masr HD");
        assert_eq!(clean_display("Football HD (tjk)"), "Football HD (tjk)");
        for s in ["beIN Sports 1HD", "MBC masr2HD", "  SSC 1 [Geo/R] "] {
            let once = clean_display(s);
            assert_eq!(clean_display(&once), once, "clean not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ChannelConfig::default();
        config.families.push(fixed("broken", "Broken", r"(unclosed"));
        assert!(ChannelCanonicalizer::new(&config).is_err());

        let mut config = ChannelConfig::default();
        config.families.push(fixed("no-template", "No Template", r"\bfoo\s*(?P<n>\d)"));
        assert!(ChannelCanonicalizer::new(&config).is_err());
    }

    #[test]
    fn test_config_round_trip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.json");
        let config = ChannelConfig::default();
        config.save_to(&path).unwrap();

        let loaded = ChannelConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let c = ChannelCanonicalizer::new(&loaded).unwrap();
        assert_eq!(c.family_count(), config.families.len());
    }
}
