//! Text normalization, script detection and free-text field parsing.
//!
//! `normalize` is the one place where folding rules live. Every other component
//! (channel keys, dictionary lookups, name similarity, competition buckets) calls
//! it instead of carrying its own lowercase/strip logic.

use chrono::{NaiveTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Generic club suffix tokens dropped from team names ("Chelsea FC" == "Chelsea").
const GENERIC_CLUB_TOKENS: &[&str] = &["fc", "sc", "cf"];

/// Latin transliterations of the Arabic definite article, written as a separate token.
const LATIN_ARTICLE_TOKENS: &[&str] = &["al", "el"];

/// The Arabic definite article prefix.
const ARABIC_ARTICLE: &str = "ال";

/// Script a team name is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Script {
    Latin,
    Arabic,
}

impl Script {
    /// Classify text by majority of alphabetic characters. Ties and text without
    /// letters count as Latin.
    pub fn detect(text: &str) -> Self {
        let mut arabic = 0usize;
        let mut other = 0usize;
        for c in text.chars().filter(|c| c.is_alphabetic()) {
            if is_arabic_char(c) {
                arabic += 1;
            } else {
                other += 1;
            }
        }
        if arabic > other {
            Script::Arabic
        } else {
            Script::Latin
        }
    }

    /// The script on the other side of the bridge.
    pub fn other(self) -> Self {
        match self {
            Script::Latin => Script::Arabic,
            Script::Arabic => Script::Latin,
        }
    }

    /// ISO 639-1 language code used by translation endpoints.
    pub fn language_code(self) -> &'static str {
        match self {
            Script::Latin => "en",
            Script::Arabic => "ar",
        }
    }
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Script::Latin => write!(f, "latin"),
            Script::Arabic => write!(f, "arabic"),
        }
    }
}

/// Reduce free text to its matching key.
///
/// Steps, in order:
/// 1. Strip emoji and pictographs
/// 2. Strip parenthetical / bracketed annotations
/// 3. NFKD decomposition, dropping combining marks (accents, Arabic harakat, hamza carriers)
/// 4. Lowercase
/// 5. Drop generic club tokens (`fc`, `sc`, `cf`) unless they are the whole name
/// 6. Fold Arabic letter variants and the definite article (both scripts)
/// 7. Remove whitespace, hyphens and underscores
/// 8. Drop anything outside ASCII alphanumerics and Arabic letters
///
/// Total and deterministic: empty input gives an empty string.
///
/// ```ignore
/// assert_eq!(normalize("Chelsea FC"), "chelsea");
/// assert_eq!(normalize("Atlético Madrid"), "atleticomadrid");
/// assert_eq!(normalize("الأهلي"), "اهلي");
/// ```
pub fn normalize(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let without_pictographs: String = text.chars().filter(|c| !is_pictograph(*c)).collect();
    let without_annotations = annotation_re().replace_all(&without_pictographs, " ");

    let folded: String = without_annotations
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let tokens: Vec<String> = folded
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .map(fold_token)
        .filter(|t| !t.is_empty())
        .collect();

    let token_count = tokens.len();
    let mut out = String::with_capacity(folded.len());
    for (idx, token) in tokens.iter().enumerate() {
        if token_count > 1 && GENERIC_CLUB_TOKENS.contains(&token.as_str()) {
            continue;
        }
        if idx + 1 < token_count && LATIN_ARTICLE_TOKENS.contains(&token.as_str()) {
            continue;
        }
        out.push_str(strip_arabic_article(token));
    }
    out
}

/// Fold one lowercase token: script-specific letter unification, then keep only
/// the allowed character set.
fn fold_token(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for c in token.chars() {
        match c {
            // Arabic letter variants
            'ى' | 'ی' => out.push('ي'),
            'ة' => out.push('ه'),
            'ٱ' => out.push('ا'),
            'ک' => out.push('ك'),
            'ـ' => {}
            // Arabic-Indic and extended digits
            '٠'..='٩' => out.push(char::from(b'0' + (c as u32 - '٠' as u32) as u8)),
            '۰'..='۹' => out.push(char::from(b'0' + (c as u32 - '۰' as u32) as u8)),
            // Latin letters with no decomposition
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'œ' => out.push_str("oe"),
            'ø' => out.push('o'),
            'ł' => out.push('l'),
            'đ' => out.push('d'),
            'ı' => out.push('i'),
            _ if c.is_ascii_alphanumeric() => out.push(c),
            _ if is_arabic_char(c) && c.is_alphabetic() => out.push(c),
            _ => {}
        }
    }
    out
}

/// "الهلال" -> "هلال". Short words keep the prefix so that two-letter tokens
/// do not vanish.
fn strip_arabic_article(token: &str) -> &str {
    match token.strip_prefix(ARABIC_ARTICLE) {
        Some(rest) if rest.chars().count() >= 2 => rest,
        _ => token,
    }
}

fn annotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\([^()]*\)|\[[^\[\]]*\]|\{[^{}]*\}").expect("static annotation pattern")
    })
}

/// Arabic block plus presentation forms.
pub fn is_arabic_char(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}'
        | '\u{0750}'..='\u{077F}'
        | '\u{08A0}'..='\u{08FF}'
        | '\u{FB50}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}')
}

/// Emoji, pictographs, dingbats and the joiners/selectors that glue them.
pub fn is_pictograph(c: char) -> bool {
    matches!(c,
        '\u{1F000}'..='\u{1FAFF}'
        | '\u{2300}'..='\u{23FF}'
        | '\u{2600}'..='\u{27BF}'
        | '\u{2B00}'..='\u{2BFF}'
        | '\u{FE00}'..='\u{FE0F}'
        | '\u{200D}'
        | '\u{20E3}'
        | '\u{E0020}'..='\u{E007F}')
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a free-text kickoff into minutes after midnight.
///
/// Accepts `HH:MM`, `H:MM`, `HH.MM`, with an optional `am`/`pm` suffix, anywhere
/// in the text (first time-like token wins). Returns `None` when nothing
/// parses; callers treat that as "unknown", never as an error.
pub fn parse_kickoff_minutes(raw: &str) -> Option<u16> {
    let caps = kickoff_re().captures(raw)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = caps.get(2)?.as_str().parse().ok()?;

    if let Some(meridiem) = caps.get(3) {
        if hour == 0 || hour > 12 {
            return None;
        }
        let pm = meridiem.as_str().to_ascii_lowercase().starts_with('p');
        hour = match (pm, hour) {
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, 12) => 0,
            (false, h) => h,
        };
    }

    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    Some((time.num_seconds_from_midnight() / 60) as u16)
}

fn kickoff_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(\d{1,2})[:.](\d{2})\b(?:\s*([ap]\.?\s?m\.?))?")
            .expect("static kickoff pattern")
    })
}

/// Split a fixture title into (home, away).
///
/// Common formats:
/// - "Team A v Team B"
/// - "Team A vs Team B" / "Team A vs. Team B"
/// - "Team A - Team B" (also en/em dash)
///
/// A trailing "ST: 19:00" start-time annotation is ignored. Hyphens inside a
/// name ("Al-Hilal") do not split because the delimiter needs surrounding spaces.
pub fn parse_teams_from_title(title: &str) -> Option<(String, String)> {
    let caps = title_re().captures(title.trim())?;
    let home = collapse_whitespace(caps.get(1)?.as_str());
    let away = collapse_whitespace(caps.get(2)?.as_str());
    if home.is_empty() || away.is_empty() {
        return None;
    }
    Some((home, away))
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(.+?)\s+(?:vs\.?|v|-|–|—)\s+(.+?)(?:\s+ST:.*)?$")
            .expect("static title pattern")
    })
}
