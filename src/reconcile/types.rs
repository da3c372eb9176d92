//! Core types for fixture reconciliation.
//!
//! Both feeds are parsed into the same [`RawFixture`] shape. Field aliases
//! accept the key spellings the scrapers emit (`home`/`home_team`,
//! `kickoff_baghdad`/`time`, `channel`/`channels_raw`, ...).

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::normalize::parse_teams_from_title;

/// One fixture as delivered by a feed. Never mutated after parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFixture {
    /// Feed-local identifier (assigned from position when the feed has none)
    #[serde(default, alias = "id", deserialize_with = "null_as_empty")]
    pub source_id: String,
    #[serde(default, alias = "home", alias = "home_team", deserialize_with = "null_as_empty")]
    pub home_name: String,
    #[serde(default, alias = "away", alias = "away_team", deserialize_with = "null_as_empty")]
    pub away_name: String,
    /// Free-text title ("Brentford v Chelsea"), used when home/away are missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        alias = "kickoff",
        alias = "kickoff_baghdad",
        alias = "time_baghdad",
        alias = "time",
        deserialize_with = "null_as_empty"
    )]
    pub kickoff_raw: String,
    #[serde(default, alias = "competition", deserialize_with = "null_as_empty")]
    pub competition_raw: String,
    /// Broadcaster mentions in feed order (Feed A: zero or one)
    #[serde(
        default,
        alias = "channel",
        alias = "channels",
        alias = "channels_raw",
        deserialize_with = "one_or_many"
    )]
    pub channel_mentions: Vec<String>,
    /// Opaque pass-through data (logos, live status)
    #[serde(flatten)]
    pub metadata: FixtureMetadata,
}

impl RawFixture {
    pub fn new(source_id: &str, home: &str, away: &str, kickoff: &str, competition: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            home_name: home.to_string(),
            away_name: away.to_string(),
            kickoff_raw: kickoff.to_string(),
            competition_raw: competition.to_string(),
            ..Default::default()
        }
    }

    /// A fixture known only by its title line
    pub fn from_title(source_id: &str, title: &str, kickoff: &str, competition: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            title: Some(title.to_string()),
            kickoff_raw: kickoff.to_string(),
            competition_raw: competition.to_string(),
            ..Default::default()
        }
    }

    pub fn with_channel(mut self, mention: &str) -> Self {
        self.channel_mentions.push(mention.to_string());
        self
    }

    pub fn with_channels(mut self, mentions: &[&str]) -> Self {
        self.channel_mentions
            .extend(mentions.iter().map(|m| m.to_string()));
        self
    }

    /// Home/away names: explicit fields first, then the split title.
    pub fn team_names(&self) -> Option<(String, String)> {
        let home = self.home_name.trim();
        let away = self.away_name.trim();
        if !home.is_empty() && !away.is_empty() {
            return Some((home.to_string(), away.to_string()));
        }
        self.title.as_deref().and_then(parse_teams_from_title)
    }

    /// The single broadcaster a primary-feed record declares, if any.
    pub fn declared_channel(&self) -> Option<&str> {
        self.channel_mentions
            .iter()
            .map(|m| m.trim())
            .find(|m| !m.is_empty())
    }
}

/// Pass-through metadata the primary feed carries. Untouched by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_text: Option<String>,
    /// Any other keys, kept in sorted order for stable output
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A broadcaster collapsed onto its stable identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalChannel {
    /// Stable lowercase key (`bein-1`, `ssc-2`, `dazn-pt-3`)
    pub key: String,
    pub display_name: String,
    /// Family key for rule-table hits; `None` for allow-list fragments
    pub family: Option<String>,
    /// Channel number for numbered families
    pub number: Option<u32>,
}

impl CanonicalChannel {
    /// A specific numbered flagship channel (`bein-1`), usable as an identity signal.
    pub fn is_numbered_flagship(&self) -> bool {
        self.family.is_some() && self.number.is_some()
    }
}

/// Sub-scores behind one candidate's composite score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ComponentScores {
    /// Best team-name similarity across orientations and scripts (0..=1)
    pub name: f64,
    /// Kickoff proximity (0..=1); 0.5 when either side has no parseable time
    pub time: f64,
    /// Minimized kickoff gap in minutes, when both sides parsed
    pub time_gap_minutes: Option<u16>,
    /// Bonus for the same non-generic competition bucket
    pub bucket: f64,
    /// Bonus for an agreeing numbered flagship broadcaster
    pub broadcaster: f64,
}

/// One scored secondary-feed candidate. Transient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    /// Position of the candidate in the secondary feed
    pub pool_index: usize,
    pub source_id: String,
    /// Composite score (0..=1)
    pub score: f64,
    pub components: ComponentScores,
    /// Number of broadcaster mentions the canonicalizer accepts
    pub accepted_channels: usize,
}

/// One reconciled fixture. Display text comes from the primary feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedFixture {
    /// `<home>-<away>-<date>` with whitespace removed
    pub id: String,
    pub competition: String,
    pub kickoff: String,
    pub home_team: String,
    pub away_team: String,
    /// Canonical display names, unique by key, primary broadcaster first
    pub channels: Vec<String>,
    /// Canonical keys parallel to `channels`
    pub channel_keys: Vec<String>,
    /// Matched secondary mentions, exact duplicates removed
    pub channels_raw: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
    #[serde(flatten)]
    pub metadata: FixtureMetadata,
}

/// A feed file: either `{"date": .., "matches": [..]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeedDocument {
    Dated {
        #[serde(default)]
        date: Option<String>,
        #[serde(default)]
        source_url: Option<String>,
        #[serde(alias = "fixtures")]
        matches: Vec<RawFixture>,
    },
    Bare(Vec<RawFixture>),
}

impl FeedDocument {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading feed {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing feed {}", path.display()))
    }

    pub fn date(&self) -> Option<&str> {
        match self {
            FeedDocument::Dated { date, .. } => date.as_deref(),
            FeedDocument::Bare(_) => None,
        }
    }

    pub fn source_url(&self) -> Option<&str> {
        match self {
            FeedDocument::Dated { source_url, .. } => source_url.as_deref(),
            FeedDocument::Bare(_) => None,
        }
    }

    /// The fixtures, with positional ids filled in where the feed had none.
    pub fn into_fixtures(self, prefix: &str) -> Vec<RawFixture> {
        let fixtures = match self {
            FeedDocument::Dated { matches, .. } => matches,
            FeedDocument::Bare(matches) => matches,
        };
        fixtures
            .into_iter()
            .enumerate()
            .map(|(i, mut f)| {
                if f.source_id.trim().is_empty() {
                    f.source_id = format!("{}-{}", prefix, i);
                }
                f
            })
            .collect()
    }
}

/// The document the binary writes.
#[derive(Debug, Clone, Serialize)]
pub struct OutputDocument {
    pub date: String,
    pub source_url: Option<String>,
    pub matches: Vec<MergedFixture>,
}

/// Scrapers write `null` for a field they could not find; treat it as empty.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `null`, a single string, or a list of strings; blanks are dropped.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<Option<String>>),
        Null(()),
    }

    let values = match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v.into_iter().flatten().collect(),
        OneOrMany::Null(()) => Vec::new(),
    };
    Ok(values.into_iter().filter(|s| !s.trim().is_empty()).collect())
}
