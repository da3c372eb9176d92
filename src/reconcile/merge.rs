//! Builds the output record for one primary fixture.

use super::channels::ChannelCanonicalizer;
use super::types::{CanonicalChannel, MatchCandidate, MergedFixture, RawFixture};

/// Combines a primary fixture with its optional secondary match.
pub struct MergeEngine<'a> {
    canonicalizer: &'a ChannelCanonicalizer,
}

impl<'a> MergeEngine<'a> {
    pub fn new(canonicalizer: &'a ChannelCanonicalizer) -> Self {
        Self { canonicalizer }
    }

    /// Display text comes from the primary fixture verbatim. Channels: the
    /// primary's declared broadcaster first, then every accepted secondary
    /// mention in order, unique by canonical key (first seen wins).
    pub fn merge(
        &self,
        primary: &RawFixture,
        matched: Option<(&RawFixture, &MatchCandidate)>,
        date: &str,
    ) -> MergedFixture {
        let mut channels: Vec<CanonicalChannel> = Vec::new();
        let mut push_unique = |channel: CanonicalChannel| {
            if !channels.iter().any(|c| c.key == channel.key) {
                channels.push(channel);
            }
        };

        if let Some(declared) = primary
            .declared_channel()
            .and_then(|c| self.canonicalizer.canonicalize_declared(c))
        {
            push_unique(declared);
        }

        let mut channels_raw: Vec<String> = Vec::new();
        if let Some((secondary, _)) = matched {
            for mention in &secondary.channel_mentions {
                if let Some(channel) = self.canonicalizer.canonicalize(mention) {
                    push_unique(channel);
                }
                let trimmed = mention.trim();
                if !trimmed.is_empty() && !channels_raw.iter().any(|r| r == trimmed) {
                    channels_raw.push(trimmed.to_string());
                }
            }
        }

        let (home_team, away_team) = display_names(primary);

        MergedFixture {
            id: record_id(&home_team, &away_team, date),
            competition: primary.competition_raw.trim().to_string(),
            kickoff: primary.kickoff_raw.trim().to_string(),
            home_team,
            away_team,
            channel_keys: channels.iter().map(|c| c.key.clone()).collect(),
            channels: channels.into_iter().map(|c| c.display_name).collect(),
            channels_raw,
            matched_source_id: matched.map(|(secondary, _)| secondary.source_id.clone()),
            match_score: matched.map(|(_, candidate)| round_score(candidate.score)),
            metadata: primary.metadata.clone(),
        }
    }
}

/// Primary home/away as the feed wrote them; split from the title only when
/// the fields are missing.
fn display_names(primary: &RawFixture) -> (String, String) {
    let home = primary.home_name.trim();
    let away = primary.away_name.trim();
    if home.is_empty() && away.is_empty() {
        if let Some(split) = primary.title.as_deref().and_then(super::normalize::parse_teams_from_title) {
            return split;
        }
    }
    (home.to_string(), away.to_string())
}

/// `<home>-<away>-<date>` with all whitespace removed
pub fn record_id(home: &str, away: &str, date: &str) -> String {
    format!("{}-{}-{}", home, away, date)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

fn round_score(score: f64) -> f64 {
    (score * 10_000.0).round() / 10_000.0
}
