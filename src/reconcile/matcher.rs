//! Multi-signal fixture matching.
//!
//! Each primary fixture is scored against every unclaimed secondary fixture:
//!
//! ```text
//! score = name_weight * name + time_weight * time + bucket + broadcaster   (clamped to 0..=1)
//! ```
//!
//! - name: best similarity across straight/swapped orientation, native and
//!   cross-script keys. Edit-distance similarity below a noise floor counts as
//!   zero, so two unrelated names contribute nothing. A candidate whose name
//!   score is under `min_name_evidence` is ineligible unless both sides name
//!   the same numbered flagship channel.
//! - time: linear decay over the tolerance window after the offset search;
//!   0.5 when either kickoff is unparseable; a gap beyond tolerance at every
//!   offset makes the candidate ineligible
//! - bucket: flat bonus for the same non-generic competition bucket
//! - broadcaster: flat bonus when both sides name the same numbered flagship channel
//!
//! The highest score at or above the threshold wins; ties go to the candidate
//! with more accepted channels, then to the earlier one. The winner is claimed
//! and never offered again.

use tracing::debug;

use super::buckets::CompetitionBucket;
use super::channels::ChannelCanonicalizer;
use super::names::NameResolver;
use super::normalize::{normalize, parse_kickoff_minutes};
use super::types::{CanonicalChannel, ComponentScores, MatchCandidate, RawFixture};

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Time score when either kickoff is missing or unparseable.
const NEUTRAL_TIME_SCORE: f64 = 0.5;

/// Containment score for names where one key holds the other ("brighton" in "brightonhovealbion").
const CONTAINMENT_SCORE: f64 = 0.9;
const MIN_CONTAINMENT_CHARS: usize = 4;

/// Jaro-Winkler at or below this is what unrelated team names score.
const JARO_NOISE_FLOOR: f64 = 0.70;

/// Weights, bonuses and tolerances of the scorer
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Minimum composite score to accept a candidate
    pub threshold: f64,
    /// Minimum name score for a candidate without a shared flagship channel
    pub min_name_evidence: f64,
    pub name_weight: f64,
    pub time_weight: f64,
    pub bucket_bonus: f64,
    pub broadcaster_bonus: f64,
    /// Largest accepted kickoff gap after the offset search
    pub tolerance_minutes: u16,
    /// Whole-hour offsets tried between feeds (primary = secondary + offset)
    pub offsets_hours: Vec<i32>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.60,
            min_name_evidence: 0.50,
            name_weight: 0.55,
            time_weight: 0.30,
            bucket_bonus: 0.10,
            broadcaster_bonus: 0.25,
            tolerance_minutes: 30,
            offsets_hours: vec![0, 1, 2, 3],
        }
    }
}

/// Which feed a fixture came from. Only the secondary feed's full mention
/// list counts toward identity and tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedRole {
    Primary,
    Secondary,
}

/// A fixture reduced to its matching keys. Computed once per fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFixture {
    /// Normalized home/away in the fixture's own script
    pub native: Option<(String, String)>,
    /// Normalized home/away bridged into the other script
    pub translated: Option<(String, String)>,
    pub kickoff_minutes: Option<u16>,
    pub bucket: CompetitionBucket,
    /// (family, number) of every numbered flagship channel mentioned
    pub flagships: Vec<(String, u32)>,
    /// Mentions the canonicalizer accepts (distinct keys)
    pub accepted_channels: usize,
}

impl PreparedFixture {
    pub fn prepare(
        fixture: &RawFixture,
        role: FeedRole,
        resolver: &NameResolver,
        canonicalizer: &ChannelCanonicalizer,
    ) -> Self {
        let names = fixture.team_names();
        let native = names
            .as_ref()
            .map(|(home, away)| (normalize(home), normalize(away)));
        let translated = names.as_ref().map(|(home, away)| {
            (
                normalize(&resolver.to_other_script(home)),
                normalize(&resolver.to_other_script(away)),
            )
        });

        let channels: Vec<CanonicalChannel> = match role {
            FeedRole::Primary => fixture
                .declared_channel()
                .and_then(|c| canonicalizer.canonicalize(c))
                .into_iter()
                .collect(),
            FeedRole::Secondary => canonicalizer.canonicalize_all(&fixture.channel_mentions),
        };
        let flagships = channels
            .iter()
            .filter(|c| c.is_numbered_flagship())
            .filter_map(|c| Some((c.family.clone()?, c.number?)))
            .collect();

        Self {
            native,
            translated,
            kickoff_minutes: parse_kickoff_minutes(&fixture.kickoff_raw),
            bucket: CompetitionBucket::classify(&fixture.competition_raw),
            flagships,
            accepted_channels: channels.len(),
        }
    }
}

/// Secondary fixtures plus their claim state for one run.
pub struct CandidatePool<'a> {
    fixtures: &'a [RawFixture],
    prepared: Vec<PreparedFixture>,
    eligible: Vec<bool>,
    claimed: Vec<bool>,
}

impl<'a> CandidatePool<'a> {
    /// `prepared` and `eligible` are parallel to `fixtures`.
    pub fn new(fixtures: &'a [RawFixture], prepared: Vec<PreparedFixture>, eligible: Vec<bool>) -> Self {
        debug_assert_eq!(fixtures.len(), prepared.len());
        debug_assert_eq!(fixtures.len(), eligible.len());
        Self {
            fixtures,
            prepared,
            eligible,
            claimed: vec![false; fixtures.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn fixture(&self, index: usize) -> &'a RawFixture {
        &self.fixtures[index]
    }

    pub fn is_available(&self, index: usize) -> bool {
        self.eligible[index] && !self.claimed[index]
    }

    pub fn is_claimed(&self, index: usize) -> bool {
        self.claimed[index]
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible.iter().filter(|e| **e).count()
    }

    /// Eligible fixtures nobody claimed
    pub fn unclaimed_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_available(i)).count()
    }

    fn claim(&mut self, index: usize) {
        self.claimed[index] = true;
    }
}

/// Terminal state of one primary fixture's match attempt
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The candidate was claimed
    Matched(MatchCandidate),
    /// Nothing cleared the threshold; carries the best eligible candidate, if any
    Unmatched { best_rejected: Option<MatchCandidate> },
}

impl MatchOutcome {
    pub fn matched(&self) -> Option<&MatchCandidate> {
        match self {
            MatchOutcome::Matched(candidate) => Some(candidate),
            MatchOutcome::Unmatched { .. } => None,
        }
    }
}

/// Scores candidates and claims the winner. Never fails.
#[derive(Debug, Clone)]
pub struct FixtureMatcher {
    config: MatchConfig,
}

impl FixtureMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Component scores and composite for one pair, or `None` when the
    /// kickoff gap rules the candidate out or nothing but the time slot and
    /// competition ties the two fixtures together.
    pub fn score(&self, primary: &PreparedFixture, secondary: &PreparedFixture) -> Option<(f64, ComponentScores)> {
        let (time, time_gap_minutes) = match (primary.kickoff_minutes, secondary.kickoff_minutes) {
            (Some(a), Some(b)) => {
                let gap = kickoff_gap(a, b, &self.config.offsets_hours);
                (time_score(gap, self.config.tolerance_minutes)?, Some(gap))
            }
            _ => (NEUTRAL_TIME_SCORE, None),
        };

        let name = name_score(primary, secondary);
        let shared_flagship = shares_flagship(primary, secondary);
        if name < self.config.min_name_evidence && !shared_flagship {
            return None;
        }

        let bucket = if primary.bucket.agrees_with(secondary.bucket) {
            self.config.bucket_bonus
        } else {
            0.0
        };
        let broadcaster = if shared_flagship {
            self.config.broadcaster_bonus
        } else {
            0.0
        };

        let composite = (self.config.name_weight * name + self.config.time_weight * time + bucket + broadcaster)
            .clamp(0.0, 1.0);

        Some((
            composite,
            ComponentScores {
                name,
                time,
                time_gap_minutes,
                bucket,
                broadcaster,
            },
        ))
    }

    /// Pick the best available candidate for `primary` and claim it if it
    /// clears the threshold.
    pub fn find_match(&self, primary: &PreparedFixture, pool: &mut CandidatePool<'_>) -> MatchOutcome {
        let mut best: Option<MatchCandidate> = None;

        for index in 0..pool.len() {
            if !pool.is_available(index) {
                continue;
            }
            let secondary = &pool.prepared[index];
            let Some((score, components)) = self.score(primary, secondary) else {
                continue;
            };

            let candidate = MatchCandidate {
                pool_index: index,
                source_id: pool.fixtures[index].source_id.clone(),
                score,
                components,
                accepted_channels: secondary.accepted_channels,
            };
            debug!(
                "candidate {} score={:.3} name={:.3} time={:.3} bucket={:.2} broadcaster={:.2}",
                candidate.source_id, score, components.name, components.time, components.bucket, components.broadcaster
            );

            if best.as_ref().map_or(true, |b| outranks(&candidate, b)) {
                best = Some(candidate);
            }
        }

        match best {
            Some(candidate) if candidate.score >= self.config.threshold => {
                pool.claim(candidate.pool_index);
                MatchOutcome::Matched(candidate)
            }
            best_rejected => MatchOutcome::Unmatched { best_rejected },
        }
    }
}

/// Higher score first, then more accepted channels. Equal candidates keep the
/// earlier pool position because iteration is in pool order.
fn outranks(candidate: &MatchCandidate, current: &MatchCandidate) -> bool {
    match candidate.score.total_cmp(&current.score) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.accepted_channels > current.accepted_channels,
    }
}

/// Similarity of two normalized names in `0..=1`. Unrelated names score 0.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if short.chars().count() >= MIN_CONTAINMENT_CHARS && long.contains(short) {
        return CONTAINMENT_SCORE;
    }
    let jw = strsim::jaro_winkler(a, b);
    ((jw - JARO_NOISE_FLOOR) / (1.0 - JARO_NOISE_FLOOR)).max(0.0)
}

/// Better of the straight and swapped orientation.
fn pair_similarity(a: &(String, String), b: &(String, String)) -> f64 {
    let straight = (name_similarity(&a.0, &b.0) + name_similarity(&a.1, &b.1)) / 2.0;
    let swapped = (name_similarity(&a.0, &b.1) + name_similarity(&a.1, &b.0)) / 2.0;
    straight.max(swapped)
}

/// Best similarity across native/native and each side's bridged names.
fn name_score(primary: &PreparedFixture, secondary: &PreparedFixture) -> f64 {
    let pairs = [
        (primary.native.as_ref(), secondary.native.as_ref()),
        (primary.translated.as_ref(), secondary.native.as_ref()),
        (primary.native.as_ref(), secondary.translated.as_ref()),
    ];
    pairs
        .iter()
        .filter_map(|(a, b)| Some(pair_similarity(a.as_ref()?, b.as_ref()?)))
        .fold(0.0, f64::max)
}

fn shares_flagship(primary: &PreparedFixture, secondary: &PreparedFixture) -> bool {
    primary
        .flagships
        .iter()
        .any(|flagship| secondary.flagships.contains(flagship))
}

/// Smallest circular distance between `primary` and `secondary + offset`
/// over all offsets.
pub fn kickoff_gap(primary: u16, secondary: u16, offsets_hours: &[i32]) -> u16 {
    let circular = |offset_hours: i32| -> i32 {
        let shifted = (secondary as i32 + offset_hours * 60).rem_euclid(MINUTES_PER_DAY);
        let d = (primary as i32 - shifted).abs();
        d.min(MINUTES_PER_DAY - d)
    };
    let gap = if offsets_hours.is_empty() {
        circular(0)
    } else {
        offsets_hours.iter().map(|&o| circular(o)).min().unwrap_or(0)
    };
    gap as u16
}

/// Linear decay from 1.0 at zero gap to 0.0 at the tolerance edge; `None`
/// beyond it.
pub fn time_score(gap_minutes: u16, tolerance_minutes: u16) -> Option<f64> {
    if gap_minutes > tolerance_minutes {
        return None;
    }
    if tolerance_minutes == 0 {
        return Some(1.0);
    }
    Some((1.0 - gap_minutes as f64 / tolerance_minutes as f64).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(home: &str, away: &str, kickoff: Option<u16>, bucket: CompetitionBucket) -> PreparedFixture {
        PreparedFixture {
            native: Some((normalize(home), normalize(away))),
            translated: None,
            kickoff_minutes: kickoff,
            bucket,
            flagships: Vec::new(),
            accepted_channels: 0,
        }
    }

    fn pool_of<'a>(fixtures: &'a [RawFixture], prepared: Vec<PreparedFixture>) -> CandidatePool<'a> {
        let eligible = vec![true; fixtures.len()];
        CandidatePool::new(fixtures, prepared, eligible)
    }

    fn raw(ids: &[&str]) -> Vec<RawFixture> {
        ids.iter().map(|id| RawFixture::new(id, "", "", "", "")).collect()
    }

    #[test]
    fn test_kickoff_gap_offsets_and_midnight() {
        // 22:00 vs 19:00 with +3h
        assert_eq!(kickoff_gap(22 * 60, 19 * 60, &[0, 1, 2, 3]), 0);
        // 00:10 vs 23:50 wraps across midnight
        assert_eq!(kickoff_gap(10, 23 * 60 + 50, &[0]), 20);
        // 01:00 vs 22:00 +3h = 01:00 next day
        assert_eq!(kickoff_gap(60, 22 * 60, &[0, 3]), 0);
        // no offsets behaves as [0]
        assert_eq!(kickoff_gap(600, 630, &[]), 30);
    }

    #[test]
    fn test_time_score_decay() {
        assert_eq!(time_score(0, 30), Some(1.0));
        assert_eq!(time_score(15, 30), Some(0.5));
        assert_eq!(time_score(30, 30), Some(0.0));
        assert_eq!(time_score(31, 30), None);
        assert_eq!(time_score(0, 0), Some(1.0));
        assert_eq!(time_score(1, 0), None);
    }

    #[test]
    fn test_name_similarity() {
        assert_eq!(name_similarity("", "chelsea"), 0.0);
        assert_eq!(name_similarity("chelsea", "chelsea"), 1.0);
        assert_eq!(name_similarity("brighton", "brightonhovealbion"), CONTAINMENT_SCORE);
        // Short keys do not get the containment shortcut
        assert!(name_similarity("ac", "acmilan") < CONTAINMENT_SCORE);
        let close = name_similarity("wolfsburg", "wolfsberg");
        assert!(close > 0.8, "close={}", close);
        for (a, b) in [
            ("wolfsburg", "juventus"),
            ("arsenal", "fulham"),
            ("everton", "brentford"),
            ("chelsea", "liverpool"),
        ] {
            assert_eq!(name_similarity(a, b), 0.0, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_swapped_orientation_tolerated() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        let a = prepared("Arsenal", "Everton", Some(1200), CompetitionBucket::Generic);
        let b = prepared("Everton", "Arsenal", Some(1200), CompetitionBucket::Generic);
        let (_, components) = matcher.score(&a, &b).unwrap();
        assert_eq!(components.name, 1.0);
    }

    #[test]
    fn test_cross_script_names_use_translation() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        let mut a = prepared("برينتفورد", "تشيلسي", Some(22 * 60), CompetitionBucket::Generic);
        let b = prepared("Brentford", "Chelsea", Some(19 * 60), CompetitionBucket::Generic);

        assert!(
            matcher.score(&a, &b).is_none(),
            "native-only comparison has no name evidence"
        );

        a.translated = Some(("brentford".into(), "chelsea".into()));
        let (score, components) = matcher.score(&a, &b).unwrap();
        assert_eq!(components.name, 1.0);
        assert_eq!(components.time_gap_minutes, Some(0));
        assert!((score - 0.85).abs() < 1e-9, "score={}", score);
    }

    #[test]
    fn test_unparseable_time_is_neutral() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        let a = prepared("Arsenal", "Everton", None, CompetitionBucket::Generic);
        let b = prepared("Arsenal", "Everton", Some(600), CompetitionBucket::Generic);
        let (score, components) = matcher.score(&a, &b).unwrap();
        assert_eq!(components.time, NEUTRAL_TIME_SCORE);
        assert_eq!(components.time_gap_minutes, None);
        assert!((score - (0.55 + 0.15)).abs() < 1e-9);
    }

    #[test]
    fn test_gap_beyond_tolerance_is_ineligible() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        let a = prepared("Arsenal", "Everton", Some(22 * 60), CompetitionBucket::England);
        let b = prepared("Arsenal", "Everton", Some(14 * 60), CompetitionBucket::England);
        assert!(matcher.score(&a, &b).is_none());
    }

    #[test]
    fn test_broadcaster_bonus_requires_same_number() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        let mut a = prepared("Arsenal", "Everton", Some(600), CompetitionBucket::Generic);
        let mut b = prepared("Arsenal", "Everton", Some(600), CompetitionBucket::Generic);
        a.flagships = vec![("bein".into(), 1)];
        b.flagships = vec![("bein".into(), 2)];
        assert_eq!(matcher.score(&a, &b).unwrap().1.broadcaster, 0.0);
        b.flagships.push(("bein".into(), 1));
        assert_eq!(matcher.score(&a, &b).unwrap().1.broadcaster, 0.25);
    }

    #[test]
    fn test_name_evidence_required_without_shared_flagship() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        // Same slot, same competition, different teams
        let mut a = prepared("Arsenal", "Everton", Some(1020), CompetitionBucket::England);
        let mut b = prepared("Fulham", "Brentford", Some(1020), CompetitionBucket::England);
        assert!(matcher.score(&a, &b).is_none());

        // A shared numbered flagship is identity evidence on its own
        a.flagships = vec![("bein".into(), 2)];
        b.flagships = vec![("bein".into(), 2)];
        let (score, components) = matcher.score(&a, &b).expect("flagship keeps it eligible");
        assert_eq!(components.name, 0.0);
        assert!(score >= 0.6, "score={}", score);
    }

    #[test]
    fn test_bucket_bonus_tips_selection() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        let primary = prepared("Inter Milan", "Napoli", Some(1200), CompetitionBucket::Italy);
        let fixtures = raw(&["b-0", "b-1"]);
        let pool_prepared = vec![
            // Slightly better name, wrong bucket
            prepared("Inter Milan", "Napoli", Some(1200), CompetitionBucket::Generic),
            // Slightly worse name, same bucket
            prepared("Inter Milano", "Napoli", Some(1200), CompetitionBucket::Italy),
        ];
        let mut pool = pool_of(&fixtures, pool_prepared);

        let outcome = matcher.find_match(&primary, &mut pool);
        let chosen = outcome.matched().expect("should match");
        assert_eq!(chosen.source_id, "b-1");
        assert!(chosen.components.name < 1.0);
        assert!(pool.is_claimed(1));
        assert!(!pool.is_claimed(0));
    }

    #[test]
    fn test_tie_breaks_on_channel_count_then_order() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        let primary = prepared("Arsenal", "Everton", Some(1200), CompetitionBucket::Generic);
        let fixtures = raw(&["b-0", "b-1", "b-2"]);
        let mut few = prepared("Arsenal", "Everton", Some(1200), CompetitionBucket::Generic);
        few.accepted_channels = 1;
        let mut many = few.clone();
        many.accepted_channels = 3;
        let mut pool = pool_of(&fixtures, vec![few, many.clone(), many]);

        let first = matcher.find_match(&primary, &mut pool);
        assert_eq!(first.matched().unwrap().source_id, "b-1");
        // b-1 is claimed; the next identical primary gets b-2, then b-0
        let second = matcher.find_match(&primary, &mut pool);
        assert_eq!(second.matched().unwrap().source_id, "b-2");
        let third = matcher.find_match(&primary, &mut pool);
        assert_eq!(third.matched().unwrap().source_id, "b-0");
        let fourth = matcher.find_match(&primary, &mut pool);
        assert_eq!(fourth, MatchOutcome::Unmatched { best_rejected: None });
        assert_eq!(pool.unclaimed_count(), 0);
    }

    #[test]
    fn test_below_threshold_reports_best_rejected() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        let primary = prepared("Arsenal", "Everton", Some(1200), CompetitionBucket::Generic);
        let fixtures = raw(&["b-0"]);
        let mut pool = pool_of(
            &fixtures,
            // Right teams, but at the edge of the tolerance window
            vec![prepared("Arsenal", "Everton", Some(1230), CompetitionBucket::Generic)],
        );
        match matcher.find_match(&primary, &mut pool) {
            MatchOutcome::Unmatched { best_rejected: Some(c) } => {
                assert_eq!(c.source_id, "b-0");
                assert!(c.score < 0.6);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(!pool.is_claimed(0));
    }

    #[test]
    fn test_missing_partner_does_not_steal_slot() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        let fixtures = raw(&["b-0"]);
        let mut pool = pool_of(
            &fixtures,
            vec![prepared("Fulham", "Brentford", Some(1020), CompetitionBucket::England)],
        );

        let arsenal = prepared("Arsenal", "Everton", Some(1020), CompetitionBucket::England);
        let fulham = prepared("Fulham", "Brentford", Some(1020), CompetitionBucket::England);
        assert_eq!(
            matcher.find_match(&arsenal, &mut pool),
            MatchOutcome::Unmatched { best_rejected: None }
        );
        assert_eq!(matcher.find_match(&fulham, &mut pool).matched().unwrap().source_id, "b-0");
    }

    #[test]
    fn test_ineligible_fixtures_never_offered() {
        let matcher = FixtureMatcher::new(MatchConfig::default());
        let primary = prepared("Arsenal", "Everton", Some(1200), CompetitionBucket::Generic);
        let fixtures = raw(&["b-0"]);
        let mut pool = CandidatePool::new(
            &fixtures,
            vec![prepared("Arsenal", "Everton", Some(1200), CompetitionBucket::Generic)],
            vec![false],
        );
        assert_eq!(pool.eligible_count(), 0);
        assert!(matcher.find_match(&primary, &mut pool).matched().is_none());
    }
}
