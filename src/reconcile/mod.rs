//! Fixture reconciliation engine.
//!
//! Takes the primary feed (system of record for display text) and the
//! secondary feed (broadcaster mentions), and produces one merged record per
//! primary fixture, in input order.
//!
//! ## Architecture
//!
//! - **normalize**: the single text folding function, script detection, kickoff/title parsing
//! - **channels**: ordered broadcaster rule table and allow-list
//! - **translate**: translation port, HTTP adapter and memoizing decorator
//! - **names**: dictionary-then-translator name bridging
//! - **buckets**: coarse competition classes
//! - **matcher**: composite scorer and single-use candidate pool
//! - **merge**: output record construction
//!
//! ## Usage
//!
//! ```ignore
//! let reconciler = Reconciler::from_config(&EngineConfig::from_env())?;
//! let report = reconciler.reconcile(&primary, &secondary, "2025-09-13");
//! assert_eq!(report.fixtures.len(), primary.len());
//! ```

pub mod buckets;
pub mod channels;
pub mod matcher;
pub mod merge;
pub mod names;
pub mod normalize;
pub mod translate;
pub mod types;

pub use buckets::CompetitionBucket;
pub use channels::{ChannelCanonicalizer, ChannelConfig, ChannelRuleSpec};
pub use matcher::{CandidatePool, FeedRole, FixtureMatcher, MatchConfig, MatchOutcome, PreparedFixture};
pub use merge::MergeEngine;
pub use names::{NameResolver, NameSource, ResolvedName};
pub use normalize::{normalize, Script};
pub use translate::{CachedTranslator, HttpTranslator, Translate};
pub use types::*;

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::TeamDictionary;
use crate::config::EngineConfig;
use crate::retry::RetryPolicy;

/// Counts for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub primary_fixtures: usize,
    pub secondary_fixtures: usize,
    /// Secondary fixtures offered to the matcher (after the optional whitelist)
    pub secondary_eligible: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Eligible secondary fixtures no primary fixture claimed
    pub secondary_unclaimed: usize,
    /// Calls that reached the translation adapter during this run
    pub translator_invocations: usize,
}

/// Result of one run
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// One record per primary fixture, same order
    pub fixtures: Vec<MergedFixture>,
    pub stats: RunStats,
}

/// Wires the components together. Immutable after construction; rule
/// tables, dictionary and translation memo are shared read-only by all
/// fixtures of a run.
pub struct Reconciler {
    canonicalizer: ChannelCanonicalizer,
    resolver: NameResolver,
    matcher: FixtureMatcher,
    whitelist_only: bool,
    debug_dump: bool,
}

impl Reconciler {
    pub fn new(canonicalizer: ChannelCanonicalizer, resolver: NameResolver, config: MatchConfig) -> Self {
        Self {
            canonicalizer,
            resolver,
            matcher: FixtureMatcher::new(config),
            whitelist_only: false,
            debug_dump: false,
        }
    }

    /// Build from environment configuration: rule table and dictionary from
    /// their files (or built-in defaults), HTTP translator when a URL is set.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let channel_config = match &config.channel_rules_path {
            Some(path) => ChannelConfig::load_from(path)?,
            None => ChannelConfig::default(),
        };
        let canonicalizer = ChannelCanonicalizer::new(&channel_config)?;

        let dictionary = match &config.team_dictionary_path {
            Some(path) => TeamDictionary::load_from(path)?,
            None => TeamDictionary::builtin(),
        };

        let mut resolver = NameResolver::new(dictionary);
        if let Some(translate) = &config.translate {
            let adapter = HttpTranslator::new(
                &translate.url,
                translate.api_key.clone(),
                translate.timeout,
                RetryPolicy::from_env(),
            )?;
            resolver = resolver.with_translator(Box::new(adapter));
        }

        info!(
            families = canonicalizer.family_count(),
            dictionary_entries = resolver.dictionary().len(),
            translator = resolver.has_translator(),
            whitelist_only = config.feed_b_whitelist_only,
            "Reconciler ready"
        );

        Ok(Self::new(canonicalizer, resolver, config.matching.clone())
            .with_whitelist_only(config.feed_b_whitelist_only)
            .with_debug_dump(config.debug_dump))
    }

    /// Only offer secondary fixtures whose competition lands in a known bucket
    pub fn with_whitelist_only(mut self, enabled: bool) -> Self {
        self.whitelist_only = enabled;
        self
    }

    /// Log the best candidate of every primary fixture at info level
    pub fn with_debug_dump(mut self, enabled: bool) -> Self {
        self.debug_dump = enabled;
        self
    }

    pub fn canonicalizer(&self) -> &ChannelCanonicalizer {
        &self.canonicalizer
    }

    pub fn resolver(&self) -> &NameResolver {
        &self.resolver
    }

    /// Reconcile both feeds. Total: output length always equals `primary.len()`.
    pub fn reconcile(&self, primary: &[RawFixture], secondary: &[RawFixture], date: &str) -> ReconcileReport {
        let invocations_before = self.resolver.translator_invocations();

        let prepared_secondary: Vec<PreparedFixture> = secondary
            .iter()
            .map(|f| PreparedFixture::prepare(f, FeedRole::Secondary, &self.resolver, &self.canonicalizer))
            .collect();
        let eligible: Vec<bool> = prepared_secondary
            .iter()
            .map(|p| !self.whitelist_only || !p.bucket.is_generic())
            .collect();
        let mut pool = CandidatePool::new(secondary, prepared_secondary, eligible);
        let secondary_eligible = pool.eligible_count();

        let merger = MergeEngine::new(&self.canonicalizer);
        let mut fixtures = Vec::with_capacity(primary.len());
        let mut matched_count = 0usize;

        for fixture in primary {
            let prepared = PreparedFixture::prepare(fixture, FeedRole::Primary, &self.resolver, &self.canonicalizer);
            let outcome = self.matcher.find_match(&prepared, &mut pool);

            if self.debug_dump {
                self.dump_outcome(fixture, &outcome, &pool);
            }

            let merged = match &outcome {
                MatchOutcome::Matched(candidate) => {
                    matched_count += 1;
                    let secondary_fixture = pool.fixture(candidate.pool_index);
                    info!(
                        "Matched {} vs {} -> {} (score={:.3})",
                        fixture.home_name, fixture.away_name, candidate.source_id, candidate.score
                    );
                    merger.merge(fixture, Some((secondary_fixture, candidate)), date)
                }
                MatchOutcome::Unmatched { .. } => {
                    debug!("No match for {} vs {}", fixture.home_name, fixture.away_name);
                    merger.merge(fixture, None, date)
                }
            };
            fixtures.push(merged);
        }

        let stats = RunStats {
            primary_fixtures: primary.len(),
            secondary_fixtures: secondary.len(),
            secondary_eligible,
            matched: matched_count,
            unmatched: primary.len() - matched_count,
            secondary_unclaimed: pool.unclaimed_count(),
            translator_invocations: self.resolver.translator_invocations() - invocations_before,
        };

        info!(
            primary = stats.primary_fixtures,
            secondary = stats.secondary_fixtures,
            eligible = stats.secondary_eligible,
            matched = stats.matched,
            unmatched = stats.unmatched,
            unclaimed = stats.secondary_unclaimed,
            translations = stats.translator_invocations,
            "Reconciliation complete"
        );

        ReconcileReport { fixtures, stats }
    }

    fn dump_outcome(&self, fixture: &RawFixture, outcome: &MatchOutcome, pool: &CandidatePool<'_>) {
        let (verdict, candidate) = match outcome {
            MatchOutcome::Matched(c) => ("MATCHED", Some(c)),
            MatchOutcome::Unmatched { best_rejected } => ("REJECTED", best_rejected.as_ref()),
        };
        match candidate {
            Some(c) => {
                let title = pool
                    .fixture(c.pool_index)
                    .team_names()
                    .map(|(h, a)| format!("{} v {}", h, a))
                    .unwrap_or_default();
                info!(
                    "[RECONCILE_DEBUG] {} {} vs {} @ {:?} | best={} '{}' score={:.3} name={:.3} time={:.3} gap={:?} bucket={:.2} broadcaster={:.2} channels={}",
                    verdict,
                    fixture.home_name,
                    fixture.away_name,
                    fixture.kickoff_raw,
                    c.source_id,
                    title,
                    c.score,
                    c.components.name,
                    c.components.time,
                    c.components.time_gap_minutes,
                    c.components.bucket,
                    c.components.broadcaster,
                    c.accepted_channels
                );
            }
            None => info!(
                "[RECONCILE_DEBUG] NO_CANDIDATE {} vs {} @ {:?}",
                fixture.home_name, fixture.away_name, fixture.kickoff_raw
            ),
        }
    }
}
