//! Engine configuration read from the environment.
//!
//! Every value has a safe default. Unparseable or out-of-range values are
//! logged with `warn!` and replaced by the default; configuration never fails
//! a run.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::reconcile::MatchConfig;

/// Default minimum composite score for a match
const DEFAULT_MATCH_THRESHOLD: f64 = 0.60;

/// Default name score a candidate needs unless a flagship channel is shared
const DEFAULT_MIN_NAME_EVIDENCE: f64 = 0.50;

const DEFAULT_NAME_WEIGHT: f64 = 0.55;
const DEFAULT_TIME_WEIGHT: f64 = 0.30;
const DEFAULT_BUCKET_BONUS: f64 = 0.10;
const DEFAULT_BROADCASTER_BONUS: f64 = 0.25;

/// Default kickoff tolerance after the offset search
const DEFAULT_KICKOFF_TOLERANCE_MINUTES: u16 = 30;

/// Default whole-hour offsets tried between the two feeds
const DEFAULT_KICKOFF_OFFSETS_HOURS: &[i32] = &[0, 1, 2, 3];

/// Default per-request timeout for the translation service
const DEFAULT_TRANSLATE_TIMEOUT_MS: u64 = 8_000;

const DEFAULT_FEED_A_PATH: &str = "feed_a.json";
const DEFAULT_FEED_B_PATH: &str = "feed_b.json";
const DEFAULT_OUTPUT_PATH: &str = "matches.json";

/// Translation adapter settings. Present only when `TRANSLATE_URL` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Input/output locations for the binary
#[derive(Debug, Clone, PartialEq)]
pub struct IoPaths {
    pub feed_a: PathBuf,
    pub feed_b: PathBuf,
    pub output: PathBuf,
}

impl Default for IoPaths {
    fn default() -> Self {
        Self {
            feed_a: PathBuf::from(DEFAULT_FEED_A_PATH),
            feed_b: PathBuf::from(DEFAULT_FEED_B_PATH),
            output: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }
}

/// Everything the reconciler needs, loaded once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub matching: MatchConfig,
    /// JSON rule table; built-in table when unset
    pub channel_rules_path: Option<PathBuf>,
    /// JSON team dictionary; built-in dictionary when unset
    pub team_dictionary_path: Option<PathBuf>,
    pub translate: Option<TranslateConfig>,
    pub feed_b_whitelist_only: bool,
    pub debug_dump: bool,
    pub io: IoPaths,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matching: MatchConfig::default(),
            channel_rules_path: None,
            team_dictionary_path: None,
            translate: None,
            feed_b_whitelist_only: false,
            debug_dump: false,
            io: IoPaths::default(),
        }
    }
}

impl EngineConfig {
    /// Read the configuration from environment variables.
    ///
    /// - `MATCH_THRESHOLD`, `MATCH_MIN_NAME_EVIDENCE`, `MATCH_NAME_WEIGHT`,
    ///   `MATCH_TIME_WEIGHT`, `MATCH_BUCKET_BONUS`, `MATCH_BROADCASTER_BONUS`
    ///   (0.0..=1.0)
    /// - `KICKOFF_TOLERANCE_MINUTES`, `KICKOFF_OFFSETS_HOURS` (comma list)
    /// - `CHANNEL_RULES_PATH`, `TEAM_DICTIONARY_PATH`
    /// - `TRANSLATE_URL`, `TRANSLATE_API_KEY`, `TRANSLATE_TIMEOUT_MS`
    /// - `FEED_B_WHITELIST_ONLY`, `RECONCILE_DEBUG` (`1`/`true`)
    /// - `FEED_A_PATH`, `FEED_B_PATH`, `OUTPUT_PATH`
    pub fn from_env() -> Self {
        let matching = MatchConfig {
            threshold: unit_interval_from_env("MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD),
            min_name_evidence: unit_interval_from_env("MATCH_MIN_NAME_EVIDENCE", DEFAULT_MIN_NAME_EVIDENCE),
            name_weight: unit_interval_from_env("MATCH_NAME_WEIGHT", DEFAULT_NAME_WEIGHT),
            time_weight: unit_interval_from_env("MATCH_TIME_WEIGHT", DEFAULT_TIME_WEIGHT),
            bucket_bonus: unit_interval_from_env("MATCH_BUCKET_BONUS", DEFAULT_BUCKET_BONUS),
            broadcaster_bonus: unit_interval_from_env("MATCH_BROADCASTER_BONUS", DEFAULT_BROADCASTER_BONUS),
            tolerance_minutes: parse_from_env("KICKOFF_TOLERANCE_MINUTES", DEFAULT_KICKOFF_TOLERANCE_MINUTES),
            offsets_hours: offsets_from_env(),
        };

        let translate = non_empty_var("TRANSLATE_URL").map(|url| TranslateConfig {
            url,
            api_key: non_empty_var("TRANSLATE_API_KEY"),
            timeout: Duration::from_millis(parse_from_env("TRANSLATE_TIMEOUT_MS", DEFAULT_TRANSLATE_TIMEOUT_MS)),
        });

        let io = IoPaths {
            feed_a: non_empty_var("FEED_A_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FEED_A_PATH)),
            feed_b: non_empty_var("FEED_B_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FEED_B_PATH)),
            output: non_empty_var("OUTPUT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
        };

        Self {
            matching,
            channel_rules_path: non_empty_var("CHANNEL_RULES_PATH").map(PathBuf::from),
            team_dictionary_path: non_empty_var("TEAM_DICTIONARY_PATH").map(PathBuf::from),
            translate,
            feed_b_whitelist_only: flag_from_env("FEED_B_WHITELIST_ONLY"),
            debug_dump: flag_from_env("RECONCILE_DEBUG"),
            io,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn flag_from_env(name: &str) -> bool {
    non_empty_var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_from_env<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    let Some(val_str) = non_empty_var(name) else {
        return default;
    };
    match val_str.parse::<T>() {
        Ok(val) => val,
        Err(_) => {
            warn!("Failed to parse {}='{}', using default {}", name, val_str, default);
            default
        }
    }
}

fn unit_interval_from_env(name: &str, default: f64) -> f64 {
    let val = parse_from_env(name, default);
    if (0.0..=1.0).contains(&val) {
        val
    } else {
        warn!("Invalid {}={} (must be 0.0-1.0), using default {}", name, val, default);
        default
    }
}

/// `KICKOFF_OFFSETS_HOURS="0,1,2,3"`. Offsets outside -23..=23 are rejected.
fn offsets_from_env() -> Vec<i32> {
    let Some(val_str) = non_empty_var("KICKOFF_OFFSETS_HOURS") else {
        return DEFAULT_KICKOFF_OFFSETS_HOURS.to_vec();
    };
    let parsed: Result<Vec<i32>, _> = val_str.split(',').map(|s| s.trim().parse::<i32>()).collect();
    match parsed {
        Ok(offsets) if !offsets.is_empty() && offsets.iter().all(|o| o.abs() < 24) => offsets,
        _ => {
            warn!(
                "Invalid KICKOFF_OFFSETS_HOURS='{}', using default {:?}",
                val_str, DEFAULT_KICKOFF_OFFSETS_HOURS
            );
            DEFAULT_KICKOFF_OFFSETS_HOURS.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "MATCH_THRESHOLD",
        "MATCH_MIN_NAME_EVIDENCE",
        "MATCH_NAME_WEIGHT",
        "MATCH_TIME_WEIGHT",
        "MATCH_BUCKET_BONUS",
        "MATCH_BROADCASTER_BONUS",
        "KICKOFF_TOLERANCE_MINUTES",
        "KICKOFF_OFFSETS_HOURS",
        "CHANNEL_RULES_PATH",
        "TEAM_DICTIONARY_PATH",
        "TRANSLATE_URL",
        "TRANSLATE_API_KEY",
        "TRANSLATE_TIMEOUT_MS",
        "FEED_B_WHITELIST_ONLY",
        "RECONCILE_DEBUG",
        "FEED_A_PATH",
        "FEED_B_PATH",
        "OUTPUT_PATH",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    // Env vars are process-global, so everything runs in one test.
    #[test]
    fn test_engine_config_from_env() {
        clear_env();
        let config = EngineConfig::from_env();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.matching.offsets_hours, vec![0, 1, 2, 3]);
        assert!(config.translate.is_none());

        std::env::set_var("MATCH_THRESHOLD", "0.7");
        std::env::set_var("MATCH_NAME_WEIGHT", "1.5");
        std::env::set_var("MATCH_MIN_NAME_EVIDENCE", "0.35");
        std::env::set_var("KICKOFF_TOLERANCE_MINUTES", "soon");
        std::env::set_var("KICKOFF_OFFSETS_HOURS", " 0, 3 ");
        std::env::set_var("TRANSLATE_URL", "http://localhost:5000/translate");
        std::env::set_var("TRANSLATE_TIMEOUT_MS", "2500");
        std::env::set_var("FEED_B_WHITELIST_ONLY", "true");
        std::env::set_var("RECONCILE_DEBUG", "1");
        std::env::set_var("OUTPUT_PATH", "/tmp/out.json");

        let config = EngineConfig::from_env();
        assert_eq!(config.matching.threshold, 0.7);
        assert_eq!(config.matching.name_weight, DEFAULT_NAME_WEIGHT, "out of range falls back");
        assert_eq!(config.matching.min_name_evidence, 0.35);
        assert_eq!(config.matching.tolerance_minutes, DEFAULT_KICKOFF_TOLERANCE_MINUTES);
        assert_eq!(config.matching.offsets_hours, vec![0, 3]);
        let translate = config.translate.expect("translator configured");
        assert_eq!(translate.url, "http://localhost:5000/translate");
        assert_eq!(translate.timeout, Duration::from_millis(2500));
        assert!(translate.api_key.is_none());
        assert!(config.feed_b_whitelist_only);
        assert!(config.debug_dump);
        assert_eq!(config.io.output, PathBuf::from("/tmp/out.json"));
        assert_eq!(config.io.feed_a, PathBuf::from(DEFAULT_FEED_A_PATH));

        std::env::set_var("KICKOFF_OFFSETS_HOURS", "0,48");
        assert_eq!(EngineConfig::from_env().matching.offsets_hours, vec![0, 1, 2, 3]);

        clear_env();
    }
}
