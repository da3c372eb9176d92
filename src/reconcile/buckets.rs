//! Coarse competition classification used as a matching signal.
//!
//! Keywords are given in both scripts and compared on normalized text, so
//! "English Premier League" and "الدوري الإنجليزي الممتاز" land in the same
//! bucket. Buckets are tried in order; continental and national-team
//! competitions come first, England last because "Premier League" is also
//! part of other countries' league names.

use serde::Serialize;
use std::sync::OnceLock;

use super::normalize::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionBucket {
    AfcChampionsLeague,
    CafChampionsLeague,
    UefaChampionsLeague,
    EuropaLeague,
    ConferenceLeague,
    ClubWorldCup,
    NationalTeams,
    Saudi,
    Egypt,
    Brazil,
    Spain,
    Italy,
    Germany,
    France,
    Netherlands,
    Portugal,
    Turkey,
    England,
    /// Nothing recognizable; never earns a bonus
    Generic,
}

const BUCKET_KEYWORDS: &[(CompetitionBucket, &[&str])] = &[
    (
        CompetitionBucket::AfcChampionsLeague,
        &["AFC Champions", "Asian Champions", "أبطال آسيا"],
    ),
    (
        CompetitionBucket::CafChampionsLeague,
        &["CAF Champions", "African Champions", "أبطال أفريقيا", "أبطال إفريقيا"],
    ),
    (
        CompetitionBucket::UefaChampionsLeague,
        &["Champions League", "أبطال أوروبا"],
    ),
    (CompetitionBucket::EuropaLeague, &["Europa League", "الدوري الأوروبي"]),
    (CompetitionBucket::ConferenceLeague, &["Conference League", "دوري المؤتمر"]),
    (CompetitionBucket::ClubWorldCup, &["Club World Cup", "كأس العالم للأندية"]),
    (
        CompetitionBucket::NationalTeams,
        &[
            "World Cup",
            "Qualif",
            "Nations League",
            "Euro 20",
            "Africa Cup of Nations",
            "Asian Cup",
            "Copa America",
            "Gulf Cup",
            "Arab Cup",
            "International Friendl",
            "كأس العالم",
            "تصفيات",
            "دوري الأمم",
            "كأس أمم",
            "كأس آسيا",
            "كأس الخليج",
            "كأس العرب",
        ],
    ),
    (CompetitionBucket::Saudi, &["Saudi", "Roshn", "سعودي", "روشن"]),
    (CompetitionBucket::Egypt, &["Egypt", "مصري", "مصر"]),
    (CompetitionBucket::Brazil, &["Brazil", "Brasileir", "برازيلي"]),
    (
        CompetitionBucket::Spain,
        &["Spanish", "Spain", "La Liga", "Copa del Rey", "Supercopa", "إسباني", "إسبانيا"],
    ),
    (
        CompetitionBucket::Italy,
        &["Italian", "Italy", "Serie A", "Coppa Italia", "إيطالي", "إيطاليا"],
    ),
    (
        CompetitionBucket::Germany,
        &["German", "Bundesliga", "DFB", "ألماني", "ألمانيا"],
    ),
    (
        CompetitionBucket::France,
        &["French", "France", "Ligue 1", "Coupe de France", "فرنسي", "فرنسا"],
    ),
    (CompetitionBucket::Netherlands, &["Dutch", "Eredivisie", "هولندي"]),
    (
        CompetitionBucket::Portugal,
        &["Portug", "Primeira Liga", "برتغالي"],
    ),
    (CompetitionBucket::Turkey, &["Turkish", "Super Lig", "تركي"]),
    (
        CompetitionBucket::England,
        &[
            "English",
            "England",
            "Premier League",
            "FA Cup",
            "EFL",
            "Carabao",
            "Championship",
            "Community Shield",
            "إنجليزي",
            "إنجلترا",
        ],
    ),
];

fn keyword_table() -> &'static Vec<(CompetitionBucket, Vec<String>)> {
    static TABLE: OnceLock<Vec<(CompetitionBucket, Vec<String>)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        BUCKET_KEYWORDS
            .iter()
            .map(|(bucket, words)| {
                let normalized = words
                    .iter()
                    .map(|w| normalize(w))
                    .filter(|w| !w.is_empty())
                    .collect();
                (*bucket, normalized)
            })
            .collect()
    })
}

impl CompetitionBucket {
    /// Classify a free-text competition name. Total: unknown text is `Generic`.
    pub fn classify(competition: &str) -> Self {
        let key = normalize(competition);
        if key.is_empty() {
            return CompetitionBucket::Generic;
        }
        keyword_table()
            .iter()
            .find(|(_, words)| words.iter().any(|w| key.contains(w.as_str())))
            .map(|(bucket, _)| *bucket)
            .unwrap_or(CompetitionBucket::Generic)
    }

    pub fn is_generic(self) -> bool {
        self == CompetitionBucket::Generic
    }

    /// True when both sides resolve to the same non-generic bucket
    pub fn agrees_with(self, other: CompetitionBucket) -> bool {
        !self.is_generic() && self == other
    }
}
