//! Team name dictionary for cross-script fixture matching.
//!
//! Bidirectional mapping between Latin and Arabic team names, keyed by the
//! normalized form of every spelling so lookups survive hamza/ta-marbuta
//! variants, diacritics, "FC" suffixes and the definite article.

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::reconcile::normalize::{normalize, Script};

const DICTIONARY_VERSION: u32 = 2;

/// Shortest normalized key the substring fallback may use.
const MIN_SUBSTRING_KEY_CHARS: usize = 4;

/// One club or national team, with optional alternative spellings in either script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub latin: String,
    pub arabic: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl DictionaryEntry {
    pub fn new(latin: &str, arabic: &str) -> Self {
        Self {
            latin: latin.to_string(),
            arabic: arabic.to_string(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.to_string()));
        self
    }
}

/// Dictionary file format enum for backward compatibility
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DictionaryFormat {
    /// V2: versioned entry list
    V2 {
        #[serde(default)]
        version: u32,
        entries: Vec<DictionaryEntry>,
    },
    /// V1: flat Arabic -> Latin map (reverse is rebuilt)
    V1 { forward: BTreeMap<String, String> },
}

#[derive(Serialize)]
struct DictionaryFile<'a> {
    version: u32,
    entries: &'a [DictionaryEntry],
}

/// Bidirectional team dictionary. Immutable once built; passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct TeamDictionary {
    entries: Vec<DictionaryEntry>,
    /// Normalized Arabic spelling -> Latin display name
    to_latin: FxHashMap<Box<str>, Box<str>>,
    /// Normalized Latin spelling -> Arabic display name
    to_arabic: FxHashMap<Box<str>, Box<str>>,
}

impl TeamDictionary {
    pub fn from_entries(entries: Vec<DictionaryEntry>) -> Self {
        let mut dict = Self {
            entries,
            ..Default::default()
        };
        dict.rebuild_maps();
        dict
    }

    /// The curated dictionary compiled into the binary
    pub fn builtin() -> Self {
        Self::from_entries(builtin_entries())
    }

    /// Load from a JSON file (v2 entry list or v1 flat map)
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading team dictionary {}", path.display()))?;
        let format: DictionaryFormat = serde_json::from_str(&contents)
            .with_context(|| format!("parsing team dictionary {}", path.display()))?;

        let dict = match format {
            DictionaryFormat::V2 { version, entries } => {
                tracing::debug!("Loaded team dictionary (v{} format, {} entries)", version, entries.len());
                Self::from_entries(entries)
            }
            DictionaryFormat::V1 { forward } => {
                tracing::debug!("Loaded team dictionary (v1 flat format), migrating to v2");
                Self::from_entries(
                    forward
                        .into_iter()
                        .map(|(arabic, latin)| DictionaryEntry::new(&latin, &arabic))
                        .collect(),
                )
            }
        };
        Ok(dict)
    }

    /// Save as v2 JSON
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = DictionaryFile {
            version: DICTIONARY_VERSION,
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Add an entry. Spellings already claimed by an earlier entry keep their mapping.
    pub fn insert(&mut self, entry: DictionaryEntry) {
        Self::index_entry(&mut self.to_latin, &mut self.to_arabic, &entry);
        self.entries.push(entry);
    }

    /// The counterpart of `name` in the other script.
    ///
    /// Exact match on the normalized form first; otherwise the longest
    /// dictionary key (at least four characters) contained in the name.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let key = normalize(name);
        if key.is_empty() {
            return None;
        }
        let map = match Script::detect(name) {
            Script::Arabic => &self.to_latin,
            Script::Latin => &self.to_arabic,
        };

        if let Some(found) = map.get(key.as_str()) {
            return Some(&**found);
        }

        map.iter()
            .filter(|(k, _)| {
                let k: &str = k;
                k.chars().count() >= MIN_SUBSTRING_KEY_CHARS && key.contains(k)
            })
            .max_by(|(a, _), (b, _)| {
                a.chars()
                    .count()
                    .cmp(&b.chars().count())
                    .then_with(|| b.cmp(a))
            })
            .map(|(_, v)| &**v)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuild both lookup maps from the entry list
    fn rebuild_maps(&mut self) {
        self.to_latin.clear();
        self.to_arabic.clear();
        for entry in &self.entries {
            Self::index_entry(&mut self.to_latin, &mut self.to_arabic, entry);
        }
    }

    fn index_entry(
        to_latin: &mut FxHashMap<Box<str>, Box<str>>,
        to_arabic: &mut FxHashMap<Box<str>, Box<str>>,
        entry: &DictionaryEntry,
    ) {
        let spellings = std::iter::once(entry.latin.as_str())
            .chain(std::iter::once(entry.arabic.as_str()))
            .chain(entry.aliases.iter().map(|a| a.as_str()));

        for spelling in spellings {
            let key = normalize(spelling);
            if key.is_empty() {
                continue;
            }
            let (map, target) = match Script::detect(spelling) {
                Script::Arabic => (&mut *to_latin, entry.latin.as_str()),
                Script::Latin => (&mut *to_arabic, entry.arabic.as_str()),
            };
            map.entry(key.into_boxed_str())
                .or_insert_with(|| target.into());
        }
    }
}

fn builtin_entries() -> Vec<DictionaryEntry> {
    let e = DictionaryEntry::new;
    vec![
        // Saudi Arabia
        e("Al Hilal", "الهلال"),
        e("Al Nassr", "النصر").with_aliases(&["Al Nasr"]),
        e("Al Ittihad", "الاتحاد").with_aliases(&["Ittihad Jeddah"]),
        e("Al Ahli", "الأهلي").with_aliases(&["Al Ahli Saudi", "Al Ahli Jeddah"]),
        e("Al Shabab", "الشباب"),
        e("Al Ettifaq", "الاتفاق"),
        e("Al Taawoun", "التعاون"),
        e("Damac", "ضمك"),
        e("Al Fateh", "الفتح"),
        e("Al Raed", "الرائد"),
        e("Al Khaleej", "الخليج"),
        e("Abha", "أبها"),
        e("Al Fayha", "الفيحاء"),
        e("Al Wehda", "الوحدة"),
        e("Al Okhdood", "الأخدود"),
        e("Al Hazem", "الحزم"),
        e("Al Riyadh", "الرياض"),
        e("Al Qadsiah", "القادسية"),
        e("Neom", "نيوم"),
        e("Al Kholood", "الخلود"),
        // England
        e("Arsenal", "أرسنال"),
        e("Chelsea", "تشيلسي"),
        e("Manchester City", "مانشستر سيتي").with_aliases(&["Man City"]),
        e("Manchester United", "مانشستر يونايتد").with_aliases(&["Man United", "Man Utd"]),
        e("Liverpool", "ليفربول"),
        e("Tottenham Hotspur", "توتنهام هوتسبير").with_aliases(&["Tottenham", "Spurs", "توتنهام"]),
        e("Newcastle United", "نيوكاسل يونايتد").with_aliases(&["Newcastle", "نيوكاسل"]),
        e("Aston Villa", "أستون فيلا"),
        e("West Ham United", "وست هام يونايتد").with_aliases(&["West Ham", "وست هام"]),
        e("Brighton & Hove Albion", "برايتون").with_aliases(&["Brighton"]),
        e("Fulham", "فولهام").with_aliases(&["فولام"]),
        e("Crystal Palace", "كريستال بالاس"),
        e("Brentford", "برينتفورد"),
        e("Wolverhampton Wanderers", "وولفرهامبتون").with_aliases(&["Wolves", "ولفرهامبتون"]),
        e("Everton", "إيفرتون"),
        e("Nottingham Forest", "نوتنغهام فورست"),
        e("Bournemouth", "بورنموث"),
        e("Ipswich Town", "إيبسويتش تاون"),
        e("Leicester City", "ليستر سيتي").with_aliases(&["Leicester"]),
        e("Southampton", "ساوثهامبتون"),
        // Spain
        e("Real Madrid", "ريال مدريد"),
        e("Barcelona", "برشلونة"),
        e("Atletico Madrid", "أتلتيكو مدريد"),
        e("Girona", "جيرونا"),
        e("Athletic Bilbao", "أتلتيك بلباو").with_aliases(&["Athletic Club", "أتلتيك بيلباو"]),
        e("Real Sociedad", "ريال سوسييداد").with_aliases(&["ريال سوسيداد"]),
        e("Real Betis", "ريال بيتيس"),
        e("Valencia", "فالنسيا"),
        e("Villarreal", "فياريال"),
        e("Getafe", "خيتافي"),
        e("Osasuna", "أوساسونا"),
        e("Sevilla", "إشبيلية"),
        e("Celta Vigo", "سيلتا فيغو"),
        e("Rayo Vallecano", "رايو فاليكانو"),
        e("Las Palmas", "لاس بالماس"),
        e("Alaves", "ألافيس"),
        e("Mallorca", "ريال مايوركا"),
        e("Valladolid", "بلد الوليد"),
        e("Almeria", "ألميريا"),
        // Italy
        e("Inter Milan", "إنتر ميلان").with_aliases(&["Inter", "Internazionale", "إنتر"]),
        e("AC Milan", "ميلان").with_aliases(&["Milan", "إيه سي ميلان"]),
        e("Juventus", "يوفنتوس"),
        e("Napoli", "نابولي"),
        e("Roma", "روما").with_aliases(&["AS Roma"]),
        e("Lazio", "لاتسيو"),
        e("Fiorentina", "فيورنتينا"),
        e("Atalanta", "أتالانتا").with_aliases(&["أتلانتا"]),
        e("Bologna", "بولونيا"),
        e("Torino", "تورينو"),
        e("Udinese", "أودينيزي"),
        e("Genoa", "جنوى"),
        e("Cagliari", "كالياري"),
        e("Empoli", "إمبولي"),
        e("Monza", "مونزا"),
        e("Lecce", "ليتشي"),
        e("Verona", "فيرونا").with_aliases(&["Hellas Verona"]),
        e("Parma", "بارما"),
        e("Como", "كومو"),
        e("Sassuolo", "ساسوولو"),
        // France
        e("Paris Saint-Germain", "باريس سان جيرمان").with_aliases(&["PSG", "Paris SG"]),
        e("Marseille", "مارسيليا"),
        e("Lyon", "ليون").with_aliases(&["Olympique Lyonnais"]),
        e("Lille", "ليل"),
        e("Monaco", "موناكو").with_aliases(&["AS Monaco"]),
        e("Nice", "نيس"),
        e("Brest", "بريست"),
        e("Lens", "لانس"),
        e("Rennes", "رين"),
        // Germany
        e("Bayern Munich", "بايرن ميونخ").with_aliases(&["Bayern Munchen", "Bayern"]),
        e("Borussia Dortmund", "بوروسيا دورتموند").with_aliases(&["Dortmund"]),
        e("RB Leipzig", "لايبزيغ").with_aliases(&["Leipzig", "لايبزيج"]),
        e("Bayer Leverkusen", "باير ليفركوزن").with_aliases(&["Leverkusen"]),
        e("VfB Stuttgart", "شتوتغارت").with_aliases(&["Stuttgart", "شتوتجارت"]),
        e("Wolfsburg", "فولفسبورغ").with_aliases(&["فولفسبورج"]),
        e("Hoffenheim", "هوفنهايم"),
        e("Freiburg", "فرايبورغ").with_aliases(&["فرايبورج"]),
        e("Augsburg", "أوغسبورغ"),
        e("Werder Bremen", "فيردر بريمن"),
        e("Borussia Monchengladbach", "بوروسيا مونشنغلادباخ")
            .with_aliases(&["Monchengladbach", "Gladbach", "مونشنغلادباخ"]),
        e("Union Berlin", "يونيون برلين"),
        e("Eintracht Frankfurt", "آينتراخت فرانكفورت"),
        e("Hamburg", "هامبورج"),
        // Netherlands / Portugal / Turkey
        e("PSV Eindhoven", "آيندهوفن").with_aliases(&["PSV"]),
        e("Feyenoord", "فاينورد"),
        e("Ajax", "أياكس"),
        e("Sporting CP", "سبورتينغ لشبونة").with_aliases(&["Sporting Lisbon"]),
        e("Benfica", "بنفيكا"),
        e("Porto", "بورتو"),
        e("Braga", "سبورتينغ براغا"),
        e("Galatasaray", "غلطة سراي"),
        e("Fenerbahce", "فنربخشة"),
        // Egypt
        e("Al Ahly", "الأهلي المصري"),
        e("Zamalek", "الزمالك"),
        e("Pyramids", "بيراميدز"),
        // South America
        e("Flamengo", "فلامنغو"),
        e("Palmeiras", "بالميراس"),
        e("Boca Juniors", "بوكا جونيورز"),
        e("River Plate", "ريفر بليت"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup_both_directions() {
        let dict = TeamDictionary::builtin();
        assert_eq!(dict.lookup("برينتفورد"), Some("Brentford"));
        assert_eq!(dict.lookup("تشيلسي"), Some("Chelsea"));
        assert_eq!(dict.lookup("Chelsea FC"), Some("تشيلسي"));
        assert_eq!(dict.lookup("Al-Hilal"), Some("الهلال"));
        assert_eq!(dict.lookup("الهلال"), Some("Al Hilal"));
    }

    #[test]
    fn test_lookup_survives_spelling_variants() {
        let dict = TeamDictionary::builtin();
        // hamza / ta marbuta / alif maqsura
        assert_eq!(dict.lookup("اشبيليه"), Some("Sevilla"));
        assert_eq!(dict.lookup("جنوي"), Some("Genoa"));
        assert_eq!(dict.lookup("Atlético Madrid"), Some("أتلتيكو مدريد"));
        assert_eq!(dict.lookup("Man Utd"), Some("مانشستر يونايتد"));
    }

    #[test]
    fn test_substring_fallback_prefers_longest() {
        let dict = TeamDictionary::builtin();
        // "Real Madrid Castilla" contains "realmadrid" (and "madrid" via Atletico? no)
        assert_eq!(dict.lookup("Real Madrid Castilla"), Some("ريال مدريد"));
        // Contains both "inter" and "intermilan": longest wins
        assert_eq!(dict.lookup("Inter Milan Women"), Some("إنتر ميلان"));
        // Short keys never match as substrings ("ليل" is three letters)
        assert_eq!(dict.lookup("ليلة"), None);
    }

    #[test]
    fn test_unknown_and_empty() {
        let dict = TeamDictionary::builtin();
        assert_eq!(dict.lookup("Kaizer Chiefs"), None);
        assert_eq!(dict.lookup(""), None);
        assert_eq!(dict.lookup("⚽"), None);
    }

    #[test]
    fn test_first_entry_keeps_shared_spelling() {
        let mut dict = TeamDictionary::from_entries(vec![DictionaryEntry::new("Al Ahli", "الأهلي")]);
        dict.insert(DictionaryEntry::new("Al Ahly", "الأهلي"));
        assert_eq!(dict.lookup("الأهلي"), Some("Al Ahli"));
        assert_eq!(dict.lookup("Al Ahly"), Some("الأهلي"));
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_load_v2_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teams.json");
        std::fs::write(
            &path,
            r#"{
                "version": 2,
                "entries": [
                    {"latin": "Kaizer Chiefs", "arabic": "كايزر تشيفز", "aliases": ["Chiefs"]},
                    {"latin": "Orlando Pirates", "arabic": "أورلاندو بايرتس"}
                ]
            }"#,
        )
        .unwrap();

        let dict = TeamDictionary::load_from(&path).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.lookup("Chiefs"), Some("كايزر تشيفز"));
        assert_eq!(dict.lookup("اورلاندو بايرتس"), Some("Orlando Pirates"));
    }

    #[test]
    fn test_load_v1_flat_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        std::fs::write(
            &path,
            r#"{"forward": {"برينتفورد": "Brentford", "تشيلسي": "Chelsea"}}"#,
        )
        .unwrap();

        let dict = TeamDictionary::load_from(&path).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.lookup("تشيلسي"), Some("Chelsea"));
        // Reverse is rebuilt
        assert_eq!(dict.lookup("Brentford"), Some("برينتفورد"));
    }

    #[test]
    fn test_load_errors_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(TeamDictionary::load_from(&missing).is_err());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        let err = TeamDictionary::load_from(&bad).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing team dictionary"));
    }

    #[test]
    fn test_save_creates_v2_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");
        let dict = TeamDictionary::from_entries(vec![
            DictionaryEntry::new("Chelsea", "تشيلسي").with_aliases(&["Chelsea FC"]),
        ]);
        dict.save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"version\": 2"));
        assert!(contents.contains("\"entries\""));
        assert!(!contents.contains("\"forward\""));

        let loaded = TeamDictionary::load_from(&path).unwrap();
        assert_eq!(loaded.lookup("تشيلسي"), Some("Chelsea"));
    }
}
