//! Field normalization
//!
//! Maps free-form source values onto the fixed vocabularies used by
//! `JobPosting`: education levels, employment types and timestamps.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Canonical education levels, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EducationLevel {
    Irrelevant,
    HighSchool,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl EducationLevel {
    /// Label stored on postings
    pub fn label(&self) -> &'static str {
        match self {
            Self::Irrelevant => "무관",
            Self::HighSchool => "고졸",
            Self::Associate => "전문대졸",
            Self::Bachelor => "학사",
            Self::Master => "석사",
            Self::Doctorate => "박사",
        }
    }

    /// Classifies a short education value by substring containment
    ///
    /// Levels are tried in declaration order; the first level with a matching
    /// variant wins.
    pub fn from_value(value: &str) -> Option<Self> {
        let upper = value.trim().to_uppercase();
        EDUCATION_VARIANTS
            .iter()
            .find(|(_, variants)| variants.iter().any(|v| upper.contains(v)))
            .map(|(level, _)| *level)
    }
}

/// Variant spellings per level; order matters (`전문대졸` contains `대졸`)
const EDUCATION_VARIANTS: &[(EducationLevel, &[&str])] = &[
    (
        EducationLevel::Irrelevant,
        &["무관", "불문", "IRRELEVANT", "NOT_REQUIRED"],
    ),
    (
        EducationLevel::HighSchool,
        &["고졸", "고등학교", "HIGH_SCHOOL", "HIGHSCHOOL"],
    ),
    (
        EducationLevel::Associate,
        &["전문대", "초대졸", "2년제", "3년제", "ASSOCIATE", "COLLEGE"],
    ),
    (
        EducationLevel::Bachelor,
        &["학사", "대졸", "4년제", "대학교", "BACHELOR", "UNIVERSITY"],
    ),
    (EducationLevel::Master, &["석사", "MASTER"]),
    (EducationLevel::Doctorate, &["박사", "DOCTOR", "PHD", "PH.D"]),
];

/// Keywords searched in descriptive text, most specific first
const EDUCATION_KEYWORDS: &[(&str, EducationLevel)] = &[
    ("박사", EducationLevel::Doctorate),
    ("석사", EducationLevel::Master),
    ("전문대", EducationLevel::Associate),
    ("초대졸", EducationLevel::Associate),
    ("학사", EducationLevel::Bachelor),
    ("대졸", EducationLevel::Bachelor),
    ("4년제", EducationLevel::Bachelor),
    ("고졸", EducationLevel::HighSchool),
    ("고등학교", EducationLevel::HighSchool),
    ("학력무관", EducationLevel::Irrelevant),
    ("학력 무관", EducationLevel::Irrelevant),
];

/// Normalizes a free-form education value
///
/// Returns one of the six canonical labels, or the trimmed input when no
/// level matches. Blank input yields `None`.
pub fn normalize_education(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(
        EducationLevel::from_value(trimmed)
            .map(|level| level.label().to_string())
            .unwrap_or_else(|| trimmed.to_string()),
    )
}

/// Derives the education requirement of a posting
///
/// Precedence: first non-blank entry of the explicit list, then the singular
/// field, then a keyword search over `text`.
pub fn extract_education(list: &[String], single: Option<&str>, text: &str) -> Option<String> {
    if let Some(value) = list.iter().find(|v| !v.trim().is_empty()) {
        return normalize_education(value);
    }

    if let Some(value) = single.filter(|v| !v.trim().is_empty()) {
        return normalize_education(value);
    }

    EDUCATION_KEYWORDS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map(|(_, level)| level.label().to_string())
}

/// Source employment-type codes and their labels
const EMPLOYMENT_TYPES: &[(&str, &str)] = &[
    ("FULL_TIME", "정규직"),
    ("CONTRACT", "계약직"),
    ("CONTRACTOR", "계약직"),
    ("TEMPORARY", "계약직"),
    ("INTERN", "인턴"),
    ("INTERNSHIP", "인턴"),
    ("PART_TIME", "아르바이트"),
    ("FREELANCE", "프리랜서"),
    ("FREELANCER", "프리랜서"),
    ("DISPATCH", "파견직"),
    ("MILITARY_SERVICE", "병역특례"),
    ("OTHER", "기타"),
];

/// Maps one employment-type code to its label
///
/// Unknown codes pass through trimmed so new source values are not lost.
pub fn map_employment_type(code: &str) -> String {
    let trimmed = code.trim();
    let upper = trimmed.to_uppercase();

    EMPLOYMENT_TYPES
        .iter()
        .find(|(known, _)| *known == upper)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Maps a list of codes, dropping blanks and duplicate labels
pub fn map_employment_types<I, S>(codes: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut labels: Vec<String> = Vec::new();
    for code in codes {
        if code.as_ref().trim().is_empty() {
            continue;
        }
        let label = map_employment_type(code.as_ref());
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

/// The source publishes local times in KST
fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

/// Current calendar date on the source's clock
pub fn today_kst() -> NaiveDate {
    Utc::now().with_timezone(&kst()).date_naive()
}

/// Parses the timestamp formats found in sitemaps and page payloads
///
/// Accepts RFC 3339, naive date-times (read as KST) and plain dates (KST
/// midnight). The streamed payload prefixes dates with `$D`; that marker is
/// stripped first.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let value = raw.trim().trim_start_matches("$D");
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return kst()
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }

    parse_plain_date(value).and_then(|date| {
        kst()
            .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    })
}

fn parse_plain_date(value: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Parses a calendar date (in KST) from any supported timestamp format
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim().trim_start_matches("$D");
    if let Some(date) = parse_plain_date(value) {
        return Some(date);
    }
    parse_timestamp(value).map(|dt| dt.with_timezone(&kst()).date_naive())
}
