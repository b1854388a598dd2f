//! Keyword-based classification of campaign export files.

use report_core::models::CampaignType;

/// Categories whose files each contribute one row to the summary table.
pub const SUMMARY_KEYWORDS: [&str; 8] = [
    "VOD", "TVE", "LSA", "Delivery", "Daily", "Hourly", "Creative", "Geo",
];

const ADDRESSABLE_KEYWORDS: [&str; 9] = [
    "VOD",
    "LSA",
    "Delivery",
    "Reach-Frequency",
    "Unique RF",
    "Daily",
    "Hourly",
    "Creative",
    "Geo",
];

const NON_ADDRESSABLE_KEYWORDS: [&str; 9] = [
    "VOD",
    "TVE",
    "Delivery",
    "Reach-Frequency",
    "Unique RF",
    "Daily",
    "Hourly",
    "Creative",
    "Geo",
];

/// `true` when files of `category` feed the summary table.
pub fn is_summary_keyword(category: &str) -> bool {
    SUMMARY_KEYWORDS.contains(&category)
}

/// Ranked category keywords. Earlier entries win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordList(Vec<String>);

impl KeywordList {
    /// Build from explicit keywords, dropping blanks and repeats.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for k in keywords {
            let k: String = k.into().trim().to_string();
            if !k.is_empty() && !out.contains(&k) {
                out.push(k);
            }
        }
        Self(out)
    }

    /// Default ranking for `campaign`.
    pub fn for_campaign(campaign: CampaignType) -> Self {
        match campaign {
            CampaignType::Addressable => Self::new(ADDRESSABLE_KEYWORDS),
            CampaignType::NonAddressable => Self::new(NON_ADDRESSABLE_KEYWORDS),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first keyword appearing in `file_name`, ignoring case.
    pub fn classify(&self, file_name: &str) -> Option<&str> {
        let name = file_name.to_lowercase();
        self.0
            .iter()
            .find(|k| name.contains(&k.to_lowercase()))
            .map(String::as_str)
    }
}

/// A file together with the category it was assigned, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified<T> {
    pub name: String,
    pub source: T,
    pub category: Option<String>,
}

/// Classify every `(name, source)` pair, preserving input order.
pub fn classify_all<T>(keywords: &KeywordList, files: Vec<(String, T)>) -> Vec<Classified<T>> {
    files
        .into_iter()
        .map(|(name, source)| {
            let category = keywords.classify(&name).map(str::to_string);
            Classified {
                name,
                source,
                category,
            }
        })
        .collect()
}
