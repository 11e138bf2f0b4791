//! Aggregate distributions over the roster and the verification log.

use crate::log::VerificationLog;
use crate::types::{InmateRecord, LegalStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const AGE_BUCKETS: [&str; 4] = ["18-30", "31-45", "46-60", "60+"];
const CRIME_BUCKETS: [&str; 6] = [
    "Burglary",
    "Assault",
    "Fraud",
    "Drug Offense",
    "Theft",
    "Other",
];
const SENTENCE_BUCKETS: [&str; 5] = [
    "< 5 years",
    "5-10 years",
    "10-20 years",
    "> 20 years",
    "Life",
];

/// Crime keywords, checked in order; the first hit wins.
const CRIME_KEYWORDS: [(&str, &str); 5] = [
    ("burglary", "Burglary"),
    ("assault", "Assault"),
    ("fraud", "Fraud"),
    ("drug", "Drug Offense"),
    ("theft", "Theft"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analytics {
    pub legal_status: Vec<Bucket>,
    /// Inmates with no recorded age, or under 18, are not counted.
    pub age: Vec<Bucket>,
    /// Inmates with an empty crime field are not counted.
    pub crimes: Vec<Bucket>,
    /// Sentences that do not parse as years, months or life are not counted.
    pub sentences: Vec<Bucket>,
    /// Verifications per prison, busiest first.
    pub prisons: Vec<Bucket>,
    /// Verifications per calendar month (`YYYY-MM`, UTC), oldest first.
    pub monthly: Vec<Bucket>,
}

impl Analytics {
    pub fn compute(inmates: &[InmateRecord], log: &VerificationLog) -> Self {
        let legal_status = LegalStatus::ALL
            .into_iter()
            .map(|status| Bucket {
                name: status.to_string(),
                value: inmates.iter().filter(|i| i.legal_status == status).count(),
            })
            .collect();

        let age = fixed_buckets(
            &AGE_BUCKETS,
            inmates.iter().filter_map(|i| age_bucket(i.age?)),
        );
        let crimes = fixed_buckets(
            &CRIME_BUCKETS,
            inmates.iter().filter_map(|i| crime_bucket(&i.crime)),
        );
        let sentences = fixed_buckets(
            &SENTENCE_BUCKETS,
            inmates.iter().filter_map(|i| sentence_bucket(&i.sentence)),
        );

        let mut per_prison: BTreeMap<&str, usize> = BTreeMap::new();
        let mut per_month: BTreeMap<String, usize> = BTreeMap::new();
        for entry in log.entries() {
            *per_prison.entry(entry.prison.as_str()).or_default() += 1;
            *per_month
                .entry(entry.timestamp.format("%Y-%m").to_string())
                .or_default() += 1;
        }

        let mut prisons: Vec<Bucket> = per_prison
            .into_iter()
            .map(|(name, value)| Bucket {
                name: name.to_string(),
                value,
            })
            .collect();
        // Stable sort keeps names alphabetical within equal counts.
        prisons.sort_by(|a, b| b.value.cmp(&a.value));

        let monthly = per_month
            .into_iter()
            .map(|(name, value)| Bucket { name, value })
            .collect();

        Self {
            legal_status,
            age,
            crimes,
            sentences,
            prisons,
            monthly,
        }
    }
}

fn fixed_buckets<'a>(names: &[&str], hits: impl Iterator<Item = &'a str>) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = names
        .iter()
        .map(|name| Bucket {
            name: name.to_string(),
            value: 0,
        })
        .collect();
    for hit in hits {
        if let Some(bucket) = buckets.iter_mut().find(|b| b.name == hit) {
            bucket.value += 1;
        }
    }
    buckets
}

fn age_bucket(age: u32) -> Option<&'static str> {
    match age {
        0..=17 => None,
        18..=30 => Some(AGE_BUCKETS[0]),
        31..=45 => Some(AGE_BUCKETS[1]),
        46..=60 => Some(AGE_BUCKETS[2]),
        _ => Some(AGE_BUCKETS[3]),
    }
}

fn crime_bucket(crime: &str) -> Option<&'static str> {
    let crime = crime.trim().to_lowercase();
    if crime.is_empty() {
        return None;
    }
    let category = CRIME_KEYWORDS
        .iter()
        .find(|(keyword, _)| crime.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or("Other");
    Some(category)
}

/// Sentence length in months from text like "8 years", "18 months" or "Life".
fn sentence_months(sentence: &str) -> Option<u32> {
    let text = sentence.trim().to_lowercase();
    let mut words = text.split_whitespace();
    let amount: f64 = words.next()?.parse().ok()?;
    let unit = words.next()?;
    let months = if unit.starts_with("year") {
        amount * 12.0
    } else if unit.starts_with("month") {
        amount
    } else {
        return None;
    };
    (months.is_finite() && months >= 0.0).then(|| months.round() as u32)
}

fn sentence_bucket(sentence: &str) -> Option<&'static str> {
    if sentence.to_lowercase().contains("life") {
        return Some(SENTENCE_BUCKETS[4]);
    }
    let months = sentence_months(sentence)?;
    Some(match months {
        0..=59 => SENTENCE_BUCKETS[0],
        60..=120 => SENTENCE_BUCKETS[1],
        121..=240 => SENTENCE_BUCKETS[2],
        _ => SENTENCE_BUCKETS[3],
    })
}
