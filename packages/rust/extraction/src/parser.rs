//! Response parser: engine text → validated [`Business`] records.
//!
//! The engine output is best-effort instruction following, so the parser
//! never fails. Blocks without an end marker, or whose `NAME` is missing or
//! shorter than two characters, are dropped individually.

use std::collections::HashMap;
use std::sync::LazyLock;

use leadmatrix_shared::{Business, LeadId, NOT_AVAILABLE, SocialFootprint};
use regex::Regex;
use tracing::debug;

use crate::contract::LeadField;

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

static LEAD_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\[LEAD_START\]\]").expect("lead start regex"));

static LEAD_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[\[LEAD_END\]\]").expect("lead end regex"));

/// Leading decimal number, optionally signed, with optional exponent.
static LEADING_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("number regex")
});

/// Minimum character count for an admissible `NAME`.
const MIN_NAME_LEN: usize = 2;

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse engine text into lead records, in encounter order.
///
/// `source_count` is the number of grounding citations on the response. It is
/// accepted for forward compatibility and only logged; it does not affect the
/// records.
pub fn parse_response(text: &str, source_count: usize) -> Vec<Business> {
    let mut leads = Vec::new();
    let mut dropped = 0usize;

    // The first segment precedes any start marker.
    for (index, segment) in LEAD_START_RE.split(text).enumerate().skip(1) {
        let Some(end) = LEAD_END_RE.find(segment) else {
            debug!(block = index, "dropping block without end marker");
            dropped += 1;
            continue;
        };

        let fields = BlockFields::parse(segment[..end.start()].trim());
        match fields.into_business() {
            Some(business) => leads.push(business),
            None => {
                debug!(block = index, "dropping block without a usable NAME");
                dropped += 1;
            }
        }
    }

    debug!(
        leads = leads.len(),
        dropped, source_count, "engine response parsed"
    );

    leads
}

/// First-match-wins view of one block's `KEY: value` lines.
struct BlockFields<'a> {
    values: HashMap<LeadField, &'a str>,
}

impl<'a> BlockFields<'a> {
    fn parse(content: &'a str) -> Self {
        let mut values = HashMap::new();
        for line in content.lines() {
            // Everything after the first colon is the value, so URLs keep
            // their scheme and port separators.
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            if let Some(field) = LeadField::from_key(key) {
                values.entry(field).or_insert(value.trim());
            }
        }
        Self { values }
    }

    /// The field's value, or the sentinel when missing or blank.
    fn get(&self, field: LeadField) -> String {
        match self.values.get(&field) {
            Some(value) if !value.is_empty() => (*value).to_string(),
            _ => NOT_AVAILABLE.to_string(),
        }
    }

    fn into_business(self) -> Option<Business> {
        let name = self.get(LeadField::Name);
        if name == NOT_AVAILABLE || name.chars().count() < MIN_NAME_LEN {
            return None;
        }

        Some(Business {
            id: LeadId::generate(),
            name,
            address: self.get(LeadField::Address),
            phone: self.get(LeadField::Phone),
            email: self.get(LeadField::Email),
            website: self.get(LeadField::Website),
            leader_name: self.get(LeadField::Leader),
            leader_role: self.get(LeadField::Role),
            description: self.get(LeadField::Description),
            channel: self.get(LeadField::Channel),
            social_footprint: SocialFootprint {
                linkedin: self.get(LeadField::LinkedIn),
                twitter: self.get(LeadField::Twitter),
                facebook: self.get(LeadField::Facebook),
            },
            latitude: parse_coordinate(&self.get(LeadField::Latitude)),
            longitude: parse_coordinate(&self.get(LeadField::Longitude)),
        })
    }
}

/// Best-effort coordinate: the leading number of the value, else `0.0`.
pub(crate) fn parse_coordinate(value: &str) -> f64 {
    LEADING_NUMBER_RE
        .find(value.trim_start())
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
