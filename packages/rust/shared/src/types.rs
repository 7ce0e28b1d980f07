//! Core domain types for LeadMatrix scans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel used for every field the engine did not supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Whether a record field holds a real value rather than [`NOT_AVAILABLE`].
pub fn is_present(value: &str) -> bool {
    value != NOT_AVAILABLE
}

// ---------------------------------------------------------------------------
// ScanQuery
// ---------------------------------------------------------------------------

/// Operator intent: what to look for and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanQuery {
    /// Business category (e.g. "dental clinics").
    pub category: String,
    /// Geographic zone (e.g. "Lagos, Nigeria").
    pub location: String,
    /// Free-form boolean refinement, forwarded verbatim to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_logic: Option<String>,
}

impl ScanQuery {
    pub fn new(category: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            location: location.into(),
            boolean_logic: None,
        }
    }

    pub fn with_boolean_logic(mut self, logic: impl Into<String>) -> Self {
        self.boolean_logic = Some(logic.into());
        self
    }
}

// ---------------------------------------------------------------------------
// GeoBias
// ---------------------------------------------------------------------------

/// Best-effort operator position used to bias maps grounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBias {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoBias {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both coordinates are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

// ---------------------------------------------------------------------------
// RawExtractionResult
// ---------------------------------------------------------------------------

/// Unparsed engine output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawExtractionResult {
    /// Free-form text containing zero or more lead blocks.
    pub text: String,
    /// Number of grounding citations attached to the response.
    pub source_count: usize,
}

// ---------------------------------------------------------------------------
// LeadId
// ---------------------------------------------------------------------------

/// Parse-time identifier for a lead, e.g. `NODE-3FA94C1B-0421`.
///
/// The hex token comes from the random tail of a UUID v7; the numeric
/// suffix is the last four digits of the current Unix millisecond clock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl LeadId {
    /// Generate a fresh identifier. Never reuses a previous value in practice.
    pub fn generate() -> Self {
        let uuid = Uuid::now_v7().simple().to_string();
        let token = uuid[uuid.len() - 8..].to_ascii_uppercase();
        let suffix = Utc::now().timestamp_millis().rem_euclid(10_000);
        Self(format!("NODE-{token}-{suffix:04}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Business
// ---------------------------------------------------------------------------

/// Social profile URLs for a lead; each is a URL or [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialFootprint {
    pub linkedin: String,
    pub twitter: String,
    pub facebook: String,
}

impl Default for SocialFootprint {
    fn default() -> Self {
        Self {
            linkedin: NOT_AVAILABLE.into(),
            twitter: NOT_AVAILABLE.into(),
            facebook: NOT_AVAILABLE.into(),
        }
    }
}

/// One extracted lead. String fields carry [`NOT_AVAILABLE`] when unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: LeadId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub leader_name: String,
    pub leader_role: String,
    pub description: String,
    /// Primary marketing channel.
    pub channel: String,
    pub social_footprint: SocialFootprint,
    pub latitude: f64,
    pub longitude: f64,
}

impl Business {
    /// A record with the given name and every other field unset.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: LeadId::generate(),
            name: name.into(),
            address: NOT_AVAILABLE.into(),
            phone: NOT_AVAILABLE.into(),
            email: NOT_AVAILABLE.into(),
            website: NOT_AVAILABLE.into(),
            leader_name: NOT_AVAILABLE.into(),
            leader_role: NOT_AVAILABLE.into(),
            description: NOT_AVAILABLE.into(),
            channel: NOT_AVAILABLE.into(),
            social_footprint: SocialFootprint::default(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    /// Compare every field except the parse-time `id`.
    pub fn same_content(&self, other: &Business) -> bool {
        Business {
            id: other.id.clone(),
            ..self.clone()
        } == *other
    }
}

// ---------------------------------------------------------------------------
// SavedSession
// ---------------------------------------------------------------------------

/// The last successful scan, as kept in the session slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub query: ScanQuery,
    pub leads: Vec<Business>,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_id_format() {
        let id = LeadId::generate();
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "NODE");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn lead_ids_do_not_repeat_within_a_run() {
        let ids: std::collections::HashSet<LeadId> =
            (0..200).map(|_| LeadId::generate()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn named_business_defaults_to_sentinel() {
        let biz = Business::named("Acme");
        assert_eq!(biz.phone, NOT_AVAILABLE);
        assert_eq!(biz.social_footprint.facebook, NOT_AVAILABLE);
        assert_eq!(biz.latitude, 0.0);
        assert!(!is_present(&biz.email));
        assert!(is_present(&biz.name));
    }

    #[test]
    fn same_content_ignores_id() {
        let a = Business::named("Acme");
        let b = Business::named("Acme");
        assert_ne!(a.id, b.id);
        assert!(a.same_content(&b));

        let c = Business {
            phone: "555-0100".into(),
            ..Business::named("Acme")
        };
        assert!(!a.same_content(&c));
    }

    #[test]
    fn geo_bias_bounds() {
        assert!(GeoBias::new(6.5244, 3.3792).is_valid());
        assert!(!GeoBias::new(91.0, 0.0).is_valid());
        assert!(!GeoBias::new(0.0, f64::NAN).is_valid());
    }

    #[test]
    fn session_serialization() {
        let session = SavedSession {
            query: ScanQuery::new("bakeries", "Accra").with_boolean_logic("HAS email"),
            leads: vec![Business::named("Golden Crust")],
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string(&session).expect("serialize");
        let parsed: SavedSession = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, session);
    }

    #[test]
    fn query_without_boolean_logic_omits_field() {
        let json = serde_json::to_string(&ScanQuery::new("gyms", "Nairobi")).expect("serialize");
        assert!(!json.contains("boolean_logic"));
        let parsed: ScanQuery = serde_json::from_str(&json).expect("deserialize");
        assert!(parsed.boolean_logic.is_none());
    }
}
