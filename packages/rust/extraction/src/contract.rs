//! The block format the engine is asked to emit and the parser accepts.
//!
//! ```text
//! [[LEAD_START]]
//! NAME: Acme Corp
//! ADDR: 1 Main St
//! ...
//! [[LEAD_END]]
//! ```

/// Opens a lead block.
pub const LEAD_START: &str = "[[LEAD_START]]";

/// Closes a lead block.
pub const LEAD_END: &str = "[[LEAD_END]]";

/// One `KEY: value` line inside a lead block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadField {
    Name,
    Address,
    Phone,
    Email,
    Website,
    Leader,
    Role,
    LinkedIn,
    Twitter,
    Facebook,
    Description,
    Latitude,
    Longitude,
    Channel,
}

impl LeadField {
    /// Every field, in the order the engine is asked to emit them.
    pub const ALL: [LeadField; 14] = [
        Self::Name,
        Self::Address,
        Self::Phone,
        Self::Email,
        Self::Website,
        Self::Leader,
        Self::Role,
        Self::LinkedIn,
        Self::Twitter,
        Self::Facebook,
        Self::Description,
        Self::Latitude,
        Self::Longitude,
        Self::Channel,
    ];

    /// The line prefix (without the colon).
    pub fn key(&self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Address => "ADDR",
            Self::Phone => "PHONE",
            Self::Email => "EMAIL",
            Self::Website => "WEB",
            Self::Leader => "LEADER",
            Self::Role => "ROLE",
            Self::LinkedIn => "LI",
            Self::Twitter => "TW",
            Self::Facebook => "FB",
            Self::Description => "DESC",
            Self::Latitude => "LAT",
            Self::Longitude => "LNG",
            Self::Channel => "CHAN",
        }
    }

    /// Hint shown to the engine next to the key, if any.
    fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Leader => Some("Name"),
            Self::Role => Some("Title"),
            Self::LinkedIn => Some("LinkedIn"),
            Self::Twitter => Some("Twitter"),
            Self::Facebook => Some("Facebook"),
            Self::Description => Some("Analysis"),
            Self::Channel => Some("Marketing Channel"),
            _ => None,
        }
    }

    /// Case-insensitive lookup by line prefix.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.key().eq_ignore_ascii_case(key))
    }
}

/// `NAME, ADDR, PHONE, ..., LEADER (Name), ROLE (Title), ...` as listed in the
/// system instruction.
pub(crate) fn field_listing() -> String {
    LeadField::ALL
        .iter()
        .map(|field| match field.hint() {
            Some(hint) => format!("{} ({hint})", field.key()),
            None => field.key().to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
