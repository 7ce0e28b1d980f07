//! CSV export of a lead set.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use leadmatrix_shared::{Business, LeadMatrixError, Result, ScanQuery};
use tracing::info;

/// Column titles, in row order.
pub const CSV_HEADERS: [&str; 13] = [
    "Matrix ID",
    "Business Name",
    "Address",
    "Phone",
    "Email",
    "Website",
    "Leader Name",
    "Leader Role",
    "LinkedIn",
    "X (Twitter)",
    "Facebook",
    "Market Analysis",
    "Primary Channel",
];

/// Wrap a free-text value in quotes, doubling embedded quotes.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn csv_row(biz: &Business) -> String {
    let social = &biz.social_footprint;
    let quoted = [
        &biz.name,
        &biz.address,
        &biz.phone,
        &biz.email,
        &biz.website,
        &biz.leader_name,
        &biz.leader_role,
        &social.linkedin,
        &social.twitter,
        &social.facebook,
        &biz.description,
        &biz.channel,
    ]
    .map(|field| quote(field));

    format!("{},{}", biz.id, quoted.join(","))
}

/// Render the header and one row per lead, joined by `\n`.
pub fn to_csv(leads: &[Business]) -> String {
    std::iter::once(CSV_HEADERS.join(","))
        .chain(leads.iter().map(csv_row))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Characters that cannot appear in a file name on common platforms.
const UNSAFE_FILE_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

fn file_safe(c: char) -> char {
    if c.is_control() || UNSAFE_FILE_CHARS.contains(&c) {
        '_'
    } else {
        c
    }
}

/// `OM_EXTRACT_<category>_<unix millis>.csv`. Whitespace runs in the category
/// collapse to `_` and path separators or other unsafe characters become `_`.
pub fn export_file_name(query: &ScanQuery, now: DateTime<Utc>) -> String {
    let category = query
        .category
        .split_whitespace()
        .map(|word| word.chars().map(file_safe).collect::<String>())
        .collect::<Vec<_>>()
        .join("_");
    format!("OM_EXTRACT_{category}_{}.csv", now.timestamp_millis())
}

/// Write the lead set as CSV into `dir` and return the file path.
pub fn write_csv(dir: &Path, query: &ScanQuery, leads: &[Business]) -> Result<PathBuf> {
    if leads.is_empty() {
        return Err(LeadMatrixError::validation("nothing to export"));
    }

    std::fs::create_dir_all(dir).map_err(|e| LeadMatrixError::io(dir, e))?;
    let path = dir.join(export_file_name(query, Utc::now()));
    std::fs::write(&path, to_csv(leads)).map_err(|e| {
        LeadMatrixError::Export(format!("failed to write {}: {e}", path.display()))
    })?;

    info!(path = %path.display(), rows = leads.len(), "exported leads");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use leadmatrix_shared::LeadId;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("lm_export_{}", uuid::Uuid::now_v7()))
    }

    #[test]
    fn header_line() {
        let csv = to_csv(&[]);
        assert_eq!(
            csv,
            "Matrix ID,Business Name,Address,Phone,Email,Website,Leader Name,Leader Role,\
             LinkedIn,X (Twitter),Facebook,Market Analysis,Primary Channel"
        );
    }

    #[test]
    fn rows_quote_fields_and_double_quotes() {
        let biz = Business {
            id: LeadId("NODE-0000ABCD-0042".into()),
            description: "Known as \"the\" clinic".into(),
            ..Business::named("Smile, Bright")
        };
        let csv = to_csv(&[biz]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.starts_with("NODE-0000ABCD-0042,\"Smile, Bright\",\"N/A\","));
        assert!(row.contains("\"Known as \"\"the\"\" clinic\""));
        assert!(row.ends_with(",\"N/A\""));
    }

    #[test]
    fn one_row_per_lead() {
        let leads = vec![Business::named("Alpha"), Business::named("Beta")];
        let csv = to_csv(&leads);
        assert_eq!(csv.lines().count(), 3);
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn file_name_collapses_whitespace() {
        let now = Utc.timestamp_millis_opt(1_760_000_000_123).unwrap();
        let query = ScanQuery::new("dental  clinics\tlagos", "Lagos");
        assert_eq!(
            export_file_name(&query, now),
            "OM_EXTRACT_dental_clinics_lagos_1760000000123.csv"
        );
    }

    #[test]
    fn file_name_replaces_unsafe_characters() {
        let now = Utc.timestamp_millis_opt(1_760_000_000_123).unwrap();
        let query = ScanQuery::new("B2B/SaaS vendors", "Berlin");
        assert_eq!(
            export_file_name(&query, now),
            "OM_EXTRACT_B2B_SaaS_vendors_1760000000123.csv"
        );

        let query = ScanQuery::new("cafes\\bakeries: \"best\" <24h>|?*", "Accra");
        assert_eq!(
            export_file_name(&query, now),
            "OM_EXTRACT_cafes_bakeries___best___24h_____1760000000123.csv"
        );
    }

    #[test]
    fn write_csv_with_slash_in_category_stays_in_dir() {
        let dir = temp_dir();
        let query = ScanQuery::new("B2B/SaaS vendors", "Berlin");
        let path = write_csv(&dir, &query, &[Business::named("Acme GmbH")]).unwrap();

        assert_eq!(path.parent(), Some(dir.as_path()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("OM_EXTRACT_B2B_SaaS_vendors_"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"Acme GmbH\""));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_csv_creates_file() {
        let dir = temp_dir();
        let query = ScanQuery::new("gyms", "Nairobi");
        let path = write_csv(&dir, &query, &[Business::named("Iron Works")]).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("OM_EXTRACT_gyms_"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Iron Works\""));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_csv_rejects_empty_set() {
        let err = write_csv(&temp_dir(), &ScanQuery::new("gyms", "Nairobi"), &[]).unwrap_err();
        assert!(err.to_string().contains("nothing to export"));
    }
}
