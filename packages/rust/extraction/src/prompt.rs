//! Query builder: turns a [`ScanQuery`] into an engine request.

use leadmatrix_shared::{GeoBias, ScanQuery};

use crate::contract::{LEAD_END, LEAD_START, field_listing};

/// Substituted when the operator gave no boolean refinement.
pub const STANDARD_EXTRACTION: &str = "Standard Extraction";

/// Grounding capabilities declared on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundingTool {
    /// Maps grounding (physical locations, local signals).
    GoogleMaps,
    /// General web search.
    GoogleSearch,
}

/// A fully assembled engine request, independent of the wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    /// Fixed extraction instructions and output contract.
    pub system_instruction: String,
    /// Task-specific prompt (category, location, boolean script).
    pub prompt: String,
    pub tools: Vec<GroundingTool>,
    /// Retrieval hint; `None` means no hint is sent at all.
    pub geo_bias: Option<GeoBias>,
}

/// The boolean script forwarded to the engine.
pub fn boolean_script(query: &ScanQuery) -> &str {
    match query.boolean_logic.as_deref().map(str::trim) {
        Some(logic) if !logic.is_empty() => logic,
        _ => STANDARD_EXTRACTION,
    }
}

/// Assemble the instruction, prompt, and grounding configuration.
pub fn build_request(query: &ScanQuery, geo_bias: Option<GeoBias>) -> ExtractionRequest {
    ExtractionRequest {
        system_instruction: system_instruction(query),
        prompt: task_prompt(query),
        tools: vec![GroundingTool::GoogleMaps, GroundingTool::GoogleSearch],
        geo_bias,
    }
}

fn system_instruction(query: &ScanQuery) -> String {
    let script = boolean_script(query);
    let fields = field_listing();
    format!(
        "You are the LeadMatrix Intelligence Engine.\n\
Extract high-fidelity business data and identify Market Leaders (Founders, CEOs, Directors) using Google Maps and web grounding.\n\
\n\
CRITICAL RULES:\n\
- BOOLEAN RESOLUTION: Apply the Boolean script precisely (e.g., \"{script}\").\n\
- SOCIAL MINING: Find specific profiles on LinkedIn, Twitter, and Facebook.\n\
- CONTACT FIDELITY: Prioritize corporate emails.\n\
\n\
OUTPUT:\n\
Generate 10-15 leads. Wrap each lead in {LEAD_START} and {LEAD_END}.\n\
Write one field per line as KEY: value.\n\
FIELDS:\n\
{fields}."
    )
}

fn task_prompt(query: &ScanQuery) -> String {
    format!(
        "CATEGORY: {}\nLOCATION: {}\nBOOLEAN SCRIPT: {}",
        query.category,
        query.location,
        boolean_script(query)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_query() {
        let query = ScanQuery::new("dental clinics", "Lagos, Nigeria")
            .with_boolean_logic("HAS email AND NOT chain");
        let request = build_request(&query, None);
        assert_eq!(
            request.prompt,
            "CATEGORY: dental clinics\nLOCATION: Lagos, Nigeria\nBOOLEAN SCRIPT: HAS email AND NOT chain"
        );
        assert!(request.system_instruction.contains("\"HAS email AND NOT chain\""));
    }

    #[test]
    fn missing_boolean_logic_uses_standard_extraction() {
        let query = ScanQuery::new("gyms", "Nairobi");
        assert_eq!(boolean_script(&query), STANDARD_EXTRACTION);

        let blank = ScanQuery::new("gyms", "Nairobi").with_boolean_logic("   ");
        assert_eq!(boolean_script(&blank), STANDARD_EXTRACTION);

        let request = build_request(&query, None);
        assert!(request.prompt.ends_with("BOOLEAN SCRIPT: Standard Extraction"));
    }

    #[test]
    fn instruction_requests_contract_verbatim() {
        let request = build_request(&ScanQuery::new("cafes", "Accra"), None);
        let instruction = &request.system_instruction;
        assert!(instruction.contains("[[LEAD_START]] and [[LEAD_END]]"));
        assert!(instruction.contains(
            "NAME, ADDR, PHONE, EMAIL, WEB, LEADER (Name), ROLE (Title), LI (LinkedIn), \
             TW (Twitter), FB (Facebook), DESC (Analysis), LAT, LNG, CHAN (Marketing Channel)."
        ));
    }

    #[test]
    fn tools_always_declared() {
        let request = build_request(&ScanQuery::new("cafes", "Accra"), None);
        assert_eq!(
            request.tools,
            vec![GroundingTool::GoogleMaps, GroundingTool::GoogleSearch]
        );
    }

    #[test]
    fn geo_bias_is_passed_through_or_omitted() {
        let query = ScanQuery::new("cafes", "Accra");
        assert!(build_request(&query, None).geo_bias.is_none());

        let bias = GeoBias::new(5.6037, -0.187);
        assert_eq!(build_request(&query, Some(bias)).geo_bias, Some(bias));
    }
}
