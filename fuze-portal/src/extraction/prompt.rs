//! Extraction prompt
//!
//! One user message carrying the full transcript and the field schema, plus a
//! system message demanding bare JSON.

use crate::collaborator::{ChatMessage, ChatRequest};
use fuze_common::Recommendation;

pub const SYSTEM_PROMPT: &str = "You are a data extraction specialist. Return ONLY valid JSON \
with no markdown code blocks, no backticks, no explanation text - just pure JSON starting \
with { and ending with }.";

/// Every extractable field with the type the reply should use
const FIELD_SCHEMA: &[(&str, &str)] = &[
    ("company_name", "\"string or null\""),
    ("contact_email", "\"string or null\""),
    ("contact_phone", "\"string or null\""),
    ("company_size", "\"string or null\""),
    ("company_type", "\"string or null\""),
    ("technology_name", "\"string or null\""),
    ("technology_description", "\"brief 1-sentence summary\""),
    ("detailed_description", "\"REQUIRED: 3-5 paragraph detailed technical description\""),
    ("technology_category", "\"string or null\""),
    ("unique_value_proposition", "\"string or null\""),
    ("military_applications", "\"string or null\""),
    ("commercial_applications", "\"string or null\""),
    ("trl_level", "number (1-9) or null"),
    ("mrl_level", "number or null"),
    ("development_stage", "\"string or null\""),
    ("ip_status", "\"string or null\""),
    ("team_size", "number or null"),
    ("team_expertise", "\"string or null\""),
    ("funding_pathway", "\"string or null\""),
    ("funding_amount_requested", "number or null"),
    ("previous_fuze_awards", "\"string or null\""),
    ("previous_fuze_amount", "number or null"),
    ("development_timeline", "\"string or null\""),
    ("sam_gov_registered", "boolean or null"),
    ("dsip_registered", "boolean or null"),
    ("capability_score", "number (0-10) or null"),
    ("ai_assessment", "\"REQUIRED: 2-3 paragraph brutally honest military value analysis\""),
    ("recommendation", "RECOMMENDATION"),
];

fn schema_block() -> String {
    let labels = Recommendation::ALL
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(" / ");

    let lines: Vec<String> = FIELD_SCHEMA
        .iter()
        .map(|(field, kind)| {
            let kind = if *kind == "RECOMMENDATION" {
                format!("\"{}\"", labels)
            } else {
                (*kind).to_string()
            };
            format!("  \"{}\": {}", field, kind)
        })
        .collect();

    format!("{{\n{}\n}}", lines.join(",\n"))
}

/// User message embedding the transcript
pub fn extraction_prompt(transcript: &str) -> String {
    format!(
        r#"You are a data extraction specialist for Army FUZE submissions. Analyze the following conversation transcript and extract structured data.

CONVERSATION TRANSCRIPT:
{transcript}

YOUR TASK:
Extract ALL mentioned information from the conversation and provide it in JSON format. For fields not mentioned, use null.

CRITICAL: You must provide these two detailed outputs:
1. "detailed_description": A comprehensive 3-5 paragraph technical description of the technology. Include: how it works, key technical specifications, unique innovations, current development state, and future potential. Be thorough and technical.

2. "ai_assessment": A brutally honest 2-3 paragraph military value analysis. Answer: Is this valuable to the military? Why or why not? What are the strengths and weaknesses? What are the risks? Be direct and critical where needed.

"recommendation" must be exactly one of the listed labels.

Return ONLY valid JSON in this exact format (no markdown, no backticks):
{schema}

DO NOT include conversation_transcript or timestamp in your JSON output - these will be added automatically."#,
        transcript = transcript,
        schema = schema_block(),
    )
}

pub fn extraction_request(model: &str, transcript: &str) -> ChatRequest {
    ChatRequest::new(
        model,
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(extraction_prompt(transcript)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuze_common::SubmissionFields;

    #[test]
    fn test_schema_covers_extractable_columns() {
        let schema = schema_block();
        for column in SubmissionFields::COLUMNS {
            let provenance = matches!(*column, "conversation_transcript" | "extraction_status");
            assert_eq!(
                schema.contains(&format!("\"{}\":", column)),
                !provenance,
                "column {}",
                column
            );
        }
        assert!(schema.contains("\"Strong Fit / Moderate Fit / Needs Development / Not Ready\""));
    }

    #[test]
    fn test_request_shape() {
        let request = extraction_request("gpt-4-turbo", "user: we make drones");

        assert_eq!(request.model, "gpt-4-turbo");
        assert_eq!(request.max_tokens, 4096);
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[1].role, "user");
        assert!(request.messages[1].content.contains("user: we make drones"));
    }
}
