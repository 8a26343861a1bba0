//! Prompt construction and wire types for the `generateContent` endpoint.

use serde::{Deserialize, Serialize};

use reword_core::PARAPHRASE_SEPARATOR;

/// Build the paraphrase instruction prompt.
///
/// The prompt asks for `count` distinct rewordings that preserve language,
/// formatting, emojis, and length, delimited by the sentinel token so the
/// response splits deterministically.
#[must_use]
pub fn build_prompt(text: &str, count: usize) -> String {
    format!(
        "Paraphrase the following post carefully.\n\
         Your job is to rewrite the text using different wording while keeping the same meaning.\n\
         \n\
         Rules:\n\
         - Keep the original language. Do NOT translate anything.\n\
         - Maintain emojis, formatting, line breaks, bullet points, and spacing.\n\
         - Keep numbers, symbols, and special characters unchanged.\n\
         - The paraphrased result should sound natural and have about the same length as the original.\n\
         - Do not remove links, usernames, or emojis.\n\
         \n\
         Post:\n\
         {text}\n\
         \n\
         Provide {count} distinct paraphrased versions. Separate each version using the exact token: {PARAPHRASE_SEPARATOR}\n\
         Do not add extra numbering or commentary outside the paraphrased text blocks."
    )
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns; a single user turn for our use.
    pub contents: Vec<Content>,

    /// Sampling parameters.
    pub generation_config: GenerationConfig,
}

/// One conversation turn.
#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    /// Text parts of the turn.
    pub parts: Vec<Part>,
}

/// One text part.
#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    /// The text payload.
    pub text: String,
}

/// Sampling parameters.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,

    /// Output token cap.
    pub max_output_tokens: u32,
}

/// Response body for `models/{model}:generateContent`.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    /// Generated candidates; the first one is used.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One generated candidate.
#[derive(Debug, Deserialize)]
pub struct Candidate {
    /// The candidate's content, absent when generation was blocked.
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if any.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("");
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_count_and_sentinel() {
        let prompt = build_prompt("Hello world", 4);
        assert!(prompt.contains("Hello world"));
        assert!(prompt.contains("Provide 4 distinct paraphrased versions"));
        assert!(prompt.contains(PARAPHRASE_SEPARATOR));
    }

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "foo "}, {"text": "bar"}]}}]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("foo bar"));
    }

    #[test]
    fn empty_response_text_is_none() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(response.text().is_none());

        let blocked: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [{}] })).unwrap();
        assert!(blocked.text().is_none());
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hi".into(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 800,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("generationConfig").is_some());
        assert!(json["generationConfig"].get("maxOutputTokens").is_some());
    }
}
