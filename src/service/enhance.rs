use serde::Deserialize;
use serde_json::json;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

pub const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// The instructional prefix sent ahead of the raw note text. The model is
// asked for a bare JSON object with `title` and `description` fields in a
// reflective journaling register.
const PROMPT: &str = "You are Gemini, and your sole task is to respond to every user input \
with a JSON object containing a 'title' and 'description' field. Format the 'title' as a \
brief summary of the user input and the 'description' as a rewording or elaboration of the \
user's text in an appropriate journaling style. Each response must include supportive or \
reflective statements relevant to journaling, using emojis to add emotions or thematic \
elements, but nothing excessive. Here's the format: json Copy code { \"title\": \"Brief \
title summarizing the user's input\", \"description\": \"A thoughtful, descriptive \
rewording of the user's input with a reflective journaling style.\" } Do not ask questions. \
Do not provide explanations. Always include a title and description in every response. \
Only output the JSON object, formatted neatly. Please start now. ";

#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("Gemini API key is missing")]
    MissingCredential,
    #[error("enhancement unavailable: {0}")]
    Unavailable(String),
}

/// Suggested rewording for a note.
#[derive(Debug, Clone, PartialEq)]
pub struct Enhancement {
    pub title: String,
    pub content: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct Suggestion {
    title: Option<String>,
    description: Option<String>,
}

/// Rewrite the note's raw text into a suggested title/content pair.
///
/// An empty key fails with `MissingCredential` before any I/O. Transport
/// failures, non-success statuses, and unexpected response shapes fail with
/// `Unavailable`; a reply that merely fails to parse as JSON falls back to
/// the caller's original text instead, so the save is never lost.
pub fn enhance(api_key: &str, title: &str, content: &str) -> Result<Enhancement, EnhanceError> {
    if api_key.is_empty() {
        return Err(EnhanceError::MissingCredential);
    }

    let reply = request_rewrite(api_key, content)?;
    Ok(parse_suggestion(&reply, title, content))
}

/// Run `enhance` on a worker thread, reporting exactly one result over the
/// returned channel. Dropping the receiver discards the outcome; no save
/// happens. No retries, no queueing.
pub fn enhance_in_background(
    api_key: String,
    title: String,
    content: String,
) -> mpsc::Receiver<Result<Enhancement, EnhanceError>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(enhance(&api_key, &title, &content));
    });
    rx
}

fn request_rewrite(api_key: &str, content: &str) -> Result<String, EnhanceError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| EnhanceError::Unavailable(e.to_string()))?;

    let body = json!({
        "contents": [{
            "parts": [{
                "text": format!("{}{}", PROMPT, content),
            }],
        }],
    });

    let response = client
        .post(format!("{}?key={}", GEMINI_ENDPOINT, api_key))
        .json(&body)
        .send()
        .map_err(|e| EnhanceError::Unavailable(e.to_string()))?;

    if !response.status().is_success() {
        return Err(EnhanceError::Unavailable(format!("HTTP {}", response.status())));
    }

    let data: GenerateResponse = response
        .json()
        .map_err(|e| EnhanceError::Unavailable(e.to_string()))?;

    data.candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content.parts.into_iter().next())
        .map(|part| part.text)
        .ok_or_else(|| EnhanceError::Unavailable("unexpected response shape".to_string()))
}

/// Parse the model's reply into an `Enhancement`. The reply may be wrapped
/// in a language-tagged code fence; one leading/trailing fence pair is
/// stripped before parsing. Each missing field falls back to the caller's
/// original value, and a reply that is not JSON at all falls back entirely.
pub fn parse_suggestion(reply: &str, original_title: &str, original_content: &str) -> Enhancement {
    match serde_json::from_str::<Suggestion>(strip_code_fence(reply)) {
        Ok(suggestion) => Enhancement {
            title: suggestion
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| original_title.to_string()),
            content: suggestion
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| original_content.to_string()),
        },
        Err(_) => Enhancement {
            title: original_title.to_string(),
            content: original_content.to_string(),
        },
    }
}

// Strips one ```lang ... ``` wrapper. Anything that doesn't match the fence
// shape is returned unchanged and left to the JSON parser.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text;
    };
    let Some((tag, body)) = rest.split_once('\n') else {
        return text;
    };
    if !tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
        return text;
    }
    match body.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_missing_credential() {
        let result = enhance("", "title", "content");
        assert!(matches!(result, Err(EnhanceError::MissingCredential)));
    }

    #[test]
    fn test_parse_plain_json_reply() {
        let reply = r#"{"title":"T","description":"D"}"#;
        let enhancement = parse_suggestion(reply, "orig title", "orig content");
        assert_eq!(enhancement.title, "T");
        assert_eq!(enhancement.content, "D");
    }

    #[test]
    fn test_parse_fenced_json_reply() {
        let reply = "```json\n{\"title\":\"T\",\"description\":\"D\"}\n```";
        let enhancement = parse_suggestion(reply, "orig title", "orig content");
        assert_eq!(enhancement.title, "T");
        assert_eq!(enhancement.content, "D");
    }

    #[test]
    fn test_non_json_reply_falls_back_entirely() {
        let reply = "Sorry, I can only chat today.";
        let enhancement = parse_suggestion(reply, "orig title", "orig content");
        assert_eq!(enhancement.title, "orig title");
        assert_eq!(enhancement.content, "orig content");
    }

    #[test]
    fn test_missing_fields_fall_back_individually() {
        let reply = r#"{"title":"Only a title"}"#;
        let enhancement = parse_suggestion(reply, "orig title", "orig content");
        assert_eq!(enhancement.title, "Only a title");
        assert_eq!(enhancement.content, "orig content");
    }

    #[test]
    fn test_strip_fence_requires_matching_shape() {
        // Unterminated fence: left alone, so parsing fails and falls back.
        let reply = "```json\n{\"title\":\"T\"}";
        let enhancement = parse_suggestion(reply, "orig", "orig content");
        assert_eq!(enhancement.title, "orig");

        // Untagged fence is also stripped.
        let reply = "```\n{\"title\":\"T\",\"description\":\"D\"}\n```";
        assert_eq!(parse_suggestion(reply, "x", "y").title, "T");
    }
}
