use serde::de::DeserializeOwned;

use c4draft_core::api::{RefineResponse, Suggestion};

/// Remove Markdown code fences the model wraps around diagram text.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```mermaid\n", "")
        .replace("```mermaid", "")
        .replace("```\n", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse the refinement JSON object, tolerating prose around it.
pub fn parse_refinement(raw: &str) -> Option<RefineResponse> {
    let mut response: RefineResponse = parse_object(raw)?;
    response.updated_diagram_text = strip_code_fences(&response.updated_diagram_text);
    if response.updated_diagram_text.is_empty() {
        return None;
    }
    Some(response)
}

#[derive(serde::Deserialize)]
struct SuggestionEnvelope {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

/// Parse suggestions from model output. Returns empty vec on total parse
/// failure (graceful degradation).
pub fn parse_suggestions(raw: &str) -> Vec<Suggestion> {
    if let Some(envelope) = parse_object::<SuggestionEnvelope>(raw) {
        return envelope.suggestions;
    }

    // Fall back to salvaging whichever array items still parse
    match extract_delimited(raw, '[', ']') {
        Some(array) => parse_items(array),
        None => vec![],
    }
}

fn parse_object<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let json_str = extract_delimited(raw, '{', '}')?;
    match serde_json::from_str(json_str) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("model output is not valid JSON: {e}");
            None
        }
    }
}

/// Slice from the first `open` to the last `close`, inclusive.
fn extract_delimited(raw: &str, open: char, close: char) -> Option<&str> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Try to parse individual objects from a malformed JSON array.
fn parse_items<T: DeserializeOwned>(array: &str) -> Vec<T> {
    let inner = array
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(array);

    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in inner.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        if let Ok(item) = serde_json::from_str::<T>(&inner[s..=i]) {
                            items.push(item);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    items
}
