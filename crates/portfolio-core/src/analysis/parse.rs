//! LLM response parsing

use crate::domain::AiAnalysis;
use crate::error::{Error, Result};

/// Locate the JSON payload in generated text
///
/// A fenced code block wins; otherwise the span from the first `{` to the
/// last `}` is used.
pub fn extract_json(text: &str) -> Option<&str> {
    fenced_block(text).or_else(|| {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        (end > start).then(|| &text[start..=end])
    })
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // skip the info string (`json`, `JSON`, or nothing) up to the newline
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    let inner = body[..close].trim();
    inner.starts_with('{').then_some(inner)
}

/// Deserialize and validate a generated analysis
pub fn parse_analysis(text: &str) -> Result<AiAnalysis> {
    let payload = extract_json(text)
        .ok_or_else(|| Error::AnalysisParse("no JSON object found in response".to_string()))?;

    let mut analysis: AiAnalysis =
        serde_json::from_str(payload).map_err(|e| Error::AnalysisParse(e.to_string()))?;
    analysis.validate()?;
    analysis.synthetic = false;
    Ok(analysis)
}
