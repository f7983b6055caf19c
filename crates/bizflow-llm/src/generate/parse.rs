/// Extract JSON from text that may be wrapped in markdown code fences.
pub(crate) fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let after_fence = &trimmed[start + fence.len()..];
            if let Some(end) = after_fence.find("```") {
                return after_fence[..end].trim();
            }
        }
    }
    trimmed
}
