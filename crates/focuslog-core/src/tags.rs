//! Tag normalization shared by sessions and memos.

/// Trim tags, drop empties, and dedupe while preserving first-seen order.
pub fn normalize(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::new();
    for raw in tags {
        let tag = raw.trim();
        if tag.is_empty() || !seen.insert(tag.to_string()) {
            continue;
        }
        unique.push(tag.to_string());
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn trims_dedupes_and_preserves_order() {
        let tags = owned(&[" rust ", "focus", "rust", "", "  ", "deep work"]);
        assert_eq!(normalize(&tags), owned(&["rust", "focus", "deep work"]));
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(normalize(&[]).is_empty());
    }
}
