//! Text normalization for clustering comparisons.

/// English stopwords stripped during tokenization. Words shorter than three
/// characters never survive the length filter, so only longer ones are
/// listed.
const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "and", "any", "are", "aren",
    "because", "been", "before", "being", "below", "between", "both", "but", "can",
    "couldn", "did", "didn", "does", "doesn", "doing", "don", "down", "during", "each",
    "few", "for", "from", "further", "had", "hadn", "has", "hasn", "have", "haven",
    "having", "her", "here", "hers", "herself", "him", "himself", "his", "how", "into",
    "isn", "its", "itself", "just", "more", "most", "mustn", "myself", "nor", "not",
    "now", "off", "once", "only", "other", "our", "ours", "ourselves", "out", "over",
    "own", "same", "shan", "she", "should", "shouldn", "some", "such", "than", "that",
    "the", "their", "theirs", "them", "themselves", "then", "there", "these", "they",
    "this", "those", "through", "too", "under", "until", "very", "was", "wasn", "were",
    "weren", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
    "with", "won", "wouldn", "you", "your", "yours", "yourself", "yourselves",
];

/// Normalize text into tokens: lowercase, replace non-word characters with
/// spaces, split, drop stopwords and tokens shorter than three characters.
/// Order-preserving; duplicates are kept (set-based measures collapse them
/// later).
pub fn normalize_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() >= 3 && !STOPWORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(
            normalize_tokens("Sharks Sign Jane Doe!"),
            vec!["sharks", "sign", "jane", "doe"]
        );
    }

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let tokens = normalize_tokens("the team is on a roll with two wins");
        assert!(!tokens.contains(&"the".to_string()));
        assert!(!tokens.contains(&"is".to_string()));
        assert!(!tokens.contains(&"on".to_string()));
        assert!(tokens.contains(&"team".to_string()));
        assert!(tokens.contains(&"roll".to_string()));
        assert!(tokens.contains(&"wins".to_string()));
    }

    #[test]
    fn preserves_order_and_duplicates() {
        assert_eq!(
            normalize_tokens("trade rumors trade talks"),
            vec!["trade", "rumors", "trade", "talks"]
        );
    }

    #[test]
    fn hyphenated_words_split() {
        assert_eq!(
            normalize_tokens("two-year extension"),
            vec!["two", "year", "extension"]
        );
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(normalize_tokens("").is_empty());
        assert!(normalize_tokens("  !?  ").is_empty());
    }
}
