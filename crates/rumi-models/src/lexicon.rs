//! Fixed phrase lexicons for CTA, hook, filler, and urgency detection.

/// Call-to-action phrases.
pub const CTA: &[&str] = &[
    "follow",
    "like",
    "comment",
    "share",
    "subscribe",
    "tap",
    "click",
    "swipe",
    "hit the",
    "don't forget to",
    "make sure to",
    "check out",
    "link in bio",
    "dm me",
    "tag",
];

/// Opening hook phrases.
pub const HOOK: &[&str] = &[
    "wait for it",
    "watch this",
    "you won't believe",
    "check this out",
    "stay tuned",
    "here's what happened",
    "this is crazy",
    "no way",
];

/// Filler words in speech.
pub const FILLER: &[&str] = &["um", "uh", "like", "you know", "basically", "literally", "so"];

/// High-urgency phrases.
pub const URGENCY_HIGH: &[&str] = &["now", "today", "last chance", "ends soon"];
/// Medium-urgency phrases.
pub const URGENCY_MEDIUM: &[&str] = &["limited", "don't miss", "hurry"];
/// Low-urgency phrases.
pub const URGENCY_LOW: &[&str] = &["soon", "coming"];

/// Caption phrase buckets for semantic grouping of overlay text.
pub const PRODUCT_MENTIONS: &[&str] = &["buy", "shop", "price", "deal", "sale", "product", "order"];
pub const SOCIAL_PROOF: &[&str] = &["everyone", "viral", "trending", "million", "best seller", "sold out"];

/// True when `text` contains any phrase from `lexicon`.
///
/// Single-word phrases match on word boundaries so that `"so"` does not
/// match inside `"sofa"`; multi-word phrases match as substrings.
pub fn matches_lexicon(text: &str, lexicon: &[&str]) -> bool {
    first_match(text, lexicon).is_some()
}

/// The first lexicon phrase found in `text`, if any.
pub fn first_match<'a>(text: &str, lexicon: &'a [&'a str]) -> Option<&'a str> {
    let lowered = text.to_lowercase();
    lexicon.iter().copied().find(|phrase| {
        if phrase.contains(' ') || phrase.contains('\'') {
            lowered.contains(phrase)
        } else {
            lowered
                .split(|c: char| !c.is_alphanumeric() && c != '\'')
                .any(|word| word == *phrase)
        }
    })
}

/// Count how many words of `text` appear in `lexicon` (word-level lexicons
/// such as fillers).
pub fn count_word_matches(text: &str, lexicon: &[&str]) -> usize {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|word| !word.is_empty() && lexicon.contains(word))
        .count()
}

/// Urgency level for a text, `"high"`, `"medium"`, `"low"`, or `"none"`.
pub fn urgency_level(text: &str) -> &'static str {
    if matches_lexicon(text, URGENCY_HIGH) {
        "high"
    } else if matches_lexicon(text, URGENCY_MEDIUM) {
        "medium"
    } else if matches_lexicon(text, URGENCY_LOW) {
        "low"
    } else {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cta_phrase_match() {
        assert!(matches_lexicon("don't forget to like and subscribe", CTA));
        assert!(matches_lexicon("Link in bio!", CTA));
        assert!(!matches_lexicon("a quiet morning walk", CTA));
    }

    #[test]
    fn test_word_boundary_for_single_words() {
        assert!(matches_lexicon("follow me", CTA));
        // "tap" should not match inside "tapestry"
        assert!(!matches_lexicon("a tapestry of colors", CTA));
    }

    #[test]
    fn test_hook_match() {
        assert!(matches_lexicon("Wait for it...", HOOK));
        assert_eq!(first_match("you won't believe this trick", HOOK), Some("you won't believe"));
    }

    #[test]
    fn test_filler_count() {
        assert_eq!(count_word_matches("um so like basically yes", FILLER), 4);
        assert_eq!(count_word_matches("nothing here", FILLER), 0);
    }

    #[test]
    fn test_urgency_levels() {
        assert_eq!(urgency_level("last chance to join"), "high");
        assert_eq!(urgency_level("limited spots available"), "medium");
        assert_eq!(urgency_level("coming to stores"), "low");
        assert_eq!(urgency_level("hello world"), "none");
    }
}
