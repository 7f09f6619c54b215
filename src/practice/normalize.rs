//! Canonical comparison form for spoken and written text

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalize optional text for comparison
///
/// Absence maps to absence. See [`normalize_str`] for the transformation.
#[must_use]
pub fn normalize(text: Option<&str>) -> Option<String> {
    text.map(normalize_str)
}

/// Lowercase, NFKD-decompose and strip combining marks
///
/// The result is only meant for comparison and is never shown to the learner.
/// Applying this twice yields the same string as applying it once.
#[must_use]
pub fn normalize_str(text: &str) -> String {
    // Lowercasing can produce decomposable characters and compatibility
    // decomposition can produce uppercase ones, so fold in both orders
    let folded: String = strip_marks(text).flat_map(char::to_lowercase).collect();
    strip_marks(&folded).collect()
}

fn strip_marks(text: &str) -> impl Iterator<Item = char> + '_ {
    text.nfkd().filter(|c| !is_combining_mark(*c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accents_and_case_fold_away() {
        assert_eq!(normalize(Some("ÉCOLE")), normalize(Some("ecole")));
        assert_eq!(normalize_str("Buenos días, ¿cómo estás?"), "buenos dias, ¿como estas?");
        assert_eq!(normalize_str("Ich hätte gerne"), "ich hatte gerne");
    }

    #[test]
    fn absence_maps_to_absence() {
        assert_eq!(normalize(None), None);
    }

    #[test]
    fn normalizing_twice_is_a_no_op() {
        for text in [
            "ÉCOLE",
            "Où est la gare?",
            "Dov'è la stazione ferroviaria?",
            "こんにちは、お元気ですか？",
            "ﬁne ℌello İstanbul",
            "",
        ] {
            let once = normalize_str(text);
            assert_eq!(normalize_str(&once), once, "{text}");
        }
    }

    #[test]
    fn compatibility_forms_decompose() {
        assert_eq!(normalize_str("ﬁ"), "fi");
        assert_eq!(normalize_str("Ｃａｆé"), "cafe");
    }
}
