//! Starter query suggestions.
//!
//! A static pool of handbook-flavored questions users can pick from when
//! they don't know where to start, plus curated per-category lists.

use rand::seq::SliceRandom;

const SUGGESTIONS: &[&str] = &[
    "What are the organization's core values?",
    "How is remote work handled?",
    "What is the product direction?",
    "How are engineering decisions made?",
    "What are the security practices?",
    "How is customer success approached?",
    "What does transparency mean in practice?",
    "How are teams managed?",
    "What are the hiring practices?",
    "How is diversity and inclusion approached?",
    "What is the compensation philosophy?",
    "How are performance reviews handled?",
    "What are the engineering principles?",
    "How does product development work?",
    "What is the marketing strategy?",
];

/// Sample `n` random starter questions.
pub fn starter_questions(n: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    SUGGESTIONS
        .choose_multiple(&mut rng, n.min(SUGGESTIONS.len()))
        .map(|s| s.to_string())
        .collect()
}

/// Curated suggestions for a category, falling back to a random sample for
/// unknown categories.
pub fn category_questions(category: &str) -> Vec<String> {
    let curated: &[&str] = match category.to_lowercase().as_str() {
        "values" => &[
            "What are the organization's core values?",
            "What does transparency mean in practice?",
            "How is collaboration approached?",
        ],
        "engineering" => &[
            "What are the engineering principles?",
            "How are code reviews handled?",
            "What is the approach to testing?",
        ],
        "product" => &[
            "What is the product direction?",
            "How are features prioritized?",
            "What is the product development process?",
        ],
        "people" => &[
            "How is remote work handled?",
            "What are the hiring practices?",
            "How is diversity and inclusion approached?",
        ],
        _ => return starter_questions(3),
    };
    curated.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_size_respected() {
        assert_eq!(starter_questions(4).len(), 4);
        assert_eq!(starter_questions(100).len(), SUGGESTIONS.len());
    }

    #[test]
    fn test_samples_come_from_pool() {
        for q in starter_questions(5) {
            assert!(SUGGESTIONS.contains(&q.as_str()));
        }
    }

    #[test]
    fn test_known_category() {
        let qs = category_questions("engineering");
        assert_eq!(qs.len(), 3);
        assert!(qs[0].contains("engineering principles"));
    }

    #[test]
    fn test_category_is_case_insensitive() {
        assert_eq!(category_questions("Values"), category_questions("values"));
    }

    #[test]
    fn test_unknown_category_falls_back() {
        assert_eq!(category_questions("finance").len(), 3);
    }
}
