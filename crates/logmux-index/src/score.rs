//! Keyword scoring over a block's input and output text.

/// Cap on the number of search terms considered.
const MAX_TERMS: usize = 20;
/// Points per fully matched term: input hits are worth twice output hits.
const INPUT_POINTS: u32 = 2;
const OUTPUT_POINTS: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct TermScore {
    pub score: f64,
    pub why: String,
}

/// Lowercased whitespace-separated terms, bounded by [`MAX_TERMS`].
pub fn normalize_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|t| !t.is_empty())
        .take(MAX_TERMS)
        .map(str::to_lowercase)
        .collect()
}

/// Score one block's text against a normalized term set. Every term must
/// appear in the input or the output; a non-match returns `None`, and a
/// match never scores zero. More matching placements never lower the score.
pub fn score_text(input: &str, output: &str, terms: &[String]) -> Option<TermScore> {
    if terms.is_empty() {
        return None;
    }
    let input = input.to_lowercase();
    let output = output.to_lowercase();
    let mut points = 0u32;
    let mut matched_terms = 0usize;
    for term in terms {
        let in_input = input.contains(term.as_str());
        let in_output = output.contains(term.as_str());
        if !in_input && !in_output {
            return None;
        }
        matched_terms += 1;
        if in_input {
            points += INPUT_POINTS;
        }
        if in_output {
            points += OUTPUT_POINTS;
        }
    }
    let max_points = (terms.len() as u32) * (INPUT_POINTS + OUTPUT_POINTS);
    let score = f64::min(1.0, f64::from(points) / f64::from(max_points));
    Some(TermScore {
        score,
        why: format!("matched {}/{} term(s)", matched_terms, terms.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_are_lowercased_and_capped() {
        let terms = normalize_terms("Foo BAR");
        assert_eq!(terms, vec!["foo", "bar"]);
        let many = (0..40).map(|i| format!("t{}", i)).collect::<Vec<_>>().join(" ");
        assert_eq!(normalize_terms(&many).len(), 20);
    }

    #[test]
    fn all_terms_must_match() {
        let terms = normalize_terms("alpha beta");
        assert!(score_text("alpha here", "no second term", &terms).is_none());
        assert!(score_text("alpha", "beta", &terms).is_some());
    }

    #[test]
    fn match_never_scores_zero() {
        let terms = normalize_terms("alpha");
        let hit = score_text("", "alpha in output only", &terms).unwrap();
        assert!(hit.score > 0.0);
        assert_eq!(hit.why, "matched 1/1 term(s)");
    }

    #[test]
    fn more_placements_score_higher() {
        let terms = normalize_terms("alpha");
        let output_only = score_text("", "alpha", &terms).unwrap();
        let input_only = score_text("alpha", "", &terms).unwrap();
        let both = score_text("alpha", "alpha", &terms).unwrap();
        assert!(input_only.score > output_only.score);
        assert!(both.score >= input_only.score);
        assert!(both.score <= 1.0);
    }

    #[test]
    fn case_insensitive() {
        let terms = normalize_terms("ALPHA");
        assert!(score_text("some Alpha text", "", &terms).is_some());
    }
}
