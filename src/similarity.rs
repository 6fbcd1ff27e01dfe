use std::collections::{BTreeSet, HashMap};

/// Scores how textually similar two pages are, from 0 (nothing shared) to 100.
pub trait Scorer: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// TF-IDF weighting over the two-document corpus `{a, b}` compared by cosine
/// similarity. Uses smoothed idf, `ln((1 + n) / (1 + df)) + 1`, and raw term
/// counts, with tokens being lowercase runs of two or more word characters.
/// Identical non-empty texts always score 100, tokens or not.
#[derive(Debug, Default, Clone, Copy)]
pub struct TfIdfScorer;

const DOCUMENTS: f64 = 2.0;

impl Scorer for TfIdfScorer {
    fn score(&self, a: &str, b: &str) -> f64 {
        // Covers texts too short to yield any term.
        if !a.is_empty() && a == b {
            return 100.0;
        }

        let counts_a = term_counts(a);
        let counts_b = term_counts(b);
        if counts_a.is_empty() || counts_b.is_empty() {
            return 0.0;
        }

        // Sorted vocabulary keeps the summation order independent of argument order.
        let vocabulary: BTreeSet<&str> = counts_a
            .keys()
            .chain(counts_b.keys())
            .map(String::as_str)
            .collect();

        let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
        for term in vocabulary {
            let tf_a = counts_a.get(term).copied().unwrap_or(0) as f64;
            let tf_b = counts_b.get(term).copied().unwrap_or(0) as f64;
            let df = f64::from(u8::from(tf_a > 0.0) + u8::from(tf_b > 0.0));
            let idf = ((1.0 + DOCUMENTS) / (1.0 + df)).ln() + 1.0;

            let (weight_a, weight_b) = (tf_a * idf, tf_b * idf);
            dot += weight_a * weight_b;
            norm_a += weight_a * weight_a;
            norm_b += weight_b * weight_b;
        }

        let cosine = dot / (norm_a.sqrt() * norm_b.sqrt());
        let percent = (cosine * 100.0).clamp(0.0, 100.0);
        (percent * 1e6).round() / 1e6
    }
}

fn term_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in text
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
    {
        *counts.entry(token.to_lowercase()).or_insert(0) += 1;
    }
    counts
}
