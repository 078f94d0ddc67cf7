//! TF-IDF vectorizer artifact.
//!
//! Tokens are runs of two or more word characters. N-grams join consecutive
//! tokens with a single space, the same keys the vocabulary was built with.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::common::error::ServeResult;

use super::domain::{SparseRow, Vectorizer};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

/// Longest n-gram an artifact may ask for.
pub const MAX_NGRAM: usize = 8;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f32>,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default = "default_norm")]
    norm: Option<Norm>,
    #[serde(default = "default_true")]
    lowercase: bool,
}

impl TfidfVectorizer {
    pub fn new(vocabulary: BTreeMap<String, usize>, idf: Vec<f32>) -> Self {
        Self {
            vocabulary,
            idf,
            ngram_range: default_ngram_range(),
            sublinear_tf: false,
            norm: default_norm(),
            lowercase: true,
        }
    }

    pub fn with_ngram_range(mut self, min_n: usize, max_n: usize) -> Self {
        self.ngram_range = (min_n, max_n);
        self
    }

    pub fn with_sublinear_tf(mut self, enabled: bool) -> Self {
        self.sublinear_tf = enabled;
        self
    }

    pub fn with_norm(mut self, norm: Option<Norm>) -> Self {
        self.norm = norm;
        self
    }

    /// Check internal consistency after deserialization.
    pub fn validate(&self) -> Result<(), String> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid ngram_range ({min_n}, {max_n})"));
        }
        if max_n > MAX_NGRAM {
            return Err(format!("ngram_range upper bound {max_n} exceeds {MAX_NGRAM}"));
        }
        let longest = self
            .vocabulary
            .keys()
            .map(|term| term.split(' ').count())
            .max()
            .unwrap_or(0);
        if longest > max_n {
            return Err(format!(
                "vocabulary holds {longest}-grams but ngram_range stops at {max_n}"
            ));
        }
        if let Some((term, col)) = self.vocabulary.iter().find(|(_, col)| **col >= self.idf.len()) {
            return Err(format!(
                "vocabulary term {term:?} maps to column {col} but idf has {} entries",
                self.idf.len()
            ));
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err("idf contains non-finite weights".to_string());
        }
        Ok(())
    }

    fn term_counts(&self, text: &str) -> HashMap<usize, f32> {
        let lowered;
        let text = if self.lowercase {
            lowered = text.to_lowercase();
            lowered.as_str()
        } else {
            text
        };
        let tokens: Vec<&str> = TOKEN.find_iter(text).map(|m| m.as_str()).collect();

        let (min_n, max_n) = self.ngram_range;
        let mut counts = HashMap::new();
        for n in min_n..=max_n.min(tokens.len()) {
            for gram in tokens.windows(n) {
                let key = gram.join(" ");
                if let Some(&col) = self.vocabulary.get(&key) {
                    *counts.entry(col).or_insert(0.0) += 1.0;
                }
            }
        }
        counts
    }
}

impl Vectorizer for TfidfVectorizer {
    fn width(&self) -> usize {
        self.idf.len()
    }

    fn transform(&self, text: &str) -> ServeResult<SparseRow> {
        let mut entries: Vec<(usize, f32)> = self
            .term_counts(text)
            .into_iter()
            .filter_map(|(col, tf)| {
                let tf = if self.sublinear_tf { 1.0 + tf.ln() } else { tf };
                self.idf.get(col).map(|idf| (col, tf * idf))
            })
            .collect();

        let scale = match self.norm {
            Some(Norm::L2) => entries.iter().map(|(_, v)| v * v).sum::<f32>().sqrt(),
            Some(Norm::L1) => entries.iter().map(|(_, v)| v.abs()).sum::<f32>(),
            None => 1.0,
        };
        if scale > 0.0 {
            for (_, value) in entries.iter_mut() {
                *value /= scale;
            }
        }

        SparseRow::new(self.width(), entries)
    }

    fn vocabulary(&self) -> Option<&BTreeMap<String, usize>> {
        Some(&self.vocabulary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(terms: &[&str]) -> BTreeMap<String, usize> {
        terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect()
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn unigram_l2_normalised() {
        let v = TfidfVectorizer::new(vocab(&["good", "bad"]), vec![1.0, 2.0]);
        let row = v.transform("good bad bad").unwrap();
        // raw weights: good=1, bad=4; l2 norm = sqrt(17)
        let norm = 17f32.sqrt();
        assert_eq!(row.width(), 2);
        assert!(approx(row.entries()[0].1, 1.0 / norm));
        assert!(approx(row.entries()[1].1, 4.0 / norm));
    }

    #[test]
    fn single_letter_tokens_and_unknown_terms_are_ignored() {
        let v = TfidfVectorizer::new(vocab(&["good"]), vec![1.0]);
        let row = v.transform("a b c unknown").unwrap();
        assert!(row.entries().is_empty());
        assert!(v.transform("").unwrap().entries().is_empty());
    }

    #[test]
    fn bigrams_hit_joined_keys() {
        let v = TfidfVectorizer::new(vocab(&["not", "good", "not good"]), vec![1.0, 1.0, 1.0])
            .with_ngram_range(1, 2)
            .with_norm(None);
        let row = v.transform("Not good").unwrap();
        assert_eq!(row.entries(), &[(0, 1.0), (1, 1.0), (2, 1.0)]);
    }

    #[test]
    fn sublinear_tf_dampens_repeats() {
        let v = TfidfVectorizer::new(vocab(&["wow"]), vec![1.0])
            .with_sublinear_tf(true)
            .with_norm(None);
        let row = v.transform("wow wow wow").unwrap();
        assert!(approx(row.entries()[0].1, 1.0 + 3f32.ln()));
    }

    #[test]
    fn validate_catches_out_of_range_vocabulary() {
        let v = TfidfVectorizer::new(vocab(&["a1", "b2"]), vec![1.0]);
        assert!(v.validate().is_err());
        let v = TfidfVectorizer::new(vocab(&["a1"]), vec![1.0]).with_ngram_range(2, 1);
        assert!(v.validate().is_err());
    }

    #[test]
    fn validate_bounds_the_ngram_range() {
        let huge: TfidfVectorizer = serde_json::from_str(
            r#"{"vocabulary":{"great":0},"idf":[1.5],"ngram_range":[1,1000000000]}"#,
        )
        .unwrap();
        assert!(huge.validate().unwrap_err().contains("exceeds"));

        let short = TfidfVectorizer::new(vocab(&["not good"]), vec![1.0]);
        assert!(short.validate().is_err());
        assert!(short.with_ngram_range(1, 2).validate().is_ok());
    }

    #[test]
    fn ngram_loop_stops_at_token_count() {
        let v = TfidfVectorizer::new(vocab(&["good"]), vec![1.0])
            .with_ngram_range(1, MAX_NGRAM)
            .with_norm(None);
        assert_eq!(v.transform("good").unwrap().entries(), &[(0, 1.0)]);
    }

    #[test]
    fn deserializes_with_defaults() {
        let v: TfidfVectorizer =
            serde_json::from_str(r#"{"vocabulary":{"great":0},"idf":[1.5]}"#).unwrap();
        assert!(v.validate().is_ok());
        assert_eq!(v, TfidfVectorizer::new(vocab(&["great"]), vec![1.5]));

        let v: TfidfVectorizer = serde_json::from_str(
            r#"{"vocabulary":{"great":0},"idf":[1.5],"norm":null,"ngram_range":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(v.transform("great").unwrap().entries(), &[(0, 1.5)]);
    }
}
