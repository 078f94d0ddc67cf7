#![allow(dead_code)]

use std::fs;
use std::path::Path;

use sentiment_serve::AppCfg;

pub const VECTORIZER_JSON: &str = r#"{
    "vocabulary": {"awful": 0, "fine": 1, "great": 2, "love": 3, "terrible": 4, "not great": 5},
    "idf": [1.2, 1.0, 1.1, 1.3, 1.4, 1.5],
    "ngram_range": [1, 2],
    "sublinear_tf": true
}"#;

pub const MODEL_JSON: &str = r#"{
    "model_type": "logistic_regression",
    "classes": [-1, 0, 1],
    "coef": [
        [3.0, 0.0, -1.0, -1.0, 3.0, 3.0],
        [0.0, 2.0, 0.0, 0.0, 0.0, 0.0],
        [-1.0, 0.0, 3.0, 3.0, -1.0, -2.0]
    ],
    "intercept": [0.0, 0.3, 0.0],
    "feature_importances": [5.0, 1.0, 4.0, 6.0, 2.0, 3.0]
}"#;

pub fn write_artifacts(dir: &Path) {
    fs::write(dir.join("sentiment_model.json"), MODEL_JSON).unwrap();
    fs::write(dir.join("tfidf_vectorizer.json"), VECTORIZER_JSON).unwrap();
}

pub fn cfg_for(dir: &Path) -> AppCfg {
    AppCfg {
        model_path: dir.join("sentiment_model.json"),
        vectorizer_path: dir.join("tfidf_vectorizer.json"),
        ..AppCfg::default()
    }
}
