// src/core/assessor.rs — Four-dimension answer quality scoring

use regex::Regex;
use std::sync::{Arc, LazyLock};

use super::types::{Dimension, QualityScore};
use crate::infra::errors::ScrutineerError;
use crate::provider::{ChatRequest, Message, ModelProvider, TokenUsage};

pub const DEFAULT_QUALITY_THRESHOLD: f32 = 7.0;

/// Sub-scores missing from an otherwise parseable response default to
/// mid-scale rather than dragging the aggregate to the floor.
const MISSING_DIMENSION_SCORE: f32 = 5.0;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("valid number pattern"));

#[derive(Debug, Clone)]
pub struct Assessment {
    pub score: QualityScore,
    pub usage: TokenUsage,
}

/// Scores a candidate answer on completeness, accuracy, clarity and
/// specificity via the assessor model. The threshold comparison lives
/// here so DECIDE logic can be tested with injected scores.
pub struct QualityAssessor {
    provider: Arc<dyn ModelProvider>,
    model: String,
    threshold: f32,
}

impl QualityAssessor {
    pub fn new(provider: Arc<dyn ModelProvider>, model: String) -> Self {
        Self {
            provider,
            model,
            threshold: DEFAULT_QUALITY_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn meets_threshold(&self, score: &QualityScore) -> bool {
        score.passes(self.threshold)
    }

    pub async fn assess(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<Assessment, ScrutineerError> {
        let prompt = scoring_prompt(question, answer);
        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![
                    Message::system(&prompt),
                    Message::user(&format!("Question: {question}\nAnswer: {answer}")),
                ],
                max_tokens: Some(64),
                temperature: Some(0.0),
            })
            .await?;

        let score = parse_scores(&response.content)?;
        tracing::debug!(
            aggregate = score.aggregate(),
            completeness = score.completeness,
            accuracy = score.accuracy,
            clarity = score.clarity,
            specificity = score.specificity,
            "answer scored"
        );

        Ok(Assessment {
            score,
            usage: response.usage,
        })
    }
}

fn scoring_prompt(question: &str, answer: &str) -> String {
    format!(
        "You are a quality assessor for an AI agent. Rate the answer to the question on four \
         dimensions, each from 1 (poor) to 10 (excellent):\n\n\
         completeness - does the answer cover everything the question asks?\n\
         accuracy - is the answer consistent with the cited regulations?\n\
         clarity - is the answer well structured and unambiguous?\n\
         specificity - does it cite concrete articles, values, and years?\n\n\
         Question: {question}\n\n\
         Answer: {answer}\n\n\
         Respond with exactly four lines, one per dimension:\n\
         completeness: <1-10>\n\
         accuracy: <1-10>\n\
         clarity: <1-10>\n\
         specificity: <1-10>\n\n\
         Do not provide explanations or detailed analysis."
    )
}

/// Pull the four sub-scores out of a scoring response. Line-oriented and
/// tolerant: lines may be reordered, carry list markers, or use "8/10".
/// A missing dimension defaults to mid-scale; a response with none of
/// the four is a scoring error. All values are clamped to [1, 10].
pub fn parse_scores(text: &str) -> Result<QualityScore, ScrutineerError> {
    let mut found: [Option<f32>; 4] = [None; 4];
    let dims = [
        Dimension::Completeness,
        Dimension::Accuracy,
        Dimension::Clarity,
        Dimension::Specificity,
    ];

    for line in text.lines() {
        let lowered = line.trim().trim_start_matches(['-', '*', '•', ' ']).to_lowercase();
        for (i, dim) in dims.iter().enumerate() {
            if found[i].is_some() || !lowered.starts_with(dim.as_str()) {
                continue;
            }
            let rest = &lowered[dim.as_str().len()..];
            if let Some(m) = NUMBER_RE.find(rest) {
                if let Ok(value) = m.as_str().parse::<f32>() {
                    found[i] = Some(value);
                }
            }
        }
    }

    if found.iter().all(Option::is_none) {
        return Err(ScrutineerError::Scoring(format!(
            "no dimension scores in response: {:?}",
            crate::util::clip(text, 120)
        )));
    }

    let value = |i: usize| found[i].unwrap_or(MISSING_DIMENSION_SCORE);
    Ok(QualityScore::new(value(0), value(1), value(2), value(3)).clamped())
}
