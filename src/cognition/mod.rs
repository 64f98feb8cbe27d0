//! 认知层：答案合成与质量闸门

pub mod critic;
pub mod synthesizer;

pub use critic::{parse_score_reply, GateDecision, LlmScorer, QualityGate, QualityScore, QualityScorer};
pub use synthesizer::{Synthesizer, SYNTHESIS_FALLBACK};
