use serde::{Deserialize, Serialize};

use super::BlendshapeScores;

const EYES_CLOSED_THRESHOLD: f32 = 0.4;
const LOOKING_AWAY_THRESHOLD: f32 = 0.7;
const LOOKING_DOWN_THRESHOLD: f32 = 0.6;
const CONFUSED_THRESHOLD: f32 = 0.3;

/// Discrete attention state derived from one face's blendshape scores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AttentionState {
    Attentive,
    EyesClosed,
    LookingAway,
    LookingDown,
    Confused,
}

impl AttentionState {
    pub fn is_distracted(&self) -> bool {
        !matches!(self, AttentionState::Attentive)
    }
}

/// Maps blendshape scores to exactly one attention state. Evaluation is by
/// strict priority, first match wins; the thresholds are design constants.
/// A face that is simultaneously past the looking-away and confused
/// thresholds classifies as looking away.
pub fn classify_attention(shapes: &BlendshapeScores) -> AttentionState {
    let eyes_closed = shapes.score("eyeBlinkLeft").max(shapes.score("eyeBlinkRight"));
    let looking_away = shapes
        .score("eyeLookInLeft")
        .max(shapes.score("eyeLookInRight"));
    let looking_down = shapes
        .score("eyeLookDownLeft")
        .max(shapes.score("eyeLookDownRight"));
    let confused = shapes.score("browDownLeft").max(shapes.score("browDownRight"));

    if eyes_closed > EYES_CLOSED_THRESHOLD {
        return AttentionState::EyesClosed;
    }
    if looking_away > LOOKING_AWAY_THRESHOLD {
        return AttentionState::LookingAway;
    }
    if looking_down > LOOKING_DOWN_THRESHOLD {
        return AttentionState::LookingDown;
    }
    if confused > CONFUSED_THRESHOLD {
        return AttentionState::Confused;
    }
    AttentionState::Attentive
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes(pairs: &[(&str, f32)]) -> BlendshapeScores {
        pairs.iter().map(|&(name, score)| (name, score)).collect()
    }

    #[test]
    fn empty_scores_are_attentive() {
        assert_eq!(
            classify_attention(&BlendshapeScores::default()),
            AttentionState::Attentive
        );
    }

    #[test]
    fn single_threshold_matches() {
        assert_eq!(
            classify_attention(&shapes(&[("eyeBlinkRight", 0.5)])),
            AttentionState::EyesClosed
        );
        assert_eq!(
            classify_attention(&shapes(&[("eyeLookInRight", 0.8)])),
            AttentionState::LookingAway
        );
        assert_eq!(
            classify_attention(&shapes(&[("eyeLookDownLeft", 0.65)])),
            AttentionState::LookingDown
        );
        assert_eq!(
            classify_attention(&shapes(&[("browDownLeft", 0.35)])),
            AttentionState::Confused
        );
    }

    #[test]
    fn thresholds_are_exclusive() {
        // Scores exactly at a threshold do not trip it.
        assert_eq!(
            classify_attention(&shapes(&[("eyeBlinkLeft", 0.4)])),
            AttentionState::Attentive
        );
        assert_eq!(
            classify_attention(&shapes(&[("browDownRight", 0.3)])),
            AttentionState::Attentive
        );
    }

    #[test]
    fn priority_order_wins_over_later_matches() {
        // Blink beats eye-look even though both thresholds are exceeded.
        assert_eq!(
            classify_attention(&shapes(&[("eyeBlinkLeft", 0.5), ("eyeLookInLeft", 0.9)])),
            AttentionState::EyesClosed
        );
        // Looking away beats confused.
        assert_eq!(
            classify_attention(&shapes(&[("eyeLookInLeft", 0.75), ("browDownLeft", 0.9)])),
            AttentionState::LookingAway
        );
        // Looking down beats confused.
        assert_eq!(
            classify_attention(&shapes(&[("eyeLookDownRight", 0.7), ("browDownRight", 0.5)])),
            AttentionState::LookingDown
        );
    }

    #[test]
    fn either_side_can_trip_a_state() {
        assert_eq!(
            classify_attention(&shapes(&[("eyeBlinkLeft", 0.1), ("eyeBlinkRight", 0.45)])),
            AttentionState::EyesClosed
        );
        assert_eq!(
            classify_attention(&shapes(&[("eyeLookDownLeft", 0.61), ("eyeLookDownRight", 0.0)])),
            AttentionState::LookingDown
        );
    }
}
