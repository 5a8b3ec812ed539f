//! Survey records: participant profiles, questionnaire items, answers and
//! per-clip perceptual ratings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::AssetId;

/// Store-assigned primary key of a survey record.
pub type RecordId = u64;

/// Self-reported gender of a participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

impl Gender {
    /// Stored representation, as written to exports.
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

/// A registered study participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: RecordId,
    /// Participant code chosen at registration, unique across the study
    pub user_id: String,
    pub age: i32,
    pub gender: Gender,
}

/// Registration payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUserProfile {
    pub user_id: String,
    pub age: i32,
    #[serde(default)]
    pub gender: Gender,
}

/// One item of the noise-sensitivity questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoiseQuestion {
    pub id: RecordId,
    /// Position in the questionnaire
    pub number: i32,
    pub text: String,
    /// Agree/disagree scale is flipped for this item
    pub reverse_scale: bool,
}

/// Questionnaire item as written in the questions file.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionSpec {
    pub number: i32,
    pub text: String,
    #[serde(default)]
    pub reverse_scale: bool,
}

/// A participant's answer to one questionnaire item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoiseResponse {
    pub id: RecordId,
    pub user: RecordId,
    pub question: RecordId,
    /// Six-point agreement rating, 1 to 6
    pub rating: i32,
}

/// Answer payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewNoiseResponse {
    pub user: RecordId,
    pub question: RecordId,
    pub rating: i32,
}

/// Perceptual ratings given to one clip.
///
/// The first eight fields are slider ratings of perceived soundscape
/// attributes; the last four rate how dominant each sound source was, on a
/// 0 to 4 scale. Omitted fields default to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationRatings {
    pub annoyance: i32,
    pub eventfulness: i32,
    pub pleasantness: i32,
    pub chaotic: i32,
    pub vibrant: i32,
    pub uneventful: i32,
    pub calm: i32,
    pub monotonous: i32,

    pub traffic_noise: i32,
    pub other_noise: i32,
    pub human_sounds: i32,
    pub natural_sounds: i32,
}

impl EvaluationRatings {
    /// Sound-source dominance ratings with their field names.
    pub fn dominance(&self) -> [(&'static str, i32); 4] {
        [
            ("traffic_noise", self.traffic_noise),
            ("other_noise", self.other_noise),
            ("human_sounds", self.human_sounds),
            ("natural_sounds", self.natural_sounds),
        ]
    }
}

/// A submitted evaluation of one clip by one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioEvaluation {
    pub id: RecordId,
    pub audio: AssetId,
    pub user: RecordId,
    #[serde(flatten)]
    pub ratings: EvaluationRatings,
    pub submitted_at: DateTime<Utc>,
}

/// Evaluation payload.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAudioEvaluation {
    pub audio: AssetId,
    pub user: RecordId,
    #[serde(flatten)]
    pub ratings: EvaluationRatings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_defaults_to_male() {
        let profile: NewUserProfile =
            serde_json::from_str(r#"{"user_id": "P001", "age": 31}"#).unwrap();
        assert_eq!(profile.gender, Gender::Male);

        let profile: NewUserProfile =
            serde_json::from_str(r#"{"user_id": "P002", "age": 27, "gender": "female"}"#).unwrap();
        assert_eq!(profile.gender, Gender::Female);
    }

    #[test]
    fn test_evaluation_payload_defaults_missing_ratings() {
        let payload: NewAudioEvaluation = serde_json::from_str(
            r#"{"audio": 3, "user": 1, "annoyance": 7, "natural_sounds": 4}"#,
        )
        .unwrap();

        assert_eq!(payload.audio, AssetId::new(3));
        assert_eq!(payload.ratings.annoyance, 7);
        assert_eq!(payload.ratings.natural_sounds, 4);
        assert_eq!(payload.ratings.calm, 0);
    }

    #[test]
    fn test_evaluation_serializes_flat() {
        let evaluation = AudioEvaluation {
            id: 1,
            audio: AssetId::new(2),
            user: 5,
            ratings: EvaluationRatings {
                calm: 60,
                ..Default::default()
            },
            submitted_at: DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };

        let json = serde_json::to_value(&evaluation).unwrap();
        assert_eq!(json["audio"], 2);
        assert_eq!(json["calm"], 60);
        assert!(json.get("ratings").is_none());
    }
}
