//! In-memory survey record store

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::models::{
    AudioEvaluation, NewAudioEvaluation, NewNoiseResponse, NewUserProfile, NoiseQuestion,
    NoiseResponse, QuestionSpec, RecordId, UserProfile,
};
use super::{SurveyError, SurveyResult};
use crate::export::{AUDIO_TITLE_COLUMN, ExportRow, USER_ID_COLUMN};
use crate::storage::{AssetId, AssetResolver};

/// Longest accepted participant code.
const MAX_USER_ID_LEN: usize = 20;
/// Accepted participant ages.
const AGE_RANGE: std::ops::RangeInclusive<i32> = 0..=130;
/// Six-point agreement scale of the questionnaire.
const RATING_RANGE: std::ops::RangeInclusive<i32> = 1..=6;
/// Sound-source dominance scale.
const DOMINANCE_RANGE: std::ops::RangeInclusive<i32> = 0..=4;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<RecordId, UserProfile>,
    responses: Vec<NoiseResponse>,
    evaluations: Vec<AudioEvaluation>,
    next_user: RecordId,
    next_response: RecordId,
    next_evaluation: RecordId,
}

fn next_id(counter: &mut RecordId) -> RecordId {
    *counter += 1;
    *counter
}

/// Survey records held in memory for the lifetime of the server.
///
/// Questionnaire items are fixed at construction. Profiles, answers and
/// evaluations are append-only.
pub struct SurveyStore {
    questions: Vec<NoiseQuestion>,
    assets: Arc<dyn AssetResolver>,
    tables: RwLock<Tables>,
}

impl SurveyStore {
    /// Create a store with the given questionnaire.
    ///
    /// Items receive primary keys 1.. in file order and are listed by number.
    pub fn new(questions: Vec<QuestionSpec>, assets: Arc<dyn AssetResolver>) -> Self {
        let mut questions: Vec<NoiseQuestion> = questions
            .into_iter()
            .zip(1..)
            .map(|(spec, id)| NoiseQuestion {
                id,
                number: spec.number,
                text: spec.text,
                reverse_scale: spec.reverse_scale,
            })
            .collect();
        questions.sort_by_key(|q| q.number);

        Self {
            questions,
            assets,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Questionnaire items ordered by number.
    pub fn questions(&self) -> &[NoiseQuestion] {
        &self.questions
    }

    /// Look up a questionnaire item by primary key.
    pub fn question(&self, id: RecordId) -> Option<&NoiseQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Register a participant.
    ///
    /// # Errors
    /// - `SurveyError::Validation` - Empty or over-long `user_id`, implausible age
    /// - `SurveyError::DuplicateUserId` - `user_id` already registered
    pub async fn create_user(&self, new: NewUserProfile) -> SurveyResult<UserProfile> {
        let user_id = new.user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(SurveyError::Validation {
                field: "user_id",
                reason: "must not be blank".to_string(),
            });
        }
        if user_id.chars().count() > MAX_USER_ID_LEN {
            return Err(SurveyError::Validation {
                field: "user_id",
                reason: format!("must be at most {MAX_USER_ID_LEN} characters"),
            });
        }
        if !AGE_RANGE.contains(&new.age) {
            return Err(SurveyError::Validation {
                field: "age",
                reason: format!(
                    "must be between {} and {}",
                    AGE_RANGE.start(),
                    AGE_RANGE.end()
                ),
            });
        }

        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.user_id == user_id) {
            return Err(SurveyError::DuplicateUserId { user_id });
        }

        let profile = UserProfile {
            id: next_id(&mut tables.next_user),
            user_id,
            age: new.age,
            gender: new.gender,
        };
        tables.users.insert(profile.id, profile.clone());

        info!("Registered participant {} ({})", profile.user_id, profile.id);
        Ok(profile)
    }

    /// Look up a participant by primary key.
    pub async fn user(&self, id: RecordId) -> Option<UserProfile> {
        self.tables.read().await.users.get(&id).cloned()
    }

    /// Record an answer to a questionnaire item.
    ///
    /// # Errors
    /// - `SurveyError::UnknownUser` / `SurveyError::UnknownQuestion` - Dangling reference
    /// - `SurveyError::Validation` - Rating outside 1..=6
    pub async fn create_response(&self, new: NewNoiseResponse) -> SurveyResult<NoiseResponse> {
        if self.question(new.question).is_none() {
            return Err(SurveyError::UnknownQuestion { id: new.question });
        }
        if !RATING_RANGE.contains(&new.rating) {
            return Err(SurveyError::Validation {
                field: "rating",
                reason: format!(
                    "must be between {} and {}",
                    RATING_RANGE.start(),
                    RATING_RANGE.end()
                ),
            });
        }

        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new.user) {
            return Err(SurveyError::UnknownUser { id: new.user });
        }

        let response = NoiseResponse {
            id: next_id(&mut tables.next_response),
            user: new.user,
            question: new.question,
            rating: new.rating,
        };
        tables.responses.push(response.clone());

        debug!(
            "Stored response {} from user {} to question {}",
            response.id, response.user, response.question
        );
        Ok(response)
    }

    /// Record an evaluation of a clip.
    ///
    /// # Errors
    /// - `SurveyError::UnknownUser` / `SurveyError::UnknownAudio` - Dangling reference
    /// - `SurveyError::Validation` - Dominance rating outside 0..=4
    pub async fn create_evaluation(
        &self,
        new: NewAudioEvaluation,
    ) -> SurveyResult<AudioEvaluation> {
        for (field, value) in new.ratings.dominance() {
            if !DOMINANCE_RANGE.contains(&value) {
                return Err(SurveyError::Validation {
                    field,
                    reason: format!(
                        "must be between {} and {}",
                        DOMINANCE_RANGE.start(),
                        DOMINANCE_RANGE.end()
                    ),
                });
            }
        }
        if self.assets.resolve(new.audio).await.is_none() {
            return Err(SurveyError::UnknownAudio { id: new.audio });
        }

        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new.user) {
            return Err(SurveyError::UnknownUser { id: new.user });
        }

        let evaluation = AudioEvaluation {
            id: next_id(&mut tables.next_evaluation),
            audio: new.audio,
            user: new.user,
            ratings: new.ratings,
            submitted_at: Utc::now(),
        };
        tables.evaluations.push(evaluation.clone());

        info!(
            "Stored evaluation {} of audio {} by user {}",
            evaluation.id, evaluation.audio, evaluation.user
        );
        Ok(evaluation)
    }

    /// Flatten everything known about a participant and a clip into one
    /// spreadsheet row.
    ///
    /// Columns: profile fields, one `Q{number}` column per questionnaire item
    /// (the participant's first answer, blank if unanswered), then the ratings
    /// of the participant's most recent evaluation of the clip.
    ///
    /// # Errors
    /// - `SurveyError::UnknownUser` / `SurveyError::UnknownAudio` - Dangling reference
    pub async fn export_row(&self, user: RecordId, audio: AssetId) -> SurveyResult<ExportRow> {
        let asset = self
            .assets
            .resolve(audio)
            .await
            .ok_or(SurveyError::UnknownAudio { id: audio })?;

        let tables = self.tables.read().await;
        let profile = tables
            .users
            .get(&user)
            .ok_or(SurveyError::UnknownUser { id: user })?;

        let mut row = ExportRow::new();
        row.push(USER_ID_COLUMN, profile.user_id.clone());
        row.push(AUDIO_TITLE_COLUMN, asset.title);
        row.push("Age", profile.age.to_string());
        row.push("Gender", profile.gender.as_str());

        for question in &self.questions {
            let answer = tables
                .responses
                .iter()
                .find(|r| r.user == user && r.question == question.id)
                .map(|r| r.rating.to_string())
                .unwrap_or_default();
            row.push(format!("Q{}", question.number), answer);
        }

        let latest = tables
            .evaluations
            .iter()
            .filter(|e| e.user == user && e.audio == audio)
            .max_by_key(|e| (e.submitted_at, e.id));

        if let Some(evaluation) = latest {
            let r = &evaluation.ratings;
            for (column, value) in [
                ("Annoyance", r.annoyance),
                ("Eventfulness", r.eventfulness),
                ("Pleasantness", r.pleasantness),
                ("Chaotic", r.chaotic),
                ("Vibrant", r.vibrant),
                ("Uneventful", r.uneventful),
                ("Calm", r.calm),
                ("Monotonous", r.monotonous),
                ("TrafficNoise", r.traffic_noise),
                ("OtherNoise", r.other_noise),
                ("HumanSounds", r.human_sounds),
                ("NaturalSounds", r.natural_sounds),
            ] {
                row.push(column, value.to_string());
            }
            row.push(
                "SubmittedAt",
                evaluation
                    .submitted_at
                    .naive_utc()
                    .format("%Y-%m-%d %H:%M:%S%.6f")
                    .to_string(),
            );
        }

        Ok(row)
    }

    /// Number of registered participants.
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::storage::AssetLibrary;
    use crate::survey::{EvaluationRatings, Gender};

    async fn store() -> (SurveyStore, AssetId) {
        let library = Arc::new(AssetLibrary::new());
        let audio = library
            .register("City Park", PathBuf::from("/clips/city_park.wav"))
            .await;
        let questions = vec![
            QuestionSpec {
                number: 2,
                text: "Noise bothers me when I am trying to sleep.".to_string(),
                reverse_scale: false,
            },
            QuestionSpec {
                number: 1,
                text: "I get used to most noises easily.".to_string(),
                reverse_scale: true,
            },
        ];
        (SurveyStore::new(questions, library), audio)
    }

    fn participant(user_id: &str) -> NewUserProfile {
        NewUserProfile {
            user_id: user_id.to_string(),
            age: 29,
            gender: Gender::Other,
        }
    }

    #[tokio::test]
    async fn test_questions_are_ordered_by_number() {
        let (store, _) = store().await;
        let numbers: Vec<i32> = store.questions().iter().map(|q| q.number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(store.question(1).unwrap().number, 2);
    }

    #[tokio::test]
    async fn test_create_user_assigns_ids_and_rejects_duplicates() {
        let (store, _) = store().await;
        let first = store.create_user(participant("P001")).await.unwrap();
        let second = store.create_user(participant("P002")).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let err = store.create_user(participant("P001")).await.unwrap_err();
        assert!(matches!(err, SurveyError::DuplicateUserId { .. }));
        assert_eq!(store.user_count().await, 2);
    }

    #[tokio::test]
    async fn test_create_user_validates_fields() {
        let (store, _) = store().await;

        let err = store.create_user(participant("   ")).await.unwrap_err();
        assert!(matches!(err, SurveyError::Validation { field: "user_id", .. }));

        let err = store
            .create_user(participant("an-identifier-that-is-too-long"))
            .await
            .unwrap_err();
        assert!(matches!(err, SurveyError::Validation { field: "user_id", .. }));

        let mut bad_age = participant("P003");
        bad_age.age = -1;
        let err = store.create_user(bad_age).await.unwrap_err();
        assert!(matches!(err, SurveyError::Validation { field: "age", .. }));
    }

    #[tokio::test]
    async fn test_create_response_checks_references_and_scale() {
        let (store, _) = store().await;
        let user = store.create_user(participant("P001")).await.unwrap();

        let ok = store
            .create_response(NewNoiseResponse {
                user: user.id,
                question: 1,
                rating: 6,
            })
            .await
            .unwrap();
        assert_eq!(ok.id, 1);

        let err = store
            .create_response(NewNoiseResponse {
                user: user.id,
                question: 9,
                rating: 3,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SurveyError::UnknownQuestion { id: 9 }));

        let err = store
            .create_response(NewNoiseResponse {
                user: 42,
                question: 1,
                rating: 3,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SurveyError::UnknownUser { id: 42 }));

        let err = store
            .create_response(NewNoiseResponse {
                user: user.id,
                question: 1,
                rating: 7,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SurveyError::Validation { field: "rating", .. }));
    }

    #[tokio::test]
    async fn test_create_evaluation_checks_audio_and_dominance() {
        let (store, audio) = store().await;
        let user = store.create_user(participant("P001")).await.unwrap();

        let err = store
            .create_evaluation(NewAudioEvaluation {
                audio: AssetId::new(77),
                user: user.id,
                ratings: EvaluationRatings::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SurveyError::UnknownAudio { .. }));

        let err = store
            .create_evaluation(NewAudioEvaluation {
                audio,
                user: user.id,
                ratings: EvaluationRatings {
                    human_sounds: 5,
                    ..Default::default()
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SurveyError::Validation {
                field: "human_sounds",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_export_row_uses_latest_evaluation() {
        let (store, audio) = store().await;
        let user = store.create_user(participant("P001")).await.unwrap();
        // Question with id 2 has number 1
        store
            .create_response(NewNoiseResponse {
                user: user.id,
                question: 2,
                rating: 4,
            })
            .await
            .unwrap();

        for calm in [10, 80] {
            store
                .create_evaluation(NewAudioEvaluation {
                    audio,
                    user: user.id,
                    ratings: EvaluationRatings {
                        calm,
                        traffic_noise: 2,
                        ..Default::default()
                    },
                })
                .await
                .unwrap();
        }

        let row = store.export_row(user.id, audio).await.unwrap();
        assert_eq!(row.get("UserID"), Some("P001"));
        assert_eq!(row.get("AudioTitle"), Some("City Park"));
        assert_eq!(row.get("Gender"), Some("other"));
        assert_eq!(row.get("Q1"), Some("4"));
        assert_eq!(row.get("Q2"), Some(""));
        assert_eq!(row.get("Calm"), Some("80"));
        assert_eq!(row.get("TrafficNoise"), Some("2"));
        assert!(row.get("SubmittedAt").is_some());

        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(&columns[..6], &["UserID", "AudioTitle", "Age", "Gender", "Q1", "Q2"]);
    }
}
