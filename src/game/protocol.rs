//! JSON frames exchanged over the game socket.
//!
//! Every frame is an object tagged by `"type"`, e.g.
//! `{"type":"get_phrase","difficulty":2,"level":4}`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::score::words_per_minute;
use crate::error::ValidationError;

fn default_difficulty() -> i32 {
    1
}

fn default_level() -> i32 {
    1
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    GetPhrase(PhraseRequest),
    SubmitText(Submission),
    SaveGameResults(GameReport),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseRequest {
    #[serde(default = "default_difficulty")]
    pub difficulty: i32,
    #[serde(default = "default_level")]
    pub level: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub original: String,
    pub text: String,
    /// Elapsed seconds.
    pub time: f64,
    #[serde(default = "default_difficulty")]
    pub difficulty: i32,
}

/// A finished game as reported by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReport {
    pub difficulty: i32,
    pub level: i32,
    pub wpm: f64,
    pub accuracy: f64,
    pub errors: i32,
    pub score: i32,
    /// Whole seconds.
    pub time_played: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    NewPhrase {
        phrase: String,
    },
    GameResult {
        wpm: f64,
        accuracy: f64,
        saved: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    ResultsSaved {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Error {
        message: String,
    },
}

fn check_difficulty(difficulty: i32) -> Result<(), ValidationError> {
    if difficulty < 1 {
        return Err(ValidationError::Difficulty(difficulty));
    }
    Ok(())
}

fn check_level(level: i32) -> Result<(), ValidationError> {
    if level < 0 {
        return Err(ValidationError::Level(level));
    }
    Ok(())
}

impl PhraseRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_difficulty(self.difficulty)?;
        check_level(self.level)
    }
}

impl Submission {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_difficulty(self.difficulty)?;
        if !self.time.is_finite() {
            return Err(ValidationError::Time);
        }
        // wpm is unbounded but must stay a real number on the wire
        if !words_per_minute(&self.text, self.time).is_finite() {
            return Err(ValidationError::Wpm);
        }
        Ok(())
    }
}

impl GameReport {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_difficulty(self.difficulty)?;
        check_level(self.level)?;
        if !self.wpm.is_finite() || self.wpm < 0.0 {
            return Err(ValidationError::Wpm);
        }
        if !self.accuracy.is_finite() || !(0.0..=100.0).contains(&self.accuracy) {
            return Err(ValidationError::Accuracy);
        }
        for (field, value) in [
            ("errors", self.errors),
            ("score", self.score),
            ("time_played", self.time_played),
        ] {
            if value < 0 {
                return Err(ValidationError::Negative(field));
            }
        }
        Ok(())
    }
}

impl ClientEvent {
    /// Parses a text frame and rejects payloads the game cannot act on.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let event: ClientEvent = serde_json::from_str(text)?;
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ClientEvent::GetPhrase(req) => req.validate(),
            ClientEvent::SubmitText(sub) => sub.validate(),
            ClientEvent::SaveGameResults(report) => report.validate(),
        }
    }
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn report() -> GameReport {
        GameReport {
            difficulty: 2,
            level: 3,
            wpm: 41.5,
            accuracy: 97.25,
            errors: 2,
            score: 1200,
            time_played: 95,
        }
    }

    #[test]
    fn get_phrase_fills_in_defaults() {
        let event = ClientEvent::decode(r#"{"type":"get_phrase"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::GetPhrase(PhraseRequest {
                difficulty: 1,
                level: 1
            })
        );
    }

    #[test]
    fn submit_text_accepts_integer_time() {
        let event =
            ClientEvent::decode(r#"{"type":"submit_text","original":"a b","text":"a b","time":12}"#)
                .unwrap();
        assert_matches!(event, ClientEvent::SubmitText(Submission { time, difficulty: 1, .. }) if time == 12.0);
    }

    #[test]
    fn missing_fields_are_malformed() {
        let err = ClientEvent::decode(r#"{"type":"submit_text","original":"abc"}"#).unwrap_err();
        assert_matches!(err, ProtocolError::Malformed(_));
    }

    #[test]
    fn unknown_types_are_malformed() {
        let err = ClientEvent::decode(r#"{"type":"start_game","difficulty":1}"#).unwrap_err();
        assert_matches!(err, ProtocolError::Malformed(_));
        assert_matches!(ClientEvent::decode("not json"), Err(ProtocolError::Malformed(_)));
    }

    #[test]
    fn fractional_counts_are_rejected_not_truncated() {
        let mut payload = serde_json::to_value(ClientEvent::SaveGameResults(report())).unwrap();
        payload["time_played"] = json!(95.5);
        let err = ClientEvent::decode(&payload.to_string()).unwrap_err();
        assert_matches!(err, ProtocolError::Malformed(_));
    }

    #[test]
    fn save_game_results_decodes_every_field() {
        let payload = json!({
            "type": "save_game_results",
            "difficulty": 2, "level": 3, "wpm": 41.5, "accuracy": 97.25,
            "errors": 2, "score": 1200, "time_played": 95
        });
        let event = ClientEvent::decode(&payload.to_string()).unwrap();
        assert_eq!(event, ClientEvent::SaveGameResults(report()));
    }

    #[test]
    fn report_validation() {
        assert_eq!(report().validate(), Ok(()));

        let bad = GameReport { accuracy: 100.5, ..report() };
        assert_eq!(bad.validate(), Err(ValidationError::Accuracy));

        let bad = GameReport { wpm: -1.0, ..report() };
        assert_eq!(bad.validate(), Err(ValidationError::Wpm));

        let bad = GameReport { score: -3, ..report() };
        assert_eq!(bad.validate(), Err(ValidationError::Negative("score")));

        let bad = GameReport { difficulty: 0, ..report() };
        assert_eq!(bad.validate(), Err(ValidationError::Difficulty(0)));
    }

    #[test]
    fn submission_with_overflowing_wpm_is_invalid() {
        let err = ClientEvent::decode(
            r#"{"type":"submit_text","original":"a b c","text":"a b c","time":1e-308}"#,
        )
        .unwrap_err();
        assert_matches!(err, ProtocolError::Invalid(ValidationError::Wpm));

        let event = ClientEvent::decode(
            r#"{"type":"submit_text","original":"a b c","text":"a b c","time":0.001}"#,
        )
        .unwrap();
        assert_matches!(event, ClientEvent::SubmitText(_));
    }

    #[test]
    fn negative_level_is_invalid() {
        let err = ClientEvent::decode(r#"{"type":"get_phrase","difficulty":2,"level":-1}"#)
            .unwrap_err();
        assert_matches!(err, ProtocolError::Invalid(ValidationError::Level(-1)));
    }

    #[test]
    fn server_events_are_tagged() {
        let event = ServerEvent::GameResult {
            wpm: 6.0,
            accuracy: 50.0,
            saved: false,
            error: Some("not authenticated".to_owned()),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "game_result", "wpm": 6.0, "accuracy": 50.0, "saved": false, "error": "not authenticated"})
        );

        let event = ServerEvent::ResultsSaved { success: true, error: None };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "results_saved", "success": true})
        );
    }
}
