use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::schema::{game_results, performances, phrases, users};
use crate::error::ValidationError;
use crate::game::protocol::GameReport;

pub const MIN_PHRASE_CHARS: usize = 5;

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub role: String,
    pub token: String,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub role: &'a str,
    pub token: &'a str,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[diesel(table_name = phrases)]
pub struct Phrase {
    pub id: i32,
    pub text: String,
    pub difficulty: i32,
    pub created_by: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = phrases)]
pub struct NewPhrase {
    pub text: String,
    pub difficulty: i32,
    pub created_by: Option<i32>,
}

impl NewPhrase {
    /// Trims `text` and rejects phrases that are too short to type.
    pub fn new(
        text: &str,
        difficulty: i32,
        created_by: Option<i32>,
    ) -> Result<Self, ValidationError> {
        let text = text.trim();
        if text.chars().count() < MIN_PHRASE_CHARS {
            return Err(ValidationError::PhraseTooShort(MIN_PHRASE_CHARS));
        }
        if difficulty < 1 {
            return Err(ValidationError::Difficulty(difficulty));
        }
        Ok(Self {
            text: text.to_owned(),
            difficulty,
            created_by,
        })
    }
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[diesel(table_name = performances)]
pub struct PerformanceRecord {
    pub id: i32,
    #[diesel(column_name = user_id)]
    pub player_id: i32,
    pub wpm: f64,
    pub accuracy: f64,
    pub difficulty: i32,
    pub errors: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = performances)]
pub struct NewPerformance {
    #[diesel(column_name = user_id)]
    pub player_id: i32,
    pub wpm: f64,
    pub accuracy: f64,
    pub difficulty: i32,
    pub errors: Option<i32>,
}

#[derive(Queryable, Selectable, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[diesel(table_name = game_results)]
pub struct GameResult {
    pub id: i32,
    #[diesel(column_name = user_id)]
    pub player_id: i32,
    pub difficulty: i32,
    pub level: i32,
    pub wpm: f64,
    pub accuracy: f64,
    pub errors: i32,
    pub score: i32,
    pub time_played: i32,
    pub played_at: NaiveDateTime,
}

#[derive(Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = game_results)]
pub struct NewGameResult {
    #[diesel(column_name = user_id)]
    pub player_id: i32,
    pub difficulty: i32,
    pub level: i32,
    pub wpm: f64,
    pub accuracy: f64,
    pub errors: i32,
    pub score: i32,
    pub time_played: i32,
}

impl NewGameResult {
    pub fn new(player_id: i32, report: &GameReport) -> Self {
        Self {
            player_id,
            difficulty: report.difficulty,
            level: report.level,
            wpm: report.wpm,
            accuracy: report.accuracy,
            errors: report.errors,
            score: report.score,
            time_played: report.time_played,
        }
    }

    /// The performance row written alongside a finished game.
    pub fn performance(&self) -> NewPerformance {
        NewPerformance {
            player_id: self.player_id,
            wpm: self.wpm,
            accuracy: self.accuracy,
            difficulty: self.difficulty,
            errors: Some(self.errors),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RankingEntry {
    pub username: String,
    pub wpm: f64,
    pub accuracy: f64,
    pub difficulty: i32,
    pub date: NaiveDateTime,
}

impl RankingEntry {
    pub fn new(username: String, record: &PerformanceRecord) -> Self {
        Self {
            username,
            wpm: record.wpm,
            accuracy: record.accuracy,
            difficulty: record.difficulty,
            date: record.created_at,
        }
    }
}
