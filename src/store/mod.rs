//! Collaborators the game core calls into.
//!
//! Handlers never reach for a global connection: they receive a [`Stores`]
//! bundle and go through these traits, so the SQLite backend and the
//! in-memory one used by tests are interchangeable.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use crate::db::models::{
    GameResult, NewGameResult, NewPerformance, NewPhrase, PerformanceRecord, Phrase,
    RankingEntry,
};
use crate::error::{StoreError, ValidationError};
use crate::game::phrase::WordBand;

pub mod memory;

pub type Result<T> = std::result::Result<T, StoreError>;

const TOKEN_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "professor")]
    Teacher,
    #[serde(rename = "aluno")]
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "professor",
            Role::Student => "aluno",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "professor" => Ok(Role::Teacher),
            "aluno" => Ok(Role::Student),
            other => Err(ValidationError::Role(other.to_owned())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

/// Who is on the other end of a request or socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Authenticated(Account),
}

impl Identity {
    pub fn account(&self) -> Option<&Account> {
        match self {
            Identity::Authenticated(account) => Some(account),
            Identity::Anonymous => None,
        }
    }

    pub fn id(&self) -> Option<i32> {
        self.account().map(|a| a.id)
    }

    pub fn role(&self) -> Option<Role> {
        self.account().map(|a| a.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.account().is_some()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Identity::Anonymous => f.write_str("anonymous"),
            Identity::Authenticated(a) => write!(f, "{} (#{}, {})", a.username, a.id, a.role),
        }
    }
}

pub trait AccountStore: Send + Sync {
    /// Resolves an API token. Missing or unknown tokens are anonymous, not errors.
    fn identify(&self, token: Option<&str>) -> Result<Identity>;

    /// Creates an account and returns it with its freshly generated token.
    fn create_account(&self, username: &str, role: Role) -> Result<(Account, String)>;
}

pub trait PhraseStore: Send + Sync {
    /// Phrases at exactly `difficulty`, narrowed to `band` when one is given.
    fn query(&self, difficulty: i32, band: Option<WordBand>) -> Result<Vec<Phrase>>;
    fn create(&self, phrase: NewPhrase) -> Result<Phrase>;
    fn delete(&self, id: i32) -> Result<bool>;
    fn list(&self) -> Result<Vec<Phrase>>;
}

pub trait PerformanceStore: Send + Sync {
    fn append(&self, record: NewPerformance) -> Result<PerformanceRecord>;

    /// Writes the game row and its performance row atomically.
    fn save_game(&self, result: NewGameResult) -> Result<(GameResult, PerformanceRecord)>;

    /// Newest first.
    fn history(&self, player_id: i32, limit: i64) -> Result<Vec<PerformanceRecord>>;
    fn game_results(&self, player_id: i32) -> Result<Vec<GameResult>>;

    /// Best record per player by wpm, fastest first.
    fn ranking(&self) -> Result<Vec<RankingEntry>>;
}

#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub phrases: Arc<dyn PhraseStore>,
    pub performance: Arc<dyn PerformanceStore>,
}

impl Stores {
    /// Uses one backend for every collaborator.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: AccountStore + PhraseStore + PerformanceStore + 'static,
    {
        Self {
            accounts: store.clone(),
            phrases: store.clone(),
            performance: store,
        }
    }
}

pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub(crate) fn best_per_player(
    rows: impl IntoIterator<Item = (PerformanceRecord, String)>,
) -> Vec<RankingEntry> {
    let mut rows: Vec<_> = rows.into_iter().collect();
    rows.sort_by(|(a, _), (b, _)| b.wpm.total_cmp(&a.wpm).then(a.id.cmp(&b.id)));

    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|(record, _)| seen.insert(record.player_id))
        .map(|(record, username)| RankingEntry::new(username, &record))
        .collect()
}
