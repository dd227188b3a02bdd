use chrono::{NaiveDateTime, Utc};
use parking_lot::Mutex;

use super::{
    best_per_player, generate_token, Account, AccountStore, GameResult, Identity, NewGameResult,
    NewPerformance, NewPhrase, PerformanceRecord, PerformanceStore, Phrase, PhraseStore,
    RankingEntry, Result, Role,
};
use crate::error::StoreError;
use crate::game::phrase::{word_count, WordBand};

/// Process-local backend. Holds everything behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i32,
    accounts: Vec<(Account, String)>,
    phrases: Vec<Phrase>,
    performances: Vec<PerformanceRecord>,
    games: Vec<GameResult>,
}

impl Inner {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_player(&self, player_id: i32) -> Result<()> {
        if self.accounts.iter().any(|(a, _)| a.id == player_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownPlayer(player_id))
        }
    }

    fn push_performance(&mut self, record: NewPerformance, now: NaiveDateTime) -> PerformanceRecord {
        let row = PerformanceRecord {
            id: self.next_id(),
            player_id: record.player_id,
            wpm: record.wpm,
            accuracy: record.accuracy,
            difficulty: record.difficulty,
            errors: record.errors,
            created_at: now,
        };
        self.performances.push(row.clone());
        row
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn performance_count(&self) -> usize {
        self.inner.lock().performances.len()
    }
}

impl AccountStore for MemoryStore {
    fn identify(&self, token: Option<&str>) -> Result<Identity> {
        let token = match token {
            Some(t) => t,
            None => return Ok(Identity::Anonymous),
        };
        let inner = self.inner.lock();
        Ok(inner
            .accounts
            .iter()
            .find(|(_, t)| t == token)
            .map(|(account, _)| Identity::Authenticated(account.clone()))
            .unwrap_or(Identity::Anonymous))
    }

    fn create_account(&self, username: &str, role: Role) -> Result<(Account, String)> {
        let mut inner = self.inner.lock();
        if inner.accounts.iter().any(|(a, _)| a.username == username) {
            return Err(StoreError::Duplicate(username.to_owned()));
        }
        let account = Account {
            id: inner.next_id(),
            username: username.to_owned(),
            role,
        };
        let token = generate_token();
        inner.accounts.push((account.clone(), token.clone()));
        Ok((account, token))
    }
}

impl PhraseStore for MemoryStore {
    fn query(&self, difficulty: i32, band: Option<WordBand>) -> Result<Vec<Phrase>> {
        let inner = self.inner.lock();
        Ok(inner
            .phrases
            .iter()
            .filter(|p| p.difficulty == difficulty)
            .filter(|p| band.map_or(true, |b| b.contains(word_count(&p.text))))
            .cloned()
            .collect())
    }

    fn create(&self, phrase: NewPhrase) -> Result<Phrase> {
        let mut inner = self.inner.lock();
        let row = Phrase {
            id: inner.next_id(),
            text: phrase.text,
            difficulty: phrase.difficulty,
            created_by: phrase.created_by,
            created_at: now(),
        };
        inner.phrases.push(row.clone());
        Ok(row)
    }

    fn delete(&self, id: i32) -> Result<bool> {
        let mut inner = self.inner.lock();
        let before = inner.phrases.len();
        inner.phrases.retain(|p| p.id != id);
        Ok(inner.phrases.len() != before)
    }

    fn list(&self) -> Result<Vec<Phrase>> {
        let mut phrases = self.inner.lock().phrases.clone();
        phrases.sort_by_key(|p| (p.difficulty, p.id));
        Ok(phrases)
    }
}

impl PerformanceStore for MemoryStore {
    fn append(&self, record: NewPerformance) -> Result<PerformanceRecord> {
        let mut inner = self.inner.lock();
        inner.check_player(record.player_id)?;
        Ok(inner.push_performance(record, now()))
    }

    fn save_game(&self, result: NewGameResult) -> Result<(GameResult, PerformanceRecord)> {
        let mut inner = self.inner.lock();
        inner.check_player(result.player_id)?;

        let played_at = now();
        let game = GameResult {
            id: inner.next_id(),
            player_id: result.player_id,
            difficulty: result.difficulty,
            level: result.level,
            wpm: result.wpm,
            accuracy: result.accuracy,
            errors: result.errors,
            score: result.score,
            time_played: result.time_played,
            played_at,
        };
        inner.games.push(game.clone());
        let performance = inner.push_performance(result.performance(), played_at);
        Ok((game, performance))
    }

    fn history(&self, player_id: i32, limit: i64) -> Result<Vec<PerformanceRecord>> {
        let inner = self.inner.lock();
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(inner
            .performances
            .iter()
            .rev()
            .filter(|r| r.player_id == player_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn game_results(&self, player_id: i32) -> Result<Vec<GameResult>> {
        let inner = self.inner.lock();
        Ok(inner
            .games
            .iter()
            .filter(|g| g.player_id == player_id)
            .cloned()
            .collect())
    }

    fn ranking(&self) -> Result<Vec<RankingEntry>> {
        let inner = self.inner.lock();
        let rows = inner.performances.iter().filter_map(|r| {
            inner
                .accounts
                .iter()
                .find(|(a, _)| a.id == r.player_id)
                .map(|(a, _)| (r.clone(), a.username.clone()))
        });
        Ok(best_per_player(rows))
    }
}
