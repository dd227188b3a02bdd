use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::result::DatabaseErrorKind;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

pub mod models;
pub mod schema;

use self::models::{
    GameResult, NewGameResult, NewPerformance, NewPhrase, NewUser, PerformanceRecord, Phrase,
    User,
};
use crate::error::StoreError;
use crate::game::phrase::{word_count, WordBand};
use crate::store::{
    self, Account, AccountStore, Identity, PerformanceStore, PhraseStore, RankingEntry, Role,
};

type Result<T> = std::result::Result<T, StoreError>;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// SQLite backend for every store trait.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Opens (or creates) the database and brings its schema up to date.
    pub fn open(database_url: &str, pool_size: u32) -> Result<Self> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_customizer(Box::new(SqlitePragmas))
            .build(manager)?;

        let mut conn = pool.get()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        if !applied.is_empty() {
            info!("applied {} migration(s) to {}", applied.len(), database_url);
        }

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<ConnectionManager<SqliteConnection>>> {
        Ok(self.pool.get()?)
    }
}

fn account_from_row(user: User) -> Result<Account> {
    let role = user
        .role
        .parse::<Role>()
        .map_err(|e| StoreError::Corrupt(format!("user {}: {}", user.id, e)))?;
    Ok(Account {
        id: user.id,
        username: user.username,
        role,
    })
}

fn check_inserted(count: usize) -> Result<()> {
    if count != 1 {
        return Err(StoreError::Insert(count));
    }
    Ok(())
}

pub fn find_user_by_token(conn: &mut SqliteConnection, api_token: &str) -> Result<Option<User>> {
    use schema::users::dsl::*;

    let user = users
        .filter(token.eq(api_token))
        .select(User::as_select())
        .first(conn)
        .optional()?;
    Ok(user)
}

pub fn create_user(
    conn: &mut SqliteConnection,
    name: &str,
    user_role: Role,
    api_token: &str,
) -> Result<User> {
    use schema::users::dsl::*;

    conn.immediate_transaction::<User, StoreError, _>(|conn| {
        let new_user = NewUser {
            username: name,
            role: user_role.as_str(),
            token: api_token,
        };
        let inserted = diesel::insert_into(users)
            .values(&new_user)
            .execute(conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    StoreError::Duplicate(name.to_owned())
                }
                other => StoreError::Database(other),
            })?;
        check_inserted(inserted)?;

        let user = users
            .filter(username.eq(name))
            .select(User::as_select())
            .first(conn)?;
        Ok(user)
    })
}

pub fn create_phrase(conn: &mut SqliteConnection, phrase: &NewPhrase) -> Result<Phrase> {
    use schema::phrases::dsl::*;

    conn.immediate_transaction::<Phrase, StoreError, _>(|conn| {
        let inserted = diesel::insert_into(phrases).values(phrase).execute(conn)?;
        check_inserted(inserted)?;

        let row = phrases
            .order(id.desc())
            .select(Phrase::as_select())
            .first(conn)?;
        Ok(row)
    })
}

pub fn query_phrases(
    conn: &mut SqliteConnection,
    wanted: i32,
    band: Option<WordBand>,
) -> Result<Vec<Phrase>> {
    use schema::phrases;

    // Word counts are not expressible in SQLite, so the band is applied here.
    let rows = phrases::table
        .filter(phrases::difficulty.eq(wanted))
        .order(phrases::id.asc())
        .select(Phrase::as_select())
        .load(conn)?;

    Ok(match band {
        Some(band) => rows
            .into_iter()
            .filter(|p| band.contains(word_count(&p.text)))
            .collect(),
        None => rows,
    })
}

pub fn list_phrases(conn: &mut SqliteConnection) -> Result<Vec<Phrase>> {
    use schema::phrases::dsl::*;

    let rows = phrases
        .order((difficulty.asc(), id.asc()))
        .select(Phrase::as_select())
        .load(conn)?;
    Ok(rows)
}

pub fn delete_phrase(conn: &mut SqliteConnection, phrase_id: i32) -> Result<bool> {
    use schema::phrases::dsl::*;

    let removed = diesel::delete(phrases.find(phrase_id)).execute(conn)?;
    Ok(removed > 0)
}

fn insert_performance_row(conn: &mut SqliteConnection, record: &NewPerformance) -> Result<PerformanceRecord> {
    use schema::performances::dsl::*;

    let inserted = diesel::insert_into(performances).values(record).execute(conn)?;
    check_inserted(inserted)?;

    let row = performances
        .order(id.desc())
        .select(PerformanceRecord::as_select())
        .first(conn)?;
    Ok(row)
}

fn insert_game_row(conn: &mut SqliteConnection, result: &NewGameResult) -> Result<GameResult> {
    use schema::game_results::dsl::*;

    let inserted = diesel::insert_into(game_results).values(result).execute(conn)?;
    check_inserted(inserted)?;

    let row = game_results
        .order(id.desc())
        .select(GameResult::as_select())
        .first(conn)?;
    Ok(row)
}

pub fn create_performance(conn: &mut SqliteConnection, record: &NewPerformance) -> Result<PerformanceRecord> {
    conn.immediate_transaction::<PerformanceRecord, StoreError, _>(|conn| insert_performance_row(conn, record))
}

/// Both rows land or neither does.
pub fn create_game_result(
    conn: &mut SqliteConnection,
    result: &NewGameResult,
) -> Result<(GameResult, PerformanceRecord)> {
    conn.immediate_transaction::<_, StoreError, _>(|conn| {
        let game = insert_game_row(conn, result)?;
        let performance = insert_performance_row(conn, &result.performance())?;
        Ok((game, performance))
    })
}

pub fn performance_history(
    conn: &mut SqliteConnection,
    player: i32,
    max_rows: i64,
) -> Result<Vec<PerformanceRecord>> {
    use schema::performances::dsl::*;

    let rows = performances
        .filter(user_id.eq(player))
        .order(id.desc())
        .limit(max_rows)
        .select(PerformanceRecord::as_select())
        .load(conn)?;
    Ok(rows)
}

pub fn game_results_for(conn: &mut SqliteConnection, player: i32) -> Result<Vec<GameResult>> {
    use schema::game_results::dsl::*;

    let rows = game_results
        .filter(user_id.eq(player))
        .order(id.asc())
        .select(GameResult::as_select())
        .load(conn)?;
    Ok(rows)
}

pub fn ranking(conn: &mut SqliteConnection) -> Result<Vec<RankingEntry>> {
    use schema::{performances, users};

    let rows = performances::table
        .inner_join(users::table)
        .select((PerformanceRecord::as_select(), users::username))
        .load::<(PerformanceRecord, String)>(conn)?;
    Ok(store::best_per_player(rows))
}

impl AccountStore for SqliteStore {
    fn identify(&self, token: Option<&str>) -> Result<Identity> {
        let token = match token {
            Some(t) => t,
            None => return Ok(Identity::Anonymous),
        };
        match find_user_by_token(&mut *self.conn()?, token)? {
            Some(user) => Ok(Identity::Authenticated(account_from_row(user)?)),
            None => Ok(Identity::Anonymous),
        }
    }

    fn create_account(&self, username: &str, role: Role) -> Result<(Account, String)> {
        let token = store::generate_token();
        let user = create_user(&mut *self.conn()?, username, role, &token)?;
        Ok((account_from_row(user)?, token))
    }
}

impl PhraseStore for SqliteStore {
    fn query(&self, difficulty: i32, band: Option<WordBand>) -> Result<Vec<Phrase>> {
        query_phrases(&mut *self.conn()?, difficulty, band)
    }

    fn create(&self, phrase: NewPhrase) -> Result<Phrase> {
        create_phrase(&mut *self.conn()?, &phrase)
    }

    fn delete(&self, id: i32) -> Result<bool> {
        delete_phrase(&mut *self.conn()?, id)
    }

    fn list(&self) -> Result<Vec<Phrase>> {
        list_phrases(&mut *self.conn()?)
    }
}

impl PerformanceStore for SqliteStore {
    fn append(&self, record: NewPerformance) -> Result<PerformanceRecord> {
        create_performance(&mut *self.conn()?, &record)
    }

    fn save_game(&self, result: NewGameResult) -> Result<(GameResult, PerformanceRecord)> {
        create_game_result(&mut *self.conn()?, &result)
    }

    fn history(&self, player_id: i32, limit: i64) -> Result<Vec<PerformanceRecord>> {
        performance_history(&mut *self.conn()?, player_id, limit)
    }

    fn game_results(&self, player_id: i32) -> Result<Vec<GameResult>> {
        game_results_for(&mut *self.conn()?, player_id)
    }

    fn ranking(&self) -> Result<Vec<RankingEntry>> {
        ranking(&mut *self.conn()?)
    }
}
