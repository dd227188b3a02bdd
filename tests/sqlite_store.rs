use std::sync::Arc;
use std::thread;

use assert_matches::assert_matches;
use tempfile::TempDir;

use classtyper::db::SqliteStore;
use classtyper::error::StoreError;
use classtyper::game::phrase::{word_count, WordBand};
use classtyper::store::{
    AccountStore, Identity, NewGameResult, NewPerformance, NewPhrase, PerformanceStore,
    PhraseStore, Role,
};

fn open() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().unwrap();
    let url = dir.path().join("classtyper.sqlite");
    let store = SqliteStore::open(url.to_str().unwrap(), 4).unwrap();
    (dir, store)
}

fn performance(player_id: i32, wpm: f64) -> NewPerformance {
    NewPerformance {
        player_id,
        wpm,
        accuracy: 95.0,
        difficulty: 1,
        errors: None,
    }
}

#[test]
fn reopening_keeps_data_and_skips_applied_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let url = dir.path().join("classtyper.sqlite");
    let url = url.to_str().unwrap();

    let (_, token) = SqliteStore::open(url, 1)
        .unwrap()
        .create_account("ana", Role::Student)
        .unwrap();
    let store = SqliteStore::open(url, 1).unwrap();
    assert!(store.identify(Some(&token)).unwrap().is_authenticated());
}

#[test]
fn accounts_resolve_by_token() {
    let (_dir, store) = open();
    let (teacher, token) = store.create_account("prof", Role::Teacher).unwrap();
    assert_eq!(teacher.role, Role::Teacher);

    assert_eq!(
        store.identify(Some(&token)).unwrap(),
        Identity::Authenticated(teacher)
    );
    assert_eq!(store.identify(Some("bogus")).unwrap(), Identity::Anonymous);
    assert_eq!(store.identify(None).unwrap(), Identity::Anonymous);
}

#[test]
fn duplicate_usernames_are_reported() {
    let (_dir, store) = open();
    store.create_account("ana", Role::Student).unwrap();
    assert_matches!(
        store.create_account("ana", Role::Student),
        Err(StoreError::Duplicate(name)) if name == "ana"
    );
}

#[test]
fn phrase_queries_filter_by_difficulty_and_band() {
    let (_dir, store) = open();
    let (teacher, _) = store.create_account("prof", Role::Teacher).unwrap();
    for (text, difficulty) in [
        ("um dois três", 1),
        ("um dois três quatro cinco seis", 1),
        ("um dois três quatro", 2),
    ] {
        store
            .create(NewPhrase::new(text, difficulty, Some(teacher.id)).unwrap())
            .unwrap();
    }

    let band = WordBand::for_player(1, 0);
    let hits = store.query(1, Some(band)).unwrap();
    assert_eq!(hits.len(), 1);
    assert!(band.contains(word_count(&hits[0].text)));
    assert_eq!(hits[0].created_by, Some(teacher.id));

    assert_eq!(store.query(1, None).unwrap().len(), 2);
    assert_eq!(store.query(3, None).unwrap().len(), 0);
}

#[test]
fn phrases_can_be_listed_and_deleted() {
    let (_dir, store) = open();
    let hard = store
        .create(NewPhrase::new("frase difícil aqui", 4, None).unwrap())
        .unwrap();
    let easy = store
        .create(NewPhrase::new("frase fácil aqui", 1, None).unwrap())
        .unwrap();

    let listed: Vec<i32> = store.list().unwrap().iter().map(|p| p.id).collect();
    assert_eq!(listed, vec![easy.id, hard.id]);

    assert!(store.delete(hard.id).unwrap());
    assert!(!store.delete(hard.id).unwrap());
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn saved_game_round_trips_without_coercion() {
    let (_dir, store) = open();
    let (player, _) = store.create_account("ana", Role::Student).unwrap();
    let result = NewGameResult {
        player_id: player.id,
        difficulty: 3,
        level: 12,
        wpm: 47.123456789,
        accuracy: 93.75,
        errors: 5,
        score: 2048,
        time_played: 187,
    };

    let (game, perf) = store.save_game(result.clone()).unwrap();

    let stored = store.game_results(player.id).unwrap();
    assert_eq!(stored, vec![game.clone()]);
    assert_eq!(game.difficulty, result.difficulty);
    assert_eq!(game.level, result.level);
    assert_eq!(game.wpm, result.wpm);
    assert_eq!(game.accuracy, result.accuracy);
    assert_eq!(game.errors, result.errors);
    assert_eq!(game.score, result.score);
    assert_eq!(game.time_played, result.time_played);

    assert_eq!(perf.player_id, player.id);
    assert_eq!(perf.wpm, result.wpm);
    assert_eq!(perf.errors, Some(5));
    assert_eq!(store.history(player.id, 10).unwrap(), vec![perf]);
}

#[test]
fn writes_for_unknown_players_leave_nothing_behind() {
    let (_dir, store) = open();
    let (player, _) = store.create_account("ana", Role::Student).unwrap();

    assert!(store.append(performance(999, 10.0)).is_err());
    let orphan = NewGameResult {
        player_id: 999,
        difficulty: 1,
        level: 1,
        wpm: 10.0,
        accuracy: 50.0,
        errors: 0,
        score: 0,
        time_played: 10,
    };
    assert!(store.save_game(orphan).is_err());

    assert!(store.game_results(999).unwrap().is_empty());
    assert!(store.history(999, 10).unwrap().is_empty());
    assert!(store.ranking().unwrap().is_empty());
    assert!(store.history(player.id, 10).unwrap().is_empty());
}

#[test]
fn history_is_newest_first_and_limited() {
    let (_dir, store) = open();
    let (player, _) = store.create_account("ana", Role::Student).unwrap();
    for wpm in [10.0, 20.0, 30.0, 40.0] {
        store.append(performance(player.id, wpm)).unwrap();
    }

    let wpms: Vec<f64> = store
        .history(player.id, 3)
        .unwrap()
        .iter()
        .map(|r| r.wpm)
        .collect();
    assert_eq!(wpms, vec![40.0, 30.0, 20.0]);
}

#[test]
fn ranking_lists_each_players_best() {
    let (_dir, store) = open();
    let (ana, _) = store.create_account("ana", Role::Student).unwrap();
    let (bia, _) = store.create_account("bia", Role::Student).unwrap();
    store.create_account("caio", Role::Student).unwrap();

    for (player, wpm) in [(ana.id, 35.0), (bia.id, 50.0), (ana.id, 62.5), (bia.id, 20.0)] {
        store.append(performance(player, wpm)).unwrap();
    }

    let ranking = store.ranking().unwrap();
    let rows: Vec<(&str, f64)> = ranking
        .iter()
        .map(|r| (r.username.as_str(), r.wpm))
        .collect();
    assert_eq!(rows, vec![("ana", 62.5), ("bia", 50.0)]);
}

#[test]
fn concurrent_players_get_independent_records() {
    let (_dir, store) = open();
    let store = Arc::new(store);
    let (ana, _) = store.create_account("ana", Role::Student).unwrap();
    let (bia, _) = store.create_account("bia", Role::Student).unwrap();

    let handles: Vec<_> = [(ana.id, 40.0), (bia.id, 70.0)]
        .into_iter()
        .map(|(player, wpm)| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..20 {
                    store.append(performance(player, wpm)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for (player, wpm) in [(ana.id, 40.0), (bia.id, 70.0)] {
        let history = store.history(player, 100).unwrap();
        assert_eq!(history.len(), 20);
        assert!(history.iter().all(|r| r.player_id == player && r.wpm == wpm));
    }
}
