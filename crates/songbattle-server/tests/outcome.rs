use std::sync::Arc;

use songbattle_core::outcome::record_outcome;
use songbattle_core::{BattleError, Catalog, MatchConfig, OutcomeTx, RatingStore};
use songbattle_server::db::SqliteStore;
use songbattle_server::memory::MemoryStore;

const SESSION: &str = "session-a";

fn catalog() -> Catalog {
    Catalog::from_json(
        r#"[
            {"id": 1, "title": "Respect", "artist": "Aretha Franklin", "genre": "Soul"},
            {"id": 2, "title": "Jolene", "artist": "Dolly Parton", "genre": "Country"},
            {"id": 3, "title": "Strobe", "artist": "deadmau5", "genre": "Electronic"},
            {"id": 4, "title": "Clair de Lune", "artist": "Claude Debussy"}
        ]"#,
    )
    .unwrap()
}

async fn sqlite_store() -> SqliteStore {
    songbattle_server::connect_sqlite("sqlite::memory:")
        .await
        .unwrap()
}

async fn setup<S: RatingStore>(store: &S) -> Catalog {
    let catalog = catalog();
    store.register_songs(&catalog.ids()).await.unwrap();
    catalog
}

// ── Scenarios (run against both stores) ─────────────────────────────────

async fn counters_and_snapshot<S: RatingStore>(store: S) {
    let catalog = setup(&store).await;
    let config = MatchConfig::default();

    let result = record_outcome(&store, &catalog, &config, SESSION, Some(1), Some(2))
        .await
        .unwrap();
    assert_eq!(result.new_rating, 1516);
    assert_eq!(result.rating_delta, 16);

    let global = store.global_ratings().await.unwrap();
    assert_eq!(global[&1].rating, 1516);
    assert_eq!(global[&1].previous_rating, 1500);
    assert_eq!(global[&1].comparisons, 1);
    assert_eq!(global[&1].wins, 1);
    assert_eq!(global[&2].rating, 1484);
    assert_eq!(global[&2].comparisons, 1);
    assert_eq!(global[&2].wins, 0);
    assert_eq!(global[&3].comparisons, 0);

    // Personal ratings are seeded from the global ratings just written, then updated.
    let personal = store.personal_ratings(SESSION).await.unwrap();
    let (winner_personal, loser_personal) = songbattle_core::update_ratings(1516, 1484, 32);
    assert_eq!(personal[&1].rating, winner_personal);
    assert_eq!(personal[&2].rating, loser_personal);
    assert_eq!(personal[&1].wins, 1);
    assert_eq!(personal[&2].comparisons, 1);

    // The underdog wins the rematch.
    let result = record_outcome(&store, &catalog, &config, SESSION, Some(2), Some(1))
        .await
        .unwrap();
    let (expected, _) = songbattle_core::update_ratings(1484, 1516, 32);
    assert_eq!(result.new_rating, expected);
    assert_eq!(result.rating_delta, expected - 1484);

    let global = store.global_ratings().await.unwrap();
    assert_eq!(global[&1].comparisons, 2);
    assert_eq!(global[&1].wins, 1);
    assert_eq!(global[&2].comparisons, 2);
    assert_eq!(global[&2].wins, 1);
}

async fn invalid_outcome_changes_nothing<S: RatingStore>(store: S) {
    let catalog = setup(&store).await;
    let config = MatchConfig::default();
    record_outcome(&store, &catalog, &config, SESSION, Some(1), Some(3))
        .await
        .unwrap();

    let global = store.global_ratings().await.unwrap();
    let personal = store.personal_ratings(SESSION).await.unwrap();
    let recent = store.recent_pairs(SESSION).await.unwrap();
    let mut affinity = store.affinity(SESSION).await.unwrap();
    affinity.sort_by(|a, b| a.0.cmp(&b.0));

    for (winner, loser) in [(Some(1), Some(1)), (None, Some(2)), (Some(1), Some(99))] {
        let err = record_outcome(&store, &catalog, &config, SESSION, winner, loser)
            .await
            .unwrap_err();
        assert!(matches!(err, BattleError::InvalidOutcome(_)));
    }
    let err = record_outcome(&store, &catalog, &config, "  ", Some(1), Some(2))
        .await
        .unwrap_err();
    assert!(matches!(err, BattleError::InvalidOutcome(_)));

    assert_eq!(store.global_ratings().await.unwrap(), global);
    assert_eq!(store.personal_ratings(SESSION).await.unwrap(), personal);
    assert_eq!(store.recent_pairs(SESSION).await.unwrap(), recent);
    let mut after = store.affinity(SESSION).await.unwrap();
    after.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(after, affinity);
}

async fn personal_rating_seeds_from_global<S: RatingStore>(store: S) {
    let catalog = setup(&store).await;
    let config = MatchConfig::default();
    record_outcome(&store, &catalog, &config, "voter", Some(1), Some(2))
        .await
        .unwrap();

    // A new session meets song 1 at its current global rating, not at 1500.
    let first = store.personal_rating_or_init("newcomer", 1).await.unwrap();
    assert_eq!(first, 1516);

    // Global moves on; the newcomer's record does not get re-seeded.
    record_outcome(&store, &catalog, &config, "voter", Some(1), Some(2))
        .await
        .unwrap();
    assert!(store.global_ratings().await.unwrap()[&1].rating > 1516);
    let second = store.personal_rating_or_init("newcomer", 1).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(store.personal_ratings("newcomer").await.unwrap().len(), 1);
}

async fn personal_and_global_diverge<S: RatingStore>(store: S) {
    let catalog = setup(&store).await;
    let config = MatchConfig::default();

    for _ in 0..3 {
        record_outcome(&store, &catalog, &config, "fan", Some(1), Some(2))
            .await
            .unwrap();
    }
    record_outcome(&store, &catalog, &config, "critic", Some(2), Some(1))
        .await
        .unwrap();

    let global = store.global_ratings().await.unwrap();
    let critic = store.personal_ratings("critic").await.unwrap();
    let fan = store.personal_ratings("fan").await.unwrap();

    // The critic's vote pulled the global ratings back, but not the fan's own.
    assert!(fan[&1].rating > global[&1].rating);
    assert!(fan[&2].rating < global[&2].rating);
    assert!(critic[&2].rating > global[&2].rating);
    assert!(critic[&2].rating > fan[&2].rating);
    assert_eq!(critic[&1].comparisons, 1);
    assert_eq!(critic[&2].wins, 1);
    assert_eq!(fan[&1].wins, 3);
}

async fn recency_keeps_newest_ten<S: RatingStore>(store: S) {
    let catalog = setup(&store).await;
    let config = MatchConfig::default();

    let pairs: Vec<(i64, i64)> = (0..15)
        .map(|i| match i % 3 {
            0 => (1, 2),
            1 => (3, 4),
            _ => (2, 3),
        })
        .collect();
    for &(winner, loser) in &pairs {
        record_outcome(&store, &catalog, &config, SESSION, Some(winner), Some(loser))
            .await
            .unwrap();
        assert!(store.recent_pairs(SESSION).await.unwrap().len() <= 10);
    }

    assert_eq!(store.recent_pairs(SESSION).await.unwrap(), pairs[5..].to_vec());
    assert!(store.recent_pairs("someone-else").await.unwrap().is_empty());
}

async fn affinity_skips_untagged<S: RatingStore>(store: S) {
    let catalog = setup(&store).await;
    let config = MatchConfig::default();

    record_outcome(&store, &catalog, &config, SESSION, Some(1), Some(2))
        .await
        .unwrap();
    record_outcome(&store, &catalog, &config, SESSION, Some(4), Some(1))
        .await
        .unwrap();
    record_outcome(&store, &catalog, &config, SESSION, Some(3), Some(4))
        .await
        .unwrap();

    let mut affinity = store.affinity(SESSION).await.unwrap();
    affinity.sort_by(|a, b| a.0.cmp(&b.0));
    let summary: Vec<(&str, u32, u32)> = affinity
        .iter()
        .map(|(genre, r)| (genre.as_str(), r.wins, r.comparisons))
        .collect();
    assert_eq!(
        summary,
        vec![("Country", 0, 1), ("Electronic", 1, 1), ("Soul", 1, 2)]
    );
}

async fn concurrent_outcomes_do_not_lose_updates<S>(store: S, rounds: u32)
where
    S: RatingStore + Clone + 'static,
{
    let catalog = Arc::new(setup(&store).await);
    let config = Arc::new(MatchConfig::default());

    let mut handles = Vec::new();
    for i in 0..rounds {
        let store = store.clone();
        let catalog = catalog.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            let session = format!("voter-{}", i);
            record_outcome(&store, &catalog, &config, &session, Some(1), Some(2))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let global = store.global_ratings().await.unwrap();
    assert_eq!(global[&1].comparisons, rounds);
    assert_eq!(global[&1].wins, rounds);
    assert_eq!(global[&2].comparisons, rounds);

    // Replaying the same sequence serially gives the same final rating.
    let (mut winner, mut loser) = (1500, 1500);
    for _ in 0..rounds {
        (winner, loser) = songbattle_core::update_ratings(winner, loser, 32);
    }
    assert_eq!(global[&1].rating, winner);
    assert_eq!(global[&2].rating, loser);
}

// ── Memory store ────────────────────────────────────────────────────────

#[tokio::test]
async fn memory_counters_and_snapshot() {
    counters_and_snapshot(MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_invalid_outcome_changes_nothing() {
    invalid_outcome_changes_nothing(MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_personal_rating_seeds_from_global() {
    personal_rating_seeds_from_global(MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_personal_and_global_diverge() {
    personal_and_global_diverge(MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_recency_keeps_newest_ten() {
    recency_keeps_newest_ten(MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_affinity_skips_untagged() {
    affinity_skips_untagged(MemoryStore::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_concurrent_outcomes_do_not_lose_updates() {
    concurrent_outcomes_do_not_lose_updates(MemoryStore::new(), 20).await;
}

// ── SQLite store ────────────────────────────────────────────────────────

#[tokio::test]
async fn sqlite_counters_and_snapshot() {
    counters_and_snapshot(sqlite_store().await).await;
}

#[tokio::test]
async fn sqlite_invalid_outcome_changes_nothing() {
    invalid_outcome_changes_nothing(sqlite_store().await).await;
}

#[tokio::test]
async fn sqlite_personal_rating_seeds_from_global() {
    personal_rating_seeds_from_global(sqlite_store().await).await;
}

#[tokio::test]
async fn sqlite_personal_and_global_diverge() {
    personal_and_global_diverge(sqlite_store().await).await;
}

#[tokio::test]
async fn sqlite_recency_keeps_newest_ten() {
    recency_keeps_newest_ten(sqlite_store().await).await;
}

#[tokio::test]
async fn sqlite_affinity_skips_untagged() {
    affinity_skips_untagged(sqlite_store().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_outcomes_do_not_lose_updates() {
    concurrent_outcomes_do_not_lose_updates(sqlite_store().await, 20).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_file_concurrent_outcomes_do_not_lose_updates() {
    // A file database gets a multi-connection pool, so transactions really contend.
    let dir = tempfile::TempDir::new().expect("temp dir");
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("battles.db").display());
    let store = songbattle_server::connect_sqlite(&url).await.unwrap();
    concurrent_outcomes_do_not_lose_updates(store, 40).await;
}

#[tokio::test]
async fn sqlite_personal_read_does_not_write_twice() {
    let store = sqlite_store().await;
    setup(&store).await;

    assert_eq!(store.personal_rating_or_init(SESSION, 3).await.unwrap(), 1500);
    assert_eq!(store.personal_rating_or_init(SESSION, 3).await.unwrap(), 1500);

    let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM personal_ratings")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn sqlite_ratings_survive_reregistration() {
    let store = sqlite_store().await;
    let catalog = setup(&store).await;
    record_outcome(&store, &catalog, &MatchConfig::default(), SESSION, Some(1), Some(2))
        .await
        .unwrap();

    store.register_songs(&catalog.ids()).await.unwrap();
    assert_eq!(store.global_ratings().await.unwrap()[&1].rating, 1516);

    // A song the catalog never registered reads as the default without a record.
    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.global_rating(42).await.unwrap(), 1500);
    drop(tx);
    assert!(!store.global_ratings().await.unwrap().contains_key(&42));
}
