mod helpers;

use helpers::*;
use pricewatch_backend::models::ArchivePolicy;
use pricewatch_backend::services::{Catalog, FilterQuery};

// ============================================================================
// Ingestion: insert / update contract
// ============================================================================

#[tokio::test]
async fn test_first_observation_inserts() {
    let db = TestDatabase::new().await;

    let outcome = db
        .state
        .ingest
        .ingest(
            &observation("storeA", "cat1", "Widget TR", "100,00"),
            ArchivePolicy::PriceChange,
        )
        .await
        .unwrap();

    assert!(outcome.inserted);
    assert!(!outcome.updated);
    assert!(outcome.previous.is_none());

    let item = db
        .state
        .item_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap()
        .expect("row should exist");
    assert_eq!(item.sell_price, "100,00");
    assert_eq!(item.sell_price_value, Some(100.0));
    assert_eq!(item.currency, "₺");
    assert_eq!(item.created_at, item.updated_at);
}

#[tokio::test]
async fn test_update_returns_previous_and_keeps_created_at() {
    let db = TestDatabase::new().await;

    db.state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget TR", "100,00"), ArchivePolicy::None)
        .await
        .unwrap();
    let first = db
        .state
        .item_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap()
        .unwrap();

    let outcome = db
        .state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget TR", "120,00"), ArchivePolicy::None)
        .await
        .unwrap();

    assert!(outcome.updated);
    assert_eq!(outcome.previous.unwrap().sell_price, "100,00");

    let current = db
        .state
        .item_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.sell_price, "120,00");
    assert_eq!(current.created_at, first.created_at);
    assert_eq!(current.id, first.id);
}

#[tokio::test]
async fn test_key_fields_are_whitespace_normalized() {
    let db = TestDatabase::new().await;

    db.state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget  TR", "100,00"), ArchivePolicy::None)
        .await
        .unwrap();
    let outcome = db
        .state
        .ingest
        .ingest(&observation("storeA", "cat1", " Widget TR ", "110,00"), ArchivePolicy::None)
        .await
        .unwrap();

    // Both spellings hit the same row.
    assert!(outcome.updated);
    let item = db
        .state
        .item_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.sell_price, "110,00");
}

#[tokio::test]
async fn test_unparsable_price_persists_nothing() {
    let db = TestDatabase::new().await;

    let err = db
        .state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget TR", "fiyat yok"), ArchivePolicy::Always)
        .await
        .unwrap_err();
    assert!(err.is_unparsable_price());

    let item = db
        .state
        .item_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap();
    assert!(item.is_none());
}

#[tokio::test]
async fn test_hint_wins_over_text() {
    let db = TestDatabase::new().await;

    db.state
        .ingest
        .ingest(
            &observation_with_hint("storeA", "cat1", "Widget TR", "broken text 1", 149.9),
            ArchivePolicy::None,
        )
        .await
        .unwrap();

    let item = db
        .state
        .item_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.sell_price_value, Some(149.9));
}

// ============================================================================
// Archival policy matrix
// ============================================================================

#[tokio::test]
async fn test_price_change_archives_exactly_once() {
    // End-to-end scenario: 100,00 then 120,00 under on-price-change.
    let db = TestDatabase::new().await;

    db.state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget TR", "100,00"), ArchivePolicy::PriceChange)
        .await
        .unwrap();
    db.state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget TR", "120,00"), ArchivePolicy::PriceChange)
        .await
        .unwrap();

    let current = db
        .state
        .item_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.sell_price, "120,00");

    let snapshots = db
        .state
        .archive_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].sell_price, "100,00");
}

#[tokio::test]
async fn test_unchanged_price_never_archives_under_price_change() {
    let db = TestDatabase::new().await;

    for _ in 0..2 {
        db.state
            .ingest
            .ingest(&observation("storeA", "cat1", "Widget TR", "100,00"), ArchivePolicy::PriceChange)
            .await
            .unwrap();
    }

    let current = db
        .state
        .item_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.sell_price, "100,00");

    let count = db
        .state
        .archive_repo
        .count_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_whitespace_jitter_is_not_a_price_change() {
    let db = TestDatabase::new().await;

    db.state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget TR", "100,00"), ArchivePolicy::PriceChange)
        .await
        .unwrap();
    db.state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget TR", " 100,00 "), ArchivePolicy::PriceChange)
        .await
        .unwrap();

    let count = db
        .state
        .archive_repo
        .count_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_always_archives_every_overwrite() {
    let db = TestDatabase::new().await;

    // First call has no prior state, nothing to archive.
    db.state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget TR", "100,00"), ArchivePolicy::Always)
        .await
        .unwrap();
    assert_eq!(
        db.state.archive_repo.count_by_key("storeA", "cat1", "Widget TR").await.unwrap(),
        0
    );

    // Identical price still archives under always.
    db.state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget TR", "100,00"), ArchivePolicy::Always)
        .await
        .unwrap();
    assert_eq!(
        db.state.archive_repo.count_by_key("storeA", "cat1", "Widget TR").await.unwrap(),
        1
    );

    db.state
        .ingest
        .ingest(&observation("storeA", "cat1", "Widget TR", "110,00"), ArchivePolicy::Always)
        .await
        .unwrap();
    assert_eq!(
        db.state.archive_repo.count_by_key("storeA", "cat1", "Widget TR").await.unwrap(),
        2
    );
}

#[tokio::test]
async fn test_none_never_archives() {
    let db = TestDatabase::new().await;

    for price in ["100,00", "120,00", "90,00"] {
        db.state
            .ingest
            .ingest(&observation("storeA", "cat1", "Widget TR", price), ArchivePolicy::None)
            .await
            .unwrap();
    }

    assert_eq!(
        db.state.archive_repo.count_by_key("storeA", "cat1", "Widget TR").await.unwrap(),
        0
    );
}

// ============================================================================
// Archive replay round-trip
// ============================================================================

#[tokio::test]
async fn test_replay_reconstructs_full_history() {
    let db = TestDatabase::new().await;

    let prices = ["100,00", "110,00", "120,00", "130,00"];
    for price in prices {
        db.state
            .ingest
            .ingest(&observation("storeA", "cat1", "Widget TR", price), ArchivePolicy::PriceChange)
            .await
            .unwrap();
    }

    let snapshots = db
        .state
        .archive_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap();
    let current = db
        .state
        .item_repo
        .find_by_key("storeA", "cat1", "Widget TR")
        .await
        .unwrap()
        .unwrap();

    // Snapshots ascending by archival time, then the live row, equals
    // the observed sequence with nothing skipped.
    let mut replayed: Vec<String> = snapshots.iter().map(|s| s.sell_price.clone()).collect();
    replayed.push(current.sell_price.clone());
    assert_eq!(replayed, prices);

    let mut times: Vec<_> = snapshots.iter().map(|s| s.archived_at).collect();
    times.push(current.updated_at);
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted, "history must be monotonic by time");
}

// ============================================================================
// Paged filtered read
// ============================================================================

#[tokio::test]
async fn test_filtered_read_pages_and_counts() {
    let db = TestDatabase::new().await;
    let catalog = Catalog::tracked();

    for i in 0..30 {
        db.state
            .ingest
            .ingest(
                &observation(
                    "gamesatis",
                    "gamesatis-mlbb-tr",
                    &format!("{} Elmas", (i + 1) * 10),
                    "49,90",
                ),
                ArchivePolicy::None,
            )
            .await
            .unwrap();
    }
    // A different site that must not match the prefix filter.
    db.state
        .ingest
        .ingest(
            &observation("kabasakalonline", "kabasakal-mlbb-tr", "100 Elmas", "59,90"),
            ArchivePolicy::None,
        )
        .await
        .unwrap();

    let page1 = db
        .state
        .catalog
        .filtered(
            &catalog,
            &FilterQuery {
                group: "mlbb".to_string(),
                site: "GameSatis".to_string(), // prefix, case-insensitive
                start: None,
                end: None,
                page: 1,
            },
        )
        .await
        .unwrap();
    assert_eq!(page1.total_count, 30);
    assert_eq!(page1.total_pages, 2);
    assert_eq!(page1.rows.len(), 25);
    // TR category rows carry "-" in the global column.
    assert!(page1.rows.iter().all(|r| r.global == "-"));

    let page2 = db
        .state
        .catalog
        .filtered(
            &catalog,
            &FilterQuery {
                group: "mlbb".to_string(),
                site: "gamesatis".to_string(),
                start: None,
                end: None,
                page: 2,
            },
        )
        .await
        .unwrap();
    assert_eq!(page2.rows.len(), 5);

    let unknown_group = db
        .state
        .catalog
        .filtered(
            &catalog,
            &FilterQuery {
                group: "csgo".to_string(),
                site: "gamesatis".to_string(),
                start: None,
                end: None,
                page: 1,
            },
        )
        .await;
    assert!(unknown_group.is_err());
}

#[tokio::test]
async fn test_filtered_site_prefix_wildcards_are_literal() {
    let db = TestDatabase::new().await;
    let catalog = Catalog::tracked();

    db.state
        .ingest
        .ingest(
            &observation("gamesatis", "gamesatis-mlbb-tr", "100 Elmas", "49,90"),
            ArchivePolicy::None,
        )
        .await
        .unwrap();

    // LIKE metacharacters in the site filter must match literally, not
    // as wildcards.
    for site in ["%", "_ames%", "game_atis"] {
        let page = db
            .state
            .catalog
            .filtered(
                &catalog,
                &FilterQuery {
                    group: "mlbb".to_string(),
                    site: site.to_string(),
                    start: None,
                    end: None,
                    page: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total_count, 0, "site filter {:?} matched rows", site);
        assert!(page.rows.is_empty());
    }
}
