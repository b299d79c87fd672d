//! End-to-end tests for the ingestion pipeline

use std::collections::HashSet;
use std::io::Write;

use cohort_config::IngestConfig;
use cohort_store::Store;

use crate::error::IngestError;
use crate::normalize::RateTable;
use crate::pipeline::Pipeline;

const HEADER: &str = "appsflyer_id,event_name,event_value,event_time,install_time,country_code,device_model,app_id,platform,media_source,event_revenue,event_revenue_currency,event_revenue_usd,order_id";

fn write_csv(rows: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

async fn rate_table(store: &Store) -> RateTable {
    RateTable::new(store.rates().all().await.unwrap())
}

fn config_with_chunk(chunk_size: usize) -> IngestConfig {
    IngestConfig {
        chunk_size,
        ..IngestConfig::default()
    }
}

#[tokio::test]
async fn test_basic_ingestion() {
    let store = Store::open_memory().await.unwrap();
    let file = write_csv(&[
        "u1,app_open,,2024-03-01 08:00:00,2024-03-01 07:00:00,US,iPhone14 Phone,app.one,ios,organic,,,,",
        "u1,af_purchase,,2024-03-01 09:30:00,2024-03-01 07:00:00,US,iPhone14 Phone,app.one,ios,organic,100,CNY,,o1",
        "u2,app_open,,2024-03-02 10:00:00,,DE,Galaxy Tab,app.one,android,paid_social,,,,",
    ]);

    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &IngestConfig::default());
    let summary = pipeline.run(file.path()).await.unwrap();

    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.users_created, 2);
    assert_eq!(summary.events_inserted, 3);
    assert_eq!(summary.purchases_inserted, 1);
    assert_eq!(summary.purchases_duplicate, 0);

    // Purchase revenue converted through the seeded CNY rate
    let purchases = store.purchases().list_ordered().await.unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].revenue_usd, 15.0);
    assert_eq!(purchases[0].order_id.as_deref(), Some("o1"));

    // User attributes come from the first observed row
    let u1 = store.users().get_by_id("u1").await.unwrap().unwrap();
    assert_eq!(u1.device_category.as_deref(), Some("mobile_phone"));
    assert_eq!(u1.first_seen_date.to_string(), "2024-03-01");
    assert_eq!(u1.last_seen_date.to_string(), "2024-03-01");
}

#[tokio::test]
async fn test_last_seen_extends_first_seen_does_not() {
    let store = Store::open_memory().await.unwrap();
    let file = write_csv(&[
        "u1,app_open,,2024-03-05 08:00:00,,US,Phone,,ios,,,,,",
        "u1,app_open,,2024-03-09 08:00:00,,GB,Tablet,,android,,,,,",
        "u1,app_open,,2024-03-02 08:00:00,,FR,Phone,,ios,,,,,",
    ]);

    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &IngestConfig::default());
    let summary = pipeline.run(file.path()).await.unwrap();
    assert_eq!(summary.users_created, 1);

    let user = store.users().get_by_id("u1").await.unwrap().unwrap();
    // First observed row wins for attributes and first_seen
    assert_eq!(user.first_seen_date.to_string(), "2024-03-05");
    assert_eq!(user.country_code.as_deref(), Some("US"));
    // Last seen extended to the max date, not shrunk by the later-arriving
    // earlier row
    assert_eq!(user.last_seen_date.to_string(), "2024-03-09");
}

#[tokio::test]
async fn test_purchase_dedup_within_batch() {
    let store = Store::open_memory().await.unwrap();
    let file = write_csv(&[
        "u1,af_purchase,,2024-03-01 09:30:00,,US,Phone,,ios,,10,USD,,o1",
        "u1,af_purchase,,2024-03-01 09:30:00,,US,Phone,,ios,,10,USD,,o1",
        "u1,af_purchase,,2024-03-01 09:30:00,,US,Phone,,ios,,10,USD,,o2",
    ]);

    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &IngestConfig::default());
    let summary = pipeline.run(file.path()).await.unwrap();

    assert_eq!(summary.purchases_inserted, 2);
    assert_eq!(summary.purchases_duplicate, 1);
    // Every row still produced an event
    assert_eq!(summary.events_inserted, 3);
}

#[tokio::test]
async fn test_purchase_dedup_across_chunks() {
    let store = Store::open_memory().await.unwrap();
    let file = write_csv(&[
        "u1,af_purchase,,2024-03-01 09:30:00,,US,Phone,,ios,,10,USD,,o1",
        "u2,app_open,,2024-03-01 10:00:00,,US,Phone,,ios,,,,,",
        "u1,af_purchase,,2024-03-01 09:30:00,,US,Phone,,ios,,10,USD,,o1",
    ]);

    // One row per chunk: the duplicate arrives in a later chunk and must be
    // suppressed against already-committed purchases
    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &config_with_chunk(1));
    let summary = pipeline.run(file.path()).await.unwrap();

    assert_eq!(summary.chunks, 3);
    assert_eq!(summary.purchases_inserted, 1);
    assert_eq!(summary.purchases_duplicate, 1);
    assert_eq!(store.purchases().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_user_not_reinserted_across_chunks() {
    let store = Store::open_memory().await.unwrap();
    let file = write_csv(&[
        "u1,app_open,,2024-03-01 08:00:00,,US,Phone,,ios,,,,,",
        "u1,app_open,,2024-03-03 08:00:00,,US,Phone,,ios,,,,,",
    ]);

    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &config_with_chunk(1));
    let summary = pipeline.run(file.path()).await.unwrap();

    assert_eq!(summary.users_created, 1);
    assert_eq!(store.users().count().await.unwrap(), 1);

    let user = store.users().get_by_id("u1").await.unwrap().unwrap();
    assert_eq!(user.last_seen_date.to_string(), "2024-03-03");
}

#[tokio::test]
async fn test_full_refresh_is_idempotent() {
    let store = Store::open_memory().await.unwrap();
    let file = write_csv(&[
        "u1,af_purchase,,2024-03-01 09:30:00,,US,Phone,,ios,,10,USD,,o1",
        "u2,app_open,,2024-03-02 10:00:00,,DE,Tab,,android,,,,,",
    ]);

    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &IngestConfig::default());

    let first = pipeline.run(file.path()).await.unwrap();
    let second = pipeline.run(file.path()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.users().count().await.unwrap(), 2);
    assert_eq!(store.events().count().await.unwrap(), 2);
    assert_eq!(store.purchases().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_referential_integrity() {
    let store = Store::open_memory().await.unwrap();
    let file = write_csv(&[
        "u1,af_purchase,,2024-03-01 09:30:00,,US,Phone,,ios,,10,USD,,o1",
        "u2,af_purchase,,2024-03-02 11:00:00,,DE,Tab,,android,,5,EUR,,o2",
        ",af_purchase,,2024-03-02 11:00:00,,DE,Tab,,android,,5,EUR,,o3",
    ]);

    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &IngestConfig::default());
    let summary = pipeline.run(file.path()).await.unwrap();

    assert_eq!(summary.rows_skipped_no_user, 1);

    let user_ids: HashSet<String> = store
        .users()
        .first_seen_dates()
        .await
        .unwrap()
        .into_keys()
        .collect();
    for purchase in store.purchases().list_ordered().await.unwrap() {
        assert!(user_ids.contains(&purchase.user_id));
    }
    for event in store.events().list_all().await.unwrap() {
        assert!(user_ids.contains(&event.user_id));
    }
}

#[tokio::test]
async fn test_purchase_requires_name_and_positive_revenue() {
    let store = Store::open_memory().await.unwrap();
    let file = write_csv(&[
        // Purchase event with zero revenue: event only
        "u1,af_purchase,,2024-03-01 09:30:00,,US,Phone,,ios,,0,USD,,o1",
        // Revenue on a non-purchase event: event only
        "u1,level_up,,2024-03-01 10:00:00,,US,Phone,,ios,,10,USD,,o2",
        // Actual purchase
        "u1,af_purchase,,2024-03-01 11:00:00,,US,Phone,,ios,,10,USD,,o3",
    ]);

    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &IngestConfig::default());
    let summary = pipeline.run(file.path()).await.unwrap();

    assert_eq!(summary.events_inserted, 3);
    assert_eq!(summary.purchases_inserted, 1);

    let purchases = store.purchases().list_ordered().await.unwrap();
    assert_eq!(purchases[0].order_id.as_deref(), Some("o3"));
}

#[tokio::test]
async fn test_rows_with_bad_event_time_are_skipped_not_fatal() {
    let store = Store::open_memory().await.unwrap();
    let file = write_csv(&[
        "u1,app_open,,garbage,,US,Phone,,ios,,,,,",
        "u2,app_open,,2024-03-02 10:00:00,,DE,Tab,,android,,,,,",
    ]);

    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &IngestConfig::default());
    let summary = pipeline.run(file.path()).await.unwrap();

    assert_eq!(summary.rows_skipped_bad_time, 1);
    assert_eq!(summary.events_inserted, 1);
    assert_eq!(store.users().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_empty_export_clears_previous_run() {
    let store = Store::open_memory().await.unwrap();

    let populated = write_csv(&["u1,app_open,,2024-03-01 08:00:00,,US,Phone,,ios,,,,,"]);
    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &IngestConfig::default());
    pipeline.run(populated.path()).await.unwrap();
    assert_eq!(store.events().count().await.unwrap(), 1);

    let empty = write_csv(&[]);
    let summary = pipeline.run(empty.path()).await.unwrap();

    assert_eq!(summary.rows_read, 0);
    assert_eq!(summary.chunks, 0);
    assert_eq!(store.events().count().await.unwrap(), 0);
    assert_eq!(store.users().count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_missing_csv_aborts_before_any_write() {
    let store = Store::open_memory().await.unwrap();

    // Pre-existing data must survive a missing-input failure
    let file = write_csv(&["u1,app_open,,2024-03-01 08:00:00,,US,Phone,,ios,,,,,"]);
    let rates = rate_table(&store).await;
    let pipeline = Pipeline::new(&store, rates, &IngestConfig::default());
    pipeline.run(file.path()).await.unwrap();

    let err = pipeline
        .run(std::path::Path::new("no/such/export.csv"))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::MissingInput { .. }));

    // Prior run's data is intact
    assert_eq!(store.events().count().await.unwrap(), 1);
}
