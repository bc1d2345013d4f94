//! End-to-end behaviour of PageStore against a file-backed SQLite database.

use std::collections::HashSet;

use pagestore_core::{PageStore, StoreConfig, StoreError};
use proptest::prelude::*;
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> StoreConfig {
    let url = format!("sqlite://{}", dir.path().join("wiki.db").display());
    StoreConfig::with_url(url)
}

async fn open_store(dir: &TempDir) -> PageStore {
    PageStore::connect(&config_for(dir))
        .await
        .expect("store should open")
}

async fn page_id(store: &PageStore, name: &str) -> i64 {
    store
        .fetch_page(name)
        .await
        .expect("fetch should succeed")
        .expect("page should exist")
        .id
}

#[tokio::test]
async fn created_page_is_fetchable_by_name() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let cases = [
        ("Home", "# Welcome\n\nHello *wiki*"),
        ("Empty", ""),
        ("Ünïcødé 🚀", "你好世界 — こんにちは"),
        ("Quotes 'and' \"more\"", "line with ? and $1 placeholders"),
    ];

    for (name, markdown) in cases {
        store.create_page(name, markdown).await.unwrap();
        let page = store.fetch_page(name).await.unwrap().expect("found");
        assert_eq!(page.raw_content, markdown, "page {name}");
    }
}

#[tokio::test]
async fn unknown_ids_and_names_are_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    for id in [0, 1, 42, -7, i64::MAX] {
        assert_eq!(store.fetch_page_by_id(id).await.unwrap(), None);
    }
    assert_eq!(store.fetch_page("Nowhere").await.unwrap(), None);
}

#[tokio::test]
async fn names_are_listed_in_ascending_order() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    for name in ["Zeta", "Alpha", "Mu"] {
        store.create_page(name, "body").await.unwrap();
    }

    assert_eq!(
        store.list_page_names().await.unwrap(),
        vec!["Alpha", "Mu", "Zeta"]
    );
}

#[tokio::test]
async fn fetch_by_id_returns_full_page() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store.create_page("Home", "# Home").await.unwrap();
    let id = page_id(&store, "Home").await;

    let page = store.fetch_page_by_id(id).await.unwrap().expect("found");
    assert_eq!(page.id, id);
    assert_eq!(page.name, "Home");
    assert_eq!(page.content, "# Home");
}

#[tokio::test]
async fn deleting_unknown_id_succeeds_and_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store.create_page("Keep", "me").await.unwrap();
    let before = store.fetch_all_pages_data().await.unwrap().len();

    store.delete_page(9_999).await.unwrap();

    assert_eq!(store.fetch_all_pages_data().await.unwrap().len(), before);
}

#[tokio::test]
async fn deleting_existing_page_removes_it() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store.create_page("Gone", "soon").await.unwrap();
    let id = page_id(&store, "Gone").await;

    store.delete_page(id).await.unwrap();

    assert_eq!(store.fetch_page_by_id(id).await.unwrap(), None);
    assert!(store.list_page_names().await.unwrap().is_empty());
}

#[tokio::test]
async fn table_creation_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store.create_page("Survivor", "still here").await.unwrap();
    store.create_table().await.unwrap();
    store.create_table().await.unwrap();

    // reopening runs table creation again against the same file
    let reopened = open_store(&dir).await;
    assert_eq!(reopened.list_page_names().await.unwrap(), vec!["Survivor"]);
}

#[tokio::test]
async fn save_updates_existing_and_ignores_missing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store.create_page("Draft", "v1").await.unwrap();
    let id = page_id(&store, "Draft").await;

    store.save_page(id, "v2").await.unwrap();
    let page = store.fetch_page_by_id(id).await.unwrap().expect("found");
    assert_eq!(page.content, "v2");

    let missing = id + 1_000;
    store.save_page(missing, "ghost").await.unwrap();
    assert_eq!(store.fetch_page_by_id(missing).await.unwrap(), None);
    assert_eq!(store.fetch_all_pages_data().await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_name_is_an_execution_error() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store.create_page("Twice", "first").await.unwrap();
    let err = store.create_page("Twice", "second").await.unwrap_err();

    assert!(matches!(err, StoreError::Execution(_)), "got {err:?}");
    assert_eq!(store.lease_stats().outstanding(), 0);
}

#[tokio::test]
async fn all_pages_data_follows_storage_order() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    for name in ["Zeta", "Alpha", "Mu"] {
        store.create_page(name, format!("about {name}")).await.unwrap();
    }

    let pages = store.fetch_all_pages_data().await.unwrap();
    let names: Vec<_> = pages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Zeta", "Alpha", "Mu"]);
    assert_eq!(pages[1].content, "about Alpha");
    assert!(pages.windows(2).all(|w| w[0].id < w[1].id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_are_all_listed() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    let pending: Vec<_> = (0..50)
        .map(|i| store.create_page(format!("page-{i:02}"), format!("body {i}")))
        .collect();
    for p in pending {
        p.await.unwrap();
    }

    let names = store.list_page_names().await.unwrap();
    assert_eq!(names.len(), 50);

    let mut expected: Vec<_> = (0..50).map(|i| format!("page-{i:02}")).collect();
    expected.sort();
    assert_eq!(names, expected);
    assert_eq!(names.iter().collect::<HashSet<_>>().len(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn every_lease_is_released_after_mixed_load() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let baseline = store.lease_stats();

    let mut outcomes = Vec::new();
    for i in 0..30i64 {
        // every third create reuses a name, so some operations fail
        let name = format!("mixed-{}", i - i % 3);
        outcomes.push(tokio::spawn({
            let store = store.clone();
            async move { store.create_page(name, "x").await.is_ok() }
        }));
        outcomes.push(tokio::spawn({
            let store = store.clone();
            async move { store.fetch_page_by_id(i).await.is_ok() }
        }));
        outcomes.push(tokio::spawn({
            let store = store.clone();
            async move { store.delete_page(i + 1_000).await.is_ok() }
        }));
        outcomes.push(tokio::spawn({
            let store = store.clone();
            async move { store.list_page_names().await.is_ok() }
        }));
    }

    let mut failures = 0;
    for outcome in outcomes {
        if !outcome.await.unwrap() {
            failures += 1;
        }
    }
    assert_eq!(failures, 20, "duplicate creates should fail");

    let stats = store.lease_stats();
    assert_eq!(stats.acquired, stats.released);
    assert_eq!(stats.acquired - baseline.acquired, 120);
}

#[tokio::test]
async fn closed_store_reports_connection_unavailable() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;

    store.close().await;

    let err = store.list_page_names().await.unwrap_err();
    assert!(matches!(err, StoreError::ConnectionUnavailable(_)), "got {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn configured_statement_overrides_are_used() {
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&dir);
    config.queries.insert(
        "all_pages".into(),
        "SELECT name FROM pages WHERE name NOT LIKE 'Sandbox%'".into(),
    );
    let store = PageStore::connect(&config).await.unwrap();

    store.create_page("Home", "").await.unwrap();
    store.create_page("Sandbox/Test", "").await.unwrap();

    assert_eq!(store.list_page_names().await.unwrap(), vec!["Home"]);
}

#[tokio::test]
async fn unreachable_database_fails_to_open() {
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&dir);
    config.database_url = format!(
        "sqlite://{}",
        dir.path().join("missing/dir/wiki.db").display()
    );

    let result = PageStore::connect(&config).await;
    assert!(matches!(result, Err(StoreError::ConnectionUnavailable(_))));
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: whatever is created under a name is read back unchanged by that name
    #[test]
    fn prop_create_then_fetch_round_trips(
        name in "\\PC{1,40}",
        markdown in "\\PC{0,200}",
    ) {
        let rt = runtime();
        let dir = TempDir::new().unwrap();

        let fetched = rt.block_on(async {
            let store = open_store(&dir).await;
            store.create_page(name.as_str(), markdown.as_str()).await.unwrap();
            let page = store.fetch_page(name.as_str()).await.unwrap();
            store.close().await;
            page
        });

        let page = fetched.expect("created page should be found");
        prop_assert_eq!(page.raw_content, markdown);
    }
}
