use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::{MutationIntent, Record},
    error::{ApiError, ErrorCode},
    protocol::KeyValueBody,
};
use tokio::time::sleep;

use super::spawn_relay;
use crate::{LoadPhase, RelayClient, SortColumn, SortDirection, TableEngine};

/// Renders records the way the engine does, with the banner and trailing
/// status line. The decoder's unconditional drop eats the first record, so
/// callers include a sacrificial lead row when they want all their records
/// visible.
fn engine_get_all(records: &[(String, String)]) -> String {
    if records.is_empty() {
        return "No data available".to_string();
    }
    let mut out = String::from("All Key-Value Pairs:\n");
    for (key, value) in records {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out.push_str("Data retrieved successfully");
    out
}

fn with_lead(records: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut all = vec![("lead".to_string(), "0".to_string())];
    all.extend(
        records
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    );
    all
}

fn static_listing_router(records: Vec<(String, String)>) -> Router {
    Router::new().route(
        "/api/getAll",
        get(move || {
            let body = engine_get_all(&records);
            async move { body }
        }),
    )
}

async fn engine_for(records: &[(&str, &str)]) -> TableEngine {
    let url = spawn_relay(static_listing_router(with_lead(records))).await;
    let table = TableEngine::new(RelayClient::new(&url));
    table.refresh().await.expect("refresh");
    table
}

#[tokio::test]
async fn refresh_replaces_the_listing_snapshot() {
    let table = engine_for(&[("alpha", "1"), ("beta", "2")]).await;
    assert_eq!(table.phase(), LoadPhase::Ready);
    assert_eq!(
        *table.current_listing(),
        vec![Record::new("alpha", "1"), Record::new("beta", "2")]
    );
}

#[tokio::test]
async fn listing_is_set_by_whichever_refresh_completes_last() {
    #[derive(Clone)]
    struct RacingState {
        calls: Arc<AtomicUsize>,
    }

    let state = RacingState {
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let app = Router::new()
        .route(
            "/api/getAll",
            get(|State(state): State<RacingState>| async move {
                if state.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    // First request is slow and arrives after the second.
                    sleep(Duration::from_millis(300)).await;
                    engine_get_all(&with_lead(&[("slow", "a")]))
                } else {
                    engine_get_all(&with_lead(&[("fast", "b")]))
                }
            }),
        )
        .with_state(state);

    let url = spawn_relay(app).await;
    let table = Arc::new(TableEngine::new(RelayClient::new(&url)));

    let slow = {
        let table = Arc::clone(&table);
        tokio::spawn(async move { table.refresh().await })
    };
    sleep(Duration::from_millis(50)).await;
    table.refresh().await.expect("fast refresh");
    assert_eq!(*table.current_listing(), vec![Record::new("fast", "b")]);
    // Two refreshes were in flight; the fast completion leaves the phase
    // loading until the slow one lands.
    assert_eq!(table.phase(), LoadPhase::Loading);

    slow.await.expect("join").expect("slow refresh");
    assert_eq!(*table.current_listing(), vec![Record::new("slow", "a")]);
    assert_eq!(table.phase(), LoadPhase::Ready);
}

#[tokio::test]
async fn reset_discards_a_late_refresh_response() {
    let app = Router::new().route(
        "/api/getAll",
        get(|| async {
            sleep(Duration::from_millis(200)).await;
            engine_get_all(&with_lead(&[("late", "x")]))
        }),
    );
    let url = spawn_relay(app).await;
    let table = Arc::new(TableEngine::new(RelayClient::new(&url)));

    let inflight = {
        let table = Arc::clone(&table);
        tokio::spawn(async move { table.refresh().await })
    };
    sleep(Duration::from_millis(50)).await;
    table.reset();

    inflight.await.expect("join").expect("discarded quietly");
    assert!(table.current_listing().is_empty());
    assert_eq!(table.phase(), LoadPhase::Idle);
}

#[tokio::test]
async fn failed_mutation_leaves_the_listing_unchanged() {
    let records = with_lead(&[("alpha", "1")]);
    let app = Router::new()
        .route(
            "/api/getAll",
            get(move || {
                let body = engine_get_all(&records);
                async move { body }
            }),
        )
        .route(
            "/setKv",
            post(|| async {
                (
                    StatusCode::BAD_GATEWAY,
                    Json(ApiError::new(ErrorCode::Engine, "engine exited with 1")),
                )
            }),
        );
    let url = spawn_relay(app).await;
    let table = TableEngine::new(RelayClient::new(&url));
    table.refresh().await.expect("refresh");

    let before = table.current_listing();
    let err = table
        .apply_mutation(MutationIntent::Add {
            key: "gamma".to_string(),
            value: "3".to_string(),
        })
        .await
        .expect_err("mutation fails");
    assert!(matches!(err, crate::ClientError::Relay { status: 502, .. }));
    assert_eq!(*table.current_listing(), *before);
    assert_eq!(table.phase(), LoadPhase::Ready);
}

#[tokio::test]
async fn successful_mutation_refreshes_the_listing() {
    #[derive(Clone, Default)]
    struct StoreState {
        records: Arc<Mutex<Vec<(String, String)>>>,
    }

    let state = StoreState {
        records: Arc::new(Mutex::new(with_lead(&[("alpha", "1")]))),
    };
    let app = Router::new()
        .route(
            "/api/getAll",
            get(|State(state): State<StoreState>| async move {
                engine_get_all(&state.records.lock().expect("lock"))
            }),
        )
        .route(
            "/setKv",
            post(
                |State(state): State<StoreState>, Json(body): Json<KeyValueBody>| async move {
                    state
                        .records
                        .lock()
                        .expect("lock")
                        .push((body.key, body.value));
                    "Key-Value pair inserted successfully"
                },
            ),
        )
        .with_state(state);
    let url = spawn_relay(app).await;
    let table = TableEngine::new(RelayClient::new(&url));
    table.refresh().await.expect("refresh");
    assert_eq!(*table.current_listing(), vec![Record::new("alpha", "1")]);

    let outcome = table
        .apply_mutation(MutationIntent::Add {
            key: "gamma".to_string(),
            value: "3".to_string(),
        })
        .await
        .expect("mutation");
    assert_eq!(outcome, "Key-Value pair inserted successfully");
    assert_eq!(
        *table.current_listing(),
        vec![Record::new("alpha", "1"), Record::new("gamma", "3")]
    );
}

#[tokio::test]
async fn projections_filter_sort_and_paginate_without_touching_the_listing() {
    // 25 visible records: k01..k25 with values v01..v25.
    let records: Vec<(&str, &str)> = vec![
        ("k01", "v01"), ("k02", "v02"), ("k03", "v03"), ("k04", "v04"), ("k05", "v05"),
        ("k06", "v06"), ("k07", "v07"), ("k08", "v08"), ("k09", "v09"), ("k10", "v10"),
        ("k11", "v11"), ("k12", "v12"), ("k13", "v13"), ("k14", "v14"), ("k15", "v15"),
        ("k16", "v16"), ("k17", "v17"), ("k18", "v18"), ("k19", "v19"), ("k20", "v20"),
        ("k21", "v21"), ("k22", "v22"), ("k23", "v23"), ("k24", "v24"), ("k25", "v25"),
    ];
    let table = engine_for(&records).await;
    assert_eq!(table.current_listing().len(), 25);

    // Page slicing: 25 rows is three pages of at most 10.
    assert_eq!(table.visible_rows().len(), 10);
    table.next_page();
    assert_eq!(table.visible_rows().len(), 10);
    table.next_page();
    assert_eq!(table.visible_rows().len(), 5);
    table.next_page(); // clamped at the last page
    assert_eq!(table.view().page, 2);
    table.prev_page();
    assert_eq!(table.view().page, 1);

    // Filtering matches against values, case-insensitively, and is
    // idempotent: reapplying the same filter changes nothing.
    table.set_filter("V1");
    let filtered = table.visible_rows();
    assert_eq!(filtered.len(), 10);
    assert!(filtered.iter().all(|r| r.value.starts_with("v1")));
    table.set_filter("V1");
    assert_eq!(table.visible_rows(), filtered);
    assert_eq!(table.visible_rows(), table.visible_rows());

    // Sorting is a pure projection; the underlying listing keeps engine
    // order throughout.
    table.set_filter("");
    table.sort_by(SortColumn::Value);
    assert_eq!(table.visible_rows()[0], Record::new("k01", "v01"));
    table.sort_by(SortColumn::Value); // toggles to descending
    assert_eq!(
        table.view().sort,
        Some((SortColumn::Value, SortDirection::Descending))
    );
    assert_eq!(table.visible_rows()[0], Record::new("k25", "v25"));
    assert_eq!(table.current_listing()[0], Record::new("k01", "v01"));
}

#[tokio::test]
async fn view_state_survives_a_refresh() {
    let table = engine_for(&[("alpha", "1"), ("beta", "2")]).await;
    table.set_filter("2");
    table.sort_by(SortColumn::Key);

    let view_before = table.view();
    table.refresh().await.expect("second refresh");
    assert_eq!(table.view(), view_before);
    assert_eq!(table.visible_rows(), vec![Record::new("beta", "2")]);
}
