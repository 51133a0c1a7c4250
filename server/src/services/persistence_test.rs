use super::*;
use crate::state::test_helpers;

#[tokio::test]
async fn flush_with_nothing_dirty_is_a_no_op() {
    let state = test_helpers::test_app_state();
    assert_eq!(flush_dirty(&state).await, 0);
}

#[tokio::test]
async fn failed_flush_keeps_dirty_flags() {
    let state = test_helpers::test_app_state();
    let id = test_helpers::seed_design(&state).await;

    // Test state uses connect_lazy; flush attempts fail and must not clear dirty flags.
    assert_eq!(flush_dirty(&state).await, 0);

    let designs = state.designs.read().await;
    assert!(designs.dirty.contains(&id));
    assert!(designs.records.contains_key(&id));
}

#[tokio::test]
async fn hydrate_without_database_reports_error() {
    let state = test_helpers::test_app_state();
    let err = hydrate(&state).await.unwrap_err();
    assert!(matches!(err, DesignError::Database(_)));
}

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    async fn live_state() -> AppState {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL for live-db-tests");
        let pool = PgPoolOptions::new().connect(&url).await.expect("connect");
        sqlx::migrate!("src/db/migrations").run(&pool).await.expect("migrate");
        AppState::new(pool, test_helpers::test_config())
    }

    #[tokio::test]
    async fn flush_then_hydrate_round_trips() {
        let state = live_state().await;
        let id = test_helpers::seed_design(&state).await;
        assert!(flush_dirty(&state).await >= 1);
        assert!(!state.designs.read().await.dirty.contains(&id));

        let fresh = AppState::new(state.pool.clone(), test_helpers::test_config());
        hydrate(&fresh).await.unwrap();
        let designs = fresh.designs.read().await;
        assert_eq!(designs.records[&id].design.customer.email, "ada@example.com");
        assert!(designs.dirty.is_empty());
    }
}
