//! Runs one night against a real backend.
//!
//! Needs `SUPABASE_URL` and `SUPABASE_ANON_KEY` (a `.env` file works) and the
//! app's tables. Run with `cargo test --test live -- --ignored`.

use dotenv::dotenv;
use nightly_ritual::cache::MemoryStore;
use nightly_ritual::clock::SystemClock;
use nightly_ritual::context::SilentOverlay;
use nightly_ritual::models::{NightPlan, TodoItem};
use nightly_ritual::store::RecordStore;
use nightly_ritual::workflow::SleepState;
use nightly_ritual::NightlyRitual;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
#[ignore]
async fn live_night_roundtrip() {
    dotenv().ok();
    let app = match NightlyRitual::from_env() {
        Ok(app) => app,
        Err(e) => {
            println!("Skipping live test: {}", e);
            return;
        }
    };

    let cache = Arc::new(MemoryStore::new());
    let accounts = app.auth_manager(cache.clone());
    let email = format!("test-{}@example.com", Uuid::new_v4());
    accounts.sign_up(&email, "test_password123").await.unwrap();
    let ctx = accounts.context().unwrap();

    let store = Arc::new(app.store(&ctx));
    let mut workflow = app.workflow(
        ctx.clone(),
        store.clone(),
        cache,
        Arc::new(SystemClock),
        Arc::new(SilentOverlay),
    );

    let id = workflow
        .confirm_plan(NightPlan::Todo(vec![TodoItem::new("Live test", None)]))
        .await
        .unwrap();
    workflow.wake_up().await.unwrap();
    workflow.complete_gratitude(&["green tests"]).await.unwrap();
    assert_eq!(*workflow.state(), SleepState::Planning);

    let latest = store.latest_session(&ctx.user_id).await.unwrap().unwrap();
    assert_eq!(latest.id, id);
    assert_eq!(latest.gratitude_text.as_deref(), Some("green tests"));

    accounts.logout().await.unwrap();
}
