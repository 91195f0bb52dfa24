mod common;

use common::{registry_with, Harness};
use komissar::kernel::controller::MODE_STEPS;
use komissar::services::llm::AssistantAdapter;
use tempfile::tempdir;

#[tokio::test]
async fn test_closed_sessions_release_their_slots() {
    let dir = tempdir().unwrap();
    let h = Harness::new(registry_with(dir.path(), &[]), AssistantAdapter::disabled());

    for user in 1..=1000 {
        h.say(user, "/start").await;
        h.say(user, "/cancel").await;
    }

    assert_eq!(h.reactor.tracked_users(), 0);
}

#[tokio::test]
async fn test_live_sessions_keep_their_slots() {
    let dir = tempdir().unwrap();
    let h = Harness::new(registry_with(dir.path(), &[]), AssistantAdapter::disabled());

    h.say(1, "/start").await;
    h.say(1, MODE_STEPS).await;
    h.say(2, "/help").await;
    h.say(3, "просто текст").await;

    // Only user 1 has a session; stateless commands leave nothing behind
    assert_eq!(h.reactor.tracked_users(), 1);
}

#[tokio::test]
async fn test_lookups_do_not_create_slots() {
    let dir = tempdir().unwrap();
    let h = Harness::new(registry_with(dir.path(), &[]), AssistantAdapter::disabled());

    assert_eq!(h.reactor.state_of(99).await, None);
    assert!(h.reactor.session_of(99).await.is_none());
    assert_eq!(h.reactor.tracked_users(), 0);
}
