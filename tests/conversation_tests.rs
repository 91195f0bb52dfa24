mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{registry_with, FakeAssistant, Harness, Script};
use komissar::kernel::controller::{CONFIRM_CANCEL, CONFIRM_SEND, MODE_ASSISTANT, MODE_STEPS};
use komissar::kernel::history::Role;
use komissar::kernel::state::SessionState;
use komissar::services::llm::adapter::{FAILURE_REPLY, UNAVAILABLE_REPLY};
use komissar::services::llm::AssistantAdapter;
use tempfile::tempdir;

const SUBMITTER: i64 = 42;

#[tokio::test]
async fn test_step_mode_end_to_end() {
    let dir = tempdir().unwrap();
    let h = Harness::new(registry_with(dir.path(), &[500, 600]), AssistantAdapter::disabled());

    h.say(SUBMITTER, "/start").await;
    assert_eq!(h.reactor.state_of(SUBMITTER).await, Some(SessionState::ChoosingMode));

    let prompt = h.say(SUBMITTER, MODE_STEPS).await;
    assert!(prompt[0].contains("Шаг 1/5"));

    h.say(SUBMITTER, "ул. Ленина 10").await;
    h.say(SUBMITTER, "2 автомобиля").await;
    h.say(SUBMITTER, "разбита фара").await;
    h.say(SUBMITTER, "Нет пострадавших").await;
    let summary = h.say(SUBMITTER, "+79001234567").await;
    assert_eq!(h.reactor.state_of(SUBMITTER).await, Some(SessionState::Confirm));
    assert!(summary[0].contains("ЗАЯВКА НА АВАРИЙНОГО КОМИССАРА"));
    assert!(summary[0].contains("ул. Ленина 10"));

    // Nothing goes out before confirmation
    assert!(h.messenger.sent().is_empty());

    let done = h.say(SUBMITTER, CONFIRM_SEND).await;
    assert!(done[0].contains("ЗАЯВКА УСПЕШНО ОТПРАВЛЕНА"));
    assert!(done[0].contains("2 получателей"));

    let sent = h.messenger.sent();
    assert_eq!(sent.len(), 2, "one notification per recipient");
    assert_eq!(sent[0].chat_id, 500);
    assert_eq!(sent[1].chat_id, 600);
    let notification = &sent[0].text;
    for expected in ["ул. Ленина 10", "2 автомобиля", "разбита фара", "Нет пострадавших", "+79001234567", "`42`"] {
        assert!(notification.contains(expected), "missing {:?} in {}", expected, notification);
    }
    assert_eq!(sent[0].text, sent[1].text);

    assert_eq!(h.reactor.state_of(SUBMITTER).await, None);
}

#[tokio::test]
async fn test_step_mode_stores_answers_verbatim() {
    let dir = tempdir().unwrap();
    let h = Harness::new(registry_with(dir.path(), &[500]), AssistantAdapter::disabled());

    h.say(SUBMITTER, "/start").await;
    h.say(SUBMITTER, MODE_STEPS).await;
    // Would trigger extraction in assistant mode; here it is just the location
    h.say(SUBMITTER, "двор, телефон +79001234567, бампер").await;
    h.say(SUBMITTER, "много").await;

    let session = h.reactor.session_of(SUBMITTER).await.unwrap();
    assert_eq!(session.state, SessionState::Damage);
    assert_eq!(session.report.location.as_deref(), Some("двор, телефон +79001234567, бампер"));
    assert_eq!(session.report.participant_count_desc.as_deref(), Some("много"));
    assert!(session.report.contact.is_none());
    assert!(session.report.damage_desc.is_none());
}

#[tokio::test]
async fn test_declined_confirmation_sends_nothing() {
    let dir = tempdir().unwrap();
    let h = Harness::new(registry_with(dir.path(), &[500]), AssistantAdapter::disabled());

    h.say(SUBMITTER, "/start").await;
    h.say(SUBMITTER, MODE_STEPS).await;
    for answer in ["ул. Ленина 10", "2 автомобиля", "разбита фара", "Нет пострадавших", "+79001234567"] {
        h.say(SUBMITTER, answer).await;
    }
    let reply = h.say(SUBMITTER, CONFIRM_CANCEL).await;

    assert!(reply[0].contains("Заявка отменена"));
    assert!(h.messenger.sent().is_empty());
    assert_eq!(h.reactor.state_of(SUBMITTER).await, None);
}

#[tokio::test]
async fn test_cancel_discards_session() {
    let dir = tempdir().unwrap();
    let h = Harness::new(registry_with(dir.path(), &[]), AssistantAdapter::disabled());

    h.say(SUBMITTER, "/start").await;
    h.say(SUBMITTER, MODE_STEPS).await;
    let reply = h.say(SUBMITTER, "/cancel").await;

    assert!(reply[0].contains("Операция отменена"));
    assert_eq!(h.reactor.state_of(SUBMITTER).await, None);
    // Free text with no session is ignored
    assert!(h.say(SUBMITTER, "ул. Ленина 10").await.is_empty());
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let dir = tempdir().unwrap();
    let h = Harness::new(registry_with(dir.path(), &[]), AssistantAdapter::disabled());

    h.say(1, "/start").await;
    h.say(2, "/start").await;
    h.say(1, MODE_STEPS).await;
    h.say(1, "ул. Ленина 10").await;

    assert_eq!(h.reactor.state_of(1).await, Some(SessionState::Participants));
    assert_eq!(h.reactor.state_of(2).await, Some(SessionState::ChoosingMode));
}

#[tokio::test]
async fn test_assistant_mode_extracts_and_finalizes() {
    let dir = tempdir().unwrap();
    let assistant = Arc::new(FakeAssistant::new(Script::Reply("Понял вас. Укажите телефон.")));
    let h = Harness::new(
        registry_with(dir.path(), &[500]),
        AssistantAdapter::new(assistant.clone(), Duration::from_secs(1)),
    );

    h.say(SUBMITTER, "/start").await;
    h.say(SUBMITTER, MODE_ASSISTANT).await;
    assert_eq!(h.reactor.state_of(SUBMITTER).await, Some(SessionState::AiChat));

    let reply = h.say(SUBMITTER, "ДТП на ул. Ленина 10, разбита фара").await;
    assert!(reply[0].starts_with("✅ Сохранено: место ДТП, повреждения"));
    assert!(reply[0].contains("Понял вас. Укажите телефон."));
    assert!(reply[0].contains("/finish"));

    // Contact is still missing
    let guard = h.say(SUBMITTER, "/finish").await;
    assert_eq!(guard, vec!["⚠️ Пожалуйста, укажите: телефон".to_string()]);
    assert_eq!(h.reactor.state_of(SUBMITTER).await, Some(SessionState::AiChat));

    h.say(SUBMITTER, "+79001234567").await;
    let calls = assistant.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].latest, "+79001234567");
    assert_eq!(calls[1].history.len(), 2);
    assert_eq!(calls[1].history[0].role, Role::User);
    assert_eq!(calls[1].history[0].content, "ДТП на ул. Ленина 10, разбита фара");
    assert!(calls[1].instruction.contains("ул. Ленина 10"));

    let summary = h.say(SUBMITTER, "Готово").await;
    assert!(summary[0].contains("+79001234567"));
    assert_eq!(h.reactor.state_of(SUBMITTER).await, Some(SessionState::Confirm));
}

#[tokio::test]
async fn test_finalization_guard_lists_missing_fields() {
    let dir = tempdir().unwrap();
    let h = Harness::new(registry_with(dir.path(), &[]), AssistantAdapter::disabled());

    h.say(SUBMITTER, "/start").await;
    h.say(SUBMITTER, MODE_ASSISTANT).await;
    let reply = h.say(SUBMITTER, "завершить").await;

    assert_eq!(reply, vec!["⚠️ Пожалуйста, укажите: место ДТП, телефон".to_string()]);
    assert_eq!(h.reactor.state_of(SUBMITTER).await, Some(SessionState::AiChat));
}

#[tokio::test]
async fn test_assistant_unconfigured_apologises() {
    let dir = tempdir().unwrap();
    let h = Harness::new(registry_with(dir.path(), &[]), AssistantAdapter::disabled());

    h.say(SUBMITTER, "/start").await;
    h.say(SUBMITTER, MODE_ASSISTANT).await;
    let reply = h.say(SUBMITTER, "помогите").await;

    assert!(reply[0].contains(UNAVAILABLE_REPLY));
    assert_eq!(h.reactor.state_of(SUBMITTER).await, Some(SessionState::AiChat));
}

#[tokio::test]
async fn test_assistant_failure_keeps_session_alive() {
    let dir = tempdir().unwrap();
    let assistant = Arc::new(FakeAssistant::new(Script::Fail));
    let h = Harness::new(
        registry_with(dir.path(), &[]),
        AssistantAdapter::new(assistant, Duration::from_secs(1)),
    );

    h.say(SUBMITTER, "/start").await;
    h.say(SUBMITTER, MODE_ASSISTANT).await;
    let reply = h.say(SUBMITTER, "улица Мира 5").await;

    assert!(reply[0].contains(FAILURE_REPLY));
    let session = h.reactor.session_of(SUBMITTER).await.unwrap();
    assert_eq!(session.state, SessionState::AiChat);
    // Extraction still happened
    assert_eq!(session.report.location.as_deref(), Some("улица Мира 5"));
}

#[tokio::test]
async fn test_assistant_timeout_degrades_to_apology() {
    let dir = tempdir().unwrap();
    let assistant = Arc::new(FakeAssistant::new(Script::Hang));
    let h = Harness::new(
        registry_with(dir.path(), &[]),
        AssistantAdapter::new(assistant, Duration::from_millis(50)),
    );

    h.say(SUBMITTER, "/start").await;
    h.say(SUBMITTER, MODE_ASSISTANT).await;
    let reply = h.say(SUBMITTER, "что делать?").await;

    assert!(reply[0].contains(FAILURE_REPLY));
}
