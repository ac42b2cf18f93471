use chrono::NaiveDate;
use nomination_board::app::render;
use nomination_board::core::live_view::FeedStatus;
use nomination_board::core::submission::{FormEdit, FormState, SubmissionPhase, RETRY_MESSAGE};
use nomination_board::core::validator::{Field, FormFields};
use nomination_board::domain::model::{CollectionPath, DateWindow, NominationRecord};
use nomination_board::utils::error::ErrorCategory;
use nomination_board::{BoardSettings, MemoryStore, NominationApp};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn settings() -> BoardSettings {
    BoardSettings {
        window: DateWindow::new(
            NaiveDate::from_ymd_opt(2025, 8, 27).unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 6).unwrap(),
        ),
        collection: CollectionPath::for_deployment("flow-test"),
        admin_contact: "8149525915".to_string(),
    }
}

fn valid_form() -> FormState {
    FormState::new(FormFields {
        full_name: "Sunita Rao".to_string(),
        flat_number: "F-1304".to_string(),
        phone_number: "8888888888".to_string(),
        date: "2025-09-06".to_string(),
        slot: "Morning".to_string(),
        brings_own_offering_set: false,
    })
}

#[tokio::test]
async fn test_valid_registration_reaches_success_view() {
    let store = Arc::new(MemoryStore::new());
    let app = NominationApp::start(store.clone(), settings()).await.unwrap();

    let state = app.submit(valid_form()).await;

    assert_eq!(state.phase, SubmissionPhase::Succeeded);
    assert_eq!(state.fields, FormFields::default());
    assert!(app
        .success_view()
        .render()
        .contains("https://wa.me/8149525915"));

    let stored = store.records(&settings().collection);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].submitter_id.as_deref(), Some(app.session().submitter_id.as_str()));
    assert_eq!(stored[0].wing.as_deref(), Some("F"));
    assert_eq!(stored[0].unit_number.as_deref(), Some("1304"));
    assert_eq!(stored[0].date.as_deref(), Some("2025-09-06"));
}

#[tokio::test]
async fn test_empty_name_blocks_write() {
    let store = Arc::new(MemoryStore::new());
    let app = NominationApp::start(store.clone(), settings()).await.unwrap();

    let state = app
        .submit(valid_form().edit(FormEdit::FullName("  ".to_string())))
        .await;

    assert_eq!(state.phase, SubmissionPhase::Idle);
    assert_eq!(state.errors.len(), 1);
    assert_eq!(state.errors.get(Field::FullName), Some("Full name is required."));
    assert!(store.records(&settings().collection).is_empty());
}

#[tokio::test]
async fn test_write_failure_keeps_entries_for_retry() {
    let store = Arc::new(MemoryStore::new());
    let app = NominationApp::start(store.clone(), settings()).await.unwrap();

    store.set_fail_writes(true);
    let state = app.submit(valid_form()).await;
    assert_eq!(state.phase, SubmissionPhase::Idle);
    assert_eq!(state.submit_error.as_deref(), Some(RETRY_MESSAGE));
    assert_eq!(state.fields, valid_form().fields);
    assert!(render::render_form_feedback(&state).contains(RETRY_MESSAGE));

    store.set_fail_writes(false);
    let state = app.submit(state).await;
    assert_eq!(state.phase, SubmissionPhase::Succeeded);
    assert_eq!(store.records(&settings().collection).len(), 1);
}

#[tokio::test]
async fn test_auth_failure_is_fatal() {
    let store = Arc::new(MemoryStore::new());
    store.set_fail_auth(true);

    let err = NominationApp::start(store, settings()).await.err().unwrap();
    assert_eq!(err.category(), ErrorCategory::Initialization);
}

#[tokio::test]
async fn test_live_view_follows_every_append() {
    let store = Arc::new(MemoryStore::new());
    let app = NominationApp::start(store.clone(), settings()).await.unwrap();
    let mut view = app.mount_live_view();

    let initial = timeout(Duration::from_secs(2), view.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(initial.status, FeedStatus::Live);
    assert_eq!(initial.total(), 0);
    assert_eq!(initial.days.len(), 11);

    // 另一個客戶端的寫入也要反映在看板上
    let other = NominationApp::start(store.clone(), settings()).await.unwrap();
    let state = other.submit(valid_form()).await;
    assert_eq!(state.phase, SubmissionPhase::Succeeded);

    let updated = timeout(Duration::from_secs(2), view.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.total(), 1);
    let last_day = updated.days.last().unwrap();
    assert_eq!((last_day.morning, last_day.evening), (1, 0));

    view.teardown();
}

#[tokio::test]
async fn test_untrusted_records_do_not_break_the_board() {
    let store = Arc::new(MemoryStore::new());
    let collection = settings().collection;
    store.insert_raw(
        &collection,
        NominationRecord {
            date: Some("2025-12-25".to_string()),
            slot: Some("Morning".to_string()),
            ..Default::default()
        },
    );
    store.insert_raw(
        &collection,
        NominationRecord {
            date: Some("2025-08-27".to_string()),
            slot: Some("Midnight".to_string()),
            ..Default::default()
        },
    );
    store.insert_raw(
        &collection,
        NominationRecord {
            date: Some("2025-08-27".to_string()),
            slot: Some("Evening".to_string()),
            ..Default::default()
        },
    );

    let app = NominationApp::start(store, settings()).await.unwrap();
    let tally = timeout(Duration::from_secs(2), app.current_tally())
        .await
        .unwrap();

    assert_eq!(tally.records.len(), 3);
    assert_eq!(tally.total(), 1);
    assert_eq!(tally.days[0].evening, 1);
}
