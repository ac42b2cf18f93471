use crate::core::validator::{self, FieldErrors, FormFields, ValidForm};
use crate::domain::model::{CollectionPath, DateWindow, Session};
use crate::domain::ports::NominationStore;
use std::sync::Arc;

/// Banner shown when the store write fails.
pub const RETRY_MESSAGE: &str = "Failed to register. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Validating,
    Persisting,
    Succeeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEdit {
    FullName(String),
    FlatNumber(String),
    PhoneNumber(String),
    Date(String),
    Slot(String),
    BringsOwnOfferingSet(bool),
}

/// The whole form as one immutable value. Every transition consumes the old
/// state and returns the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub fields: FormFields,
    pub errors: FieldErrors,
    pub phase: SubmissionPhase,
    pub submit_error: Option<String>,
}

impl FormState {
    pub fn new(fields: FormFields) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    /// Inputs are locked while a write is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(
            self.phase,
            SubmissionPhase::Validating | SubmissionPhase::Persisting
        )
    }

    pub fn edit(self, edit: FormEdit) -> Self {
        if self.phase != SubmissionPhase::Idle {
            return self;
        }
        let mut fields = self.fields;
        match edit {
            FormEdit::FullName(v) => fields.full_name = v,
            FormEdit::FlatNumber(v) => fields.flat_number = v,
            FormEdit::PhoneNumber(v) => fields.phone_number = v,
            FormEdit::Date(v) => fields.date = v,
            FormEdit::Slot(v) => fields.slot = v,
            FormEdit::BringsOwnOfferingSet(v) => fields.brings_own_offering_set = v,
        }
        Self { fields, ..self }
    }

    /// Idle → Validating. Any other phase ignores the request.
    pub fn request_submit(self) -> Self {
        if self.phase != SubmissionPhase::Idle {
            return self;
        }
        Self {
            phase: SubmissionPhase::Validating,
            submit_error: None,
            ..self
        }
    }

    /// Validating → Idle with field errors, or → Persisting with the normalized form.
    pub fn validate(self, window: &DateWindow) -> (Self, Option<ValidForm>) {
        if self.phase != SubmissionPhase::Validating {
            return (self, None);
        }
        match validator::validate(&self.fields, window) {
            Ok(form) => (
                Self {
                    errors: FieldErrors::default(),
                    phase: SubmissionPhase::Persisting,
                    ..self
                },
                Some(form),
            ),
            Err(errors) => (
                Self {
                    errors,
                    phase: SubmissionPhase::Idle,
                    ..self
                },
                None,
            ),
        }
    }

    /// Persisting → Succeeded; all inputs are cleared.
    pub fn write_succeeded(self) -> Self {
        if self.phase != SubmissionPhase::Persisting {
            return self;
        }
        Self {
            fields: FormFields::default(),
            errors: FieldErrors::default(),
            phase: SubmissionPhase::Succeeded,
            submit_error: None,
        }
    }

    /// Persisting → Idle with the retry banner; inputs are kept for resubmission.
    pub fn write_failed(self) -> Self {
        if self.phase != SubmissionPhase::Persisting {
            return self;
        }
        Self {
            phase: SubmissionPhase::Idle,
            submit_error: Some(RETRY_MESSAGE.to_string()),
            ..self
        }
    }
}

/// Validate → persist → reset, one store write per submit.
pub struct SubmissionPipeline<S: NominationStore> {
    store: Arc<S>,
    collection: CollectionPath,
    window: DateWindow,
    session: Session,
}

impl<S: NominationStore> SubmissionPipeline<S> {
    pub fn new(
        store: Arc<S>,
        collection: CollectionPath,
        window: DateWindow,
        session: Session,
    ) -> Self {
        Self {
            store,
            collection,
            window,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn submit(&self, state: FormState) -> FormState {
        let state = state.request_submit();
        if state.phase != SubmissionPhase::Validating {
            tracing::debug!("Submit ignored while in {:?}", state.phase);
            return state;
        }

        let (state, form) = state.validate(&self.window);
        let Some(form) = form else {
            tracing::info!(
                "📝 Submission blocked by {} field error(s)",
                state.errors.len()
            );
            return state;
        };

        let nomination = form.into_nomination(self.session.submitter_id.clone());
        tracing::debug!(
            "Appending nomination for {} on {} ({})",
            nomination.flat,
            nomination.date,
            nomination.slot
        );

        match self.store.append(&self.collection, &nomination).await {
            Ok(record) => {
                tracing::info!(
                    "✅ Nomination stored (id: {})",
                    record.id.as_deref().unwrap_or("-")
                );
                state.write_succeeded()
            }
            Err(e) => {
                tracing::error!(
                    "❌ Failed to store nomination: {} (Category: {:?})",
                    e,
                    e.category()
                );
                state.write_failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::validator::Field;
    use crate::domain::model::{Nomination, NominationRecord};
    use crate::domain::ports::Subscription;
    use crate::utils::error::{BoardError, Result};
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use tokio::sync::Mutex;

    struct RecordingStore {
        fail: bool,
        written: Mutex<Vec<Nomination>>,
    }

    impl RecordingStore {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                written: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl NominationStore for RecordingStore {
        async fn append(
            &self,
            _collection: &CollectionPath,
            nomination: &Nomination,
        ) -> Result<NominationRecord> {
            if self.fail {
                return Err(BoardError::store("permission denied"));
            }
            let mut written = self.written.lock().await;
            written.push(nomination.clone());
            Ok(NominationRecord::from_nomination(
                nomination,
                format!("doc-{}", written.len()),
                Utc::now(),
            ))
        }

        async fn subscribe(&self, _collection: &CollectionPath) -> Result<Subscription> {
            Err(BoardError::subscription("not supported"))
        }
    }

    fn window() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2025, 8, 27).unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, 6).unwrap(),
        )
    }

    fn filled() -> FormState {
        FormState::default()
            .edit(FormEdit::FullName("Ravi Patil".to_string()))
            .edit(FormEdit::FlatNumber("e-1203".to_string()))
            .edit(FormEdit::PhoneNumber("9123456780".to_string()))
            .edit(FormEdit::Date("2025-09-01".to_string()))
            .edit(FormEdit::Slot("Evening".to_string()))
            .edit(FormEdit::BringsOwnOfferingSet(true))
    }

    fn pipeline(store: Arc<RecordingStore>) -> SubmissionPipeline<RecordingStore> {
        SubmissionPipeline::new(
            store,
            CollectionPath::for_deployment("test-app"),
            window(),
            Session {
                submitter_id: "anon-7".to_string(),
            },
        )
    }

    #[test]
    fn test_transitions_without_store() {
        let state = filled().request_submit();
        assert_eq!(state.phase, SubmissionPhase::Validating);
        assert!(state.is_loading());

        let (state, form) = state.validate(&window());
        assert_eq!(state.phase, SubmissionPhase::Persisting);
        assert!(form.is_some());

        // 寫入中不接受編輯
        let state = state.edit(FormEdit::FullName("changed".to_string()));
        assert_eq!(state.fields.full_name, "Ravi Patil");

        let done = state.clone().write_succeeded();
        assert_eq!(done.phase, SubmissionPhase::Succeeded);
        assert_eq!(done.fields, FormFields::default());

        let failed = state.write_failed();
        assert_eq!(failed.phase, SubmissionPhase::Idle);
        assert_eq!(failed.submit_error.as_deref(), Some(RETRY_MESSAGE));
        assert_eq!(failed.fields.full_name, "Ravi Patil");
    }

    #[test]
    fn test_out_of_order_events_are_ignored() {
        let idle = filled();
        assert_eq!(idle.clone().write_succeeded(), idle);
        assert_eq!(idle.clone().write_failed(), idle);
        let (same, form) = idle.clone().validate(&window());
        assert_eq!(same, idle);
        assert!(form.is_none());
    }

    #[tokio::test]
    async fn test_valid_submit_writes_once_and_clears_form() {
        let store = Arc::new(RecordingStore::new(false));
        let state = pipeline(store.clone()).submit(filled()).await;

        assert_eq!(state.phase, SubmissionPhase::Succeeded);
        assert_eq!(state.fields, FormFields::default());

        let written = store.written.lock().await;
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].submitter_id, "anon-7");
        assert_eq!(written[0].flat.wing, 'E');
        assert_eq!(written[0].flat.number, "1203");
    }

    #[tokio::test]
    async fn test_invalid_submit_shows_single_error_and_skips_write() {
        let store = Arc::new(RecordingStore::new(false));
        let state = filled().edit(FormEdit::FullName(String::new()));
        let state = pipeline(store.clone()).submit(state).await;

        assert_eq!(state.phase, SubmissionPhase::Idle);
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors.get(Field::FullName).is_some());
        assert!(store.written.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_fields() {
        let store = Arc::new(RecordingStore::new(true));
        let before = filled();
        let state = pipeline(store).submit(before.clone()).await;

        assert_eq!(state.phase, SubmissionPhase::Idle);
        assert_eq!(state.fields, before.fields);
        assert_eq!(state.submit_error.as_deref(), Some(RETRY_MESSAGE));
    }

    #[tokio::test]
    async fn test_resubmit_after_failure_clears_banner_first() {
        let failing = Arc::new(RecordingStore::new(true));
        let state = pipeline(failing).submit(filled()).await;
        assert!(state.submit_error.is_some());

        let working = Arc::new(RecordingStore::new(false));
        let state = pipeline(working).submit(state).await;
        assert_eq!(state.phase, SubmissionPhase::Succeeded);
        assert!(state.submit_error.is_none());
    }
}
