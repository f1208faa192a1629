//! Guest admission at the event entrance.
//!
//! A scanned code is reconciled with the guest directory in one attempt:
//!
//! ```text
//! Idle -> Loading -> Admitted | AlreadyAdmitted | NotFound | Error
//! ```
//!
//! The status flip is a conditional write guarded on `status` being
//! `"waiting"` or unset (records without a status are waiting), so when two
//! entrances scan the same code at once exactly one of them sees `Admitted`
//! and the other sees `AlreadyAdmitted`.

use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::directory::{Guard, WriteOutcome};
use crate::guest::{Guest, GuestStatus, STATUS_FIELD};
use crate::guests::{field, GuestRepository};

/// Terminal result of an admission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// The guest was waiting and is now present.
    Admitted(Guest),
    /// The guest had already been admitted; nothing was written.
    AlreadyAdmitted(Guest),
    /// No guest matches the code.
    NotFound,
    /// The directory failed; the guest's status is unchanged.
    Error(String),
}

impl AdmissionOutcome {
    /// Machine-readable outcome name.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Admitted(_) => "admitted",
            Self::AlreadyAdmitted(_) => "already_admitted",
            Self::NotFound => "not_found",
            Self::Error(_) => "error",
        }
    }

    /// The guest to display, if any.
    #[must_use]
    pub const fn guest(&self) -> Option<&Guest> {
        match self {
            Self::Admitted(guest) | Self::AlreadyAdmitted(guest) => Some(guest),
            Self::NotFound | Self::Error(_) => None,
        }
    }
}

/// Progress of an admission attempt as seen by a UI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AdmissionState {
    /// Nothing scanned yet.
    #[default]
    Idle,
    /// Waiting on the directory.
    Loading,
    /// The attempt has finished.
    Done(AdmissionOutcome),
}

impl AdmissionState {
    /// Whether the attempt has finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_))
    }
}

/// Reconciles scanned codes with the guest directory.
#[derive(Clone)]
pub struct Reconciler {
    guests: GuestRepository,
}

impl Reconciler {
    /// Create a reconciler over `guests`.
    #[must_use]
    pub const fn new(guests: GuestRepository) -> Self {
        Self { guests }
    }

    /// Admit the guest identified by `code`.
    ///
    /// Every failure resolves to an outcome; nothing is retried.
    #[instrument(skip(self), fields(outcome = tracing::field::Empty))]
    pub async fn admit(&self, code: &str) -> AdmissionOutcome {
        let outcome = self.reconcile(code).await;
        tracing::Span::current().record("outcome", outcome.code());
        match &outcome {
            AdmissionOutcome::Error(message) => warn!(%message, "Admission failed"),
            _ => info!("Admission finished"),
        }
        outcome
    }

    /// Admit `code`, publishing `Loading` and then the terminal state on `progress`.
    pub async fn admit_observed(
        &self,
        code: &str,
        progress: &watch::Sender<AdmissionState>,
    ) -> AdmissionOutcome {
        progress.send_replace(AdmissionState::Loading);
        let outcome = self.admit(code).await;
        progress.send_replace(AdmissionState::Done(outcome.clone()));
        outcome
    }

    async fn reconcile(&self, code: &str) -> AdmissionOutcome {
        let guest = match self.guests.get_guest(code).await {
            Ok(Some(guest)) => guest,
            Ok(None) => return AdmissionOutcome::NotFound,
            Err(e) => return AdmissionOutcome::Error(e.to_string()),
        };

        if guest.is_present() {
            return AdmissionOutcome::AlreadyAdmitted(guest);
        }

        let Some(path) = self.guests.record_path(code) else {
            return AdmissionOutcome::NotFound;
        };
        let write = self
            .guests
            .directory()
            .compare_and_patch(
                &path,
                &Guard::FieldEqualsOrAbsent {
                    field: STATUS_FIELD.to_string(),
                    value: GuestStatus::Waiting.to_value(),
                },
                field(STATUS_FIELD, GuestStatus::Present.to_value()),
            )
            .await;

        match write {
            Ok(WriteOutcome::Applied) => AdmissionOutcome::Admitted(Guest {
                status: GuestStatus::Present,
                ..guest
            }),
            Ok(WriteOutcome::Rejected { current: None }) => AdmissionOutcome::NotFound,
            Ok(WriteOutcome::Rejected {
                current: Some(current),
            }) => match Guest::from_record(code, current) {
                Ok(current) if current.is_present() => AdmissionOutcome::AlreadyAdmitted(current),
                Ok(_) => AdmissionOutcome::Error(
                    "guest record changed during admission".to_string(),
                ),
                Err(e) => AdmissionOutcome::Error(e.to_string()),
            },
            Err(e) => AdmissionOutcome::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use tokio::sync::Notify;

    use crate::config::GuestsConfig;
    use crate::directory::{
        Child, Directory, DirectoryError, DirectoryResult, ListQuery, ListStream,
        MemoryDirectory, ValueStream,
    };
    use crate::guest::GuestDraft;

    /// Delegates to a memory directory but can be told to fail writes or to
    /// hold reads until released.
    struct FlakyDirectory {
        inner: MemoryDirectory,
        hold_reads: Option<Arc<Notify>>,
        fail_writes: AtomicBool,
    }

    impl FlakyDirectory {
        fn check(&self) -> DirectoryResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Err(DirectoryError::Unavailable {
                    message: "connection reset".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl Directory for FlakyDirectory {
        async fn create(&self, path: &str, value: Value) -> DirectoryResult<String> {
            self.check()?;
            self.inner.create(path, value).await
        }
        async fn replace(&self, path: &str, value: Value) -> DirectoryResult<()> {
            self.check()?;
            self.inner.replace(path, value).await
        }
        async fn patch(&self, path: &str, fields: Map<String, Value>) -> DirectoryResult<()> {
            self.check()?;
            self.inner.patch(path, fields).await
        }
        async fn remove(&self, path: &str) -> DirectoryResult<()> {
            self.check()?;
            self.inner.remove(path).await
        }
        async fn get_once(&self, path: &str) -> DirectoryResult<Option<Value>> {
            if let Some(release) = &self.hold_reads {
                release.notified().await;
            }
            self.inner.get_once(path).await
        }
        async fn get_once_list(
            &self,
            path: &str,
            query: &ListQuery,
        ) -> DirectoryResult<Vec<Child>> {
            self.inner.get_once_list(path, query).await
        }
        async fn compare_and_patch(
            &self,
            path: &str,
            guard: &Guard,
            fields: Map<String, Value>,
        ) -> DirectoryResult<WriteOutcome> {
            self.check()?;
            self.inner.compare_and_patch(path, guard, fields).await
        }
        fn observe_one(&self, path: &str) -> ValueStream {
            self.inner.observe_one(path)
        }
        fn observe_query(&self, path: &str, query: ListQuery) -> ListStream {
            self.inner.observe_query(path, query)
        }
    }

    fn setup() -> (MemoryDirectory, GuestRepository, Reconciler) {
        let directory = MemoryDirectory::new();
        let guests = GuestRepository::new(Arc::new(directory.clone()), GuestsConfig::default());
        let reconciler = Reconciler::new(guests.clone());
        (directory, guests, reconciler)
    }

    fn draft(name: &str) -> GuestDraft {
        GuestDraft {
            name: name.to_string(),
            guests: 2,
            table: 1,
        }
    }

    #[tokio::test]
    async fn test_admits_waiting_guest() {
        let (_, guests, reconciler) = setup();
        let guest = guests.add_guest(draft("José Á.")).await.unwrap();

        let outcome = reconciler.admit(&guest.id).await;

        let AdmissionOutcome::Admitted(admitted) = outcome else {
            panic!("expected Admitted, got {outcome:?}");
        };
        assert_eq!(admitted.name, "José Á.");
        assert_eq!(admitted.status, GuestStatus::Present);

        let stored = guests.get_guest(&guest.id).await.unwrap().unwrap();
        assert_eq!(stored.status, GuestStatus::Present);
    }

    #[tokio::test]
    async fn test_second_scan_reports_already_admitted() {
        let (directory, guests, reconciler) = setup();
        let guest = guests.add_guest(draft("Ana")).await.unwrap();

        assert!(matches!(
            reconciler.admit(&guest.id).await,
            AdmissionOutcome::Admitted(_)
        ));
        let revision = directory.revision();

        let second = reconciler.admit(&guest.id).await;
        assert!(matches!(second, AdmissionOutcome::AlreadyAdmitted(ref g) if g.name == "Ana"));
        assert_eq!(directory.revision(), revision, "re-scan must not write");
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let (_, _, reconciler) = setup();
        assert_eq!(reconciler.admit("nonexistent").await, AdmissionOutcome::NotFound);
        assert_eq!(reconciler.admit("nonexistent").await, AdmissionOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_codes_that_are_not_keys_are_not_found() {
        let (_, guests, reconciler) = setup();
        let guest = guests.add_guest(draft("Ana")).await.unwrap();

        assert_eq!(reconciler.admit("").await, AdmissionOutcome::NotFound);
        assert_eq!(
            reconciler.admit(&format!("{}/name", guest.id)).await,
            AdmissionOutcome::NotFound
        );
        assert_eq!(reconciler.admit("a.b").await, AdmissionOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_read_failure_is_error() {
        let (directory, guests, reconciler) = setup();
        let guest = guests.add_guest(draft("Ana")).await.unwrap();
        directory.set_online(false);

        assert!(matches!(
            reconciler.admit(&guest.id).await,
            AdmissionOutcome::Error(_)
        ));

        directory.set_online(true);
        let stored = guests.get_guest(&guest.id).await.unwrap().unwrap();
        assert_eq!(stored.status, GuestStatus::Waiting);
    }

    #[tokio::test]
    async fn test_write_failure_leaves_status_unchanged() {
        let memory = MemoryDirectory::new();
        let flaky = Arc::new(FlakyDirectory {
            inner: memory.clone(),
            hold_reads: None,
            fail_writes: AtomicBool::new(false),
        });
        let guests = GuestRepository::new(flaky.clone(), GuestsConfig::default());
        let reconciler = Reconciler::new(guests.clone());
        let guest = guests.add_guest(draft("Ana")).await.unwrap();

        flaky.fail_writes.store(true, Ordering::SeqCst);
        let outcome = reconciler.admit(&guest.id).await;
        assert!(
            matches!(&outcome, AdmissionOutcome::Error(message) if message.contains("connection reset")),
            "got {outcome:?}"
        );

        let stored = guests.get_guest(&guest.id).await.unwrap().unwrap();
        assert_eq!(stored.status, GuestStatus::Waiting);

        flaky.fail_writes.store(false, Ordering::SeqCst);
        assert!(matches!(
            reconciler.admit(&guest.id).await,
            AdmissionOutcome::Admitted(_)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_scans_admit_once() {
        let (_, guests, reconciler) = setup();
        let guest = guests.add_guest(draft("Ana")).await.unwrap();

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let reconciler = reconciler.clone();
                let code = guest.id.clone();
                tokio::spawn(async move { reconciler.admit(&code).await })
            })
            .collect();

        let mut admitted = 0;
        let mut already = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                AdmissionOutcome::Admitted(_) => admitted += 1,
                AdmissionOutcome::AlreadyAdmitted(_) => already += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(already, 7);
    }

    #[tokio::test]
    async fn test_guest_removed_before_write_is_not_found() {
        let (directory, guests, reconciler) = setup();
        let guest = guests.add_guest(draft("Ana")).await.unwrap();
        let path = guests.record_path(&guest.id).unwrap();

        // Simulate the race by running the conditional write against a removed record.
        directory.remove(&path).await.unwrap();
        let write = directory
            .compare_and_patch(
                &path,
                &Guard::FieldEqualsOrAbsent {
                    field: STATUS_FIELD.to_string(),
                    value: json!("waiting"),
                },
                field(STATUS_FIELD, json!("present")),
            )
            .await
            .unwrap();
        assert_eq!(write, WriteOutcome::Rejected { current: None });
        assert_eq!(reconciler.admit(&guest.id).await, AdmissionOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_record_without_status_is_admitted_once() {
        let (directory, guests, reconciler) = setup();
        directory
            .replace(
                "users/legacy",
                json!({ "name": "José Á.", "nameNormalized": "jose a.", "guests": 1, "table": 3 }),
            )
            .await
            .unwrap();
        let stored = guests.get_guest("legacy").await.unwrap().unwrap();
        assert_eq!(stored.status, GuestStatus::Waiting);

        let first = reconciler.admit("legacy").await;
        assert!(
            matches!(&first, AdmissionOutcome::Admitted(g) if g.status == GuestStatus::Present),
            "got {first:?}"
        );
        assert_eq!(
            directory.get_once("users/legacy/status").await.unwrap(),
            Some(json!("present"))
        );

        let second = reconciler.admit("legacy").await;
        assert!(
            matches!(&second, AdmissionOutcome::AlreadyAdmitted(g) if g.name == "José Á."),
            "got {second:?}"
        );
    }

    #[tokio::test]
    async fn test_admit_observed_publishes_progress() {
        let memory = MemoryDirectory::new();
        let release = Arc::new(Notify::new());
        let held = Arc::new(FlakyDirectory {
            inner: memory.clone(),
            hold_reads: Some(Arc::clone(&release)),
            fail_writes: AtomicBool::new(false),
        });
        let guests = GuestRepository::new(Arc::new(memory), GuestsConfig::default());
        let guest = guests.add_guest(draft("Ana")).await.unwrap();
        let reconciler = Reconciler::new(GuestRepository::new(held, GuestsConfig::default()));

        let (progress, mut states) = watch::channel(AdmissionState::default());
        let mut seen = vec![states.borrow_and_update().clone()];

        let attempt = tokio::spawn(async move {
            reconciler.admit_observed(&guest.id, &progress).await
        });

        states.changed().await.unwrap();
        seen.push(states.borrow_and_update().clone());
        release.notify_one();

        states.changed().await.unwrap();
        seen.push(states.borrow_and_update().clone());
        let outcome = attempt.await.unwrap();

        assert_eq!(
            seen,
            [
                AdmissionState::Idle,
                AdmissionState::Loading,
                AdmissionState::Done(outcome.clone()),
            ]
        );
        assert_eq!(outcome.code(), "admitted");
        assert_eq!(outcome.guest().map(|g| g.name.as_str()), Some("Ana"));
    }

    #[test]
    fn test_outcome_codes() {
        assert_eq!(AdmissionOutcome::NotFound.code(), "not_found");
        assert_eq!(AdmissionOutcome::Error("x".into()).code(), "error");
        assert!(AdmissionOutcome::NotFound.guest().is_none());
        assert!(!AdmissionState::Loading.is_terminal());
    }
}
