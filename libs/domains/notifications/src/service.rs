use chrono::Utc;
use notification_common::NotificationEvent;
use resilience::{CallError, CircuitBreaker, CircuitBreakerConfig};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::composer::MailComposer;
use crate::error::{NotificationError, NotificationResult};
use crate::models::{NewNotificationRecord, NotificationRecord, NotificationStatus};
use crate::repository::NotificationRepository;
use crate::transport::MailTransport;

/// Service layer for the mail pipeline and the notification read API
pub struct NotificationService<R: NotificationRepository> {
    repository: Arc<R>,
    transport: Arc<dyn MailTransport>,
    composer: MailComposer,
    mail_breaker: CircuitBreaker,
    db_breaker: CircuitBreaker,
}

impl<R: NotificationRepository> NotificationService<R> {
    pub fn new(repository: R, transport: Arc<dyn MailTransport>, composer: MailComposer) -> Self {
        Self {
            repository: Arc::new(repository),
            transport,
            composer,
            mail_breaker: CircuitBreaker::new("mail", CircuitBreakerConfig::mail()),
            db_breaker: CircuitBreaker::new(
                "notification-db",
                CircuitBreakerConfig::notification_database(),
            ),
        }
    }

    pub fn with_mail_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.mail_breaker = breaker;
        self
    }

    pub fn with_db_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.db_breaker = breaker;
        self
    }

    pub fn mail_breaker(&self) -> &CircuitBreaker {
        &self.mail_breaker
    }

    pub fn db_breaker(&self) -> &CircuitBreaker {
        &self.db_breaker
    }

    /// Compose, send and record the outcome of one event.
    ///
    /// A transport failure yields a `FAILED` record, not an error, and does not
    /// count against the mail breaker; only store failures do. While the breaker
    /// is open nothing is sent or stored and [`NotificationError::MailOperation`]
    /// is returned.
    pub async fn process(&self, event: &NotificationEvent) -> NotificationResult<NotificationRecord> {
        let record = self
            .mail_breaker
            .call(|| self.send_and_record(event))
            .await
            .map_err(|e| {
                let (status, message) = match e {
                    CallError::Rejected { name } => (
                        "rejected",
                        format!("mail service is unavailable, circuit breaker '{}' is open", name),
                    ),
                    CallError::Inner(e) => (
                        "unrecorded",
                        format!("notification could not be recorded: {}", e),
                    ),
                };
                metrics::counter!("notifications_processed_total", "status" => status).increment(1);
                NotificationError::MailOperation(message)
            })?;

        metrics::counter!("notifications_processed_total", "status" => record.status.to_string())
            .increment(1);
        Ok(record)
    }

    async fn send_and_record(&self, event: &NotificationEvent) -> NotificationResult<NotificationRecord> {
        let message = self.composer.compose(event);
        let attempted_at = Utc::now();
        let outcome = self.transport.send(&message).await;

        let status = match outcome {
            Ok(()) => NotificationStatus::Sent,
            Err(_) => NotificationStatus::Failed,
        };
        let record = self
            .repository
            .create(NewNotificationRecord {
                email: event.email.clone(),
                event_type: event.event_type,
                status,
                timestamp: attempted_at,
            })
            .await?;

        match outcome {
            Ok(()) => info!(
                notification_id = record.id,
                email = %record.email,
                event_type = %record.event_type,
                "Email sent"
            ),
            Err(e) => warn!(
                notification_id = record.id,
                email = %record.email,
                transport = self.transport.name(),
                error = %e,
                "Email not sent, recorded as FAILED"
            ),
        }
        Ok(record)
    }

    /// List every record; an empty store is reported as [`NotificationError::NoNotifications`].
    pub async fn list_all(&self) -> NotificationResult<Vec<NotificationRecord>> {
        let records = self.guarded(|| self.repository.list()).await?;
        if records.is_empty() {
            return Err(NotificationError::NoNotifications);
        }
        Ok(records)
    }

    pub async fn find_by_id(&self, id: i64) -> NotificationResult<NotificationRecord> {
        self.guarded(|| self.repository.get_by_id(id))
            .await?
            .ok_or(NotificationError::NotFound(id))
    }

    pub async fn delete_by_id(&self, id: i64) -> NotificationResult<()> {
        if !self.guarded(|| self.repository.delete(id)).await? {
            return Err(NotificationError::NotFound(id));
        }
        Ok(())
    }

    async fn guarded<T, F, Fut>(&self, operation: F) -> NotificationResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = NotificationResult<T>>,
    {
        self.db_breaker.call(operation).await.map_err(|e| match e {
            CallError::Rejected { name } => NotificationError::DatabaseOperation(format!(
                "notification database is unavailable, circuit breaker '{}' is open",
                name
            )),
            CallError::Inner(e) => e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryNotificationRepository, MockNotificationRepository};
    use crate::transport::{MockMailTransport, RecordingMailTransport};
    use mockall::predicate::eq;
    use notification_common::EventType;
    use resilience::{CircuitState, SlidingWindow};
    use std::time::Duration;

    fn composer() -> MailComposer {
        MailComposer::new("noreply@example.com")
    }

    fn service(
        transport: RecordingMailTransport,
    ) -> (NotificationService<InMemoryNotificationRepository>, InMemoryNotificationRepository) {
        let repo = InMemoryNotificationRepository::new();
        let service = NotificationService::new(repo.clone(), Arc::new(transport), composer());
        (service, repo)
    }

    fn tight_breaker(name: &str) -> CircuitBreaker {
        CircuitBreaker::new(
            name,
            CircuitBreakerConfig::mail()
                .with_sliding_window(SlidingWindow::Count(2))
                .with_minimum_calls(2)
                .with_wait_in_open(Duration::from_secs(60)),
        )
    }

    #[tokio::test]
    async fn test_process_sends_and_records_sent() {
        let transport = RecordingMailTransport::new();
        let (service, repo) = service(transport.clone());

        let before = Utc::now();
        let record = service
            .process(&NotificationEvent::created("a@b.com"))
            .await
            .unwrap();

        assert_eq!(record.email, "a@b.com");
        assert_eq!(record.event_type, EventType::Created);
        assert_eq!(record.status, NotificationStatus::Sent);
        assert!(record.timestamp >= before);
        assert_eq!(repo.list().await.unwrap(), vec![record]);

        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "User created");
        assert_eq!(sent[0].to, "a@b.com");
    }

    #[tokio::test]
    async fn test_transport_failure_records_failed_without_error() {
        let (service, repo) = service(RecordingMailTransport::failing());

        let record = service
            .process(&NotificationEvent::deleted("a@b.com"))
            .await
            .unwrap();

        assert_eq!(record.status, NotificationStatus::Failed);
        assert_eq!(record.event_type, EventType::Deleted);
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_sends_keep_mail_breaker_closed() {
        let transport = RecordingMailTransport::failing();
        let (service, repo) = service(transport.clone());
        let service = service.with_mail_breaker(tight_breaker("mail-failed-sends"));
        let event = NotificationEvent::created("a@b.com");

        for _ in 0..6 {
            let record = service.process(&event).await.unwrap();
            assert_eq!(record.status, NotificationStatus::Failed);
        }

        assert_eq!(service.mail_breaker().state(), CircuitState::Closed);
        assert_eq!(transport.attempts(), 6);
        assert_eq!(repo.list().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_open_mail_breaker_skips_send_and_store() {
        let mut mock_repo = MockNotificationRepository::new();
        mock_repo
            .expect_create()
            .times(2)
            .returning(|_| Err(NotificationError::DatabaseOperation("connection refused".into())));
        let transport = RecordingMailTransport::new();
        let service = NotificationService::new(mock_repo, Arc::new(transport.clone()), composer())
            .with_mail_breaker(tight_breaker("mail-test"));
        let event = NotificationEvent::created("a@b.com");

        for _ in 0..2 {
            assert!(matches!(
                service.process(&event).await,
                Err(NotificationError::MailOperation(_))
            ));
        }
        assert_eq!(service.mail_breaker().state(), CircuitState::Open);

        let err = service.process(&event).await.unwrap_err();
        assert!(matches!(err, NotificationError::MailOperation(ref msg) if msg.contains("circuit breaker")));
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_mail_operation_error() {
        let mut mock_repo = MockNotificationRepository::new();
        mock_repo
            .expect_create()
            .times(1)
            .returning(|_| Err(NotificationError::DatabaseOperation("disk full".into())));

        let service = NotificationService::new(
            mock_repo,
            Arc::new(RecordingMailTransport::new()),
            composer(),
        );

        let err = service
            .process(&NotificationEvent::created("a@b.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::MailOperation(ref msg) if msg.contains("disk full")));
    }

    #[tokio::test]
    async fn test_process_uses_composed_message() {
        let mut transport = MockMailTransport::new();
        transport.expect_name().return_const("mock");
        transport
            .expect_send()
            .withf(|m| m.from == "noreply@example.com" && m.body == "User with email x@y.com deleted.")
            .times(1)
            .returning(|_| Ok(()));

        let service = NotificationService::new(
            InMemoryNotificationRepository::new(),
            Arc::new(transport),
            composer(),
        );

        let record = service
            .process(&NotificationEvent::deleted("x@y.com"))
            .await
            .unwrap();
        assert_eq!(record.status, NotificationStatus::Sent);
    }

    #[tokio::test]
    async fn test_list_all_empty_is_no_notifications() {
        let (service, _) = service(RecordingMailTransport::new());

        assert!(matches!(
            service.list_all().await,
            Err(NotificationError::NoNotifications)
        ));
    }

    #[tokio::test]
    async fn test_find_and_delete() {
        let (service, _) = service(RecordingMailTransport::new());
        let record = service
            .process(&NotificationEvent::created("a@b.com"))
            .await
            .unwrap();

        assert_eq!(service.find_by_id(record.id).await.unwrap(), record);
        service.delete_by_id(record.id).await.unwrap();

        assert!(matches!(
            service.find_by_id(record.id).await,
            Err(NotificationError::NotFound(1))
        ));
        assert!(matches!(
            service.delete_by_id(record.id).await,
            Err(NotificationError::NotFound(1))
        ));
    }

    #[tokio::test]
    async fn test_store_failures_open_notification_db_breaker() {
        let mut mock_repo = MockNotificationRepository::new();
        mock_repo
            .expect_get_by_id()
            .with(eq(1))
            .times(2)
            .returning(|_| Err(NotificationError::DatabaseOperation("connection refused".into())));

        let service = NotificationService::new(
            mock_repo,
            Arc::new(RecordingMailTransport::new()),
            composer(),
        )
        .with_db_breaker(tight_breaker("notification-db-test"));

        for _ in 0..2 {
            assert!(service.find_by_id(1).await.is_err());
        }
        assert_eq!(service.db_breaker().state(), CircuitState::Open);

        let err = service.find_by_id(1).await.unwrap_err();
        assert!(matches!(err, NotificationError::DatabaseOperation(ref msg) if msg.contains("circuit breaker")));
    }
}
