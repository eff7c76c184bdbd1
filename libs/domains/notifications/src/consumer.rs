use async_trait::async_trait;
use kafka_worker::{HandlerError, InboundMessage, MessageHandler};
use notification_common::decode;
use std::sync::Arc;
use tracing::debug;

use crate::repository::NotificationRepository;
use crate::service::NotificationService;

/// Feeds `user-event` messages into [`NotificationService::process`].
///
/// Undecodable payloads are reported as [`HandlerError::Malformed`] so the
/// worker drops them; everything else that fails is a processing error for
/// this delivery only.
pub struct UserEventHandler<R: NotificationRepository> {
    service: Arc<NotificationService<R>>,
}

impl<R: NotificationRepository> UserEventHandler<R> {
    pub fn new(service: Arc<NotificationService<R>>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<R: NotificationRepository + 'static> MessageHandler for UserEventHandler<R> {
    fn name(&self) -> &'static str {
        "user-event-mailer"
    }

    async fn handle(&self, message: &InboundMessage) -> Result<(), HandlerError> {
        let payload = message
            .payload()
            .ok_or_else(|| HandlerError::Malformed("empty payload".to_string()))?;

        let event = decode(payload).map_err(|e| HandlerError::Malformed(e.to_string()))?;
        debug!(
            email = %event.email,
            event_type = %event.event_type,
            partition = message.partition,
            offset = message.offset,
            "Received user event"
        );

        self.service
            .process(&event)
            .await
            .map(|_| ())
            .map_err(|e| HandlerError::Processing(e.to_string()))
    }
}
