use notification_common::{EventType, NotificationEvent};

/// Plain-text email ready for a [`crate::MailTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Maps user events to mail content
#[derive(Debug, Clone)]
pub struct MailComposer {
    from: String,
}

impl MailComposer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }

    pub fn compose(&self, event: &NotificationEvent) -> MailMessage {
        let (subject, verb) = match event.event_type {
            EventType::Created => ("User created", "created"),
            EventType::Deleted => ("User deleted", "deleted"),
        };

        MailMessage {
            from: self.from.clone(),
            to: event.email.clone(),
            subject: subject.to_string(),
            body: format!("User with email {} {}.", event.email, verb),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_created() {
        let composer = MailComposer::new("noreply@example.com");
        let message = composer.compose(&NotificationEvent::created("a@b.com"));

        assert_eq!(
            message,
            MailMessage {
                from: "noreply@example.com".into(),
                to: "a@b.com".into(),
                subject: "User created".into(),
                body: "User with email a@b.com created.".into(),
            }
        );
    }

    #[test]
    fn test_compose_deleted() {
        let message = MailComposer::new("noreply@example.com")
            .compose(&NotificationEvent::deleted("a@b.com"));

        assert_eq!(message.subject, "User deleted");
        assert_eq!(message.body, "User with email a@b.com deleted.");
    }
}
