// Notifier trait and implementations

use std::sync::{Arc, Mutex};

use gmatch_config::EmailSection;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::NotifyResult;
use crate::event::MatchEvent;
use crate::mailer::Mailer;
use crate::queue::DispatchQueue;

/// Seam between the scheduler and mail delivery. `enqueue` never blocks and
/// never fails; delivery is best-effort off the scheduler's critical path.
pub trait Notifier: Send + Sync {
    fn enqueue(&self, event: MatchEvent);
}

/// Production notifier: a bounded queue drained by a spawned send worker.
/// With mail disabled (or SMTP credentials missing) every enqueue is a
/// successful no-op, announced once at construction.
pub struct MailNotifier {
    queue: Option<Arc<DispatchQueue>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MailNotifier {
    pub fn new(config: &EmailSection) -> NotifyResult<Self> {
        if !config.enabled || config.smtp_host.is_empty() {
            info!("mail notifier disabled (email.enabled=false or missing SMTP host), events become no-ops");
            return Ok(Self {
                queue: None,
                worker: Mutex::new(None),
            });
        }

        let mailer = Mailer::new(config)?;
        let queue = Arc::new(DispatchQueue::new(config.queue_capacity));
        let worker = {
            let queue = queue.clone();
            tokio::spawn(async move {
                while let Some(event) = queue.pop().await {
                    if let Err(e) = mailer.send(&event).await {
                        warn!(recipient = event.recipient(), error = %e, "failed to send notification");
                    }
                }
            })
        };

        info!(capacity = config.queue_capacity, "mail notifier started");
        Ok(Self {
            queue: Some(queue),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Stop accepting events, drain the queue, and wait for the worker.
    pub async fn shutdown(&self) {
        if let Some(queue) = &self.queue {
            queue.close();
        }
        let worker = self.worker.lock().ok().and_then(|mut slot| slot.take());
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

impl Notifier for MailNotifier {
    fn enqueue(&self, event: MatchEvent) {
        if let Some(queue) = &self.queue {
            queue.push(event);
        }
    }
}

/// Test notifier that records every event.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<MatchEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MatchEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn enqueue(&self, event: MatchEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_config() -> EmailSection {
        EmailSection {
            enabled: false,
            ..EmailSection::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_noop() {
        let notifier = MailNotifier::new(&disabled_config()).unwrap();
        notifier.enqueue(MatchEvent::Expired {
            email: "a@x".to_string(),
            display_name: "a".to_string(),
        });
        notifier.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_host_counts_as_disabled() {
        let config = EmailSection {
            enabled: true,
            smtp_host: String::new(),
            ..EmailSection::default()
        };
        let notifier = MailNotifier::new(&config).unwrap();
        notifier.enqueue(MatchEvent::Expired {
            email: "a@x".to_string(),
            display_name: "a".to_string(),
        });
        notifier.shutdown().await;
    }

    #[tokio::test]
    async fn test_recording_notifier_captures_order() {
        let notifier = RecordingNotifier::new();
        notifier.enqueue(MatchEvent::Expired {
            email: "a@x".to_string(),
            display_name: "a".to_string(),
        });
        notifier.enqueue(MatchEvent::Matched {
            email: "b@x".to_string(),
            display_name: "b".to_string(),
            partner_name: Some("a".to_string()),
            score: 91.0,
        });

        let events = notifier.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].recipient(), "a@x");
        assert_eq!(events[1].recipient(), "b@x");
    }
}
