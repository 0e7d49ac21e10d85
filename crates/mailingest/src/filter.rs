//! Sender gate run before an inbound message is stored.

use tracing::{info, info_span, warn};

use crate::config::{load_settings, AllowList, Environment};
use crate::error::IngestError;
use crate::event::{FilterResponse, InboundMailEvent};
use crate::notify::{Notification, NotificationCategory, Notifier};
use crate::sanitize::redact_address;
use crate::storage::ObjectStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Accepted,
    /// First record whose sender is not allowed; later records are not checked.
    Rejected { index: usize, sender: String },
}

pub struct SenderFilter<'a> {
    allow_list: &'a AllowList,
}

impl<'a> SenderFilter<'a> {
    pub fn new(allow_list: &'a AllowList) -> Self {
        Self { allow_list }
    }

    pub fn accepts(&self, sender: &str) -> bool {
        self.allow_list.accepts(sender)
    }

    pub fn decide(&self, event: &InboundMailEvent) -> Result<FilterDecision, IngestError> {
        for (index, sender) in event.senders()?.into_iter().enumerate() {
            if !self.accepts(sender) {
                return Ok(FilterDecision::Rejected {
                    index,
                    sender: sender.to_string(),
                });
            }
        }
        Ok(FilterDecision::Accepted)
    }
}

/// Runs the sender gate over a raw envelope event.
///
/// Never fails: internal faults are notified as `fail_lambda_run` and stop
/// delivery, the same as a rejection.
pub fn filter_inbound(
    event_json: &str,
    env: &Environment,
    store: &dyn ObjectStore,
    notifier: &dyn Notifier,
) -> FilterResponse {
    let span = info_span!("filter_inbound", bucket = %env.bucket);
    let _enter = span.enter();

    match evaluate(event_json, env, store) {
        Ok(FilterDecision::Accepted) => {
            info!("all senders accepted");
            FilterResponse::proceed()
        }
        Ok(FilterDecision::Rejected { index, sender }) => {
            warn!(record = index, sender = %redact_address(&sender), "sender rejected");
            notifier.publish(Notification::new(
                NotificationCategory::EmailSourceRejected,
                format!("Email source rejected: {}", sender),
            ));
            FilterResponse::stop()
        }
        Err(e) => {
            warn!(error = %e, "filter failed, stopping delivery");
            notifier.publish(Notification::new(
                NotificationCategory::FailLambdaRun,
                format!("Sender filter failed: {}", e),
            ));
            FilterResponse::stop()
        }
    }
}

fn evaluate(
    event_json: &str,
    env: &Environment,
    store: &dyn ObjectStore,
) -> Result<FilterDecision, IngestError> {
    let event = InboundMailEvent::from_json(event_json)?;
    let settings = load_settings(store, env)?;
    SenderFilter::new(&settings.accepted_senders).decide(&event)
}
