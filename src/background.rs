use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn, info_span, Instrument};
use crate::domain::models::booking::Booking;
use crate::domain::models::notification::{Actor, NotificationKind};
use crate::domain::ports::NotificationDispatcher;
use crate::error::AppError;

/// A notification produced by a committed transition.
#[derive(Debug, Clone)]
pub struct Effect {
    pub kind: NotificationKind,
    pub booking: Booking,
    pub actor: Actor,
}

/// Sending half of the effects channel. Emitting never blocks and never
/// fails the caller.
#[derive(Clone)]
pub struct EffectSender {
    tx: Option<mpsc::UnboundedSender<Effect>>,
}

pub type EffectReceiver = mpsc::UnboundedReceiver<Effect>;

pub fn effects_channel() -> (EffectSender, EffectReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EffectSender { tx: Some(tx) }, rx)
}

impl EffectSender {
    /// A sender that drops everything, for when notifications are disabled.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, effect: Effect) {
        let Some(tx) = &self.tx else {
            return;
        };
        let booking_id = effect.booking.id.clone();
        let kind = effect.kind;
        if tx.send(effect).is_err() {
            warn!(booking_id = %booking_id, kind = %kind, "Notification worker is gone, dropping effect");
        }
    }
}

/// Drains the effects channel until every sender is dropped. Each effect
/// goes to every dispatcher; failures are logged and never retried.
pub async fn start_notification_worker(mut rx: EffectReceiver, dispatchers: Vec<Arc<dyn NotificationDispatcher>>) {
    info!("Starting notification worker with {} dispatcher(s)...", dispatchers.len());

    while let Some(effect) = rx.recv().await {
        let span = info_span!(
            "notification",
            booking_id = %effect.booking.id,
            kind = %effect.kind,
            actor = %effect.actor.user_id
        );

        async {
            for dispatcher in &dispatchers {
                if let Err(e) = dispatcher.notify(effect.kind, &effect.booking, &effect.actor).await {
                    let failure = if e.is_absorbed() { e } else { AppError::ExternalService(e.to_string()) };
                    error!("Notification dispatch failed: {}", failure);
                }
            }
            info!("Notification processed");
        }
            .instrument(span)
            .await;
    }

    info!("Notification worker stopped: effects channel closed");
}
