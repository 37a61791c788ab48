use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Events emitted by services after state changes. Consumed by the
/// in-process drain task; delivery is best effort and never blocks the
/// request path on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PaymentSucceeded {
        reference_number: String,
    },
    PaymentFailed {
        reference_number: String,
    },
    CheckoutCreated(Uuid),
    CouponApplied {
        checkout_id: Uuid,
        coupon_code: String,
    },
    DocumentApproved {
        user_id: Uuid,
        document_id: Uuid,
    },
    UserVerified(Uuid),
    ReturnDecision {
        return_id: Uuid,
        admin_status: String,
    },
    ReportRequested(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event; a full or closed channel is logged and dropped.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            debug!(error = %e, "event channel closed, dropping event");
        }
    }
}

/// Builds a connected sender/receiver pair.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel. Notification fan-out (email and push
/// delivery) happens outside this process; the drain records the event
/// stream for operators.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "event processed");
    }
    info!("event channel closed, processor exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_after_receiver_drop_does_not_panic() {
        let (sender, receiver) = channel(4);
        drop(receiver);
        sender.send(Event::OrderCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_round_trip_through_the_channel() {
        let (sender, mut receiver) = channel(4);
        let order_id = Uuid::new_v4();
        sender.send(Event::OrderCreated(order_id)).await;
        match receiver.recv().await {
            Some(Event::OrderCreated(id)) => assert_eq!(id, order_id),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
