use parking_lot::Mutex;
use tracing::warn;

use crate::events::ClientEvent;

pub const DEFAULT_CAPACITY: usize = 1024;

/// Fans events out to every subscriber through its own bounded queue, so
/// each subscriber sees events in publish order.
pub struct EventBus {
    subscribers: Mutex<Vec<flume::Sender<ClientEvent>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> flume::Receiver<ClientEvent> {
        let (tx, rx) = flume::bounded(self.capacity);
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Never blocks. A subscriber whose queue is full misses the event.
    pub fn publish(&self, event: ClientEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(flume::TrySendError::Full(_)) => {
                warn!("event subscriber is lagging, dropped {}", event.kind());
                true
            }
            Err(flume::TrySendError::Disconnected(_)) => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disconnected(node: &str) -> ClientEvent {
        ClientEvent::NodeDisconnected { node: node.into() }
    }

    #[test]
    fn test_fan_out_preserves_order() {
        let bus = EventBus::default();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(disconnected("1"));
        bus.publish(disconnected("2"));

        for rx in [a, b] {
            let nodes: Vec<String> = rx.try_iter().map(|e| e.node().to_string()).collect();
            assert_eq!(nodes, vec!["1", "2"]);
        }
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::default();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(disconnected("1"));
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_full_subscriber_does_not_block_others() {
        let bus = EventBus::new(1);
        let slow = bus.subscribe();
        let fast = bus.subscribe();

        bus.publish(disconnected("1"));
        let _ = fast.try_recv();
        bus.publish(disconnected("2"));

        assert_eq!(slow.len(), 1);
        assert_eq!(slow.try_recv().unwrap().node(), "1");
        assert_eq!(fast.try_recv().unwrap().node(), "2");
        assert_eq!(bus.subscriber_count(), 2);
    }
}
