use std::fmt::Debug;
#[cfg(any(test, feature = "test-util"))]
use std::sync::Mutex;

/// Receives every newly created record, already serialized as JSON.
///
/// Publishing is fire-and-forget: implementations swallow and log their own
/// failures.
pub trait NotificationSink: Send + Sync + Debug {
    fn publish(&self, payload: &str);
}

/// Sink that keeps every payload in memory. Test-only.
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug, Default)]
pub struct RecordingSink {
    payloads: Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-util"))]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payloads(&self) -> Vec<String> {
        match self.payloads.lock() {
            Ok(p) => p.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl NotificationSink for RecordingSink {
    fn publish(&self, payload: &str) {
        match self.payloads.lock() {
            Ok(mut p) => p.push(payload.to_string()),
            Err(poisoned) => poisoned.into_inner().push(payload.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.publish("one");
        sink.publish("two");

        assert_eq!(sink.payloads(), ["one", "two"]);
    }
}
