//! Forwarding of model load progress to a single listener.

use std::sync::{Arc, PoisonError, RwLock};

use llm_relay_common::InitProgressReport;

/// Listener receiving the text of each progress report.
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Holds at most one progress listener.
///
/// Engines report progress synchronously from inside their load routine, so
/// the slot uses a blocking lock; it is never held across an await point.
#[derive(Default)]
pub struct ProgressRelay {
    listener: RwLock<Option<ProgressCallback>>,
}

impl ProgressRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registered listener.
    pub fn set(&self, callback: ProgressCallback) {
        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub fn clear(&self) {
        *self.listener.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Forward `report.text` to the listener, if any. Reports arriving with no
    /// listener are dropped.
    pub fn report(&self, report: &InitProgressReport) {
        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener(&report.text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |text: &str| {
            sink.lock().unwrap().push(text.to_string());
        });
        (callback, seen)
    }

    #[test]
    fn test_report_without_listener_is_dropped() {
        let relay = ProgressRelay::new();
        relay.report(&InitProgressReport::new(0.5, 1.0, "loading"));

        let (callback, seen) = recorder();
        relay.set(callback);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_report_forwards_text_unchanged() {
        let relay = ProgressRelay::new();
        let (callback, seen) = recorder();
        relay.set(callback);

        relay.report(&InitProgressReport::new(0.1, 0.2, "Fetching param cache[1/10]"));
        relay.report(&InitProgressReport::new(0.1, 0.3, "Fetching param cache[1/10]"));

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Fetching param cache[1/10]", "Fetching param cache[1/10]"]
        );
    }

    #[test]
    fn test_replacing_listener_is_destructive() {
        let relay = ProgressRelay::new();
        let (first, first_seen) = recorder();
        let (second, second_seen) = recorder();

        relay.set(first);
        relay.report(&InitProgressReport::new(0.0, 0.0, "a"));
        relay.set(second);
        relay.report(&InitProgressReport::new(0.5, 0.0, "b"));

        assert_eq!(*first_seen.lock().unwrap(), vec!["a"]);
        assert_eq!(*second_seen.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn test_clear_unregisters_listener() {
        let relay = ProgressRelay::new();
        let (callback, seen) = recorder();
        relay.set(callback);
        relay.clear();
        relay.report(&InitProgressReport::new(1.0, 0.0, "done"));
        assert!(seen.lock().unwrap().is_empty());
    }
}
