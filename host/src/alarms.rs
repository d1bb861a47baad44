// Named periodic timers in the manner of a browser's alarm API.
// One event stream serves every alarm, mirroring the single onAlarm
// listener of the original.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One alarm firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub name: String,
}

pub struct Alarms {
    tx: mpsc::UnboundedSender<Alarm>,
    events: Mutex<Option<mpsc::UnboundedReceiver<Alarm>>>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Alarms {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            events: Mutex::new(Some(rx)),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// The shared event stream. There is exactly one listener; a second
    /// call gets `None`.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<Alarm>> {
        self.events.lock().expect("alarm events poisoned").take()
    }

    /// Create a named alarm: first fire after `delay`, then every
    /// `period`. Creating over an existing name replaces it.
    pub fn create(&self, name: &str, delay: Duration, period: Duration) {
        let tx = self.tx.clone();
        let alarm_name = name.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            loop {
                let fired = Alarm {
                    name: alarm_name.clone(),
                };
                if tx.send(fired).is_err() {
                    // listener went away, stop ticking
                    break;
                }
                tokio::time::sleep(period).await;
            }
        });

        let replaced = self
            .timers
            .lock()
            .expect("alarm timers poisoned")
            .insert(name.to_string(), handle);
        if let Some(old) = replaced {
            old.abort();
        }
    }

    /// Cancel a named alarm. Returns whether it existed.
    pub fn clear(&self, name: &str) -> bool {
        match self.timers.lock().expect("alarm timers poisoned").remove(name) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

impl Default for Alarms {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Alarms {
    fn drop(&mut self) {
        for (_, handle) in self.timers.lock().expect("alarm timers poisoned").drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_alarm_fires_after_delay_then_periodically() {
        let alarms = Alarms::new();
        let mut events = alarms.take_events().unwrap();
        alarms.create(
            "periodicTask",
            Duration::from_secs(60),
            Duration::from_secs(3600),
        );

        let first = events.recv().await.unwrap();
        assert_eq!(first.name, "periodicTask");
        let second = events.recv().await.unwrap();
        assert_eq!(second.name, "periodicTask");
    }

    #[tokio::test]
    async fn test_clear_unknown_alarm_reports_absence() {
        let alarms = Alarms::new();
        assert!(!alarms.clear("nothing"));
        alarms.create(
            "cleanup",
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        assert!(alarms.clear("cleanup"));
    }
}
