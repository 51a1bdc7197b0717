// ─── Event Bus ───
// Publishes progress, log and lifecycle events to whatever shell embeds
// the core. Handlers run synchronously on the publishing thread; shells
// that need cross-thread delivery wrap their handler with their own queue.

use std::sync::Mutex;

use crate::core::java::JavaEntry;

/// Install phases as surfaced by `JavaPhaseChanged`.
pub const JAVA_PHASE_FILE_LIST: u8 = 1;
pub const JAVA_PHASE_DOWNLOAD: u8 = 2;
pub const JAVA_PHASE_REGISTER: u8 = 3;

/// Everything the core tells the outside world.
///
/// All strings are UTF-8 and delivered verbatim; nothing is re-encoded
/// through a platform code page.
#[derive(Debug, Clone)]
pub enum LauncherEvent {
    JavaPhaseChanged { phase: u8, name: String },
    JavaProgress { percent: u8, message: String },
    JavaFinished { success: bool, error: Option<String> },
    JavaListReady { entries: Vec<JavaEntry> },
    LaunchLog { message: String },
    GameStarted,
    GameWindowReady,
    GameExited { code: i32 },
}

pub type EventHandler = Box<dyn Fn(&LauncherEvent) + Send + Sync>;

/// Registry mapping subscribers to events. Fire-and-forget: publishing
/// with zero subscribers is a no-op.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<Vec<EventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&LauncherEvent) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .expect("event bus lock poisoned")
            .push(Box::new(handler));
    }

    pub fn publish(&self, event: LauncherEvent) {
        let handlers = self.handlers.lock().expect("event bus lock poisoned");
        for handler in handlers.iter() {
            handler(&event);
        }
    }

    /// Convenience for the launch pipeline: logs through `tracing` and
    /// mirrors the line to subscribers as a `LaunchLog` event.
    pub fn launch_log(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.publish(LauncherEvent::LaunchLog { message });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(LauncherEvent::GameStarted);
    }

    #[test]
    fn all_subscribers_see_each_event() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let seen = seen.clone();
            bus.subscribe(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
        }
        bus.publish(LauncherEvent::GameExited { code: 0 });
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn launch_log_reaches_subscribers_verbatim() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(move |event| {
            if let LauncherEvent::LaunchLog { message } = event {
                sink.lock().unwrap().push(message.clone());
            }
        });
        bus.launch_log("启动中: 1.20.1");
        assert_eq!(seen.lock().unwrap().as_slice(), &["启动中: 1.20.1"]);
    }
}
