// ─── Process Watchers ───
// Observes the spawned game: stdout/stderr relay, exit notification,
// Windows priority classes, and the first visible game window.

use std::io::{BufRead, BufReader};
use std::process::Child;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::events::{EventBus, LauncherEvent};

/// How long the window watcher keeps polling before giving up. A timeout
/// is a warning, not an error: slow modpacks routinely take minutes.
const WINDOW_WATCH_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessPriority {
    #[default]
    Normal,
    High,
    Low,
}

/// Relay one output pipe as prefixed log events on a reader thread.
pub fn relay_output<R>(pipe: R, prefix: &'static str, events: Arc<EventBus>)
where
    R: std::io::Read + Send + 'static,
{
    std::thread::spawn(move || {
        for line in BufReader::new(pipe).lines().map_while(Result::ok) {
            events.publish(LauncherEvent::LaunchLog {
                message: format!("{prefix} {line}"),
            });
        }
    });
}

/// Own the child on a background thread and publish `GameExited` with
/// its code once it terminates.
pub fn watch_process_exit(mut child: Child, events: Arc<EventBus>) {
    std::thread::spawn(move || {
        let code = match child.wait() {
            Ok(status) => status.code().unwrap_or(-1),
            Err(err) => {
                warn!("Waiting on game process failed: {}", err);
                -1
            }
        };
        debug!("Game process exited with code {}", code);
        events.publish(LauncherEvent::GameExited { code });
    });
}

/// Watch for the first visible, titled window owned by `pid` and publish
/// `GameWindowReady` once. Only Windows exposes a reliable check; other
/// platforms run no watcher and never emit the event.
pub fn watch_game_window(pid: u32, events: Arc<EventBus>) {
    if !cfg!(target_os = "windows") {
        return;
    }

    std::thread::spawn(move || {
        let deadline = Instant::now() + WINDOW_WATCH_TIMEOUT;
        while Instant::now() < deadline {
            match query_window_title(pid) {
                Some(state) if state.gone => return,
                Some(state) if state.titled => {
                    events.publish(LauncherEvent::GameWindowReady);
                    return;
                }
                _ => {}
            }
            std::thread::sleep(Duration::from_secs(2));
        }
        warn!("No game window appeared for PID {} within 180s", pid);
    });
}

struct WindowState {
    titled: bool,
    gone: bool,
}

/// `tasklist /V` reports the foreground window title per process; "N/A"
/// means no visible titled window yet.
fn query_window_title(pid: u32) -> Option<WindowState> {
    let output = std::process::Command::new("tasklist")
        .args(["/V", "/FO", "CSV", "/NH", "/FI"])
        .arg(format!("PID eq {pid}"))
        .output()
        .ok()?;
    let text = String::from_utf8_lossy(&output.stdout);

    let line = text.lines().find(|l| l.contains(&format!("\"{pid}\"")))?;
    if line.trim().is_empty() {
        return Some(WindowState {
            titled: false,
            gone: true,
        });
    }

    let title = line
        .rsplit("\",\"")
        .next()
        .map(|t| t.trim_end_matches('"').trim())
        .unwrap_or("");
    Some(WindowState {
        titled: !title.is_empty() && title != "N/A",
        gone: false,
    })
}

/// Map the requested priority onto a Windows priority class. `wmic`
/// expects the class encoded as its numeric value: NORMAL_PRIORITY_CLASS,
/// HIGH_PRIORITY_CLASS and IDLE_PRIORITY_CLASS respectively.
pub fn set_process_priority(pid: u32, priority: ProcessPriority) {
    if !cfg!(target_os = "windows") {
        return;
    }

    let class = match priority {
        ProcessPriority::Normal => 32,
        ProcessPriority::High => 128,
        ProcessPriority::Low => 64,
    };

    let result = std::process::Command::new("wmic")
        .arg("process")
        .arg("where")
        .arg(format!("processid={pid}"))
        .arg("call")
        .arg("setpriority")
        .arg(class.to_string())
        .output();
    if let Err(err) = result {
        warn!("Cannot set priority class for PID {}: {}", pid, err);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, Ordering};

    use super::*;

    #[cfg(unix)]
    #[test]
    fn exit_watcher_reports_the_child_code() {
        let events = Arc::new(EventBus::new());
        let code = Arc::new(AtomicI32::new(i32::MIN));
        let sink = code.clone();
        events.subscribe(move |event| {
            if let LauncherEvent::GameExited { code } = event {
                sink.store(*code, Ordering::SeqCst);
            }
        });

        let child = std::process::Command::new("sh")
            .args(["-c", "exit 3"])
            .spawn()
            .unwrap();
        watch_process_exit(child, events);

        let deadline = Instant::now() + Duration::from_secs(5);
        while code.load(Ordering::SeqCst) == i32::MIN && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(code.load(Ordering::SeqCst), 3);
    }

    #[cfg(unix)]
    #[test]
    fn relay_prefixes_every_line() {
        let events = Arc::new(EventBus::new());
        let lines = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = lines.clone();
        events.subscribe(move |event| {
            if let LauncherEvent::LaunchLog { message } = event {
                sink.lock().unwrap().push(message.clone());
            }
        });

        let mut child = std::process::Command::new("sh")
            .args(["-c", "echo one; echo two"])
            .stdout(std::process::Stdio::piped())
            .spawn()
            .unwrap();
        relay_output(child.stdout.take().unwrap(), "[MC]", events);
        child.wait().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while lines.lock().unwrap().len() < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        let lines = lines.lock().unwrap();
        assert_eq!(lines.as_slice(), &["[MC] one", "[MC] two"]);
    }
}
