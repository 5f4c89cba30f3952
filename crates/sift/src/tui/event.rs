//! Terminal event handling.

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Terminal events.
#[derive(Debug, Clone)]
pub enum Event {
    /// Periodic redraw so new records show up without input
    Tick,
    /// Key press
    Key(KeyEvent),
    /// Terminal resize; the next draw picks up the new size
    Resize,
}

/// Polls crossterm on a blocking thread and ticks on a timer.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    stop: CancellationToken,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let stop = CancellationToken::new();
        let task_stop = stop.clone();

        tokio::spawn(async move {
            let mut tick_interval = tokio::time::interval(tick_rate);

            loop {
                let event = tokio::select! {
                    _ = task_stop.cancelled() => break,
                    _ = tick_interval.tick() => Event::Tick,
                    maybe_event = poll_event() => {
                        match maybe_event {
                            Some(e) => e,
                            None => continue,
                        }
                    }
                };

                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        Self { rx, stop }
    }

    /// Next event; `None` once the poller has stopped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Poll for a crossterm event without blocking the runtime.
async fn poll_event() -> Option<Event> {
    let result = tokio::task::spawn_blocking(|| {
        if event::poll(Duration::from_millis(10)).ok()? {
            event::read().ok()
        } else {
            None
        }
    })
    .await
    .ok()?;

    match result? {
        // Release/repeat events only show up on some platforms
        CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
        CrosstermEvent::Resize(..) => Some(Event::Resize),
        _ => None,
    }
}
