//! Per-lobby game clock.
//!
//! A lobby that is PLAYING owns exactly one `TickHandle`. The task behind it
//! only posts `Tick` events to the dispatcher; the simulation itself runs on
//! the dispatcher so it stays serialized with every other lobby mutation.

use crate::network::ServerEvent;
use log::debug;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Starts the periodic clock of a lobby.
pub trait TickScheduler: Send {
    fn start(&self, lobby_code: &str) -> TickHandle;
}

/// Ownership of a running tick loop. Dropping the handle stops the loop.
#[derive(Debug)]
pub struct TickHandle {
    task: Option<JoinHandle<()>>,
}

impl TickHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// A handle with no task behind it, for schedulers that drive ticks by hand.
    pub fn detached() -> Self {
        Self { task: None }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Scheduler backed by a tokio interval per lobby.
///
/// Missed ticks are skipped rather than bursted; the simulation applies a
/// fixed step per tick, so game speed follows the tick rate actually achieved.
pub struct IntervalScheduler {
    period: Duration,
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl IntervalScheduler {
    pub fn new(period: Duration, events: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self { period, events }
    }
}

impl TickScheduler for IntervalScheduler {
    fn start(&self, lobby_code: &str) -> TickHandle {
        let lobby_code = lobby_code.to_string();
        let events = self.events.clone();
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // Skip the first tick since it fires immediately
            timer.tick().await;

            loop {
                timer.tick().await;
                let event = ServerEvent::Tick {
                    lobby_code: lobby_code.clone(),
                };
                if events.send(event).is_err() {
                    debug!("Dispatcher gone, stopping tick loop of {}", lobby_code);
                    break;
                }
            }
        });

        TickHandle::new(task)
    }
}
