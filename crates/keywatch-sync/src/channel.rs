//! Live Channel Manager
//!
//! Owns the single push connection of a session. State machine:
//!
//! ```text
//! Connecting --handshake ok--> Open --error / server close--> Closed
//! Closed --reconnect delay elapsed or connect()--> Connecting
//! ```
//!
//! There is no terminal state; the manager retries until it is shut down.
//! While the channel is not open a separate ticker emits
//! [`ChannelNotice::FallbackTick`] so subscribers can pull summary stats.
//! The ticker is idle while the channel is open.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::StreamExt;
use keywatch_types::{ChannelState, PushEvent};
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::api::{PushConnector, PushStream};
use crate::config::SyncConfig;

/// Observable status of the push channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStatus {
    pub state: ChannelState,
    /// Consecutive failed or dropped connections since the channel was last open
    pub retry_count: u32,
    /// When the next reconnect attempt is due, while closed
    pub next_retry_at: Option<Instant>,
}

impl ChannelStatus {
    fn initial() -> Self {
        Self {
            state: ChannelState::Closed,
            retry_count: 0,
            next_retry_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }
}

/// What subscribers receive, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelNotice {
    /// A decoded push message
    Event(PushEvent),
    /// The channel changed state
    StateChanged(ChannelStatus),
    /// The channel is down and summary stats are due for a pull refresh
    FallbackTick,
}

struct Shared {
    status: watch::Sender<ChannelStatus>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChannelNotice>>>,
    wake: Notify,
}

impl Shared {
    fn subscribers(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<ChannelNotice>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn deliver(&self, notice: ChannelNotice) {
        let mut subscribers = self.subscribers();
        Self::fan_out(&mut subscribers, notice);
    }

    fn fan_out(subscribers: &mut Vec<mpsc::UnboundedSender<ChannelNotice>>, notice: ChannelNotice) {
        subscribers.retain(|tx| tx.send(notice.clone()).is_ok());
    }

    /// Publish a new status. Subscribers are told only about state changes;
    /// retry bookkeeping is visible through the watch.
    fn transition(&self, state: ChannelState, retry_count: u32, next_retry_at: Option<Instant>) {
        let mut subscribers = self.subscribers();
        let status = ChannelStatus {
            state,
            retry_count,
            next_retry_at,
        };
        let previous = self.status.send_replace(status.clone());
        if previous.state != state {
            debug!(from = %previous.state, to = %state, retry_count, "push channel state changed");
            Self::fan_out(&mut subscribers, ChannelNotice::StateChanged(status));
        }
    }

    /// Closed -> Connecting, atomically. Returns false in any other state.
    fn begin_connect(&self) -> bool {
        let mut subscribers = self.subscribers();
        let mut began = None;
        self.status.send_if_modified(|status| {
            if status.state != ChannelState::Closed {
                return false;
            }
            status.state = ChannelState::Connecting;
            status.next_retry_at = None;
            began = Some(status.clone());
            true
        });
        match began {
            Some(status) => {
                Self::fan_out(&mut subscribers, ChannelNotice::StateChanged(status));
                true
            }
            None => false,
        }
    }
}

/// Session-wide push channel
pub struct LiveChannel {
    connector: Arc<dyn PushConnector>,
    reconnect_delay: Duration,
    fallback_interval: Duration,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl LiveChannel {
    /// Create a channel manager. Nothing happens until [`LiveChannel::connect`].
    ///
    /// `cancel` scopes the background tasks; cancelling it is equivalent to
    /// [`LiveChannel::shutdown`].
    pub fn new(
        connector: Arc<dyn PushConnector>,
        config: &SyncConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (status, _) = watch::channel(ChannelStatus::initial());
        Self {
            connector,
            reconnect_delay: config.reconnect_delay(),
            fallback_interval: config.fallback_poll_interval(),
            shared: Arc::new(Shared {
                status,
                subscribers: Mutex::new(Vec::new()),
                wake: Notify::new(),
            }),
            cancel,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Register a subscriber. Notices are delivered in arrival order.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChannelNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.subscribers().push(tx);
        rx
    }

    /// Watch the channel status
    pub fn watch(&self) -> watch::Receiver<ChannelStatus> {
        self.shared.status.subscribe()
    }

    pub fn status(&self) -> ChannelStatus {
        self.shared.status.borrow().clone()
    }

    pub fn state(&self) -> ChannelState {
        self.shared.status.borrow().state
    }

    /// Start (or restart) the connection.
    ///
    /// No-op while connecting or open. While closed and waiting out the
    /// reconnect delay, the delay is skipped. Must be called from within a
    /// tokio runtime.
    pub fn connect(&self) {
        if self.cancel.is_cancelled() {
            warn!("connect() called on a shut down push channel");
            return;
        }
        if !self.shared.begin_connect() {
            trace!(state = %self.state(), "connect() ignored");
            return;
        }

        let mut tasks = self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tasks.retain(|task| !task.is_finished());
        if !tasks.is_empty() {
            self.shared.wake.notify_one();
            return;
        }

        info!("starting push channel");
        tasks.push(tokio::spawn(supervise(
            self.shared.clone(),
            self.connector.clone(),
            self.reconnect_delay,
            self.cancel.clone(),
        )));
        tasks.push(tokio::spawn(fallback_ticker(
            self.shared.clone(),
            self.shared.status.subscribe(),
            self.fallback_interval,
            self.cancel.clone(),
        )));
    }

    /// Cancel the reconnect loop and the fallback ticker.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            info!("shutting down push channel");
        }
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the background tasks to finish after [`LiveChannel::shutdown`].
    pub async fn join(&self) {
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "push channel task ended abnormally");
            }
        }
    }
}

impl Drop for LiveChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum PumpEnd {
    Cancelled,
    Dropped(String),
}

async fn supervise(
    shared: Arc<Shared>,
    connector: Arc<dyn PushConnector>,
    delay: Duration,
    cancel: CancellationToken,
) {
    let mut retry_count: u32 = 0;

    loop {
        shared.transition(ChannelState::Connecting, retry_count, None);

        let attempt = tokio::select! {
            _ = cancel.cancelled() => break,
            attempt = connector.connect() => attempt,
        };

        match attempt {
            Ok(stream) => {
                retry_count = 0;
                shared.transition(ChannelState::Open, retry_count, None);
                info!("push channel open");
                match pump(&shared, stream, &cancel).await {
                    PumpEnd::Cancelled => break,
                    PumpEnd::Dropped(reason) => {
                        info!(reason = %reason, "push channel dropped");
                    }
                }
            }
            Err(err) => {
                debug!(error = %err, retry_count, "push channel connect failed");
            }
        }

        retry_count = retry_count.saturating_add(1);
        let deadline = Instant::now() + delay;
        shared.transition(ChannelState::Closed, retry_count, Some(deadline));

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(deadline) => {}
            _ = shared.wake.notified() => {
                debug!("reconnect requested before delay elapsed");
            }
        }
    }

    shared.transition(ChannelState::Closed, retry_count, None);
    debug!("push channel supervisor stopped");
}

async fn pump(shared: &Shared, mut stream: PushStream, cancel: &CancellationToken) -> PumpEnd {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return PumpEnd::Cancelled,
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(text)) => match PushEvent::from_frame(&text) {
                Ok(Some(event)) => shared.deliver(ChannelNotice::Event(event)),
                Ok(None) => trace!("ignoring push frame of unknown type"),
                Err(err) => warn!(error = %err, "discarding malformed push frame"),
            },
            Some(Err(err)) => return PumpEnd::Dropped(err.to_string()),
            None => return PumpEnd::Dropped("closed by server".to_string()),
        }
    }
}

async fn fallback_ticker(
    shared: Arc<Shared>,
    mut status: watch::Receiver<ChannelStatus>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        let degraded = tokio::select! {
            _ = cancel.cancelled() => return,
            degraded = status.wait_for(|s| !s.is_open()) => degraded.is_ok(),
        };
        if !degraded {
            return;
        }

        debug!(interval_ms = interval.as_millis() as u64, "fallback polling active");
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    if status.borrow().is_open() {
                        break;
                    }
                    shared.deliver(ChannelNotice::FallbackTick);
                }
                changed = status.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if status.borrow().is_open() {
                        break;
                    }
                }
            }
        }
        debug!("fallback polling suspended");
    }
}
