//! Application-level keep-alive: a single whitespace byte on a fixed interval.
//!
//! The timer is a scoped resource. It is armed when a transport becomes
//! ready, cancelled on every exit path, and cancelled on drop.
//!
//! Elapsed time is measured on the wall clock. The tokio clock is monotonic
//! and stops while the host is suspended, so it only drives a short poll;
//! each poll compares wall time against the last send.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use mudlink_core::codec::KEEPALIVE_BYTE;

use crate::transport::Writer;

/// Upper bound on how long a resumed host waits before a due keep-alive.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Source of wall-clock time. Counts time spent suspended.
pub trait WallClock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A recurring keep-alive task bound to one transport's write path.
#[derive(Debug)]
pub struct KeepAliveTimer {
    handle: Option<JoinHandle<()>>,
}

impl KeepAliveTimer {
    /// Start sending `KEEPALIVE_BYTE` every `interval`, first one after a full interval.
    pub fn arm(interval: Duration, writer: Writer) -> Self {
        Self::arm_with_clock(interval, writer, Arc::new(SystemClock))
    }

    pub fn arm_with_clock(interval: Duration, writer: Writer, clock: Arc<dyn WallClock>) -> Self {
        let poll = interval.min(POLL_INTERVAL);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + poll, poll);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut last_sent = clock.now();

            loop {
                ticker.tick().await;
                let now = clock.now();
                let elapsed = match (now - last_sent).to_std() {
                    Ok(elapsed) => elapsed,
                    Err(_) => {
                        // Wall clock stepped backwards; restart the interval.
                        last_sent = now;
                        continue;
                    }
                };
                if elapsed < interval {
                    continue;
                }

                if writer.send(vec![KEEPALIVE_BYTE]).is_err() {
                    break;
                }
                last_sent = now;
                tracing::trace!(elapsed_ms = elapsed.as_millis() as u64, "keep-alive sent");
            }

            tracing::debug!("keep-alive loop ended");
        });

        Self {
            handle: Some(handle),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(h) = self.handle.take() {
            h.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for KeepAliveTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
