//! Periodic ticks delivered over a single-slot channel.
//!
//! A background thread watches the context's monotonic clock and sends the
//! current time once per period. The channel holds one tick; ticks that
//! find it full are dropped, and periods missed by a stalled thread are
//! skipped rather than replayed.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};
use vo_time_core::Duration;

use crate::clock::TimeContext;
use crate::error::TimeError;
use crate::time::Time;

struct Schedule {
    period: Duration,
    /// Monotonic reading at which the next tick is due.
    next: i64,
    /// No ticks until the next reset.
    stopped: bool,
    /// The owning `Ticker` is gone; the thread exits.
    closed: bool,
}

struct Shared {
    ctx: TimeContext,
    schedule: Mutex<Schedule>,
    wake: Condvar,
}

/// Delivers the time every `period` on [`Ticker::receiver`].
pub struct Ticker {
    shared: Arc<Shared>,
    rx: Receiver<Time>,
}

impl Ticker {
    /// Starts a ticker on the global context. Fails for non-positive `d`.
    pub fn new(d: Duration) -> Result<Ticker, TimeError> {
        Ticker::with_context(d, TimeContext::global().clone())
    }

    /// Starts a ticker whose schedule and tick values come from `ctx`.
    pub fn with_context(d: Duration, ctx: TimeContext) -> Result<Ticker, TimeError> {
        let (shared, rx) = spawn(d, ctx)?;
        Ok(Ticker { shared, rx })
    }

    pub fn receiver(&self) -> &Receiver<Time> {
        &self.rx
    }

    /// Turns off the ticker. A tick already in the channel stays there.
    pub fn stop(&self) {
        let mut schedule = self.shared.schedule.lock();
        if !schedule.stopped {
            schedule.stopped = true;
            debug!("ticker stopped");
        }
        self.shared.wake.notify_one();
    }

    /// Restarts the ticker with period `d`, counting from now. Also
    /// restarts a stopped ticker.
    pub fn reset(&self, d: Duration) -> Result<(), TimeError> {
        if d <= Duration::ZERO {
            return Err(TimeError::NonPositiveInterval(d));
        }
        let mut schedule = self.shared.schedule.lock();
        schedule.period = d;
        schedule.next = self.shared.ctx.monotonic().saturating_add(d.nanoseconds());
        schedule.stopped = false;
        debug!(period = %d, "ticker reset");
        self.shared.wake.notify_one();
        Ok(())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shared.schedule.lock().closed = true;
        self.shared.wake.notify_one();
    }
}

/// A tick channel with no way to stop it; the timer thread exits once the
/// receiver is dropped. `None` for non-positive `d`.
pub fn tick(d: Duration) -> Option<Receiver<Time>> {
    let (_, rx) = spawn(d, TimeContext::global().clone()).ok()?;
    Some(rx)
}

fn spawn(d: Duration, ctx: TimeContext) -> Result<(Arc<Shared>, Receiver<Time>), TimeError> {
    if d <= Duration::ZERO {
        return Err(TimeError::NonPositiveInterval(d));
    }
    let (tx, rx) = sync_channel(1);
    let next = ctx.monotonic().saturating_add(d.nanoseconds());
    let shared = Arc::new(Shared {
        ctx,
        schedule: Mutex::new(Schedule {
            period: d,
            next,
            stopped: false,
            closed: false,
        }),
        wake: Condvar::new(),
    });

    let worker = shared.clone();
    thread::Builder::new()
        .name("vo-time-ticker".into())
        .spawn(move || run(&worker, &tx))
        .map_err(TimeError::TimerUnavailable)?;
    debug!(period = %d, "ticker started");
    Ok((shared, rx))
}

fn run(shared: &Shared, tx: &SyncSender<Time>) {
    let ctx = &shared.ctx;
    let mut schedule = shared.schedule.lock();

    loop {
        if schedule.closed {
            break;
        }
        if schedule.stopped {
            shared.wake.wait(&mut schedule);
            continue;
        }

        let now = ctx.monotonic();
        let next = schedule.next;
        if now < next {
            let wait = std::time::Duration::from_nanos((next - now) as u64);
            shared.wake.wait_for(&mut schedule, wait);
            continue;
        }

        match tx.try_send(ctx.now()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("tick dropped, receiver is behind"),
            Err(TrySendError::Disconnected(_)) => {
                debug!("tick receiver dropped");
                break;
            }
        }

        let period = schedule.period.nanoseconds();
        let missed = (now - next) / period;
        if missed > 0 {
            trace!(missed, "ticker skipped periods");
        }
        schedule.next = next.saturating_add(period.saturating_mul(missed + 1));
    }
    debug!("ticker thread exiting");
}
