use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt::Debug;

/// Source of the once-per-second tick that drives `elapsed_secs`.
///
/// The handle returned by [`TickScheduler::schedule`] keeps the periodic tick alive; dropping it
/// must cancel the tick. The engine stores the handle inside the live session, so a session that
/// ends or gets replaced cancels its tick exactly once.
pub trait TickScheduler {
    type Handle: Debug;

    fn schedule(&mut self) -> Self::Handle;
}

/// No timer at all, for hosts that never show elapsed time.
impl TickScheduler for () {
    type Handle = ();

    fn schedule(&mut self) -> Self::Handle {}
}

#[derive(Debug, Default)]
struct TimerCounters {
    started: Cell<u32>,
    cancelled: Cell<u32>,
}

/// Scheduler for hosts that call [`GridEngine::tick`](crate::GridEngine::tick) themselves.
///
/// It only keeps count of how many timers were started and cancelled.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    counters: Rc<TimerCounters>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> u32 {
        self.counters.started.get()
    }

    pub fn cancelled(&self) -> u32 {
        self.counters.cancelled.get()
    }

    pub fn running(&self) -> u32 {
        self.started() - self.cancelled()
    }
}

impl TickScheduler for ManualScheduler {
    type Handle = ManualTimer;

    fn schedule(&mut self) -> Self::Handle {
        let counters = &self.counters;
        counters.started.set(counters.started.get() + 1);
        ManualTimer {
            counters: Rc::clone(counters),
        }
    }
}

#[derive(Debug)]
pub struct ManualTimer {
    counters: Rc<TimerCounters>,
}

impl Drop for ManualTimer {
    fn drop(&mut self) {
        let cancelled = &self.counters.cancelled;
        cancelled.set(cancelled.get() + 1);
        log::trace!("Timer cancelled");
    }
}
