//! Cooperative Scheduling - Virtual clock, frame coalescing, debounce
//!
//! All deferred work in the pipeline flows through [`TaskTimer`]: one-shot
//! timers for debounces and a frame queue for "run before next paint"
//! callbacks. The host drives it (`advance` + `tick`), which keeps every
//! schedule fully deterministic under test.
//!
//! # Pattern
//!
//! - [`TaskTimer`] - schedule/cancel delayed callbacks, queue frame callbacks
//! - [`FrameCoalescer`] - collapse many render requests into one pending frame
//! - [`Debouncer`] - fire once after a quiet period, resetting on every trigger

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identifies a scheduled timer or frame callback for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle(usize);

type Callback = Rc<dyn Fn()>;

struct ScheduledTask {
    id: usize,
    due_ms: u64,
    callback: Callback,
}

// =============================================================================
// TaskTimer
// =============================================================================

/// Single-threaded task queue over a virtual millisecond clock.
///
/// Timers fire during [`TaskTimer::advance`] in due-time order (ties in
/// schedule order); frame callbacks fire during [`TaskTimer::tick`]. Neither
/// borrow is held while a callback runs, so callbacks may freely schedule
/// or cancel more work.
pub struct TaskTimer {
    now_ms: Cell<u64>,
    next_id: Cell<usize>,
    timers: RefCell<Vec<ScheduledTask>>,
    frames: RefCell<Vec<(usize, Callback)>>,
}

impl TaskTimer {
    pub fn new() -> Self {
        Self {
            now_ms: Cell::new(0),
            next_id: Cell::new(0),
            timers: RefCell::new(Vec::new()),
            frames: RefCell::new(Vec::new()),
        }
    }

    /// Current virtual time.
    #[inline]
    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    /// Schedules a one-shot callback `delay_ms` from now.
    pub fn schedule(&self, delay_ms: u64, callback: impl Fn() + 'static) -> TaskHandle {
        let id = self.take_id();
        self.timers.borrow_mut().push(ScheduledTask {
            id,
            due_ms: self.now_ms.get() + delay_ms,
            callback: Rc::new(callback),
        });
        TaskHandle(id)
    }

    /// Cancels a scheduled timer. Unknown or already-fired handles are
    /// ignored.
    pub fn cancel(&self, handle: TaskHandle) {
        self.timers.borrow_mut().retain(|task| task.id != handle.0);
    }

    /// Queues a callback for the next [`TaskTimer::tick`].
    pub fn request_frame(&self, callback: impl Fn() + 'static) -> TaskHandle {
        let id = self.take_id();
        self.frames.borrow_mut().push((id, Rc::new(callback)));
        TaskHandle(id)
    }

    /// Cancels a queued frame callback.
    pub fn cancel_frame(&self, handle: TaskHandle) {
        self.frames.borrow_mut().retain(|(id, _)| *id != handle.0);
    }

    /// Moves the clock forward by `ms`, firing every timer that comes due
    /// along the way. A callback that schedules new work inside the window
    /// sees it fire in the same call; the clock reads the task's due time
    /// while it runs.
    pub fn advance(&self, ms: u64) {
        let target = self.now_ms.get() + ms;
        loop {
            let next = {
                let timers = self.timers.borrow();
                timers
                    .iter()
                    .filter(|task| task.due_ms <= target)
                    .min_by_key(|task| (task.due_ms, task.id))
                    .map(|task| (task.id, task.due_ms, task.callback.clone()))
            };
            let Some((id, due_ms, callback)) = next else {
                break;
            };
            self.timers.borrow_mut().retain(|task| task.id != id);
            self.now_ms.set(due_ms);
            callback();
        }
        self.now_ms.set(target);
    }

    /// Runs every currently queued frame callback once. Frames requested
    /// while ticking land in the next tick.
    pub fn tick(&self) {
        let pending = std::mem::take(&mut *self.frames.borrow_mut());
        for (_, callback) in pending {
            callback();
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    pub fn pending_frames(&self) -> usize {
        self.frames.borrow().len()
    }

    fn take_id(&self) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

impl Default for TaskTimer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// FrameCoalescer
// =============================================================================

/// Collapses render requests into at most one pending frame.
///
/// A request while a frame is already pending is a no-op. The pending flag
/// clears before the callback runs, so the callback (or anything it
/// triggers) can request the next frame.
pub struct FrameCoalescer {
    timer: Rc<TaskTimer>,
    pending: Rc<Cell<Option<TaskHandle>>>,
}

impl FrameCoalescer {
    pub fn new(timer: Rc<TaskTimer>) -> Self {
        Self {
            timer,
            pending: Rc::new(Cell::new(None)),
        }
    }

    pub fn request(&self, callback: impl Fn() + 'static) {
        if self.pending.get().is_some() {
            return;
        }
        let pending = self.pending.clone();
        let handle = self.timer.request_frame(move || {
            pending.set(None);
            callback();
        });
        self.pending.set(Some(handle));
    }

    /// Drops the pending frame, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.take() {
            self.timer.cancel_frame(handle);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }
}

// =============================================================================
// Debouncer
// =============================================================================

/// Delays an action until `delay_ms` of quiet has passed since the last
/// trigger. Retriggering restarts the clock and replaces the callback, so
/// only the latest one fires.
pub struct Debouncer {
    timer: Rc<TaskTimer>,
    delay_ms: u64,
    pending: Rc<Cell<Option<TaskHandle>>>,
}

impl Debouncer {
    pub fn new(timer: Rc<TaskTimer>, delay_ms: u64) -> Self {
        Self {
            timer,
            delay_ms,
            pending: Rc::new(Cell::new(None)),
        }
    }

    pub fn trigger(&self, callback: impl Fn() + 'static) {
        if let Some(handle) = self.pending.take() {
            self.timer.cancel(handle);
        }
        let pending = self.pending.clone();
        let handle = self.timer.schedule(self.delay_ms, move || {
            pending.set(None);
            callback();
        });
        self.pending.set(Some(handle));
    }

    /// Drops the pending action, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.take() {
            self.timer.cancel(handle);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<usize>>, impl Fn() + Clone + 'static) {
        let count = Rc::new(Cell::new(0));
        let seen = count.clone();
        (count, move || seen.set(seen.get() + 1))
    }

    #[test]
    fn test_schedule_fires_once_when_due() {
        let timer = TaskTimer::new();
        let (count, bump) = counter();
        timer.schedule(100, bump);

        timer.advance(99);
        assert_eq!(count.get(), 0);
        timer.advance(1);
        assert_eq!(count.get(), 1);
        timer.advance(500);
        assert_eq!(count.get(), 1);
        assert_eq!(timer.pending_timers(), 0);
    }

    #[test]
    fn test_clock_follows_advance() {
        let timer = TaskTimer::new();
        assert_eq!(timer.now_ms(), 0);
        timer.advance(250);
        timer.advance(16);
        assert_eq!(timer.now_ms(), 266);
    }

    #[test]
    fn test_cancel_prevents_fire() {
        let timer = TaskTimer::new();
        let (count, bump) = counter();
        let handle = timer.schedule(50, bump);
        timer.cancel(handle);
        timer.advance(100);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_equal_due_times_fire_in_schedule_order() {
        let timer = TaskTimer::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for label in ["a", "b", "c"] {
            let seen = log.clone();
            timer.schedule(50, move || seen.borrow_mut().push(label));
        }
        timer.advance(50);
        assert_eq!(log.borrow().as_slice(), &["a", "b", "c"]);
    }

    #[test]
    fn test_nested_schedule_fires_in_same_window() {
        let timer = Rc::new(TaskTimer::new());
        let fired_at = Rc::new(RefCell::new(Vec::new()));

        let inner_timer = timer.clone();
        let seen = fired_at.clone();
        timer.schedule(10, move || {
            seen.borrow_mut().push(inner_timer.now_ms());
            let seen = seen.clone();
            let timer = inner_timer.clone();
            inner_timer.schedule(10, move || seen.borrow_mut().push(timer.now_ms()));
        });

        timer.advance(30);
        assert_eq!(fired_at.borrow().as_slice(), &[10, 20]);
        assert_eq!(timer.now_ms(), 30);
    }

    #[test]
    fn test_frames_drain_on_tick() {
        let timer = TaskTimer::new();
        let (count, bump) = counter();
        let (count_b, bump_b) = counter();
        timer.request_frame(bump);
        timer.request_frame(bump_b);

        timer.tick();
        assert_eq!((count.get(), count_b.get()), (1, 1));
        timer.tick();
        assert_eq!((count.get(), count_b.get()), (1, 1));
    }

    #[test]
    fn test_frame_requested_while_ticking_defers() {
        let timer = Rc::new(TaskTimer::new());
        let (count, bump) = counter();
        let inner_timer = timer.clone();
        timer.request_frame(move || {
            let bump = bump.clone();
            inner_timer.request_frame(move || bump());
        });

        timer.tick();
        assert_eq!(count.get(), 0);
        assert_eq!(timer.pending_frames(), 1);
        timer.tick();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_cancel_frame() {
        let timer = TaskTimer::new();
        let (count, bump) = counter();
        let handle = timer.request_frame(bump);
        timer.cancel_frame(handle);
        timer.tick();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_coalescer_collapses_requests() {
        let timer = Rc::new(TaskTimer::new());
        let coalescer = FrameCoalescer::new(timer.clone());
        let (count, bump) = counter();
        let bump = Rc::new(bump);

        for _ in 0..3 {
            let bump = bump.clone();
            coalescer.request(move || bump());
        }
        assert_eq!(timer.pending_frames(), 1);
        assert!(coalescer.is_pending());

        timer.tick();
        assert_eq!(count.get(), 1);
        assert!(!coalescer.is_pending());
    }

    #[test]
    fn test_coalescer_clears_flag_before_callback() {
        let timer = Rc::new(TaskTimer::new());
        let coalescer = Rc::new(FrameCoalescer::new(timer.clone()));
        let (count, bump) = counter();
        let bump = Rc::new(bump);

        let inner = coalescer.clone();
        let inner_bump = bump.clone();
        coalescer.request(move || {
            inner_bump();
            // Requesting from inside the frame must schedule the next one.
            let bump = inner_bump.clone();
            inner.request(move || bump());
        });

        timer.tick();
        assert_eq!(count.get(), 1);
        assert_eq!(timer.pending_frames(), 1);
        timer.tick();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_coalescer_cancel() {
        let timer = Rc::new(TaskTimer::new());
        let coalescer = FrameCoalescer::new(timer.clone());
        let (count, bump) = counter();
        coalescer.request(bump);
        coalescer.cancel();

        timer.tick();
        assert_eq!(count.get(), 0);
        assert!(!coalescer.is_pending());
    }

    #[test]
    fn test_debouncer_resets_on_retrigger() {
        let timer = Rc::new(TaskTimer::new());
        let debouncer = Debouncer::new(timer.clone(), 300);
        let (count, bump) = counter();
        let bump = Rc::new(bump);

        let first = bump.clone();
        debouncer.trigger(move || first());
        timer.advance(200);
        assert_eq!(count.get(), 0);

        let second = bump.clone();
        debouncer.trigger(move || second());
        timer.advance(200);
        assert_eq!(count.get(), 0);
        timer.advance(100);
        assert_eq!(count.get(), 1);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_debouncer_latest_callback_wins() {
        let timer = Rc::new(TaskTimer::new());
        let debouncer = Debouncer::new(timer.clone(), 100);
        let log = Rc::new(RefCell::new(Vec::new()));

        for label in ["stale", "fresh"] {
            let seen = log.clone();
            debouncer.trigger(move || seen.borrow_mut().push(label));
        }
        timer.advance(100);
        assert_eq!(log.borrow().as_slice(), &["fresh"]);
    }

    #[test]
    fn test_debouncer_cancel() {
        let timer = Rc::new(TaskTimer::new());
        let debouncer = Debouncer::new(timer.clone(), 100);
        let (count, bump) = counter();
        debouncer.trigger(bump);
        debouncer.cancel();
        timer.advance(200);
        assert_eq!(count.get(), 0);
    }
}
