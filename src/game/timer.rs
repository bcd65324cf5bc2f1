//! Cancellable timers driven by the simulation clock
//!
//! Every cooldown, buff, respawn delay and match clock is an entry in a
//! [`Scheduler`]. The host advances the clock; the controller drains due
//! entries one at a time, so a handler may cancel a timer that is due in the
//! same tick and it will not fire.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Handle to a scheduled timer. Owners keep it in an `Option` and take it
/// when cancelling so a stale handle never outlives its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Entry<E> {
    due: u64,
    interval: Option<u64>,
    event: E,
}

/// Fire-once and periodic timers keyed by simulated milliseconds
#[derive(Debug)]
pub struct Scheduler<E> {
    next_id: u64,
    entries: HashMap<u64, Entry<E>>,
    queue: BinaryHeap<Reverse<(u64, u64)>>,
}

impl<E: Clone> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: HashMap::new(),
            queue: BinaryHeap::new(),
        }
    }

    fn insert(&mut self, due: u64, interval: Option<u64>, event: E) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            Entry {
                due,
                interval,
                event,
            },
        );
        self.queue.push(Reverse((due, id)));
        TimerHandle(id)
    }

    /// Fire `event` once, `delay_ms` after `now`
    pub fn schedule_once(&mut self, now: u64, delay_ms: u64, event: E) -> TimerHandle {
        self.insert(now + delay_ms, None, event)
    }

    /// Fire `event` every `interval_ms`, first at `now + interval_ms`
    pub fn schedule_repeating(&mut self, now: u64, interval_ms: u64, event: E) -> TimerHandle {
        let interval = interval_ms.max(1);
        self.insert(now + interval, Some(interval), event)
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.entries.remove(&handle.0).is_some()
    }

    /// Cancel and clear a stored handle
    pub fn cancel_slot(&mut self, slot: &mut Option<TimerHandle>) {
        if let Some(handle) = slot.take() {
            self.cancel(handle);
        }
    }

    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.entries.contains_key(&handle.0)
    }

    /// Milliseconds until the timer next fires
    pub fn remaining(&self, handle: TimerHandle, now: u64) -> Option<u64> {
        self.entries
            .get(&handle.0)
            .map(|entry| entry.due.saturating_sub(now))
    }

    /// Number of live timers whose event satisfies `pred`
    pub fn count_live(&self, pred: impl Fn(&E) -> bool) -> usize {
        self.entries.values().filter(|entry| pred(&entry.event)).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pop the next timer due at or before `now`
    pub fn pop_due(&mut self, now: u64) -> Option<(TimerHandle, E)> {
        while let Some(Reverse((due, id))) = self.queue.peek().copied() {
            if due > now {
                return None;
            }
            self.queue.pop();

            let Some(entry) = self.entries.get_mut(&id) else {
                // Cancelled
                continue;
            };
            if entry.due != due {
                continue;
            }

            if let Some(interval) = entry.interval {
                entry.due = due + interval;
                let event = entry.event.clone();
                self.queue.push(Reverse((due + interval, id)));
                return Some((TimerHandle(id), event));
            }
            let entry = self.entries.remove(&id)?;
            return Some((TimerHandle(id), entry.event));
        }
        None
    }
}

impl<E: Clone> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one countdown step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    Running(u32),
    Expired,
}

/// Second-granular countdown with a single owned periodic handle
#[derive(Debug)]
pub struct TimerController {
    duration_secs: u32,
    remaining_secs: u32,
    handle: Option<TimerHandle>,
}

impl TimerController {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            handle: None,
        }
    }

    /// Restart from the full duration; `event` fires once per second
    pub fn start<E: Clone>(&mut self, scheduler: &mut Scheduler<E>, now: u64, event: E) {
        self.stop(scheduler);
        self.remaining_secs = self.duration_secs;
        self.handle = Some(scheduler.schedule_repeating(now, 1_000, event));
    }

    pub fn stop<E: Clone>(&mut self, scheduler: &mut Scheduler<E>) {
        scheduler.cancel_slot(&mut self.handle);
    }

    /// Advance by one second. Stops itself on expiry.
    pub fn tick<E: Clone>(&mut self, scheduler: &mut Scheduler<E>) -> CountdownTick {
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.stop(scheduler);
            CountdownTick::Expired
        } else {
            CountdownTick::Running(self.remaining_secs)
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining_secs
    }

    pub fn duration(&self) -> u32 {
        self.duration_secs
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// True if `handle` is this controller's live periodic timer
    pub fn owns(&self, handle: TimerHandle) -> bool {
        self.handle == Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Ev {
        A,
        B,
    }

    #[test]
    fn once_fires_at_due_time_only() {
        let mut s = Scheduler::new();
        s.schedule_once(0, 100, Ev::A);
        assert!(s.pop_due(99).is_none());
        assert_eq!(s.pop_due(100).map(|(_, e)| e), Some(Ev::A));
        assert!(s.pop_due(1_000).is_none());
        assert!(s.is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut s = Scheduler::new();
        let h = s.schedule_once(0, 50, Ev::A);
        s.schedule_once(0, 60, Ev::B);
        assert!(s.cancel(h));
        assert!(!s.cancel(h));
        assert_eq!(s.pop_due(100).map(|(_, e)| e), Some(Ev::B));
        assert!(s.pop_due(100).is_none());
    }

    #[test]
    fn cancel_slot_clears_handle() {
        let mut s = Scheduler::new();
        let mut slot = Some(s.schedule_once(0, 50, Ev::A));
        s.cancel_slot(&mut slot);
        assert!(slot.is_none());
        assert!(s.is_empty());
    }

    #[test]
    fn repeating_fires_each_interval() {
        let mut s = Scheduler::new();
        let h = s.schedule_repeating(0, 250, Ev::A);
        let mut fired = 0;
        while s.pop_due(1_000).is_some() {
            fired += 1;
        }
        assert_eq!(fired, 4);
        assert_eq!(s.remaining(h, 1_000), Some(250));
    }

    #[test]
    fn due_timers_pop_in_time_order() {
        let mut s = Scheduler::new();
        s.schedule_once(0, 300, Ev::B);
        s.schedule_once(0, 100, Ev::A);
        assert_eq!(s.pop_due(500).map(|(_, e)| e), Some(Ev::A));
        assert_eq!(s.pop_due(500).map(|(_, e)| e), Some(Ev::B));
    }

    #[test]
    fn countdown_expires_after_duration_and_releases_handle() {
        let mut s = Scheduler::new();
        let mut timer = TimerController::new(3);
        timer.start(&mut s, 0, Ev::A);
        assert!(timer.is_running());
        assert_eq!(timer.tick(&mut s), CountdownTick::Running(2));
        assert_eq!(timer.tick(&mut s), CountdownTick::Running(1));
        assert_eq!(timer.tick(&mut s), CountdownTick::Expired);
        assert!(!timer.is_running());
        assert!(s.is_empty());
    }

    #[test]
    fn restarting_countdown_replaces_previous_handle() {
        let mut s = Scheduler::new();
        let mut timer = TimerController::new(5);
        timer.start(&mut s, 0, Ev::A);
        timer.tick(&mut s);
        timer.start(&mut s, 1_000, Ev::A);
        assert_eq!(timer.remaining(), 5);
        assert_eq!(s.len(), 1);
    }
}
