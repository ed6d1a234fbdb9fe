//! Deterministic queue of externally injected events.
//!
//! Uses a `BinaryHeap` with reversed `Ord` on the queue entries to act as a
//! min-heap keyed by `(time, seq)`. Because sequence numbers are strictly
//! increasing, events injected for the same instant are released in
//! injection order, so two runs fed the same injections behave alike.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::event::Event;
use crate::time::SimTime;

#[derive(Debug, Clone)]
struct Queued {
    seq: u64,
    event: Event,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Queued {}

impl Ord for Queued {
    /// Reversed so that `BinaryHeap` pops the earliest `(time, seq)` first.
    fn cmp(&self, other: &Self) -> Ordering {
        (other.event.time, other.seq).cmp(&(self.event.time, self.seq))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Queue of events waiting to be delivered to the root engine.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Queued>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `event` for delivery at `event.time`. Returns its sequence
    /// number.
    pub fn schedule(&mut self, event: Event) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Queued { seq, event });
        seq
    }

    /// Time of the earliest queued event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.peek().map(|q| q.event.time)
    }

    /// Pop the earliest event if it is due at or before `now`.
    pub fn pop_due(&mut self, now: SimTime) -> Option<Event> {
        if self.peek_time()? > now {
            return None;
        }
        self.queue.pop().map(|q| q.event)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn ev(t: u64, tag: i64) -> Event {
        Event::with_content(SimTime::new(t), "cmd", Value::Integer(tag))
    }

    /// Pop everything through the public API, in delivery order.
    fn drain(sched: &mut Scheduler) -> Vec<Event> {
        let mut events = Vec::with_capacity(sched.len());
        while let Some(time) = sched.peek_time() {
            events.extend(sched.pop_due(time));
        }
        events
    }

    fn tags(events: &[Event]) -> Vec<i64> {
        events
            .iter()
            .filter_map(|e| e.content.as_ref().and_then(Value::as_integer))
            .collect()
    }

    #[test]
    fn test_fifo_at_same_time() {
        let mut sched = Scheduler::new();
        sched.schedule(ev(10, 1));
        sched.schedule(ev(10, 2));
        sched.schedule(ev(10, 3));
        assert_eq!(tags(&drain(&mut sched)), vec![1, 2, 3]);
    }

    #[test]
    fn test_time_ordering() {
        let mut sched = Scheduler::new();
        sched.schedule(ev(30, 3));
        sched.schedule(ev(10, 1));
        sched.schedule(ev(20, 2));
        sched.schedule(ev(10, 4));
        assert_eq!(tags(&drain(&mut sched)), vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_pop_due() {
        let mut sched = Scheduler::new();
        sched.schedule(ev(5, 1));
        sched.schedule(ev(7, 2));
        assert_eq!(sched.peek_time(), Some(SimTime::new(5)));
        assert!(sched.pop_due(SimTime::new(4)).is_none());
        assert!(sched.pop_due(SimTime::new(5)).is_some());
        assert!(sched.pop_due(SimTime::new(5)).is_none());
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn test_empty_scheduler() {
        let mut sched = Scheduler::new();
        assert!(sched.is_empty());
        assert_eq!(sched.peek_time(), None);
        assert!(sched.pop_due(SimTime::new(100)).is_none());
    }
}
