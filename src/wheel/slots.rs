//! # Slot structure of the time wheel.
//!
//! [`Wheel`] is the pure data structure: a ring of slots, a cursor and an
//! id → slots index. It has no clock of its own; every [`Wheel::advance`] call
//! is one tick. The [`TimeWheel`](crate::TimeWheel) control loop owns one and
//! is the only code that mutates it.
//!
//! ## Placement
//! ```text
//! steps  = ceil(delay / tick), at least 1
//! pos    = (cursor + steps) mod slots
//! circle = (steps - 1) / slots
//! ```
//! An entry fires on the tick that lands on `pos` with `circle == 0`, which is
//! exactly `steps` ticks after it was added.
//!
//! ## Removal
//! Several timers may share an id. Removal tombstones all of them; the next
//! scan of their slot drops them.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::tasks::TaskRef;

/// A task scheduled for delayed delivery.
#[derive(Clone)]
pub struct DelayTask {
    id: String,
    delay: Duration,
    task: TaskRef,
}

impl DelayTask {
    /// Schedules `task` after `delay`; the timer id is the task name.
    pub fn new(task: TaskRef, delay: Duration) -> Self {
        Self {
            id: task.name().to_string(),
            delay,
            task,
        }
    }

    /// Overrides the timer id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Timer id used for removal.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Requested delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The scheduled task.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }
}

impl fmt::Debug for DelayTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayTask")
            .field("id", &self.id)
            .field("delay", &self.delay)
            .field("task", &self.task.name())
            .finish()
    }
}

struct TimerEntry {
    task: DelayTask,
    circle: usize,
    removed: bool,
}

/// Ring of timer slots advanced one tick at a time.
pub struct Wheel {
    tick: Duration,
    slots: Vec<Vec<TimerEntry>>,
    index: HashMap<String, Vec<usize>>,
    cursor: usize,
}

impl Wheel {
    /// Creates a wheel; `slots` is clamped to at least 1 and `tick` to at least 1ms.
    pub fn new(tick: Duration, slots: usize) -> Self {
        let slots = slots.max(1);
        Self {
            tick: tick.max(Duration::from_millis(1)),
            slots: (0..slots).map(|_| Vec::new()).collect(),
            index: HashMap::new(),
            // the first advance lands on slot 0
            cursor: slots - 1,
        }
    }

    /// Tick interval.
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot the last tick landed on.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of pending (not tombstoned) timers.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|entry| !entry.removed)
            .count()
    }

    /// Returns `true` if no timer is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ticks until a timer with `delay` fires.
    pub fn steps(&self, delay: Duration) -> usize {
        let ticks = delay.as_nanos().div_ceil(self.tick.as_nanos()).max(1);
        usize::try_from(ticks).unwrap_or(usize::MAX)
    }

    /// Adds a timer; returns its slot.
    pub fn add(&mut self, task: DelayTask) -> usize {
        let count = self.slots.len();
        let steps = self.steps(task.delay);
        let pos = (self.cursor + steps % count) % count;
        let circle = (steps - 1) / count;

        self.index.entry(task.id.clone()).or_default().push(pos);
        self.slots[pos].push(TimerEntry {
            task,
            circle,
            removed: false,
        });
        pos
    }

    /// Tombstones every pending timer with `id`.
    ///
    /// Returns `false` for an empty or unknown id (already fired, never added).
    pub fn remove(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        let Some(positions) = self.index.remove(id) else {
            return false;
        };
        for pos in positions {
            for entry in self.slots[pos].iter_mut().filter(|e| e.task.id == id) {
                entry.removed = true;
            }
        }
        true
    }

    /// Moves the cursor one slot and returns the timers that are due.
    pub fn advance(&mut self) -> Vec<DelayTask> {
        self.cursor = (self.cursor + 1) % self.slots.len();
        let pos = self.cursor;

        let mut fired = Vec::new();
        for mut entry in std::mem::take(&mut self.slots[pos]) {
            if entry.removed {
                continue;
            }
            if entry.circle > 0 {
                entry.circle -= 1;
                self.slots[pos].push(entry);
                continue;
            }
            self.forget(&entry.task.id, pos);
            fired.push(entry.task);
        }
        fired
    }

    /// Drops one `pos` reference of `id` from the index.
    fn forget(&mut self, id: &str, pos: usize) {
        let Some(positions) = self.index.get_mut(id) else {
            return;
        };
        if let Some(i) = positions.iter().position(|p| *p == pos) {
            positions.swap_remove(i);
        }
        if positions.is_empty() {
            self.index.remove(id);
        }
    }
}

impl fmt::Debug for Wheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wheel")
            .field("tick", &self.tick)
            .field("slots", &self.slots.len())
            .field("cursor", &self.cursor)
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::tasks::TaskFn;
    use tokio_util::sync::CancellationToken;

    fn task(name: &'static str) -> TaskRef {
        TaskFn::arc(
            name,
            |_ctx: CancellationToken| async { Ok::<_, TaskError>(()) },
            |_ctx: CancellationToken| async { Ok::<_, TaskError>(()) },
        )
    }

    /// Returns the tick (1-based) on which `id` fires, up to `limit` ticks.
    fn fires_at(wheel: &mut Wheel, id: &str, limit: usize) -> Option<usize> {
        (1..=limit).find(|_| wheel.advance().iter().any(|t| t.id() == id))
    }

    #[test]
    fn test_steps_round_up() {
        let wheel = Wheel::new(Duration::from_secs(1), 8);
        assert_eq!(wheel.steps(Duration::ZERO), 1);
        assert_eq!(wheel.steps(Duration::from_millis(1)), 1);
        assert_eq!(wheel.steps(Duration::from_secs(1)), 1);
        assert_eq!(wheel.steps(Duration::from_millis(1001)), 2);
        assert_eq!(wheel.steps(Duration::from_secs(17)), 17);
    }

    #[test]
    fn test_fires_after_exactly_k_ticks() {
        for slots in [1, 3, 4, 60] {
            for k in 1..=20 {
                let mut wheel = Wheel::new(Duration::from_secs(1), slots);
                // start from an arbitrary cursor
                for _ in 0..(k % 5) {
                    wheel.advance();
                }
                wheel.add(DelayTask::new(task("t"), Duration::from_secs(k as u64)));
                assert_eq!(
                    fires_at(&mut wheel, "t", 100),
                    Some(k),
                    "slots={slots} k={k}"
                );
                assert!(wheel.is_empty());
            }
        }
    }

    #[test]
    fn test_remove_before_due_prevents_firing() {
        let mut wheel = Wheel::new(Duration::from_secs(1), 4);
        wheel.add(DelayTask::new(task("a"), Duration::from_secs(6)));
        wheel.add(DelayTask::new(task("b"), Duration::from_secs(6)));
        for _ in 0..3 {
            assert!(wheel.advance().is_empty());
        }

        assert!(wheel.remove("a"));
        assert_eq!(wheel.len(), 1);
        assert_eq!(fires_at(&mut wheel, "a", 20), None);
        assert!(wheel.is_empty());
    }

    #[test]
    fn test_remove_rejects_empty_and_unknown_ids() {
        let mut wheel = Wheel::new(Duration::from_secs(1), 4);
        assert!(!wheel.remove(""));
        assert!(!wheel.remove("ghost"));

        wheel.add(DelayTask::new(task("t"), Duration::from_secs(1)));
        assert_eq!(wheel.advance().len(), 1);
        // already fired
        assert!(!wheel.remove("t"));
    }

    #[test]
    fn test_with_id_overrides_task_name() {
        let mut wheel = Wheel::new(Duration::from_millis(10), 2);
        let delayed = DelayTask::new(task("send-mail"), Duration::from_millis(20)).with_id("mail-42");
        assert_eq!(delayed.id(), "mail-42");
        assert_eq!(delayed.task().name(), "send-mail");

        wheel.add(delayed);
        assert!(!wheel.remove("send-mail"));
        assert!(wheel.remove("mail-42"));
    }

    #[test]
    fn test_clamps_degenerate_config() {
        let wheel = Wheel::new(Duration::ZERO, 0);
        assert_eq!(wheel.slot_count(), 1);
        assert_eq!(wheel.tick(), Duration::from_millis(1));
        assert_eq!(wheel.cursor(), 0);
    }

    #[test]
    fn test_remove_cancels_every_timer_sharing_an_id() {
        let mut wheel = Wheel::new(Duration::from_secs(1), 8);
        wheel.add(DelayTask::new(task("reminder"), Duration::from_secs(2)));
        wheel.add(DelayTask::new(task("reminder"), Duration::from_secs(5)));
        assert_eq!(wheel.len(), 2);

        assert!(wheel.remove("reminder"));
        assert!(wheel.is_empty());
        assert_eq!(fires_at(&mut wheel, "reminder", 20), None);
        assert!(!wheel.remove("reminder"));
    }

    #[test]
    fn test_remove_after_first_duplicate_fired() {
        let mut wheel = Wheel::new(Duration::from_secs(1), 8);
        wheel.add(DelayTask::new(task("reminder"), Duration::from_secs(2)));
        wheel.add(DelayTask::new(task("reminder"), Duration::from_secs(2)));
        wheel.add(DelayTask::new(task("reminder"), Duration::from_secs(10)));

        assert_eq!(fires_at(&mut wheel, "reminder", 5), Some(2));
        assert_eq!(wheel.len(), 1);
        assert!(wheel.remove("reminder"));
        assert_eq!(fires_at(&mut wheel, "reminder", 20), None);
    }
}
