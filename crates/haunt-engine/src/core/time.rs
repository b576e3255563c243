/// Fixed timestep accumulator.
/// Turns variable host frame deltas into a whole number of simulation frames.
pub struct FixedTimestep {
    /// The fixed delta time per tick, in seconds.
    dt: f32,
    /// Accumulated time from variable frame deltas.
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            accumulator: 0.0,
        }
    }

    /// One step per frame at the given frames-per-second.
    pub fn from_fps(fps: f32) -> Self {
        Self::new(1.0 / fps.max(1.0))
    }

    /// Add frame time to the accumulator. Returns the number of fixed steps to run.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt;
        // Cap to prevent spiral of death (max 10 steps per frame)
        self.accumulator = self.accumulator.min(self.dt * 10.0);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    /// The fixed delta time in seconds.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// The fixed delta time in milliseconds.
    pub fn dt_ms(&self) -> f64 {
        self.dt as f64 * 1000.0
    }
}

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

#[derive(Debug, Clone)]
struct Timer<T> {
    id: TimerId,
    due_ms: f64,
    interval_ms: Option<f64>,
    task: T,
}

/// Millisecond timer queue: the engine's `setTimeout`/`setInterval`.
///
/// Timers never fire on their own. The owner polls `pop_due` while advancing its clock,
/// so firing order is deterministic: earliest due first, then scheduling order.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    timers: Vec<Timer<T>>,
    next_id: u64,
}

impl<T: Clone> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 1,
        }
    }

    fn push(&mut self, due_ms: f64, interval_ms: Option<f64>, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer { id, due_ms, interval_ms, task });
        id
    }

    /// Fire `task` once, `delay_ms` after `now_ms`.
    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, task: T) -> TimerId {
        self.push(now_ms + delay_ms.max(0.0), None, task)
    }

    /// Fire `task` every `interval_ms` until cancelled.
    pub fn schedule_repeating(&mut self, now_ms: f64, interval_ms: f64, task: T) -> TimerId {
        let interval = interval_ms.max(1.0);
        self.push(now_ms + interval, Some(interval), task)
    }

    /// Cancel a timer. Returns false when it already fired or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.iter().position(|t| t.id == id) {
            Some(idx) => {
                self.timers.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// Earliest due time among pending timers.
    pub fn next_due(&self) -> Option<f64> {
        self.timers.iter().map(|t| t.due_ms).reduce(f64::min)
    }

    /// Pop the earliest timer due at or before `now_ms`.
    /// Repeating timers are re-armed one interval later instead of being removed.
    pub fn pop_due(&mut self, now_ms: f64) -> Option<(TimerId, T)> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= now_ms)
            .min_by(|(_, a), (_, b)| a.due_ms.total_cmp(&b.due_ms).then(a.id.cmp(&b.id)))
            .map(|(idx, _)| idx)?;

        match self.timers[idx].interval_ms {
            Some(interval) => {
                let timer = &mut self.timers[idx];
                timer.due_ms += interval;
                Some((timer.id, timer.task.clone()))
            }
            None => {
                let timer = self.timers.remove(idx);
                Some((timer.id, timer.task))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

impl<T: Clone> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_step_exact() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        let steps = ts.accumulate(1.0 / 60.0);
        assert_eq!(steps, 1);
    }

    #[test]
    fn accumulates_partial() {
        let mut ts = FixedTimestep::from_fps(60.0);
        let steps = ts.accumulate(0.008); // half a frame
        assert_eq!(steps, 0);
        let steps = ts.accumulate(0.010); // over one frame total
        assert_eq!(steps, 1);
    }

    #[test]
    fn caps_at_ten_steps() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        let steps = ts.accumulate(1.0);
        assert_eq!(steps, 10);
    }

    #[test]
    fn timers_fire_in_due_order() {
        let mut q = TimerQueue::new();
        q.schedule(0.0, 30.0, "late");
        q.schedule(0.0, 10.0, "early");
        q.schedule(0.0, 10.0, "early-second");

        assert!(q.pop_due(5.0).is_none());
        assert_eq!(q.pop_due(40.0).map(|(_, t)| t), Some("early"));
        assert_eq!(q.pop_due(40.0).map(|(_, t)| t), Some("early-second"));
        assert_eq!(q.pop_due(40.0).map(|(_, t)| t), Some("late"));
        assert!(q.is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let id = q.schedule(0.0, 10.0, 1);
        assert!(q.cancel(id));
        assert!(!q.cancel(id));
        assert!(q.pop_due(100.0).is_none());
    }

    #[test]
    fn repeating_timer_rearms() {
        let mut q = TimerQueue::new();
        let id = q.schedule_repeating(0.0, 1000.0, ());
        assert_eq!(q.next_due(), Some(1000.0));
        assert!(q.pop_due(1000.0).is_some());
        assert_eq!(q.next_due(), Some(2000.0));
        assert!(q.is_pending(id));
    }
}
