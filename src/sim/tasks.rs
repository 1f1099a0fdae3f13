//! Timed and chained behaviour for actors
//!
//! Every task is a small state machine: `Once` fires a single action,
//! `Repeating` fires forever, `Continuous` reports progress each tick until
//! its duration runs out. When a `Once` or `Continuous` link completes it is
//! replaced in place by its follow-up, so a chain keeps its identity until the
//! last link finishes.
//!
//! An interval of zero or less is not an error: such a task is due on every
//! tick. A `Repeating` task with a non-positive interval fires exactly once
//! per tick.

use std::fmt;

/// Discrete action run against the scheduler's owner
pub type Action<T> = Box<dyn FnMut(&mut T)>;
/// Progress callback receiving elapsed seconds, clamped to the duration
pub type Progress<T> = Box<dyn FnMut(&mut T, f32)>;

/// Identifies a scheduled chain for later lookup or cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

pub enum TaskKind<T> {
    /// Fires once; `None` is a pure wait
    Once(Option<Action<T>>),
    Repeating(Action<T>),
    Continuous(Progress<T>),
}

impl<T> TaskKind<T> {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Once(Some(_)) => "once",
            TaskKind::Once(None) => "wait",
            TaskKind::Repeating(_) => "repeating",
            TaskKind::Continuous(_) => "continuous",
        }
    }
}

/// One link of a task chain
pub struct TaskDef<T> {
    id: TaskId,
    interval: f32,
    elapsed: f32,
    kind: TaskKind<T>,
    follow_up: Option<Box<TaskDef<T>>>,
    done: bool,
}

impl<T> TaskDef<T> {
    fn new(id: TaskId, interval: f32, kind: TaskKind<T>) -> Self {
        Self {
            id,
            interval,
            elapsed: 0.0,
            kind,
            follow_up: None,
            done: false,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn kind(&self) -> &TaskKind<T> {
        &self.kind
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Change the interval of this link before it completes
    pub fn set_interval(&mut self, interval: f32) -> &mut Self {
        self.interval = interval;
        self
    }

    /// The next link, if one is attached. Links are only resolved when the
    /// current one completes, so they can be edited until then.
    pub fn follow_up_mut(&mut self) -> Option<&mut TaskDef<T>> {
        self.follow_up.as_deref_mut()
    }

    fn chain(&mut self, interval: f32, kind: TaskKind<T>) -> &mut TaskDef<T> {
        // Attached to the end of the chain so builder calls read in order
        match self.follow_up {
            Some(ref mut next) => next.chain(interval, kind),
            None => {
                let id = self.id;
                self.follow_up.insert(Box::new(TaskDef::new(id, interval, kind)))
            }
        }
    }

    /// Run `action` once, `interval` seconds after this link completes.
    /// A follow-up on a repeating link never runs.
    pub fn then(&mut self, interval: f32, action: impl FnMut(&mut T) + 'static) -> &mut TaskDef<T> {
        self.chain(interval, TaskKind::Once(Some(Box::new(action))))
    }

    /// Run `action` as soon as this link completes
    pub fn then_now(&mut self, action: impl FnMut(&mut T) + 'static) -> &mut TaskDef<T> {
        self.then(0.0, action)
    }

    pub fn then_every(&mut self, interval: f32, action: impl FnMut(&mut T) + 'static) -> &mut TaskDef<T> {
        self.chain(interval, TaskKind::Repeating(Box::new(action)))
    }

    pub fn then_during(&mut self, duration: f32, progress: impl FnMut(&mut T, f32) + 'static) -> &mut TaskDef<T> {
        self.chain(duration, TaskKind::Continuous(Box::new(progress)))
    }

    pub fn then_wait(&mut self, duration: f32) -> &mut TaskDef<T> {
        self.chain(duration, TaskKind::Once(None))
    }

    /// Replace this link with its follow-up, carrying `leftover` seconds.
    /// Returns false when the chain is exhausted.
    fn advance_chain(&mut self, leftover: f32) -> bool {
        match self.follow_up.take() {
            Some(next) => {
                let next = *next;
                self.interval = next.interval;
                self.kind = next.kind;
                self.follow_up = next.follow_up;
                self.elapsed = leftover;
                true
            }
            None => {
                self.done = true;
                false
            }
        }
    }

    fn update(&mut self, delta: f32, target: &mut T) {
        if self.done {
            return;
        }
        self.elapsed += delta;
        loop {
            let due = self.elapsed >= self.interval;
            let completed = match &mut self.kind {
                TaskKind::Repeating(action) => {
                    if self.interval <= 0.0 {
                        action(target);
                    } else {
                        while self.elapsed >= self.interval {
                            self.elapsed -= self.interval;
                            action(target);
                        }
                    }
                    return;
                }
                TaskKind::Once(action) => {
                    if due {
                        if let Some(action) = action {
                            action(target);
                        }
                    }
                    due
                }
                TaskKind::Continuous(progress) => {
                    progress(target, self.elapsed.min(self.interval).max(0.0));
                    due
                }
            };
            if !completed {
                return;
            }
            let leftover = (self.elapsed - self.interval.max(0.0)).max(0.0);
            if !self.advance_chain(leftover) {
                return;
            }
        }
    }
}

impl<T> fmt::Debug for TaskDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDef")
            .field("id", &self.id)
            .field("kind", &self.kind.name())
            .field("interval", &self.interval)
            .field("elapsed", &self.elapsed)
            .field("done", &self.done)
            .field("follow_up", &self.follow_up)
            .finish()
    }
}

/// Per-owner timer and sequencing queue
pub struct TaskScheduler<T> {
    active: Vec<TaskDef<T>>,
    /// Scheduled but not yet ticked
    pending: Vec<TaskDef<T>>,
    /// Cancels aimed at chains that are running; only kept while this
    /// scheduler stands in for one moved out by `update_within`
    cancelled: Vec<TaskId>,
    stand_in: bool,
    next_id: u64,
}

impl<T> Default for TaskScheduler<T> {
    fn default() -> Self {
        Self::starting_at(0)
    }
}

impl<T> TaskScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn starting_at(next_id: u64) -> Self {
        Self {
            active: Vec::new(),
            pending: Vec::new(),
            cancelled: Vec::new(),
            stand_in: false,
            next_id,
        }
    }

    fn push(&mut self, interval: f32, kind: TaskKind<T>) -> &mut TaskDef<T> {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let index = self.pending.len();
        self.pending.push(TaskDef::new(id, interval, kind));
        &mut self.pending[index]
    }

    /// Fire `action` every `interval` seconds, forever
    pub fn every(&mut self, interval: f32, action: impl FnMut(&mut T) + 'static) -> &mut TaskDef<T> {
        self.push(interval, TaskKind::Repeating(Box::new(action)))
    }

    /// Fire `action` once after `interval` seconds
    pub fn after(&mut self, interval: f32, action: impl FnMut(&mut T) + 'static) -> &mut TaskDef<T> {
        self.push(interval, TaskKind::Once(Some(Box::new(action))))
    }

    /// Call `progress` every tick with the elapsed time until `duration` passes
    pub fn during(&mut self, duration: f32, progress: impl FnMut(&mut T, f32) + 'static) -> &mut TaskDef<T> {
        self.push(duration, TaskKind::Continuous(Box::new(progress)))
    }

    /// Do nothing for `duration` seconds; only useful with a follow-up
    pub fn wait(&mut self, duration: f32) -> &mut TaskDef<T> {
        self.push(duration, TaskKind::Once(None))
    }

    /// Live chain `id`, for retargeting its follow-ups.
    ///
    /// From inside a running action this only sees chains scheduled during
    /// that update: the running ones are moved out and `None` is returned
    /// for them.
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut TaskDef<T>> {
        self.active
            .iter_mut()
            .chain(self.pending.iter_mut())
            .find(|t| t.id == id && !t.done)
    }

    /// Drop a chain. Takes effect immediately, or at the end of the running
    /// update when called from inside a task.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.active.len() + self.pending.len();
        self.active.retain(|t| t.id != id);
        self.pending.retain(|t| t.id != id);
        if self.active.len() + self.pending.len() == before {
            if self.stand_in {
                self.cancelled.push(id);
            }
            return false;
        }
        true
    }

    pub fn clear(&mut self) {
        self.active.clear();
        self.pending.clear();
    }

    /// Number of live chains, including ones not yet activated
    pub fn len(&self) -> usize {
        self.active.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advance every active chain by `delta` seconds.
    ///
    /// Tasks scheduled before this call become active now; tasks scheduled
    /// from inside a running action wait for the next call.
    pub fn update(&mut self, delta: f32, target: &mut T) {
        self.active.append(&mut self.pending);
        let mut running = std::mem::take(&mut self.active);
        for task in &mut running {
            task.update(delta, target);
        }
        running.retain(|t| !t.done);
        self.active = running;
    }

    /// Update a scheduler that lives inside its own target.
    ///
    /// The scheduler is moved out for the duration of the update so actions
    /// get `&mut T`. Anything scheduled or cancelled on the target meanwhile
    /// is merged back afterwards, scheduled tasks as pending.
    pub fn update_within(target: &mut T, delta: f32, scheduler: fn(&mut T) -> &mut TaskScheduler<T>) {
        let next_id = scheduler(target).next_id;
        let stand_in = Self {
            stand_in: true,
            ..Self::starting_at(next_id)
        };
        let mut running = std::mem::replace(scheduler(target), stand_in);
        running.update(delta, target);

        let added = std::mem::replace(scheduler(target), running);
        let merged = scheduler(target);
        merged.next_id = merged.next_id.max(added.next_id);
        for id in added.cancelled {
            merged.active.retain(|t| t.id != id);
        }
        merged.pending.extend(added.active);
        merged.pending.extend(added.pending);
    }
}

impl<T> fmt::Debug for TaskScheduler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("active", &self.active.len())
            .field("pending", &self.pending.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
