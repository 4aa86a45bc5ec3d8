//! The generic collection and dispatch engine

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::error;

use super::{Handled, HandlerType};
use crate::state::{
    AggregateMode, HandlingOperators, MemberRole, MemberStates, StateOperator, WeakStateOperator,
};

type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Read by aggregates for members that carry no handling operators
static ALWAYS_HANDLED: LazyLock<StateOperator> = LazyLock::new(|| StateOperator::fixed(true));

fn address<T: ?Sized>(member: &Arc<T>) -> *const () {
    Arc::as_ptr(member).cast::<()>()
}

/// The operator `member` plays in `role`
fn role_state<T: ?Sized + Handled>(member: &T, role: MemberRole) -> StateOperator {
    match role {
        MemberRole::Death => member.is_dead().clone(),
        MemberRole::Handling(handler_type) => member
            .handling_operators()
            .map_or_else(|| (*ALWAYS_HANDLED).clone(), |ops| ops.get(handler_type)),
    }
}

/// Admissions and removals waiting for the next settle point
struct Pending<T: ?Sized> {
    to_add: Vec<Arc<T>>,
    to_remove: Vec<Arc<T>>,
}

/// A concurrency-safe collection of [`Handled`] objects
///
/// Additions and removals are queued and only applied at settle points (the
/// start and end of every [`dispatch`](Self::dispatch)), so members may add,
/// remove or kill each other from inside a dispatch callback. Callbacks never
/// run under one of the handler's locks.
///
/// A member whose "is dead" operator turns true is skipped and reaped by the
/// next dispatch, whether or not the operation short-circuited.
///
/// Aggregates built by the handler (including the auto-death one) watch
/// every member and are refreshed on membership changes, so listeners and
/// dependents of [`is_dead`](Handled::is_dead) hear about the handler dying.
pub struct Handler<T: ?Sized + Handled> {
    handler_type: HandlerType,
    this: Weak<Self>,
    /// Replaced wholesale at settle points so a dispatch can iterate a snapshot
    live: RwLock<Arc<Vec<Arc<T>>>>,
    pending: Mutex<Pending<T>>,
    ordering: RwLock<Option<Comparator<T>>>,
    started: StateOperator,
    killed: StateOperator,
    death: StateOperator,
    handling: HandlingOperators,
    aggregates: Mutex<Vec<(WeakStateOperator, MemberRole)>>,
}

impl<T: ?Sized + Handled + 'static> Handler<T> {
    /// Creates a handler that only dies when killed
    pub fn new(handler_type: HandlerType) -> Arc<Self> {
        Self::build(handler_type, false)
    }

    /// Creates a handler that also dies once it has held something and every
    /// member it holds is dead
    pub fn with_auto_death(handler_type: HandlerType) -> Arc<Self> {
        Self::build(handler_type, true)
    }

    fn build(handler_type: HandlerType, auto_death: bool) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let started = StateOperator::latch(false);
            let killed = StateOperator::mutable(false);
            let mut aggregates = Vec::new();
            let death = if auto_death {
                let source: Weak<dyn MemberStates> = this.clone();
                let all_dead =
                    StateOperator::aggregate(source, AggregateMode::All, MemberRole::Death, false);
                aggregates.push((all_dead.downgrade(), MemberRole::Death));
                StateOperator::any_of([
                    killed.clone(),
                    StateOperator::all_of([started.clone(), all_dead]),
                ])
            } else {
                killed.clone()
            };

            Self {
                handler_type,
                this: this.clone(),
                live: RwLock::new(Arc::new(Vec::new())),
                pending: Mutex::new(Pending {
                    to_add: Vec::new(),
                    to_remove: Vec::new(),
                }),
                ordering: RwLock::new(None),
                started,
                killed,
                death,
                handling: HandlingOperators::new(),
                aggregates: Mutex::new(aggregates),
            }
        })
    }

    /// The category this handler manages
    pub fn handler_type(&self) -> HandlerType {
        self.handler_type
    }

    /// Queues `member` for admission
    ///
    /// Returns false, changing nothing, when `member` is this handler or is
    /// already held or queued.
    pub fn add(&self, member: Arc<T>) -> bool {
        if std::ptr::addr_eq(Arc::as_ptr(&member), self as *const Self) {
            return false;
        }

        {
            let mut pending = self.pending.lock();
            let queued = pending.to_add.iter().any(|m| Arc::ptr_eq(m, &member));
            if queued || self.live.read().iter().any(|m| Arc::ptr_eq(m, &member)) {
                return false;
            }
            pending.to_add.push(Arc::clone(&member));
        }

        self.watch(member.as_ref());
        self.started.set_state(true);
        self.refresh_aggregates();
        true
    }

    /// Queues `member` for removal
    ///
    /// A member still waiting for admission is dropped from that queue
    /// instead. Returns false when `member` is neither held nor queued, or is
    /// already queued for removal.
    pub fn remove(&self, member: &Arc<T>) -> bool {
        let mut pending = self.pending.lock();
        if let Some(index) = pending.to_add.iter().position(|m| Arc::ptr_eq(m, member)) {
            pending.to_add.remove(index);
            drop(pending);
            self.refresh_aggregates();
            return true;
        }
        if pending.to_remove.iter().any(|m| Arc::ptr_eq(m, member)) {
            return false;
        }
        if !self.live.read().iter().any(|m| Arc::ptr_eq(m, member)) {
            return false;
        }
        pending.to_remove.push(Arc::clone(member));
        true
    }

    /// Queues every held member for removal and drops pending admissions
    pub fn remove_all(&self) {
        let mut pending = self.pending.lock();
        let cancelled = !pending.to_add.is_empty();
        pending.to_add.clear();

        let queued: HashSet<*const ()> = pending.to_remove.iter().map(address).collect();
        let live = self.snapshot();
        pending.to_remove.extend(
            live.iter()
                .filter(|m| !queued.contains(&address(*m)))
                .cloned(),
        );
        drop(pending);

        if cancelled {
            self.refresh_aggregates();
        }
    }

    /// Applies queued admissions and removals without dispatching anything
    pub fn settle(&self) {
        let Some(admitted) = self.settle_queues() else {
            return;
        };
        if admitted {
            self.apply_ordering();
        }
        self.refresh_aggregates();
    }

    /// Runs `operation` on every live member
    ///
    /// Dead members are swept for removal and never passed to `operation`.
    /// With `check_enabled`, members whose handling operator for this handler
    /// type is false are skipped. Once `operation` returns false no further
    /// calls are made this pass, but the dead-member sweep still covers the
    /// rest of the list. A panicking callback is logged and treated as
    /// "continue".
    pub fn dispatch<F>(&self, check_enabled: bool, mut operation: F)
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        self.settle();

        let members = self.snapshot();
        let mut proceed = true;
        let mut dead = Vec::new();
        for member in members.iter() {
            if member.is_dead().get_state() {
                dead.push(Arc::clone(member));
                continue;
            }
            if !proceed || (check_enabled && !self.should_handle(member.as_ref())) {
                continue;
            }
            proceed = self.invoke(member, &mut operation);
        }

        if !dead.is_empty() {
            let mut pending = self.pending.lock();
            for member in dead {
                if !pending.to_remove.iter().any(|m| Arc::ptr_eq(m, &member)) {
                    pending.to_remove.push(member);
                }
            }
        }

        self.settle();
    }

    /// Number of held members plus those waiting for admission
    pub fn handled_count(&self) -> usize {
        let pending = self.pending.lock();
        self.live.read().len() + pending.to_add.len()
    }

    /// Returns true when nothing is held or waiting for admission
    pub fn is_empty(&self) -> bool {
        self.handled_count() == 0
    }

    /// Returns true if `member` is held or waiting for admission
    pub fn contains(&self, member: &Arc<T>) -> bool {
        let pending = self.pending.lock();
        pending.to_add.iter().any(|m| Arc::ptr_eq(m, member))
            || self.live.read().iter().any(|m| Arc::ptr_eq(m, member))
    }

    /// Copy of the live member list, in dispatch order
    pub fn members(&self) -> Vec<Arc<T>> {
        self.snapshot().as_ref().clone()
    }

    /// Moves every member of `other` into this handler
    ///
    /// Returns how many members were admitted here.
    pub fn transfer_from(&self, other: &Handler<T>) -> usize {
        if std::ptr::eq(self, other) {
            return 0;
        }
        let moved = other.drain();
        other.refresh_aggregates();
        moved
            .into_iter()
            .filter(|member| self.add(Arc::clone(member)))
            .count()
    }

    /// Sorts the live members once
    pub fn sort_by<F>(&self, compare: F)
    where
        F: Fn(&T, &T) -> Ordering,
    {
        self.reorder(&compare);
    }

    /// Installs an ordering applied now and after every admission
    pub fn set_ordering<F>(&self, compare: F)
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        *self.ordering.write() = Some(Arc::new(compare));
        self.apply_ordering();
    }

    /// Builds an any-of / all-of operator over this handler's members
    ///
    /// The aggregate announces its flips to its own listeners for as long as
    /// it is alive.
    pub fn aggregate(&self, mode: AggregateMode, role: MemberRole, mutable: bool) -> StateOperator {
        let source: Weak<dyn MemberStates> = self.this.clone();
        let aggregate = StateOperator::aggregate(source, mode, role, mutable);
        for member in self.all_members() {
            aggregate.observe(&role_state(member.as_ref(), role));
        }
        self.aggregates.lock().push((aggregate.downgrade(), role));
        aggregate
    }

    /// Marks this handler dead
    pub fn kill(&self) {
        self.killed.set_state(true);
    }

    /// Returns true once anything has been admitted
    pub fn has_started(&self) -> bool {
        self.started.get_state()
    }

    fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        Arc::clone(&*self.live.read())
    }

    /// Live members followed by those waiting for admission
    fn all_members(&self) -> Vec<Arc<T>> {
        let pending = self.pending.lock();
        self.live
            .read()
            .iter()
            .chain(pending.to_add.iter())
            .cloned()
            .collect()
    }

    fn live_aggregates(&self) -> Vec<(StateOperator, MemberRole)> {
        let mut aggregates = self.aggregates.lock();
        aggregates.retain(|(aggregate, _)| aggregate.upgrade().is_some());
        aggregates
            .iter()
            .filter_map(|(aggregate, role)| Some((aggregate.upgrade()?, *role)))
            .collect()
    }

    /// Subscribes every aggregate to the operators `member` plays in it
    fn watch(&self, member: &T) {
        for (aggregate, role) in self.live_aggregates() {
            aggregate.observe(&role_state(member, role));
        }
    }

    fn refresh_aggregates(&self) {
        for (aggregate, _) in self.live_aggregates() {
            aggregate.refresh();
        }
    }

    fn should_handle(&self, member: &T) -> bool {
        member
            .handling_operators()
            .is_none_or(|ops| ops.is_handled_by(self.handler_type))
    }

    fn invoke<F>(&self, member: &Arc<T>, operation: &mut F) -> bool
    where
        F: FnMut(&Arc<T>) -> bool,
    {
        match panic::catch_unwind(AssertUnwindSafe(|| operation(member))) {
            Ok(proceed) => proceed,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(
                    handler = %self.handler_type,
                    panic = %message,
                    "Member callback panicked, continuing dispatch"
                );
                true
            }
        }
    }

    /// Admit then reap
    ///
    /// Returns `None` when nothing was queued, otherwise whether anything was
    /// admitted.
    fn settle_queues(&self) -> Option<bool> {
        let mut pending = self.pending.lock();
        if pending.to_add.is_empty() && pending.to_remove.is_empty() {
            return None;
        }

        let mut live = self.live.write();
        let mut next: Vec<Arc<T>> = live.as_ref().clone();

        let admitted = !pending.to_add.is_empty();
        next.append(&mut pending.to_add);

        if !pending.to_remove.is_empty() {
            let doomed: HashSet<*const ()> = pending.to_remove.iter().map(address).collect();
            pending.to_remove.clear();
            next.retain(|m| !doomed.contains(&address(m)));
        }

        *live = Arc::new(next);
        Some(admitted)
    }

    fn apply_ordering(&self) {
        let Some(compare) = self.ordering.read().clone() else {
            return;
        };
        self.reorder(compare.as_ref());
    }

    /// Sorts outside the lock and swaps the result in if nothing settled meanwhile
    fn reorder(&self, compare: &dyn Fn(&T, &T) -> Ordering) {
        loop {
            let snapshot = self.snapshot();
            let mut sorted = snapshot.as_ref().clone();
            sorted.sort_by(|a, b| compare(a, b));

            let mut live = self.live.write();
            if Arc::ptr_eq(&*live, &snapshot) {
                *live = Arc::new(sorted);
                return;
            }
        }
    }

    /// Takes every member out, leaving this handler empty
    fn drain(&self) -> Vec<Arc<T>> {
        let mut pending = self.pending.lock();
        let mut live = self.live.write();

        let doomed: HashSet<*const ()> = pending.to_remove.iter().map(address).collect();
        pending.to_remove.clear();

        let mut moved: Vec<Arc<T>> = live
            .iter()
            .filter(|m| !doomed.contains(&address(*m)))
            .cloned()
            .collect();
        moved.append(&mut pending.to_add);
        *live = Arc::new(Vec::new());
        moved
    }
}

impl<T: ?Sized + Handled + 'static> Handled for Handler<T> {
    fn is_dead(&self) -> &StateOperator {
        &self.death
    }

    fn handling_operators(&self) -> Option<&HandlingOperators> {
        Some(&self.handling)
    }
}

impl<T: ?Sized + Handled + 'static> MemberStates for Handler<T> {
    fn visit_member_states(
        &self,
        role: MemberRole,
        visitor: &mut dyn FnMut(&StateOperator) -> bool,
    ) {
        for member in self.all_members() {
            if !visitor(&role_state(member.as_ref(), role)) {
                break;
            }
        }
    }
}

impl<T: ?Sized + Handled> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("handler_type", &self.handler_type)
            .field("live", &self.live.read().len())
            .field("started", &self.started.get_state())
            .field("killed", &self.killed.get_state())
            .finish_non_exhaustive()
    }
}
