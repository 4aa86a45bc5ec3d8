//! Boolean state cells with change notification
//!
//! A [`StateOperator`] is a shared handle to one boolean cell; cloning the
//! handle shares the cell. Latches, dependents, boolean combinations and
//! handler aggregates are all the same type carrying a different
//! [`Derivation`], and reads and writes resolve that derivation in one place.
//!
//! Combinations and aggregates compute their state on read. They also watch
//! their operands and announce a change to their own listeners whenever an
//! operand change flips their value, so dependents and listeners work on them
//! like on any other operator.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use crate::handler::HandlerType;

/// Receives a notification whenever an observed operator is about to change
///
/// Listeners are held weakly: dropping the last `Arc` to a listener detaches it.
pub trait StateListener: Send + Sync {
    /// Called with the new state before the operator commits it
    ///
    /// `source.get_state()` still returns the old state during this call.
    fn on_state_change(&self, source: &StateOperator, new_state: bool);
}

/// How an aggregate operator folds member states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateMode {
    /// True as soon as one member state is true
    Any,
    /// False as soon as one member state is false
    All,
}

/// Which operator of each member an aggregate looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberRole {
    /// The member's "is dead" operator
    Death,
    /// The member's "should this handler type process me" operator
    Handling(HandlerType),
}

/// A collection whose members' operators can be walked by an aggregate
pub trait MemberStates: Send + Sync {
    /// Visits the operator playing `role` on every current member
    ///
    /// Stops as soon as `visitor` returns false.
    fn visit_member_states(
        &self,
        role: MemberRole,
        visitor: &mut dyn FnMut(&StateOperator) -> bool,
    );
}

/// Public tag describing how an operator derives its state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationKind {
    Plain,
    Latch,
    Dependent,
    And,
    Or,
    AggregateAny,
    AggregateAll,
}

enum Derivation {
    Plain,
    /// Freezes after its first change
    Latch,
    /// Mirrors the operator it was created from
    Dependent,
    And(Vec<StateOperator>),
    Or(Vec<StateOperator>),
    Aggregate {
        source: Weak<dyn MemberStates>,
        mode: AggregateMode,
        role: MemberRole,
    },
}

enum Listener {
    Mirror(Weak<Cell>),
    /// A combination or aggregate reading the notifying operator
    Composite(Weak<Cell>),
    External(Weak<dyn StateListener>),
}

enum LiveListener {
    Mirror(Arc<Cell>),
    Composite(Arc<Cell>),
    External(Arc<dyn StateListener>),
}

impl Listener {
    fn upgrade(&self) -> Option<LiveListener> {
        match self {
            Self::Mirror(cell) => cell.upgrade().map(LiveListener::Mirror),
            Self::Composite(cell) => cell.upgrade().map(LiveListener::Composite),
            Self::External(listener) => listener.upgrade().map(LiveListener::External),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            Self::Mirror(cell) | Self::Composite(cell) => cell.strong_count() > 0,
            Self::External(listener) => listener.strong_count() > 0,
        }
    }
}

struct Cell {
    /// Stored state; for combinations and aggregates, the last announced one
    state: AtomicBool,
    mutable: AtomicBool,
    derivation: Derivation,
    /// Serializes writers; reentrant so listeners may touch the same operator
    writer: ReentrantMutex<()>,
    /// Set while listeners are being told about a change
    notifying: AtomicBool,
    /// Created on first attach
    listeners: Mutex<Option<Vec<Listener>>>,
}

/// A shared boolean cell with change notification and optional immutability
#[derive(Clone)]
pub struct StateOperator {
    cell: Arc<Cell>,
}

/// Non-owning handle to a [`StateOperator`]
#[derive(Clone)]
pub(crate) struct WeakStateOperator {
    cell: Weak<Cell>,
}

impl WeakStateOperator {
    pub(crate) fn upgrade(&self) -> Option<StateOperator> {
        self.cell.upgrade().map(|cell| StateOperator { cell })
    }
}

impl StateOperator {
    fn with(state: bool, mutable: bool, derivation: Derivation) -> Self {
        Self {
            cell: Arc::new(Cell {
                state: AtomicBool::new(state),
                mutable: AtomicBool::new(mutable),
                derivation,
                writer: ReentrantMutex::new(()),
                notifying: AtomicBool::new(false),
                listeners: Mutex::new(None),
            }),
        }
    }

    /// Creates a plain operator
    pub fn new(state: bool, mutable: bool) -> Self {
        Self::with(state, mutable, Derivation::Plain)
    }

    /// Creates a plain operator that can be changed
    pub fn mutable(state: bool) -> Self {
        Self::new(state, true)
    }

    /// Creates a plain operator that never changes
    pub fn fixed(state: bool) -> Self {
        Self::new(state, false)
    }

    /// Creates an operator that accepts exactly one change, then freezes
    pub fn latch(initial: bool) -> Self {
        Self::with(initial, true, Derivation::Latch)
    }

    /// Creates an operator that mirrors `parent`
    ///
    /// The dependent starts with the parent's current state and follows every
    /// change the parent announces. It can't be set directly.
    pub fn dependent(parent: &StateOperator) -> Self {
        let child = Self::with(parent.get_state(), false, Derivation::Dependent);
        parent.push_listener(Listener::Mirror(Arc::downgrade(&child.cell)));
        child
    }

    /// Creates an operator that is true while every operand is true
    pub fn all_of(operands: impl IntoIterator<Item = StateOperator>) -> Self {
        Self::combination(Derivation::And(operands.into_iter().collect()))
    }

    /// Creates an operator that is true while any operand is true
    pub fn any_of(operands: impl IntoIterator<Item = StateOperator>) -> Self {
        Self::combination(Derivation::Or(operands.into_iter().collect()))
    }

    fn combination(derivation: Derivation) -> Self {
        let op = Self::with(false, false, derivation);
        op.cell.state.store(op.get_state(), Ordering::Release);
        if let Derivation::And(operands) | Derivation::Or(operands) = &op.cell.derivation {
            for operand in operands {
                op.observe(operand);
            }
        }
        op
    }

    /// Creates an operator folded over the members of `source`
    ///
    /// When `mutable`, setting the aggregate pushes the state to every member.
    /// The aggregate only announces changes of member operators it
    /// [observes](Self::observe), and membership changes once
    /// [refreshed](Self::refresh); [`Handler`](crate::handler::Handler) does
    /// both for the aggregates it builds.
    pub fn aggregate(
        source: Weak<dyn MemberStates>,
        mode: AggregateMode,
        role: MemberRole,
        mutable: bool,
    ) -> Self {
        let op = Self::with(false, mutable, Derivation::Aggregate { source, mode, role });
        op.cell.state.store(op.get_state(), Ordering::Release);
        op
    }

    /// Returns the current state
    pub fn get_state(&self) -> bool {
        self.evaluate(None)
    }

    /// Computes the state as it will be once `change` is committed
    fn evaluate(&self, change: Option<(&Cell, bool)>) -> bool {
        if let Some((cell, state)) = change
            && std::ptr::eq(cell, Arc::as_ptr(&self.cell))
        {
            return state;
        }

        match &self.cell.derivation {
            Derivation::Plain | Derivation::Latch | Derivation::Dependent => {
                self.cell.state.load(Ordering::Acquire)
            }
            Derivation::And(operands) => operands.iter().all(|op| op.evaluate(change)),
            Derivation::Or(operands) => operands.iter().any(|op| op.evaluate(change)),
            Derivation::Aggregate { source, mode, role } => {
                let Some(source) = source.upgrade() else {
                    // Nothing left to fold over
                    return *mode == AggregateMode::All;
                };
                let mut result = *mode == AggregateMode::All;
                source.visit_member_states(*role, &mut |member| {
                    if member.evaluate(change) == result {
                        return true;
                    }
                    result = !result;
                    false
                });
                result
            }
        }
    }

    /// Requests a new state
    ///
    /// No-op when the operator is immutable or already holds `new_state`.
    /// Listeners hear about the change before it is committed. A nested set on
    /// the same operator from inside one of those notifications is ignored.
    pub fn set_state(&self, new_state: bool) {
        match &self.cell.derivation {
            Derivation::Plain | Derivation::Latch => {}
            Derivation::Aggregate { source, role, .. } => {
                if self.cell.mutable.load(Ordering::Acquire)
                    && let Some(source) = source.upgrade()
                {
                    source.visit_member_states(*role, &mut |member| {
                        member.set_state(new_state);
                        true
                    });
                }
                return;
            }
            Derivation::Dependent | Derivation::And(_) | Derivation::Or(_) => return,
        }

        let _writer = self.cell.writer.lock();
        if !self.cell.mutable.load(Ordering::Acquire) {
            return;
        }
        self.commit(new_state);
    }

    /// Returns whether external callers may change this operator
    pub fn is_mutable(&self) -> bool {
        match self.cell.derivation {
            Derivation::Dependent | Derivation::And(_) | Derivation::Or(_) => false,
            _ => self.cell.mutable.load(Ordering::Acquire),
        }
    }

    /// Returns how this operator derives its state
    pub fn kind(&self) -> DerivationKind {
        match &self.cell.derivation {
            Derivation::Plain => DerivationKind::Plain,
            Derivation::Latch => DerivationKind::Latch,
            Derivation::Dependent => DerivationKind::Dependent,
            Derivation::And(_) => DerivationKind::And,
            Derivation::Or(_) => DerivationKind::Or,
            Derivation::Aggregate {
                mode: AggregateMode::Any,
                ..
            } => DerivationKind::AggregateAny,
            Derivation::Aggregate {
                mode: AggregateMode::All,
                ..
            } => DerivationKind::AggregateAll,
        }
    }

    /// Starts notifying `listener` about changes
    pub fn attach_listener(&self, listener: &Arc<dyn StateListener>) {
        self.push_listener(Listener::External(Arc::downgrade(listener)));
    }

    /// Stops notifying `listener`
    pub fn detach_listener(&self, listener: &Arc<dyn StateListener>) {
        let target = Arc::downgrade(listener);
        if let Some(listeners) = self.cell.listeners.lock().as_mut() {
            listeners.retain(|entry| match entry {
                Listener::External(weak) => !Weak::ptr_eq(weak, &target),
                Listener::Mirror(_) | Listener::Composite(_) => true,
            });
        }
    }

    /// Number of listeners that are still alive
    pub fn listener_count(&self) -> usize {
        self.cell
            .listeners
            .lock()
            .as_ref()
            .map_or(0, |listeners| listeners.iter().filter(|l| l.is_alive()).count())
    }

    /// Returns true if both handles share one cell
    pub fn ptr_eq(&self, other: &StateOperator) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Re-evaluates this operator whenever `operand` announces a change
    ///
    /// Only meaningful for combinations and aggregates; watching the same
    /// operand twice is a no-op.
    pub fn observe(&self, operand: &StateOperator) {
        if self.ptr_eq(operand) || !self.is_derived() {
            return;
        }
        operand.push_listener(Listener::Composite(Arc::downgrade(&self.cell)));
    }

    /// Recomputes a combination or aggregate and announces it if it flipped
    ///
    /// Needed after changes no operand announces, such as an aggregate's
    /// source gaining or losing members.
    pub fn refresh(&self) {
        if !self.is_derived() {
            return;
        }
        let _writer = self.cell.writer.lock();
        self.commit(self.get_state());
    }

    pub(crate) fn downgrade(&self) -> WeakStateOperator {
        WeakStateOperator {
            cell: Arc::downgrade(&self.cell),
        }
    }

    fn is_derived(&self) -> bool {
        matches!(
            self.cell.derivation,
            Derivation::And(_) | Derivation::Or(_) | Derivation::Aggregate { .. }
        )
    }

    fn push_listener(&self, listener: Listener) {
        let mut listeners = self.cell.listeners.lock();
        let listeners = listeners.get_or_insert_with(Vec::new);
        listeners.retain(Listener::is_alive);
        if let Listener::Composite(cell) = &listener
            && listeners.iter().any(|entry| match entry {
                Listener::Composite(known) => Weak::ptr_eq(known, cell),
                _ => false,
            })
        {
            return;
        }
        listeners.push(listener);
    }

    /// Folds an operand's upcoming change into this combination or aggregate
    fn reevaluate(&self, changed: &Cell, new_state: bool) {
        let _writer = self.cell.writer.lock();
        let next = self.evaluate(Some((changed, new_state)));
        self.commit(next);
    }

    /// Announces and stores a change; the caller holds the writer lock
    fn commit(&self, new_state: bool) {
        if self.cell.notifying.load(Ordering::Acquire)
            || self.cell.state.load(Ordering::Acquire) == new_state
        {
            return;
        }

        self.cell.notifying.store(true, Ordering::Release);
        self.notify(new_state);
        self.cell.state.store(new_state, Ordering::Release);
        if matches!(self.cell.derivation, Derivation::Latch) {
            self.cell.mutable.store(false, Ordering::Release);
        }
        self.cell.notifying.store(false, Ordering::Release);
    }

    fn notify(&self, new_state: bool) {
        let live: Vec<LiveListener> = {
            let mut listeners = self.cell.listeners.lock();
            let Some(listeners) = listeners.as_mut() else {
                return;
            };
            listeners.retain(Listener::is_alive);
            listeners.iter().filter_map(Listener::upgrade).collect()
        };

        for listener in live {
            match listener {
                LiveListener::Mirror(cell) => {
                    let dependent = StateOperator { cell };
                    let _writer = dependent.cell.writer.lock();
                    dependent.commit(new_state);
                }
                LiveListener::Composite(cell) => {
                    StateOperator { cell }.reevaluate(&self.cell, new_state);
                }
                LiveListener::External(listener) => listener.on_state_change(self, new_state),
            }
        }
    }
}

impl Default for StateOperator {
    /// A mutable operator starting out false
    fn default() -> Self {
        Self::mutable(false)
    }
}

impl fmt::Debug for StateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateOperator")
            .field("kind", &self.kind())
            .field("state", &self.get_state())
            .field("mutable", &self.is_mutable())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Mutex<Vec<(bool, bool)>>,
    }

    impl StateListener for Recorder {
        fn on_state_change(&self, source: &StateOperator, new_state: bool) {
            self.seen.lock().push((source.get_state(), new_state));
        }
    }

    fn recorder() -> Arc<Recorder> {
        Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        })
    }

    struct Members(Vec<StateOperator>);

    impl MemberStates for Members {
        fn visit_member_states(
            &self,
            _role: MemberRole,
            visitor: &mut dyn FnMut(&StateOperator) -> bool,
        ) {
            for member in &self.0 {
                if !visitor(member) {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_set_and_get() {
        let op = StateOperator::mutable(false);
        assert!(!op.get_state());
        op.set_state(true);
        assert!(op.get_state());
        assert_eq!(op.kind(), DerivationKind::Plain);
    }

    #[test]
    fn test_fixed_ignores_writes() {
        let op = StateOperator::fixed(true);
        op.set_state(false);
        assert!(op.get_state());
        assert!(!op.is_mutable());
    }

    #[test]
    fn test_listener_hears_before_commit() {
        let op = StateOperator::mutable(false);
        let rec = recorder();
        let listener: Arc<dyn StateListener> = rec.clone();
        op.attach_listener(&listener);

        op.set_state(true);
        op.set_state(true); // unchanged, silent
        op.set_state(false);

        assert_eq!(*rec.seen.lock(), vec![(false, true), (true, false)]);
    }

    #[test]
    fn test_dropped_listener_detaches() {
        let op = StateOperator::mutable(false);
        let listener: Arc<dyn StateListener> = recorder();
        op.attach_listener(&listener);
        assert_eq!(op.listener_count(), 1);
        drop(listener);
        assert_eq!(op.listener_count(), 0);
        op.set_state(true);
        assert!(op.get_state());
    }

    #[test]
    fn test_detach_listener() {
        let op = StateOperator::mutable(false);
        let rec = recorder();
        let listener: Arc<dyn StateListener> = rec.clone();
        op.attach_listener(&listener);
        op.detach_listener(&listener);
        op.set_state(true);
        assert!(rec.seen.lock().is_empty());
    }

    #[test]
    fn test_latch_freezes_after_first_change() {
        let latch = StateOperator::latch(false);
        assert!(latch.is_mutable());
        latch.set_state(true);
        assert!(latch.get_state());
        assert!(!latch.is_mutable());
        latch.set_state(false);
        assert!(latch.get_state());
    }

    #[test]
    fn test_latch_unchanged_write_keeps_it_open() {
        let latch = StateOperator::latch(false);
        latch.set_state(false);
        assert!(latch.is_mutable());
    }

    #[test]
    fn test_dependent_mirrors_parent() {
        let parent = StateOperator::mutable(true);
        let child = StateOperator::dependent(&parent);
        assert!(child.get_state());
        assert!(!child.is_mutable());

        child.set_state(false);
        assert!(child.get_state());

        parent.set_state(false);
        assert!(!child.get_state());
    }

    #[test]
    fn test_dependent_chain() {
        let root = StateOperator::mutable(false);
        let middle = StateOperator::dependent(&root);
        let leaf = StateOperator::dependent(&middle);
        root.set_state(true);
        assert!(middle.get_state());
        assert!(leaf.get_state());
    }

    #[test]
    fn test_dropped_dependent_detaches_from_parent() {
        let parent = StateOperator::mutable(false);
        let child = StateOperator::dependent(&parent);
        assert_eq!(parent.listener_count(), 1);
        drop(child);
        assert_eq!(parent.listener_count(), 0);
    }

    #[test]
    fn test_and_or_compute_on_read() {
        let a = StateOperator::mutable(true);
        let b = StateOperator::mutable(false);
        let and = StateOperator::all_of([a.clone(), b.clone()]);
        let or = StateOperator::any_of([a.clone(), b.clone()]);
        assert!(!and.get_state());
        assert!(or.get_state());

        b.set_state(true);
        assert!(and.get_state());

        a.set_state(false);
        b.set_state(false);
        assert!(!or.get_state());

        or.set_state(true);
        assert!(!or.get_state());
        assert!(!or.is_mutable());
    }

    #[test]
    fn test_empty_combinations() {
        assert!(StateOperator::all_of([]).get_state());
        assert!(!StateOperator::any_of([]).get_state());
    }

    #[test]
    fn test_aggregate_any_and_all() {
        let members = vec![StateOperator::mutable(false), StateOperator::mutable(true)];
        let source: Arc<dyn MemberStates> = Arc::new(Members(members.clone()));
        let any = StateOperator::aggregate(
            Arc::downgrade(&source),
            AggregateMode::Any,
            MemberRole::Death,
            false,
        );
        let all = StateOperator::aggregate(
            Arc::downgrade(&source),
            AggregateMode::All,
            MemberRole::Death,
            false,
        );

        assert!(any.get_state());
        assert!(!all.get_state());
        assert_eq!(any.kind(), DerivationKind::AggregateAny);

        members[0].set_state(true);
        assert!(all.get_state());

        members[0].set_state(false);
        members[1].set_state(false);
        assert!(!any.get_state());
    }

    #[test]
    fn test_mutable_aggregate_pushes_to_members() {
        let members = vec![StateOperator::mutable(false), StateOperator::mutable(false)];
        let source: Arc<dyn MemberStates> = Arc::new(Members(members.clone()));
        let all = StateOperator::aggregate(
            Arc::downgrade(&source),
            AggregateMode::All,
            MemberRole::Death,
            true,
        );

        all.set_state(true);
        assert!(members.iter().all(StateOperator::get_state));
        assert!(all.get_state());
    }

    #[test]
    fn test_aggregate_outliving_source() {
        let source: Arc<dyn MemberStates> = Arc::new(Members(vec![StateOperator::fixed(false)]));
        let weak = Arc::downgrade(&source);
        let any = StateOperator::aggregate(weak.clone(), AggregateMode::Any, MemberRole::Death, false);
        let all = StateOperator::aggregate(weak, AggregateMode::All, MemberRole::Death, false);
        drop(source);
        assert!(!any.get_state());
        assert!(all.get_state());
    }

    #[test]
    fn test_dependent_of_combination_follows_flips() {
        let a = StateOperator::mutable(false);
        let b = StateOperator::mutable(false);
        let either = StateOperator::any_of([a.clone(), b.clone()]);
        let follower = StateOperator::dependent(&either);
        assert!(!follower.get_state());

        a.set_state(true);
        assert!(follower.get_state());
        b.set_state(true);
        a.set_state(false);
        assert!(follower.get_state());
        b.set_state(false);
        assert!(!follower.get_state());
    }

    #[test]
    fn test_combination_announces_only_its_own_flips() {
        let a = StateOperator::mutable(true);
        let b = StateOperator::mutable(false);
        let both = StateOperator::all_of([a.clone(), b.clone()]);
        let rec = recorder();
        let listener: Arc<dyn StateListener> = rec.clone();
        both.attach_listener(&listener);

        a.set_state(false); // false -> false
        b.set_state(true); // still false
        a.set_state(true); // flips to true
        b.set_state(false); // flips back

        assert_eq!(*rec.seen.lock(), vec![(false, true), (true, false)]);
    }

    #[test]
    fn test_nested_combinations_propagate() {
        let a = StateOperator::mutable(false);
        let b = StateOperator::mutable(true);
        let c = StateOperator::mutable(false);
        let inner = StateOperator::all_of([a.clone(), b.clone()]);
        let outer = StateOperator::any_of([inner, c.clone()]);
        let follower = StateOperator::dependent(&outer);

        a.set_state(true);
        assert!(follower.get_state());
        b.set_state(false);
        assert!(!follower.get_state());
        c.set_state(true);
        assert!(follower.get_state());
    }

    #[test]
    fn test_observed_aggregate_announces_member_changes() {
        let members = vec![StateOperator::mutable(false), StateOperator::mutable(false)];
        let source: Arc<dyn MemberStates> = Arc::new(Members(members.clone()));
        let all = StateOperator::aggregate(
            Arc::downgrade(&source),
            AggregateMode::All,
            MemberRole::Death,
            false,
        );
        for member in &members {
            all.observe(member);
            all.observe(member);
        }
        assert_eq!(members[0].listener_count(), 1);
        let follower = StateOperator::dependent(&all);

        members[0].set_state(true);
        assert!(!follower.get_state());
        members[1].set_state(true);
        assert!(follower.get_state());
    }

    #[test]
    fn test_observe_ignores_plain_operators() {
        let plain = StateOperator::mutable(false);
        let other = StateOperator::mutable(false);
        plain.observe(&other);
        assert_eq!(other.listener_count(), 0);
    }

    struct Flipper;

    impl StateListener for Flipper {
        fn on_state_change(&self, source: &StateOperator, new_state: bool) {
            source.set_state(!new_state);
        }
    }

    #[test]
    fn test_nested_write_during_notification_is_ignored() {
        let op = StateOperator::mutable(false);
        let listener: Arc<dyn StateListener> = Arc::new(Flipper);
        op.attach_listener(&listener);
        op.set_state(true);
        assert!(op.get_state());
    }
}
