//! Integration tests for handler lifecycle and state propagation

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use handled::handler::{Actor, ActorHandler, Handled, Handler, HandlerType};
use handled::state::{AggregateMode, MemberRole, StateListener, StateOperator};

/// An actor that counts its ticks and can run a hook while acting
struct Counter {
    dead: StateOperator,
    acts: AtomicUsize,
    hook: Mutex<Option<Box<dyn FnMut() + Send>>>,
}

impl Counter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            dead: StateOperator::default(),
            acts: AtomicUsize::new(0),
            hook: Mutex::new(None),
        })
    }

    fn acts(&self) -> usize {
        self.acts.load(Ordering::SeqCst)
    }

    fn on_act(&self, hook: impl FnMut() + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    fn kill(&self) {
        self.dead.set_state(true);
    }
}

impl Handled for Counter {
    fn is_dead(&self) -> &StateOperator {
        &self.dead
    }
}

impl Actor for Counter {
    fn act(&self, _delta_time: f64) {
        self.acts.fetch_add(1, Ordering::SeqCst);
        if let Some(hook) = self.hook.lock().unwrap().as_mut() {
            hook();
        }
    }
}

#[test]
fn test_add_during_dispatch_is_deferred() {
    let actors = ActorHandler::new(HandlerType::Actor);
    let spawner = Counter::new();
    let child = Counter::new();

    let weak_actors = Arc::downgrade(&actors);
    let spawned = child.clone();
    spawner.on_act(move || {
        if let Some(actors) = weak_actors.upgrade() {
            actors.add(spawned.clone());
        }
    });
    actors.add(spawner.clone());

    actors.act(0.1);
    assert_eq!(child.acts(), 0, "child must not run in the pass that added it");
    assert_eq!(actors.handled_count(), 2);

    actors.act(0.1);
    assert_eq!(child.acts(), 1);
    assert_eq!(spawner.acts(), 2);
}

#[test]
fn test_short_circuit_still_sweeps_dead() {
    let handler = Handler::<dyn Actor>::new(HandlerType::Custom("sweep"));
    let members: Vec<Arc<Counter>> = (0..4).map(|_| Counter::new()).collect();
    for member in &members {
        handler.add(member.clone());
    }
    handler.settle();
    members[2].kill();
    members[3].kill();

    let mut calls = 0;
    handler.dispatch(false, |_| {
        calls += 1;
        false
    });

    assert_eq!(calls, 1);
    assert_eq!(handler.handled_count(), 2);
    assert!(!handler.contains(&(members[2].clone() as Arc<dyn Actor>)));
}

#[test]
fn test_duplicate_add_and_remove_are_idempotent() {
    let actors = ActorHandler::new(HandlerType::Actor);
    let counter = Counter::new();
    let member: Arc<dyn Actor> = counter.clone();

    assert!(actors.add(member.clone()));
    assert!(!actors.add(member.clone()));
    actors.act(0.1);
    assert_eq!(counter.acts(), 1);
    assert_eq!(actors.handled_count(), 1);

    assert!(actors.remove(&member));
    assert!(!actors.remove(&member));
    actors.settle();
    assert!(actors.is_empty());
    assert!(!actors.remove(&member));
}

#[test]
fn test_remove_cancels_pending_admission() {
    let actors = ActorHandler::new(HandlerType::Actor);
    let counter = Counter::new();
    let member: Arc<dyn Actor> = counter.clone();

    actors.add(member.clone());
    assert!(actors.remove(&member));
    actors.act(0.1);
    assert_eq!(counter.acts(), 0);
    assert!(actors.is_empty());
}

#[test]
fn test_auto_death_after_members_die() {
    let actors = ActorHandler::with_auto_death(HandlerType::Actor);
    assert!(!actors.is_dead().get_state(), "unstarted handler is alive");

    let first = Counter::new();
    let second = Counter::new();
    actors.add(first.clone());
    actors.add(second.clone());
    actors.act(0.1);

    first.kill();
    assert!(!actors.is_dead().get_state());
    second.kill();
    assert!(actors.is_dead().get_state());
}

#[test]
fn test_plain_handler_survives_empty() {
    let actors = ActorHandler::new(HandlerType::Actor);
    let counter = Counter::new();
    actors.add(counter.clone());
    counter.kill();
    actors.act(0.1);
    assert!(actors.is_empty());
    assert!(!actors.is_dead().get_state());

    actors.kill();
    assert!(actors.is_dead().get_state());
}

#[test]
fn test_dead_member_skipped_and_counted_out() {
    let actors = ActorHandler::new(HandlerType::Actor);
    let members: Vec<Arc<Counter>> = (0..3).map(|_| Counter::new()).collect();
    for member in &members {
        actors.add(member.clone());
    }
    members[1].kill();

    let mut calls = 0;
    actors.dispatch(false, |member| {
        member.act(0.0);
        calls += 1;
        true
    });

    assert_eq!(calls, 2);
    assert_eq!(actors.handled_count(), 2);
    assert_eq!(members[1].acts(), 0);
}

#[test]
fn test_member_killed_mid_pass_never_resurfaces() {
    let actors = ActorHandler::new(HandlerType::Actor);
    let victim = Counter::new();
    let killer = Counter::new();

    let target = victim.clone();
    killer.on_act(move || target.kill());
    actors.add(killer.clone());
    actors.add(victim.clone());

    actors.act(0.1);
    assert_eq!(victim.acts(), 0);
    assert_eq!(actors.handled_count(), 1);

    actors.act(0.1);
    actors.act(0.1);
    assert_eq!(victim.acts(), 0);
}

#[test]
fn test_panicking_member_does_not_abort_pass() {
    let actors = ActorHandler::new(HandlerType::Actor);
    let faulty = Counter::new();
    let healthy = Counter::new();
    faulty.on_act(|| panic!("member blew up"));
    actors.add(faulty.clone());
    actors.add(healthy.clone());

    actors.act(0.1);
    assert_eq!(healthy.acts(), 1);
    assert_eq!(actors.handled_count(), 2);
}

#[test]
fn test_shared_member_reaped_everywhere() {
    let left = ActorHandler::new(HandlerType::Actor);
    let right = ActorHandler::new(HandlerType::Custom("right"));
    let shared = Counter::new();
    left.add(shared.clone());
    right.add(shared.clone());
    left.act(0.1);
    right.act(0.1);

    shared.kill();
    left.act(0.1);
    right.act(0.1);
    assert!(left.is_empty());
    assert!(right.is_empty());
}

#[test]
fn test_ordering_applies_to_admissions() {
    struct Ranked {
        dead: StateOperator,
        rank: i32,
        log: Arc<Mutex<Vec<i32>>>,
    }

    impl Handled for Ranked {
        fn is_dead(&self) -> &StateOperator {
            &self.dead
        }
    }

    impl Actor for Ranked {
        fn act(&self, _delta_time: f64) {
            self.log.lock().unwrap().push(self.rank);
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let handler = Handler::<Ranked>::new(HandlerType::Custom("ranked"));
    handler.set_ordering(|a: &Ranked, b: &Ranked| a.rank.cmp(&b.rank));
    for rank in [3, 1, 2] {
        handler.add(Arc::new(Ranked {
            dead: StateOperator::default(),
            rank,
            log: log.clone(),
        }));
    }

    handler.dispatch(true, |member| {
        member.act(0.0);
        true
    });
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_handling_aggregate_tracks_members() {
    let actors = ActorHandler::new(HandlerType::Actor);
    let inner = ActorHandler::new(HandlerType::Actor);
    actors.add(inner.clone());
    actors.settle();

    let any_enabled = actors.aggregate(
        AggregateMode::Any,
        MemberRole::Handling(HandlerType::Actor),
        false,
    );
    assert!(any_enabled.get_state());

    if let Some(ops) = inner.handling_operators() {
        ops.set(HandlerType::Actor, StateOperator::fixed(false));
    }
    assert!(!any_enabled.get_state());
}

#[test]
fn test_latch_freezes() {
    let latch = StateOperator::latch(false);
    latch.set_state(true);
    assert!(latch.get_state());
    latch.set_state(false);
    assert!(latch.get_state());
    assert!(!latch.is_mutable());
}

#[test]
fn test_dependent_death_chain() {
    let parent = Counter::new();
    let child = Arc::new(Counter {
        dead: StateOperator::dependent(&parent.dead),
        acts: AtomicUsize::new(0),
        hook: Mutex::new(None),
    });

    let actors = ActorHandler::new(HandlerType::Actor);
    actors.add(parent.clone());
    actors.add(child.clone());
    actors.act(0.1);
    assert_eq!(child.acts(), 1);

    parent.kill();
    actors.act(0.1);
    assert!(child.dead.get_state());
    assert!(actors.is_empty());
}

#[test]
fn test_dependent_follows_explicit_kill() {
    let actors = ActorHandler::with_auto_death(HandlerType::Actor);
    let follower = StateOperator::dependent(actors.is_dead());
    actors.add(Counter::new());
    actors.act(0.1);

    actors.kill();
    assert!(actors.is_dead().get_state());
    assert!(follower.get_state());
}

#[test]
fn test_dependent_follows_last_member_dying() {
    let actors = ActorHandler::with_auto_death(HandlerType::Actor);
    let follower = StateOperator::dependent(actors.is_dead());
    let first = Counter::new();
    let second = Counter::new();
    actors.add(first.clone());
    actors.add(second.clone());
    assert!(!follower.get_state());

    first.kill();
    assert!(!follower.get_state());
    second.kill();
    assert!(follower.get_state());
}

#[test]
fn test_child_dies_with_auto_death_parent() {
    let parent = ActorHandler::with_auto_death(HandlerType::Actor);
    let member = Counter::new();
    parent.add(member.clone());

    let child = Arc::new(Counter {
        dead: StateOperator::dependent(parent.is_dead()),
        acts: AtomicUsize::new(0),
        hook: Mutex::new(None),
    });
    let outer = ActorHandler::new(HandlerType::Actor);
    outer.add(child.clone());
    outer.act(0.1);
    assert_eq!(child.acts(), 1);

    member.kill();
    outer.act(0.1);
    assert_eq!(child.acts(), 1);
    assert!(outer.is_empty());
}

#[test]
fn test_listener_hears_handler_death_once() {
    struct Mourner {
        heard: AtomicUsize,
    }

    impl StateListener for Mourner {
        fn on_state_change(&self, _source: &StateOperator, new_state: bool) {
            if new_state {
                self.heard.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    let actors = ActorHandler::with_auto_death(HandlerType::Actor);
    let mourner = Arc::new(Mourner {
        heard: AtomicUsize::new(0),
    });
    let listener: Arc<dyn StateListener> = mourner.clone();
    actors.is_dead().attach_listener(&listener);

    let member = Counter::new();
    actors.add(member.clone());
    member.kill();
    actors.kill();
    actors.act(0.1);

    assert_eq!(mourner.heard.load(Ordering::SeqCst), 1);
}

#[test]
fn test_member_aggregate_announces_membership_changes() {
    let actors = ActorHandler::new(HandlerType::Actor);
    let any_dead = actors.aggregate(AggregateMode::Any, MemberRole::Death, false);
    let follower = StateOperator::dependent(&any_dead);

    let doomed = Counter::new();
    actors.add(doomed.clone());
    actors.act(0.1);
    doomed.kill();
    assert!(follower.get_state());

    actors.act(0.1);
    assert!(actors.is_empty());
    assert!(!follower.get_state());
}

#[test]
fn test_concurrent_membership_changes_during_dispatch() {
    const WORKERS: usize = 4;
    const ROUNDS: usize = 200;

    let actors = ActorHandler::new(HandlerType::Actor);
    let keepers: Vec<Arc<Counter>> = (0..WORKERS).map(|_| Counter::new()).collect();
    let running = AtomicBool::new(true);

    thread::scope(|scope| {
        scope.spawn(|| {
            while running.load(Ordering::SeqCst) {
                actors.act(0.001);
            }
        });

        let workers: Vec<_> = keepers
            .iter()
            .map(|keeper| {
                let actors = &actors;
                scope.spawn(move || {
                    for round in 0..ROUNDS {
                        let transient = Counter::new();
                        let member: Arc<dyn Actor> = transient.clone();
                        actors.add(member.clone());
                        match round % 3 {
                            0 => {
                                actors.remove(&member);
                            }
                            1 => transient.kill(),
                            _ => {
                                thread::yield_now();
                                actors.remove(&member);
                            }
                        }
                    }
                    actors.add(keeper.clone());
                })
            })
            .collect();

        for worker in workers {
            worker.join().expect("worker thread panicked");
        }
        running.store(false, Ordering::SeqCst);
    });

    actors.act(0.001);
    actors.act(0.001);
    assert_eq!(actors.handled_count(), WORKERS);
    for keeper in &keepers {
        assert!(actors.contains(&(keeper.clone() as Arc<dyn Actor>)));
    }

    let before: Vec<usize> = keepers.iter().map(|keeper| keeper.acts()).collect();
    actors.act(0.001);
    for (keeper, acts) in keepers.iter().zip(before) {
        assert_eq!(keeper.acts(), acts + 1);
    }
}
