//! Property-based tests for event processing order

use super::*;
use crate::effect::EffectRouter;
use crate::state_machine::Next;
use crate::testing::RecordingConsumer;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add(i8),
    Double,
    Keep,
    Announce,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<i8>().prop_map(Op::Add),
        1 => Just(Op::Double),
        1 => Just(Op::Keep),
        2 => Just(Op::Announce),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(arb_op(), 0..40)
}

fn apply(model: i64, op: Op) -> Option<i64> {
    match op {
        Op::Add(n) => Some(model.wrapping_add(i64::from(n))),
        Op::Double => Some(model.wrapping_mul(2)),
        Op::Keep | Op::Announce => None,
    }
}

/// Add and Double move the model; Announce emits the current model as an
/// effect; Keep does nothing.
fn update(model: &i64, op: &Op) -> Next<i64, i64> {
    match apply(*model, *op) {
        Some(next) => Next::next(next),
        None if *op == Op::Announce => Next::dispatch([*model]),
        None => Next::no_change(),
    }
}

fn announcer(announced: &RecordingConsumer<i64>) -> EffectRouter<i64, Op> {
    let sink = announced.consumer();
    EffectRouter::new()
        .route_matching(|_| true)
        .to_side_effect(move |n| sink(n))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// An observer registered before any event sees the start model followed
    /// by the left fold of the update function over the event sequence.
    #[test]
    fn prop_observer_sees_left_fold(start in any::<i32>(), ops in arb_ops()) {
        let announced = RecordingConsumer::new();
        let event_loop = loop_builder(update, announcer(&announced).as_connectable())
            .start(i64::from(start))
            .unwrap();
        let models = RecordingConsumer::new();
        event_loop.add_observer(models.observer()).unwrap();

        let mut expected_models = vec![i64::from(start)];
        let mut expected_announced = Vec::new();
        let mut model = i64::from(start);
        for op in &ops {
            event_loop.dispatch_event(*op);
            if let Some(next) = apply(model, *op) {
                model = next;
                expected_models.push(model);
            } else if *op == Op::Announce {
                expected_announced.push(model);
            }
        }

        prop_assert_eq!(models.values(), expected_models);
        prop_assert_eq!(announced.values(), expected_announced);
        prop_assert_eq!(event_loop.model(), model);
    }

    /// When an effect runs, observers have already seen the model produced
    /// by the update that emitted it.
    #[test]
    fn prop_model_published_before_effects(ops in arb_ops()) {
        let models = RecordingConsumer::new();
        let seen_at_effect = Arc::new(Mutex::new(Vec::new()));

        let observed = models.clone();
        let witness = seen_at_effect.clone();
        let router = EffectRouter::<i64, Op>::new()
            .route_matching(|_| true)
            .to_side_effect(move |n| {
                let last = observed.values().last().copied();
                witness.lock().unwrap().push((n, last));
            });
        let next_with_effect = |model: &i64, op: &Op| match apply(*model, *op) {
            Some(next) => Next::next_with(next, [next]),
            None => Next::no_change(),
        };
        let event_loop = loop_builder(next_with_effect, router.as_connectable())
            .start(0)
            .unwrap();
        event_loop.add_observer(models.observer()).unwrap();

        for op in &ops {
            event_loop.dispatch_event(*op);
        }

        for (effect, last_seen) in seen_at_effect.lock().unwrap().iter() {
            prop_assert_eq!(Some(*effect), *last_seen);
        }
    }

    /// Nothing is observed or executed once the loop is disposed, whatever
    /// point in the sequence that happens at.
    #[test]
    fn prop_dispose_stops_everything(ops in arb_ops(), cut in 0usize..40) {
        let announced = RecordingConsumer::new();
        let event_loop = loop_builder(update, announcer(&announced).as_connectable())
            .start(0)
            .unwrap();
        let models = RecordingConsumer::new();
        event_loop.add_observer(models.observer()).unwrap();

        let cut = cut.min(ops.len());
        for op in &ops[..cut] {
            event_loop.dispatch_event(*op);
        }
        event_loop.dispose();
        let (seen, emitted, model) = (models.len(), announced.len(), event_loop.model());
        for op in &ops[cut..] {
            event_loop.dispatch_event(*op);
        }
        event_loop.replace_model(model.wrapping_add(1));

        prop_assert_eq!(models.len(), seen);
        prop_assert_eq!(announced.len(), emitted);
        prop_assert_eq!(event_loop.model(), model);
        prop_assert!(!event_loop.is_running());
    }
}
