//! Property-based tests for routing and effect tracking

use super::*;
use crate::connectable::Connectable;
use crate::error::LoopError;
use crate::testing::{ControlledHandler, RecordingConsumer, RecordingErrorHook};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// A route as a set of residues: it matches `n` when `n % 8` is in the set.
fn arb_route() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0u8..8, 0..4)
}

fn arb_routes() -> impl Strategy<Value = Vec<Vec<u8>>> {
    proptest::collection::vec(arb_route(), 1..5)
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Dispatch,
    Send(usize),
    End(usize),
    Drop(usize),
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::Dispatch),
        2 => (0usize..16).prop_map(Step::Send),
        2 => (0usize..16).prop_map(Step::End),
        1 => (0usize..16).prop_map(Step::Drop),
    ]
}

// ============================================================================
// Router
// ============================================================================

proptest! {
    /// Exactly one handler runs when exactly one route matches; otherwise
    /// the error hook sees the match count and nothing is dispatched.
    #[test]
    fn prop_router_dispatches_exactly_once(routes in arb_routes(), effect in 0u8..32) {
        let errors = RecordingErrorHook::new();
        let hits: Vec<Arc<AtomicUsize>> = routes.iter().map(|_| Arc::new(AtomicUsize::new(0))).collect();

        let mut router = EffectRouter::<u8, usize>::new().with_error_hook(errors.hook());
        for (index, residues) in routes.iter().enumerate() {
            let residues = residues.clone();
            let hit = hits[index].clone();
            router = router
                .route_matching(move |n: &u8| residues.contains(&(n % 8)))
                .to_side_effect(move |_| {
                    hit.fetch_add(1, Ordering::SeqCst);
                });
        }
        let connection = router
            .as_connectable()
            .connect(RecordingConsumer::new().consumer())
            .unwrap();

        connection.accept(effect);

        let expected: Vec<usize> = routes
            .iter()
            .enumerate()
            .filter(|(_, residues)| residues.contains(&(effect % 8)))
            .map(|(index, _)| index)
            .collect();
        let total_hits: usize = hits.iter().map(|h| h.load(Ordering::SeqCst)).sum();

        if expected.len() == 1 {
            prop_assert_eq!(total_hits, 1);
            prop_assert_eq!(hits[expected[0]].load(Ordering::SeqCst), 1);
            prop_assert!(errors.errors().is_empty());
        } else {
            prop_assert_eq!(total_hits, 0);
            prop_assert_eq!(
                errors.errors(),
                vec![LoopError::routing(expected.len(), &effect, expected.clone())]
            );
        }
    }
}

// ============================================================================
// Callback
// ============================================================================

proptest! {
    #[test]
    fn prop_callback_hook_runs_once(sends_before in 0usize..5, ends in 1usize..6, sends_after in 0usize..5) {
        let outputs = RecordingConsumer::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let callback = EffectCallback::new(outputs.consumer(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for n in 0..sends_before {
            callback.send(n);
        }
        for _ in 0..ends {
            callback.end();
        }
        for n in 0..sends_after {
            callback.send(100 + n);
        }
        drop(callback);

        prop_assert_eq!(count.load(Ordering::SeqCst), 1);
        prop_assert_eq!(outputs.values(), (0..sends_before).collect::<Vec<_>>());
    }
}

// ============================================================================
// Executor
// ============================================================================

proptest! {
    /// Whatever mix of sends, ends and abandonment happens first, the table
    /// holds exactly the unfinished effects and dispose clears all of them.
    #[test]
    fn prop_executor_dispose_ends_all_in_flight(steps in proptest::collection::vec(arb_step(), 0..40)) {
        let handler = ControlledHandler::<usize, usize>::new();
        let outputs = RecordingConsumer::new();
        let executor = EffectExecutor::new(Arc::new(handler.clone()), outputs.consumer());

        let mut dispatched = 0usize;
        let mut finished = vec![];
        for step in steps {
            match step {
                Step::Dispatch => {
                    executor.handle(dispatched);
                    finished.push(false);
                    dispatched += 1;
                }
                Step::Send(i) => {
                    if let Some(callback) = handler.held(i) {
                        callback.send(i);
                    }
                }
                Step::End(i) => {
                    if let Some(callback) = handler.held(i) {
                        callback.end();
                        finished[i] = true;
                    }
                }
                Step::Drop(i) if i < dispatched => {
                    handler.release(i);
                    finished[i] = true;
                }
                _ => {}
            }
        }

        let in_flight = finished.iter().filter(|done| !**done).count();
        prop_assert_eq!(executor.ongoing_count(), in_flight);

        executor.dispose();

        prop_assert_eq!(executor.ongoing_count(), 0);
        prop_assert_eq!(handler.cancellations(), in_flight);
        prop_assert!(handler.callbacks().iter().all(EffectCallback::is_ended));
    }
}
