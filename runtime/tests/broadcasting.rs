//! Integration tests for Store action broadcasting
//!
//! Request/settle flows wait on the action broadcast for the settlement
//! produced by a remote call.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use taskboard_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use taskboard_runtime::{Store, StoreError};

// ============================================================================
// Test Fixtures
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum LookupAction {
    /// Ask the fake backend for a value
    Lookup { key: u64 },
    /// The fake backend answered
    Found { key: u64, value: String },
    /// The fake backend refused
    Missing { key: u64 },
    /// Local edit, no effects
    Touch,
}

#[derive(Debug, Clone, Default)]
struct LookupState {
    in_flight: usize,
    found: Vec<u64>,
    touched: u32,
}

#[derive(Clone)]
struct LookupEnvironment;

#[derive(Clone)]
struct LookupReducer;

impl Reducer for LookupReducer {
    type State = LookupState;
    type Action = LookupAction;
    type Environment = LookupEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            LookupAction::Lookup { key } => {
                state.in_flight += 1;
                smallvec![Effect::future(async move {
                    tokio::time::sleep(Duration::from_millis(5 * (key % 3))).await;
                    if key % 2 == 0 {
                        Some(LookupAction::Found {
                            key,
                            value: format!("value-{key}"),
                        })
                    } else {
                        Some(LookupAction::Missing { key })
                    }
                })]
            }
            LookupAction::Found { key, .. } => {
                state.in_flight -= 1;
                state.found.push(key);
                smallvec![]
            }
            LookupAction::Missing { .. } => {
                state.in_flight -= 1;
                smallvec![]
            }
            LookupAction::Touch => {
                state.touched += 1;
                smallvec![]
            }
        }
    }
}

fn store() -> Store<LookupState, LookupAction, LookupEnvironment, LookupReducer> {
    Store::new(LookupState::default(), LookupReducer, LookupEnvironment)
}

fn is_settlement(key: u64) -> impl Fn(&LookupAction) -> bool {
    move |action| {
        matches!(action,
            LookupAction::Found { key: k, .. } | LookupAction::Missing { key: k } if *k == key)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn send_and_wait_for_returns_success_settlement() {
    let store = store();

    let result = store
        .send_and_wait_for(LookupAction::Lookup { key: 4 }, is_settlement(4), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(
        result,
        LookupAction::Found {
            key: 4,
            value: "value-4".to_string()
        }
    );
    assert_eq!(store.state(|s| s.found.clone()).await, vec![4]);
}

#[tokio::test]
async fn send_and_wait_for_returns_failure_settlement() {
    let store = store();

    let result = store
        .send_and_wait_for(LookupAction::Lookup { key: 7 }, is_settlement(7), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(result, LookupAction::Missing { key: 7 });
    assert_eq!(store.state(|s| s.in_flight).await, 0);
}

#[tokio::test]
async fn send_and_wait_for_times_out() {
    let store = store();

    let result = store
        .send_and_wait_for(LookupAction::Touch, |_| true, Duration::from_millis(30))
        .await;

    assert!(matches!(result, Err(StoreError::Timeout)));
}

#[tokio::test]
async fn concurrent_waiters_get_their_own_settlement() {
    let store = Arc::new(store());

    let mut handles = vec![];
    for key in 1..=6 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .send_and_wait_for(LookupAction::Lookup { key }, is_settlement(key), Duration::from_secs(2))
                .await
        }));
    }

    for (idx, handle) in handles.into_iter().enumerate() {
        let key = idx as u64 + 1;
        let action = handle.await.expect("task panicked").unwrap();
        assert!(is_settlement(key)(&action), "wrong settlement for {key}: {action:?}");
    }

    assert_eq!(store.state(|s| s.in_flight).await, 0);
}

#[tokio::test]
async fn directly_sent_actions_are_not_broadcast() {
    let store = store();
    let mut rx = store.subscribe_actions();

    let mut handle = store.send(LookupAction::Lookup { key: 2 }).await.unwrap();
    handle.wait().await;

    let first = rx.try_recv().unwrap();
    assert!(matches!(first, LookupAction::Found { key: 2, .. }));
    assert!(rx.try_recv().is_err(), "Lookup itself must not be broadcast");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn broadcast_settlements_are_already_reduced() {
    let store = store();
    let mut rx = store.subscribe_actions();

    let observer = {
        let store = store.clone();
        tokio::spawn(async move {
            let mut seen = 0;
            while seen < 6 {
                let action = rx.recv().await.unwrap();
                if let LookupAction::Found { key, .. } = action {
                    assert!(store.state(|s| s.found.contains(&key)).await, "{key} broadcast before reduce");
                }
                seen += 1;
            }
        })
    };

    for key in 1..=6 {
        let _ = store.send(LookupAction::Lookup { key }).await.unwrap();
    }

    tokio::time::timeout(Duration::from_secs(2), observer)
        .await
        .expect("observer timed out")
        .expect("observer panicked");
    assert_eq!(store.state(|s| s.in_flight).await, 0);
}
