//! # Taskboard Runtime
//!
//! Runtime for the Taskboard stores.
//!
//! This crate provides the [`Store`] that owns a piece of client state,
//! runs the reducer for every action and executes the returned effects.
//!
//! ## Core Components
//!
//! - **Store**: Manages state and executes effects
//! - **Effect Executor**: Runs effect descriptions and feeds produced actions back
//! - **Subscriptions**: State revisions (for re-rendering views) and an
//!   action broadcast (for request/response style waiting)
//!
//! ## Example
//!
//! ```ignore
//! use taskboard_runtime::Store;
//!
//! let store = Store::new(TaskListState::default(), TaskListReducer::new(), env);
//!
//! // Dispatch and wait until the remote call has settled
//! let mut handle = store
//!     .send(TaskListAction::FetchTasksForUser { user_name: "alice".into() })
//!     .await?;
//! handle.wait().await;
//!
//! let count = store.state(|s| s.tasks.len()).await;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use taskboard_core::effect::{Effect, EffectId};
use taskboard_core::reducer::Reducer;
use tokio::sync::{RwLock, watch};
use tokio::task::AbortHandle;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after shutdown was initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Waiting on the handle returns once every
/// effect started by the action has finished, including effects started by
/// the actions those effects fed back into the store.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(SessionAction::Login { email, password }).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // The login request settled and any navigation effect has run
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new handle together with its internal tracking context
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of effects from this action tree that are still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    ///
    /// Aborted effects count as complete.
    pub async fn wait(&mut self) {
        wait_for_zero(&self.effects, &mut self.completion).await;
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all
    /// effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

async fn wait_for_zero(counter: &AtomicUsize, completion: &mut watch::Receiver<()>) {
    while counter.load(Ordering::SeqCst) > 0 {
        if completion.changed().await.is_err() {
            // Every tracker is gone, so nothing can still be running
            break;
        }
    }
}

/// Internal: tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            self.notifier.send_replace(());
        }
    }
}

/// Internal: RAII guard that decrements the effect counter on drop
///
/// Runs on normal completion, on panic and when the task is aborted.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Internal: the task currently occupying a cancellable slot
struct Slot {
    generation: u64,
    abort: AbortHandle,
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        AbortHandle, Arc, AtomicBool, AtomicCounterGuard, AtomicU64, AtomicUsize, DecrementGuard,
        Duration, Effect, EffectHandle, EffectId, EffectTracking, HashMap, Mutex, Ordering,
        PoisonError, Reducer, RwLock, Slot, StoreError, wait_for_zero,
    };
    use std::future::Future;
    use tokio::sync::{broadcast, watch};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (state transitions)
    /// 3. Environment (injected collaborators)
    /// 4. Effect execution (with feedback loop and cancellable slots)
    /// 5. Subscriptions (state revisions and produced actions)
    ///
    /// Cloning a Store is cheap; clones share state and subscriptions.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Every action produced by an effect is broadcast here right after
        /// it has been reduced.
        action_broadcast: broadcast::Sender<A>,
        /// Bumped after every reducer run; views watch it to re-render.
        revision: Arc<watch::Sender<u64>>,
        slots: Arc<Mutex<HashMap<EffectId, Slot>>>,
        next_generation: Arc<AtomicU64>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// The action broadcast buffers 16 actions; use
        /// [`Store::with_broadcast_capacity`] for chattier stores.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
        }

        /// Create a new Store with custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));
            let (revision, _) = watch::channel(0);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
                revision: Arc::new(revision),
                slots: Arc::new(Mutex::new(HashMap::new())),
                next_generation: Arc::new(AtomicU64::new(0)),
            }
        }

        /// Initiate graceful shutdown
        ///
        /// New actions sent through [`Store::send`] are rejected. Actions fed
        /// back by effects that are already running are still reduced.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if effects are still
        /// running when the timeout elapses.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running",
                        pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires the write lock on state
        /// 2. Calls the reducer with (state, action, environment)
        /// 3. Bumps the state revision
        /// 4. Starts the returned effects (before releasing the lock, so a
        ///    superseded slot is aborted before anyone else can reduce)
        ///
        /// `send()` returns once effects are started, not completed. Use the
        /// returned [`EffectHandle`] to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            let (handle, tracking) = EffectHandle::new();
            self.dispatch(action, tracking, false).await;
            Ok(handle)
        }

        /// Send an action and wait for a matching action produced by its effects
        ///
        /// Subscribes to the action broadcast before sending, so the result
        /// cannot be missed. The matching action has already been reduced
        /// when this returns.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action before the timeout
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged, {} actions skipped", skipped);
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to every action produced by effects
        ///
        /// Actions arrive after the reducer has applied them. Actions sent
        /// directly through [`Store::send`] are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Subscribe to state changes
        ///
        /// The receiver yields a revision number that increases after every
        /// reducer run. Read the state itself with [`Store::state`].
        #[must_use]
        pub fn subscribe_state(&self) -> watch::Receiver<u64> {
            self.revision.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let loading = store.state(|s| s.loading).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Reduce one action and start its effects under the given tracking
        ///
        /// With `publish` set, the action is broadcast once it has been
        /// reduced, still under the write lock. A task aborted while waiting
        /// for the lock therefore publishes nothing.
        async fn dispatch(&self, action: A, tracking: EffectTracking, publish: bool)
        where
            R: Clone,
            E: Clone,
        {
            tracing::debug!("Processing action");
            metrics::counter!("store.commands.total").increment(1);

            let mut state = self.state.write().await;
            let published = publish.then(|| action.clone());
            let effects = {
                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();
                self.reducer.reduce(&mut *state, action, &self.environment)
            };
            self.revision.send_modify(|revision| *revision += 1);

            if let Some(action) = published {
                // No receivers is fine
                let _ = self.action_broadcast.send(action);
            }

            tracing::trace!("Reducer completed, executing {} effects", effects.len());
            for effect in effects {
                self.execute_effect_internal(effect, tracking.clone());
            }
            drop(state);
        }

        /// Execute an effect with tracking
        ///
        /// - `None`: no-op
        /// - `Future` / `Delay`: spawned; a produced action is reduced under
        ///   the same tracking, then broadcast
        /// - `Parallel`: each child executed with the same tracking
        /// - `Sequential`: children run one after another in a spawned task
        /// - `Cancellable`: like `Future` / `Delay`, registered in a slot
        /// - `Cancel`: aborts the task occupying a slot
        ///
        /// A panicking effect is isolated in its task; the guards keep the
        /// counters correct.
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned into spawned tasks
        fn execute_effect_internal(&self, effect: Effect<A>, tracking: EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    self.spawn_effect(None, &tracking, fut);
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    self.spawn_effect(None, &tracking, async move {
                        tokio::time::sleep(duration).await;
                        Some(*action)
                    });
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    for effect in effects {
                        self.execute_effect_internal(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                    self.spawn_sequential(effects, &tracking);
                },
                Effect::Cancellable { id, effect } => {
                    metrics::counter!("store.effects.executed", "type" => "cancellable").increment(1);
                    match *effect {
                        Effect::Future(fut) => self.spawn_effect(Some(id), &tracking, fut),
                        Effect::Delay { duration, action } => {
                            self.spawn_effect(Some(id), &tracking, async move {
                                tokio::time::sleep(duration).await;
                                Some(*action)
                            });
                        },
                        other => {
                            tracing::debug!(slot = %id, "Effect cannot be aborted, running it without a slot");
                            self.execute_effect_internal(other, tracking);
                        },
                    }
                },
                Effect::Cancel(id) => {
                    metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);
                    self.cancel_slot(&id);
                },
            }
        }

        /// Spawn an action-producing future, optionally inside a slot
        fn spawn_effect<F>(&self, slot: Option<EffectId>, tracking: &EffectTracking, fut: F)
        where
            F: Future<Output = Option<A>> + Send + 'static,
            R: Clone,
            E: Clone,
        {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            // Built before spawning so an abort ahead of the first poll still releases them
            let guard = DecrementGuard(tracking.clone());

            let slot = slot.map(|id| (id, self.next_generation.fetch_add(1, Ordering::SeqCst)));
            let task_slot = slot.clone();
            let tracking = tracking.clone();
            let store = self.clone();

            let join = tokio::spawn(async move {
                let _guard = guard;
                let _pending_guard = pending_guard;

                if let Some(action) = fut.await {
                    tracing::trace!("Effect produced an action, sending to store");
                    store.dispatch(action, tracking, true).await;
                } else {
                    tracing::trace!("Effect completed with no action");
                }

                if let Some((id, generation)) = task_slot {
                    store.release_slot(&id, generation);
                }
            });

            if let Some((id, generation)) = slot {
                let previous = self
                    .slots
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(id.clone(), Slot {
                        generation,
                        abort: join.abort_handle(),
                    });
                if let Some(previous) = previous {
                    Self::abort_slot(&id, &previous.abort, "superseded");
                }
            }
        }

        fn spawn_sequential(&self, effects: Vec<Effect<A>>, tracking: &EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            let guard = DecrementGuard(tracking.clone());
            let store = self.clone();
            let effect_count = effects.len();

            tokio::spawn(async move {
                let _guard = guard;
                let _pending_guard = pending_guard;

                for (idx, effect) in effects.into_iter().enumerate() {
                    tracing::trace!("Executing sequential effect {} of {}", idx + 1, effect_count);

                    let (mut sub_handle, sub_tracking) = EffectHandle::new();
                    store.execute_effect_internal(effect, sub_tracking);
                    wait_for_zero(&sub_handle.effects, &mut sub_handle.completion).await;
                }
            });
        }

        fn cancel_slot(&self, id: &EffectId) {
            let slot = self
                .slots
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(id);
            match slot {
                Some(slot) => Self::abort_slot(id, &slot.abort, "cancelled"),
                None => tracing::trace!(slot = %id, "Cancel on an empty slot"),
            }
        }

        fn release_slot(&self, id: &EffectId, generation: u64) {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.get(id).is_some_and(|slot| slot.generation == generation) {
                slots.remove(id);
            }
        }

        fn abort_slot(id: &EffectId, abort: &AbortHandle, reason: &'static str) {
            if !abort.is_finished() {
                tracing::debug!(slot = %id, reason, "Aborting in-flight effect");
                metrics::counter!("store.effects.cancelled", "reason" => reason).increment(1);
            }
            abort.abort();
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
                revision: Arc::clone(&self.revision),
                slots: Arc::clone(&self.slots),
                next_generation: Arc::clone(&self.next_generation),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
