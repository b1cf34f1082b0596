//! The Dispatcher - single entry point for backend requests.
//!
//! The dispatcher routes each request to the connector registered for its
//! connection context and hands back an [`Answer`] without blocking. It
//! owns the shared query cache, the per-server connection state, the
//! offline action queue and the set of action identities already
//! dispatched.
//!
//! # Queries
//!
//! 1. Server offline: serve any cached entry regardless of age, else fail
//!    with [`Error::Offline`]
//! 2. Fresh cached entry: serve it with `from_cache = true`
//! 3. No route: fail with [`Error::NoRoute`]
//! 4. Execute; store successful results, note connection loss
//!
//! # Actions
//!
//! 1. No route: fail with [`Error::NoRoute`]
//! 2. Server offline and the action cannot be deferred: fail with
//!    [`Error::Offline`]
//! 3. Identity already dispatched: fail with [`Error::DuplicateDispatch`]
//! 4. Server offline: queue until [`Dispatcher::reconnect`]
//! 5. Execute; success invalidates the server's cached queries

use dashmap::{DashMap, DashSet};
use p4runner_concurrency::{Answer, ErrorList};
use p4runner_core::{
    ActionId, ClientServerRef, ConnectionContext, Error, Result, ServerName, UnitKey,
};
use p4runner_engine::{CacheKey, MemoryQueryCache, QueryCache, RunnerConfig};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::connector::BackendConnector;
use crate::fanout::{FanOut, SubmitUnit};
use crate::offline::{PendingAction, PendingActionQueue, QueuedAction};
use crate::output::{ActionResult, QueryResult};
use crate::request::{
    Action, ActionAnswer, ActionRequest, Envelope, FutureResult, Query, QueryAnswer, QueryRequest,
    Request, RequestScope,
};
use crate::requests::SubmitChangelistResult;
use crate::{Command, Output};

/// Reachability of one server, as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Requests go to the connector
    Online,
    /// A connection failure was observed
    Disconnected,
    /// The user asked to work offline
    UserOffline,
}

impl ConnectionState {
    /// Whether requests are sent to the connector
    pub fn is_online(self) -> bool {
        self == ConnectionState::Online
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RouteKey {
    Server(ServerName),
    Client(ClientServerRef),
}

struct DispatcherInner {
    routes: RwLock<HashMap<RouteKey, Arc<dyn BackendConnector>>>,
    cache: Option<Arc<dyn QueryCache<Output>>>,
    /// Bumped by every successful action; a query started under an older
    /// generation does not store its result
    generations: DashMap<ServerName, u64>,
    dispatched: DashSet<ActionId>,
    connection: DashMap<ServerName, ConnectionState>,
    offline: PendingActionQueue,
    config: RunnerConfig,
}

/// Routes typed requests to backend connectors.
///
/// Cloning is cheap; clones share routes, cache and state, so chained
/// closures can carry a dispatcher and issue follow-up requests.
///
/// # Thread Safety
///
/// `Dispatcher` is `Send + Sync`. Dispatch never blocks on the backend.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Create a dispatcher with an explicit cache (or none).
    pub fn new(config: RunnerConfig, cache: Option<Arc<dyn QueryCache<Output>>>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                routes: RwLock::new(HashMap::new()),
                cache,
                generations: DashMap::new(),
                dispatched: DashSet::new(),
                connection: DashMap::new(),
                offline: PendingActionQueue::new(),
                config,
            }),
        }
    }

    /// Create a dispatcher with the in-memory cache if `config` enables it.
    pub fn from_config(config: RunnerConfig) -> Self {
        let cache: Option<Arc<dyn QueryCache<Output>>> = if config.cache.enabled {
            Some(Arc::new(MemoryQueryCache::new(config.cache.max_entries)))
        } else {
            None
        };
        Self::new(config, cache)
    }

    /// Configuration this dispatcher was built with
    pub fn config(&self) -> &RunnerConfig {
        &self.inner.config
    }

    // ==================== Routing ====================

    /// Route every request for `server` to `connector`.
    pub fn register_server(&self, server: &ServerName, connector: Arc<dyn BackendConnector>) {
        debug!(%server, "server route registered");
        self.inner
            .routes
            .write()
            .insert(RouteKey::Server(server.clone()), connector);
    }

    /// Route requests for one client workspace to `connector`.
    ///
    /// Takes precedence over the server route for that client's requests.
    pub fn register_client(&self, client: &ClientServerRef, connector: Arc<dyn BackendConnector>) {
        debug!(%client, "client route registered");
        self.inner
            .routes
            .write()
            .insert(RouteKey::Client(client.clone()), connector);
    }

    // ==================== Queries ====================

    /// Issue a read-only request.
    pub fn query<Q: QueryRequest>(
        &self,
        context: &<Q::Scope as RequestScope>::Context,
        query: Query<Q>,
    ) -> QueryAnswer<Q::Output> {
        self.run_query(context.clone().into(), query, true)
    }

    /// Last cached result for `query`, regardless of age; never dispatches.
    pub fn cached_query<Q: QueryRequest>(
        &self,
        context: &<Q::Scope as RequestScope>::Context,
        query: &Query<Q>,
    ) -> Option<QueryResult<Q::Output>> {
        let context: ConnectionContext = context.clone().into();
        let command = query.request().clone().into_command();
        let key = self.inner.cache_key(&context, &command)?;
        let entry = self.inner.cache.as_ref()?.lookup(&key)?;
        narrow::<Q>(command.name(), entry.value)
            .ok()
            .map(|value| QueryResult {
                context,
                from_cache: true,
                value,
            })
    }

    /// Last cached result plus an answer for a fresh dispatch that ignores
    /// cache freshness.
    pub fn sync_query<Q: QueryRequest>(
        &self,
        context: &<Q::Scope as RequestScope>::Context,
        query: Query<Q>,
    ) -> FutureResult<Q::Output> {
        let last = self.cached_query(context, &query);
        let answer = self.run_query(context.clone().into(), query, false);
        FutureResult { last, answer }
    }

    fn run_query<Q: QueryRequest>(
        &self,
        context: ConnectionContext,
        query: Query<Q>,
        use_fresh_cache: bool,
    ) -> QueryAnswer<Q::Output> {
        let command = query.into_request().into_command();
        let name = command.name();
        let server = context.server_name().clone();
        let key = if command.is_cacheable() {
            self.inner.cache_key(&context, &command)
        } else {
            None
        };

        if !self.connection_state(&server).is_online() {
            return match key.as_ref().and_then(|k| self.inner.lookup(k)) {
                Some(output) => {
                    debug!(%server, command = name, "offline query served from cache");
                    Answer::from_result(from_cache::<Q>(name, context, output))
                }
                None => Answer::failed(Error::Offline {
                    server: server.to_string(),
                }),
            };
        }

        if use_fresh_cache {
            if let Some(output) = key.as_ref().and_then(|k| self.inner.lookup_fresh(k)) {
                debug!(%server, command = name, "query served from cache");
                return Answer::from_result(from_cache::<Q>(name, context, output));
            }
        }

        let connector = match self.inner.route(&context) {
            Some(connector) => connector,
            None => return Answer::failed(no_route(&context)),
        };

        debug!(%context, command = name, "dispatching query");
        let generation = self.inner.generation(&server);
        let inner = Arc::clone(&self.inner);
        let observed = server.clone();
        connector
            .execute(&context, Envelope::query(command))
            .when_completed(move |outcome| match outcome {
                Ok(output) => {
                    if let Some(key) = key {
                        inner.store(key, generation, output.clone());
                    }
                }
                Err(e) => inner.observe_failure(&observed, e),
            })
            .try_map(move |output| {
                narrow::<Q>(name, output.clone()).map(|value| QueryResult {
                    context,
                    from_cache: false,
                    value,
                })
            })
    }

    // ==================== Actions ====================

    /// Issue a mutating request.
    ///
    /// Each action identity is dispatched at most once over the lifetime of
    /// the dispatcher; a repeat fails with [`Error::DuplicateDispatch`].
    pub fn perform<A: ActionRequest>(
        &self,
        context: &<A::Scope as RequestScope>::Context,
        action: Action<A>,
    ) -> ActionAnswer<A::Output> {
        let context: ConnectionContext = context.clone().into();
        let (action_id, request) = action.into_parts();
        let command = request.into_command();
        let name = command.name();
        let server = context.server_name().clone();

        let connector = match self.inner.route(&context) {
            Some(connector) => connector,
            None => return Answer::failed(no_route(&context)),
        };

        let online = self.connection_state(&server).is_online();
        let deferrable = self.inner.config.queue_offline_actions && command.is_queueable();
        if !online && !deferrable {
            return Answer::failed(Error::Offline {
                server: server.to_string(),
            });
        }

        if !self.inner.dispatched.insert(action_id) {
            error!(%action_id, command = name, "action identity dispatched twice");
            return Answer::failed(Error::DuplicateDispatch {
                action_id: action_id.to_string(),
            });
        }

        let envelope = Envelope::action(action_id, command);
        let raw = if online {
            debug!(%context, %action_id, command = name, "dispatching action");
            self.inner.execute_action(&connector, &context, envelope)
        } else {
            let (promise, answer) = Answer::pending();
            let inner = &self.inner;
            let queued = inner.offline.enqueue_while(
                &server,
                QueuedAction::new(context.clone(), envelope, promise),
                || !inner.state(&server).is_online(),
            );
            if let Err(action) = queued {
                debug!(%server, %action_id, command = name, "server came back while queueing");
                let QueuedAction {
                    context: target,
                    envelope,
                    promise,
                    ..
                } = action;
                inner
                    .execute_action(&connector, &target, envelope)
                    .forward_to(promise);
            }
            answer
        };

        raw.try_map(move |output| {
            narrow::<A>(name, output.clone()).map(|value| ActionResult {
                context,
                action_id,
                value,
            })
        })
    }

    // ==================== Connection state ====================

    /// Current state of `server` (online unless told otherwise)
    pub fn connection_state(&self, server: &ServerName) -> ConnectionState {
        self.inner.state(server)
    }

    /// Stop sending requests to `server` until [`reconnect`](Self::reconnect).
    pub fn go_offline(&self, server: &ServerName) {
        info!(%server, "working offline");
        self.inner
            .connection
            .insert(server.clone(), ConnectionState::UserOffline);
    }

    /// Mark `server` online and replay its deferred actions in order.
    ///
    /// Each deferred action starts after the previous one settled. If the
    /// server drops again mid-replay, the rest stay queued. Returns the
    /// number of actions taken off the queue.
    pub fn reconnect(&self, server: &ServerName) -> usize {
        self.inner
            .connection
            .insert(server.clone(), ConnectionState::Online);
        let queue = self.inner.offline.take(server);
        let count = queue.len();
        info!(%server, deferred = count, "server online");
        DispatcherInner::replay(Arc::clone(&self.inner), server.clone(), queue);
        count
    }

    /// Actions deferred for `server`, in replay order
    pub fn pending_actions(&self, server: &ServerName) -> Vec<PendingAction> {
        self.inner.offline.snapshot(server)
    }

    /// Fail every action deferred for `server` with [`Error::Offline`].
    pub fn discard_pending(&self, server: &ServerName) -> usize {
        let queue = self.inner.offline.take(server);
        let count = queue.len();
        for action in queue {
            action.settle(Err(Error::Offline {
                server: server.to_string(),
            }));
        }
        if count > 0 {
            info!(%server, discarded = count, "deferred actions discarded");
        }
        count
    }

    // ==================== Fan-out ====================

    /// Start a fan-out with its own idempotency guard.
    pub fn fan_out<T: Clone + Send + Sync + 'static>(&self) -> FanOut<T> {
        FanOut::new(self.clone())
    }

    /// Submit every unit and wait for all of them against one deadline.
    ///
    /// Returns the per-unit failures; empty means every unit succeeded.
    pub fn submit_all<I>(&self, units: I, timeout: Duration) -> ErrorList<UnitKey>
    where
        I: IntoIterator<Item = SubmitUnit>,
    {
        let fan_out = self.fan_out::<SubmitChangelistResult>();
        for unit in units {
            fan_out.submit_changelist(unit);
        }
        fan_out.join(timeout).errors
    }

    // ==================== Cache ====================

    /// Drop every cached query result
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.inner.cache {
            cache.clear();
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::from_config(RunnerConfig::default())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.inner.routes.read().len())
            .field("cached", &self.inner.cache.as_ref().map(|c| c.len()))
            .field("dispatched", &self.inner.dispatched.len())
            .finish()
    }
}

impl DispatcherInner {
    fn route(&self, context: &ConnectionContext) -> Option<Arc<dyn BackendConnector>> {
        let routes = self.routes.read();
        context
            .client_ref()
            .and_then(|client| routes.get(&RouteKey::Client(client)))
            .or_else(|| routes.get(&RouteKey::Server(context.server_name().clone())))
            .cloned()
    }

    fn state(&self, server: &ServerName) -> ConnectionState {
        self.connection
            .get(server)
            .map_or(ConnectionState::Online, |s| *s)
    }

    fn cache_key(&self, context: &ConnectionContext, command: &Command) -> Option<CacheKey> {
        self.cache.as_ref()?;
        match serde_json::to_string(command) {
            Ok(request) => Some(CacheKey {
                server: context.server_name().clone(),
                client: context.client_ref(),
                request,
            }),
            Err(e) => {
                debug!(command = command.name(), error = %e, "query not cacheable");
                None
            }
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<Output> {
        self.cache.as_ref()?.lookup(key).map(|entry| entry.value)
    }

    fn lookup_fresh(&self, key: &CacheKey) -> Option<Output> {
        let ttl = self.config.cache.ttl();
        self.cache
            .as_ref()?
            .lookup(key)
            .filter(|entry| entry.is_fresh(ttl))
            .map(|entry| entry.value)
    }

    fn generation(&self, server: &ServerName) -> u64 {
        self.generations.get(server).map_or(0, |g| *g)
    }

    fn store(&self, key: CacheKey, generation: u64, output: Output) {
        let cache = match &self.cache {
            Some(cache) => cache,
            None => return,
        };
        // The entry guard keeps an invalidation from slipping in between
        // the generation check and the store.
        let current = self.generations.entry(key.server.clone()).or_insert(0);
        if *current == generation {
            cache.store(key, output);
        } else {
            debug!(server = %key.server, "discarding query result older than the last action");
        }
    }

    fn invalidate(&self, server: &ServerName) {
        if let Some(cache) = &self.cache {
            let mut current = self.generations.entry(server.clone()).or_insert(0);
            *current += 1;
            cache.invalidate_server(server);
        }
    }

    fn execute_action(
        self: &Arc<Self>,
        connector: &Arc<dyn BackendConnector>,
        context: &ConnectionContext,
        envelope: Envelope,
    ) -> Answer<Output> {
        let inner = Arc::clone(self);
        let server = context.server_name().clone();
        connector
            .execute(context, envelope)
            .when_completed(move |outcome| inner.after_action(&server, outcome))
    }

    fn observe_failure(&self, server: &ServerName, error: &Error) {
        if !error.is_connection_loss() {
            return;
        }
        let mut state = self
            .connection
            .entry(server.clone())
            .or_insert(ConnectionState::Online);
        if *state == ConnectionState::Online {
            *state = ConnectionState::Disconnected;
            info!(%server, %error, "server disconnected");
        }
    }

    fn after_action(&self, server: &ServerName, outcome: std::result::Result<&Output, &Error>) {
        match outcome {
            Ok(_) => self.invalidate(server),
            Err(e) => self.observe_failure(server, e),
        }
    }

    fn replay(inner: Arc<Self>, server: ServerName, mut queue: VecDeque<QueuedAction>) {
        loop {
            if !inner.state(&server).is_online() {
                info!(%server, remaining = queue.len(), "replay interrupted");
                inner.offline.restore_front(&server, queue);
                return;
            }
            let action = match queue.pop_front() {
                Some(action) => action,
                None => return,
            };

            debug!(
                %server,
                command = action.envelope.command.name(),
                "replaying deferred action"
            );
            let answer = match inner.route(&action.context) {
                Some(connector) => connector.replay(&action.context, action.envelope.clone()),
                None => Answer::failed(no_route(&action.context)),
            };

            if let Some(outcome) = answer.try_result() {
                inner.after_action(&server, outcome.as_ref());
                action.settle(outcome);
                continue;
            }

            let next = Arc::clone(&inner);
            answer.when_completed(move |outcome| {
                next.after_action(&server, outcome);
                action.settle(outcome.map(Clone::clone).map_err(Clone::clone));
                Self::replay(next, server, queue);
            });
            return;
        }
    }
}

fn no_route(context: &ConnectionContext) -> Error {
    Error::NoRoute {
        context: context.to_string(),
    }
}

fn narrow<R: Request>(name: &str, output: Output) -> Result<R::Output> {
    R::from_output(output).map_err(|other| {
        Error::internal(format!(
            "connector answered {} with a {} result",
            name,
            other.name()
        ))
    })
}

fn from_cache<Q: QueryRequest>(
    name: &str,
    context: ConnectionContext,
    output: Output,
) -> Result<QueryResult<Q::Output>> {
    narrow::<Q>(name, output).map(|value| QueryResult {
        context,
        from_cache: true,
        value,
    })
}
