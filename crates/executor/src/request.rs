//! Typed requests and envelopes.
//!
//! Every request struct implements [`Request`], which fixes at compile time:
//! - the scope marker, and through it the context type the dispatcher
//!   accepts (a client query cannot be sent with a server-only context)
//! - the result type the caller gets back
//! - the [`OperationKind`]
//!
//! [`QueryRequest`] and [`ActionRequest`] mark the mutation axis; the
//! dispatcher's `query` only takes the former, `perform` only the latter.

use p4runner_concurrency::Answer;
use p4runner_core::{ActionId, ClientConfig, ConnectionContext, ServerConfig};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

use crate::command::{OperationKind, Scope};
use crate::output::{ActionResult, QueryResult};
use crate::{Command, Output};

/// Scope marker: names the connection context a request needs.
pub trait RequestScope: Send + Sync + 'static {
    /// Context type accepted by the dispatcher for this scope
    type Context: Clone + Into<ConnectionContext> + fmt::Debug + Send + Sync + 'static;

    /// Runtime scope tag
    const SCOPE: Scope;
}

/// Server-wide requests take a [`ServerConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ServerScope;

impl RequestScope for ServerScope {
    type Context = ServerConfig;
    const SCOPE: Scope = Scope::Server;
}

/// Workspace-bound requests take a [`ClientConfig`].
#[derive(Debug, Clone, Copy)]
pub struct ClientScope;

impl RequestScope for ClientScope {
    type Context = ClientConfig;
    const SCOPE: Scope = Scope::Client;
}

/// One operation of the catalog.
pub trait Request:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Scope marker
    type Scope: RequestScope;

    /// Result payload type
    type Output: Clone + fmt::Debug + Send + Sync + 'static;

    /// Operation kind
    const KIND: OperationKind;

    /// Wrap into the untyped command
    fn into_command(self) -> Command;

    /// Narrow an untyped output to this request's result type.
    ///
    /// Returns the output unchanged if it answers a different command.
    fn from_output(output: Output) -> std::result::Result<Self::Output, Output>;
}

/// Read-only request.
pub trait QueryRequest: Request {}

/// Mutating request.
pub trait ActionRequest: Request {}

/// Implements [`Request`] and the matching marker trait for a request struct.
macro_rules! impl_request {
    ($req:ident => $out:ident, server query) => {
        impl_request!(@impl $req, $out, ServerScope, ServerQuery, QueryRequest);
    };
    ($req:ident => $out:ident, client query) => {
        impl_request!(@impl $req, $out, ClientScope, ClientQuery, QueryRequest);
    };
    ($req:ident => $out:ident, server action) => {
        impl_request!(@impl $req, $out, ServerScope, ServerAction, ActionRequest);
    };
    ($req:ident => $out:ident, client action) => {
        impl_request!(@impl $req, $out, ClientScope, ClientAction, ActionRequest);
    };
    (@impl $req:ident, $out:ident, $scope:ident, $kind:ident, $marker:ident) => {
        impl $crate::request::Request for $req {
            type Scope = $crate::request::$scope;
            type Output = $out;
            const KIND: $crate::command::OperationKind = $crate::command::OperationKind::$kind;

            fn into_command(self) -> $crate::Command {
                $crate::Command::$req(self)
            }

            fn from_output(
                output: $crate::Output,
            ) -> ::std::result::Result<Self::Output, $crate::Output> {
                match output {
                    $crate::Output::$req(value) => Ok(value),
                    other => Err(other),
                }
            }
        }

        impl $crate::request::$marker for $req {}
    };
}

pub(crate) use impl_request;

/// Untyped request as handed to a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Operation kind
    pub kind: OperationKind,
    /// Action identity; `None` for queries
    pub action_id: Option<ActionId>,
    /// The command payload
    pub command: Command,
}

impl Envelope {
    /// Envelope for a query command
    pub fn query(command: Command) -> Self {
        Self {
            kind: command.kind(),
            action_id: None,
            command,
        }
    }

    /// Envelope for an action command
    pub fn action(id: ActionId, command: Command) -> Self {
        Self {
            kind: command.kind(),
            action_id: Some(id),
            command,
        }
    }
}

/// A read-only request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Query<Q: QueryRequest> {
    request: Q,
}

impl<Q: QueryRequest> Query<Q> {
    /// Wrap a query request
    pub fn new(request: Q) -> Self {
        Self { request }
    }

    /// The request payload
    pub fn request(&self) -> &Q {
        &self.request
    }

    /// Operation kind
    pub fn kind(&self) -> OperationKind {
        Q::KIND
    }

    pub(crate) fn into_request(self) -> Q {
        self.request
    }
}

impl<Q: QueryRequest> From<Q> for Query<Q> {
    fn from(request: Q) -> Self {
        Self::new(request)
    }
}

/// A mutating request envelope with a stable identity.
///
/// The identity is fixed at construction. Dispatching two actions with the
/// same identity is a programming error.
#[derive(Debug, Clone, PartialEq)]
pub struct Action<A: ActionRequest> {
    id: ActionId,
    request: A,
}

impl<A: ActionRequest> Action<A> {
    /// Wrap an action request under a fresh identity
    pub fn new(request: A) -> Self {
        Self::with_id(ActionId::generate(), request)
    }

    /// Wrap an action request under a caller-chosen identity
    pub fn with_id(id: ActionId, request: A) -> Self {
        Self { id, request }
    }

    /// Action identity
    pub fn id(&self) -> ActionId {
        self.id
    }

    /// The request payload
    pub fn request(&self) -> &A {
        &self.request
    }

    /// Operation kind
    pub fn kind(&self) -> OperationKind {
        A::KIND
    }

    pub(crate) fn into_parts(self) -> (ActionId, A) {
        (self.id, self.request)
    }
}

/// Answer to a query.
pub type QueryAnswer<T> = Answer<QueryResult<T>>;

/// Answer to an action.
pub type ActionAnswer<T> = Answer<ActionResult<T>>;

/// Last cached value plus a fresh request for the same query.
#[derive(Debug, Clone)]
pub struct FutureResult<T> {
    /// Most recent cached result, if any
    pub last: Option<QueryResult<T>>,
    /// Answer to a request that bypasses the cache
    pub answer: QueryAnswer<T>,
}

impl<T: Clone + Send + Sync + 'static> FutureResult<T> {
    /// The cached value if there is one, otherwise wait for the fresh answer.
    pub fn value_or_wait(&self, timeout: std::time::Duration) -> p4runner_core::Result<QueryResult<T>> {
        match &self.last {
            Some(last) => Ok(last.clone()),
            None => self.answer.blocking_get(timeout),
        }
    }
}
