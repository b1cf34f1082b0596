//! Core identifiers and connection contexts
//!
//! This module defines the foundational types:
//! - ServerName / ServerConfig: a server connection (address + user)
//! - ClientConfig / ClientServerRef: a client workspace on a server
//! - ConnectionContext: the context a request is dispatched against
//! - ChangelistId / JobId / FilePath: backend object identities
//! - ActionId: unique identity of one mutating request
//! - UnitKey: logical unit-of-work identity used by fan-out composition

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Number of the default (unnumbered) pending changelist of a client.
pub const DEFAULT_CHANGELIST: u64 = 0;

/// Server address, e.g. `ssl:perforce.example.com:1666`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerName(String);

impl ServerName {
    /// Create a server name from its address
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A server connection: which server, as which user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server address
    pub server_name: ServerName,
    /// User the connection authenticates as
    pub user: String,
}

impl ServerConfig {
    /// Create a server config
    pub fn new(server_name: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            server_name: ServerName::new(server_name),
            user: user.into(),
        }
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.server_name)
    }
}

/// Identity of a client workspace: the pair (server, client name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientServerRef {
    /// Server the client lives on
    pub server: ServerName,
    /// Client workspace name
    pub client_name: String,
}

impl fmt::Display for ClientServerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.client_name, self.server)
    }
}

/// A client workspace connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Server connection the client is reached through
    pub server: ServerConfig,
    /// Client workspace name
    pub client_name: String,
}

impl ClientConfig {
    /// Create a client config on top of a server connection
    pub fn new(server: ServerConfig, client_name: impl Into<String>) -> Self {
        Self {
            server,
            client_name: client_name.into(),
        }
    }

    /// The (server, client) identity of this workspace
    pub fn client_server_ref(&self) -> ClientServerRef {
        ClientServerRef {
            server: self.server.server_name.clone(),
            client_name: self.client_name.clone(),
        }
    }
}

impl fmt::Display for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.server, self.client_name)
    }
}

/// The backend connection a request is addressed to.
///
/// Every result is tagged with the context it came from so callers juggling
/// several connections can tell results apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionContext {
    /// Server-wide context
    Server(ServerConfig),
    /// Workspace-bound context
    Client(ClientConfig),
}

impl ConnectionContext {
    /// Server this context talks to
    pub fn server_name(&self) -> &ServerName {
        match self {
            ConnectionContext::Server(s) => &s.server_name,
            ConnectionContext::Client(c) => &c.server.server_name,
        }
    }

    /// Client workspace identity, if this is a client context
    pub fn client_ref(&self) -> Option<ClientServerRef> {
        match self {
            ConnectionContext::Server(_) => None,
            ConnectionContext::Client(c) => Some(c.client_server_ref()),
        }
    }
}

impl fmt::Display for ConnectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionContext::Server(s) => write!(f, "{}", s),
            ConnectionContext::Client(c) => write!(f, "{}", c),
        }
    }
}

impl From<ServerConfig> for ConnectionContext {
    fn from(config: ServerConfig) -> Self {
        ConnectionContext::Server(config)
    }
}

impl From<ClientConfig> for ConnectionContext {
    fn from(config: ClientConfig) -> Self {
        ConnectionContext::Client(config)
    }
}

/// Identity of a changelist: the owning client plus its number.
///
/// Pending changelists are renumbered on submit, so this identity refers
/// to the changelist as the caller knows it at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChangelistId {
    /// Owning client workspace
    pub client: ClientServerRef,
    /// Changelist number; [`DEFAULT_CHANGELIST`] for the default changelist
    pub number: u64,
}

impl ChangelistId {
    /// Create a changelist identity
    pub fn new(client: ClientServerRef, number: u64) -> Self {
        Self { client, number }
    }

    /// Whether this is the client's default changelist
    pub fn is_default(&self) -> bool {
        self.number == DEFAULT_CHANGELIST
    }
}

impl fmt::Display for ChangelistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            write!(f, "default@{}", self.client)
        } else {
            write!(f, "{}@{}", self.number, self.client)
        }
    }
}

/// Job name, e.g. `job000042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Placeholder that asks the server to assign the next job name
    pub const NEW: &'static str = "new";

    /// Create a job id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Whether this is the [`NEW`](Self::NEW) placeholder rather than a real name
    pub fn is_new(&self) -> bool {
        self.0 == Self::NEW
    }

    /// The job name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Depot path of a file, e.g. `//depot/project/main.c`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FilePath(String);

impl FilePath {
    /// Create a file path
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The path string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identity of one mutating request.
///
/// Stable for the life of the action object. The dispatcher refuses to
/// dispatch the same identity twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(Uuid);

impl ActionId {
    /// Generate a fresh random identity
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse an identity from its string form
    ///
    /// Returns None if the string is not a valid UUID.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical unit-of-work identity.
///
/// Fan-out composition deduplicates on this key rather than on the
/// [`ActionId`] of whatever request ends up carrying the work, because the
/// same unit can be reached through several composition paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKey {
    /// Submission of one changelist
    Changelist(ChangelistId),
    /// Creation of one job on one server
    Job {
        /// Server the job lives on
        server: ServerName,
        /// Job name
        job: JobId,
    },
    /// Any other caller-defined unit
    Named(String),
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKey::Changelist(id) => write!(f, "changelist {}", id),
            UnitKey::Job { server, job } => write!(f, "job {}@{}", job, server),
            UnitKey::Named(name) => f.write_str(name),
        }
    }
}

impl From<ChangelistId> for UnitKey {
    fn from(id: ChangelistId) -> Self {
        UnitKey::Changelist(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ClientConfig {
        ClientConfig::new(ServerConfig::new("perforce:1666", "alice"), "alice-ws")
    }

    #[test]
    fn test_context_server_name() {
        let ctx: ConnectionContext = client().into();
        assert_eq!(ctx.server_name().as_str(), "perforce:1666");
        assert_eq!(ctx.client_ref().unwrap().client_name, "alice-ws");

        let server: ConnectionContext = ServerConfig::new("perforce:1666", "alice").into();
        assert!(server.client_ref().is_none());
    }

    #[test]
    fn test_context_display() {
        let ctx: ConnectionContext = client().into();
        assert_eq!(ctx.to_string(), "alice@perforce:1666:alice-ws");
    }

    #[test]
    fn test_default_changelist_display() {
        let cl = ChangelistId::new(client().client_server_ref(), DEFAULT_CHANGELIST);
        assert!(cl.is_default());
        assert_eq!(cl.to_string(), "default@alice-ws@perforce:1666");

        let numbered = ChangelistId::new(client().client_server_ref(), 42);
        assert_eq!(numbered.to_string(), "42@alice-ws@perforce:1666");
    }

    #[test]
    fn test_action_ids_are_unique() {
        let a = ActionId::generate();
        let b = ActionId::generate();
        assert_ne!(a, b);
        assert_eq!(ActionId::parse(&a.to_string()), Some(a));
    }

    #[test]
    fn test_unit_keys_distinguish_clients() {
        let ws1 = client().client_server_ref();
        let mut ws2 = ws1.clone();
        ws2.client_name = "bob-ws".into();
        let k1 = UnitKey::from(ChangelistId::new(ws1, 7));
        let k2 = UnitKey::from(ChangelistId::new(ws2, 7));
        assert_ne!(k1, k2);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn unit_key_equality_follows_changelist_identity(
                client_a in "[a-z]{1,8}",
                client_b in "[a-z]{1,8}",
                number_a in 0u64..50,
                number_b in 0u64..50,
            ) {
                let server = ServerName::new("perforce:1666");
                let key = |client: &str, number| {
                    UnitKey::from(ChangelistId::new(
                        ClientServerRef { server: server.clone(), client_name: client.to_string() },
                        number,
                    ))
                };
                let same = client_a == client_b && number_a == number_b;
                prop_assert_eq!(key(&client_a, number_a) == key(&client_b, number_b), same);
            }
        }
    }
}
