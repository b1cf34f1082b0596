//! Server-level requests: identity, users, clients, login.

use p4runner_core::{ClientSummary, ServerName, User};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::request::impl_request;

/// Server identity and version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerInfo {}

/// Result of [`ServerInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfoResult {
    /// Server address
    pub server: ServerName,
    /// Server version string
    pub version: String,
    /// User the connection runs as
    pub user: String,
    /// Whether depot paths compare case-sensitively
    pub case_sensitive: bool,
}

impl_request!(ServerInfo => ServerInfoResult, server query);

/// List users, at most `max_results` (0 = no limit).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListUsers {
    /// Result bound, 0 for unbounded
    #[serde(default)]
    pub max_results: usize,
}

/// Result of [`ListUsers`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListUsersResult {
    /// Users ordered by name
    pub users: Vec<User>,
}

impl_request!(ListUsers => ListUsersResult, server query);

/// List the client workspaces a user owns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListClientsForUser {
    /// Owner
    pub user: String,
    /// Result bound, 0 for unbounded
    #[serde(default)]
    pub max_results: usize,
}

/// Result of [`ListClientsForUser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListClientsForUserResult {
    /// Owner that was asked about
    pub user: String,
    /// Matching clients ordered by name
    pub clients: Vec<ClientSummary>,
}

impl_request!(ListClientsForUser => ListClientsForUserResult, server query);

/// A password that never shows up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    /// Wrap a password
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// The secret text
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Authenticate the connection user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Login {
    /// Password; `None` to use an existing ticket
    #[serde(default)]
    pub password: Option<Password>,
}

/// Result of [`Login`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResult {
    /// User that is now authenticated
    pub user: String,
}

impl_request!(Login => LoginResult, server action);
