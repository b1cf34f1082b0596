//! Server command handlers.
//!
//! - ServerInfo: identity of the server and the connection user
//! - ListUsers: accounts ordered by name
//! - ListClientsForUser: workspaces owned by a user
//! - Login: password check for the connection user

use p4runner_core::{Error, ErrorCategory, Result, ServerConfig};

use super::store::{bounded, ServerState};
use crate::requests::{
    ListClientsForUser, ListClientsForUserResult, ListUsers, ListUsersResult, Login, LoginResult,
    ServerInfoResult,
};
use crate::Output;

/// Handle ServerInfo command.
pub(crate) fn server_info(state: &ServerState, server: &ServerConfig) -> Result<Output> {
    Ok(Output::ServerInfo(ServerInfoResult {
        server: state.server.clone(),
        version: state.version.clone(),
        user: server.user.clone(),
        case_sensitive: state.case_sensitive,
    }))
}

/// Handle ListUsers command.
pub(crate) fn list_users(state: &ServerState, req: ListUsers) -> Result<Output> {
    let users = bounded(
        state.accounts.values().map(|account| account.user.clone()),
        req.max_results,
    );
    Ok(Output::ListUsers(ListUsersResult { users }))
}

/// Handle ListClientsForUser command.
pub(crate) fn list_clients_for_user(state: &ServerState, req: ListClientsForUser) -> Result<Output> {
    let clients = bounded(
        state
            .workspaces
            .values()
            .filter(|ws| ws.summary.owner == req.user)
            .map(|ws| ws.summary.clone()),
        req.max_results,
    );
    Ok(Output::ListClientsForUser(ListClientsForUserResult {
        user: req.user,
        clients,
    }))
}

/// Handle Login command.
///
/// Accounts without a password accept any login; a login without a
/// password succeeds only for them.
pub(crate) fn login(state: &ServerState, server: &ServerConfig, req: Login) -> Result<Output> {
    let account = state.accounts.get(&server.user).ok_or_else(|| {
        Error::backend(
            ErrorCategory::AccessDenied,
            format!("user {} does not exist", server.user),
        )
    })?;
    let accepted = match (&account.password, &req.password) {
        (None, _) => true,
        (Some(expected), Some(given)) => expected == given.expose(),
        (Some(_), None) => false,
    };
    if !accepted {
        return Err(Error::backend(
            ErrorCategory::AccessDenied,
            "password invalid",
        ));
    }
    Ok(Output::Login(LoginResult {
        user: server.user.clone(),
    }))
}
