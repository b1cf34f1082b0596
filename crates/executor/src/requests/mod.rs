//! Request and result payloads, grouped by domain.
//!
//! | Module | Requests |
//! |--------|----------|
//! | `server` | ServerInfo, ListUsers, ListClientsForUser, Login |
//! | `job` | ListJobs, GetJobSpec, ListChangelistsFixedByJob, CreateJob |
//! | `changelist` | DescribeChangelist, ListOpenedFilesChanges, ListSubmittedChangelists, changelist actions, SubmitChangelist, ShelveFiles |
//! | `file` | ListFilesDetails, ListFileHistory, file actions, FetchFiles |

mod changelist;
mod file;
mod job;
mod server;

pub use changelist::*;
pub use file::*;
pub use job::*;
pub use server::*;
