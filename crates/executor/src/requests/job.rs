//! Job requests: lookup, spec, fixes, creation.

use p4runner_core::{Job, JobId, JobSpec, RemoteChangelist};
use serde::{Deserialize, Serialize};

use crate::request::impl_request;

/// Which jobs [`ListJobs`] returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobFilter {
    /// Exactly these ids; unknown ids are left out of the result
    Ids(Vec<JobId>),
    /// Jobs whose id or description contains the text (case-insensitive)
    Pattern(String),
    /// Every job
    #[default]
    All,
}

/// Look up jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListJobs {
    /// Selection
    #[serde(default)]
    pub filter: JobFilter,
    /// Result bound, 0 for unbounded
    #[serde(default)]
    pub max_results: usize,
}

impl ListJobs {
    /// Look up exactly `ids`
    pub fn by_ids(ids: Vec<JobId>) -> Self {
        Self {
            filter: JobFilter::Ids(ids),
            max_results: 0,
        }
    }

    /// Search ids and descriptions for `pattern`
    pub fn matching(pattern: impl Into<String>, max_results: usize) -> Self {
        Self {
            filter: JobFilter::Pattern(pattern.into()),
            max_results,
        }
    }
}

/// Result of [`ListJobs`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListJobsResult {
    /// Matching jobs ordered by id
    pub jobs: Vec<Job>,
}

impl ListJobsResult {
    /// Ids from `wanted` that are absent from the result
    pub fn missing<'a>(&self, wanted: &'a [JobId]) -> Vec<&'a JobId> {
        wanted
            .iter()
            .filter(|id| !self.jobs.iter().any(|job| &job.id == *id))
            .collect()
    }
}

impl_request!(ListJobs => ListJobsResult, server query);

/// Fetch the job specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetJobSpec {}

/// Result of [`GetJobSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetJobSpecResult {
    /// The specification
    pub spec: JobSpec,
}

impl_request!(GetJobSpec => GetJobSpecResult, server query);

/// Submitted changelists that fix a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListChangelistsFixedByJob {
    /// The job
    pub job: JobId,
}

/// Result of [`ListChangelistsFixedByJob`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListChangelistsFixedByJobResult {
    /// The job that was asked about
    pub job: JobId,
    /// Fixing changelists, oldest first
    pub changelists: Vec<RemoteChangelist>,
}

impl_request!(ListChangelistsFixedByJob => ListChangelistsFixedByJobResult, server query);

/// Create a job, or update it if the id exists.
///
/// The id `new` asks the server to assign the next free `jobNNNNNN` name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateJob {
    /// Job to store
    pub job: Job,
}

/// Result of [`CreateJob`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJobResult {
    /// The stored job, with its final id
    pub job: Job,
    /// Whether an existing job was overwritten
    pub updated: bool,
}

impl_request!(CreateJob => CreateJobResult, server action);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_reports_unknown_ids_in_order() {
        let result = ListJobsResult {
            jobs: vec![Job::new("job2", "x")],
        };
        let wanted = vec![JobId::new("job3"), JobId::new("job2"), JobId::new("job1")];
        let missing: Vec<_> = result.missing(&wanted).into_iter().cloned().collect();
        assert_eq!(missing, vec![JobId::new("job3"), JobId::new("job1")]);
    }

    #[test]
    fn list_jobs_wire_shape() {
        let json = serde_json::to_value(ListJobs::by_ids(vec![JobId::new("job1")])).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"filter": {"ids": ["job1"]}, "max_results": 0})
        );
    }
}
