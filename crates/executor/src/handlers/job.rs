//! Job command handlers.
//!
//! - ListJobs: by id list, substring pattern, or all
//! - GetJobSpec: the server's job specification
//! - ListChangelistsFixedByJob: submitted changelists recorded as fixes
//! - CreateJob: create, update, or auto-name with the id `new`

use p4runner_core::{Error, Job, JobId, Result};

use super::store::{bounded, server_error, require_text, ServerState};
use crate::requests::{
    CreateJob, CreateJobResult, GetJobSpecResult, JobFilter, ListChangelistsFixedByJob,
    ListChangelistsFixedByJobResult, ListJobs, ListJobsResult,
};
use crate::Output;

/// Id that asks the server to name a new job.

fn matches_pattern(job: &Job, pattern: &str) -> bool {
    let pattern = pattern.to_lowercase();
    job.id.as_str().to_lowercase().contains(&pattern)
        || job.description.to_lowercase().contains(&pattern)
}

/// Handle ListJobs command.
pub(crate) fn list_jobs(state: &ServerState, req: ListJobs) -> Result<Output> {
    let jobs = match req.filter {
        JobFilter::Ids(ids) => {
            let mut found: Vec<Job> = ids
                .iter()
                .filter_map(|id| state.jobs.get(id).cloned())
                .collect();
            found.sort_by(|a, b| a.id.cmp(&b.id));
            found.dedup_by(|a, b| a.id == b.id);
            bounded(found.into_iter(), req.max_results)
        }
        JobFilter::Pattern(pattern) => bounded(
            state
                .jobs
                .values()
                .filter(|job| matches_pattern(job, &pattern))
                .cloned(),
            req.max_results,
        ),
        JobFilter::All => bounded(state.jobs.values().cloned(), req.max_results),
    };
    Ok(Output::ListJobs(ListJobsResult { jobs }))
}

/// Handle GetJobSpec command.
pub(crate) fn get_job_spec(state: &ServerState) -> Result<Output> {
    Ok(Output::GetJobSpec(GetJobSpecResult {
        spec: state.job_spec.clone(),
    }))
}

/// Handle ListChangelistsFixedByJob command.
pub(crate) fn list_changelists_fixed_by_job(
    state: &ServerState,
    req: ListChangelistsFixedByJob,
) -> Result<Output> {
    if !state.jobs.contains_key(&req.job) {
        return Err(server_error(format!("job '{}' unknown", req.job)));
    }
    let changelists = state
        .fixes
        .get(&req.job)
        .into_iter()
        .flatten()
        .filter_map(|number| {
            state
                .changes
                .get(number)
                .map(|change| state.remote_changelist(*number, change))
        })
        .collect();
    Ok(Output::ListChangelistsFixedByJob(
        ListChangelistsFixedByJobResult {
            job: req.job,
            changelists,
        },
    ))
}

/// Handle CreateJob command.
pub(crate) fn create_job(state: &mut ServerState, req: CreateJob) -> Result<Output> {
    let mut job = req.job;
    require_text("job description", &job.description)?;
    if !state.job_spec.statuses.contains(&job.status) {
        return Err(Error::invalid_input(format!(
            "status {:?} is not allowed by the job spec",
            job.status
        )));
    }
    if let Some(field) = job
        .fields
        .keys()
        .find(|field| !state.job_spec.fields.contains(field))
    {
        return Err(Error::invalid_input(format!(
            "field '{}' is not in the job spec",
            field
        )));
    }

    if job.id.is_new() {
        job.id = next_job_id(state);
    } else if job.id.as_str().trim().is_empty() {
        return Err(Error::invalid_input("job id must not be blank"));
    }

    let updated = state.jobs.insert(job.id.clone(), job.clone()).is_some();
    Ok(Output::CreateJob(CreateJobResult { job, updated }))
}

fn next_job_id(state: &mut ServerState) -> JobId {
    loop {
        let candidate = JobId::new(format!("job{:06}", state.next_job));
        state.next_job += 1;
        if !state.jobs.contains_key(&candidate) {
            return candidate;
        }
    }
}
