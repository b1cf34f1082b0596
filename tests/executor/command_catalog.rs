//! Command Catalog Tests
//!
//! Every command has exactly one kind, and the typed request agrees with the
//! untyped command it wraps.

use crate::common::*;

fn every_command() -> Vec<Command> {
    let file = FilePath::new("//depot/main/readme.txt");
    vec![
        ServerInfo {}.into_command(),
        DescribeChangelist { number: 1 }.into_command(),
        ListJobs::default().into_command(),
        GetJobSpec {}.into_command(),
        ListUsers::default().into_command(),
        ListClientsForUser {
            user: "alice".into(),
            max_results: 0,
        }
        .into_command(),
        ListChangelistsFixedByJob {
            job: JobId::new("job1"),
        }
        .into_command(),
        ListOpenedFilesChanges::default().into_command(),
        ListSubmittedChangelists::default().into_command(),
        ListFilesDetails {
            files: vec![file.clone()],
        }
        .into_command(),
        ListFileHistory {
            file: file.clone(),
            max_revisions: 0,
        }
        .into_command(),
        CreateJob {
            job: Job::new("job1", "d"),
        }
        .into_command(),
        Login { password: None }.into_command(),
        AddEditFile {
            file: file.clone(),
            changelist: 0,
        }
        .into_command(),
        DeleteFile {
            file: file.clone(),
            changelist: 0,
        }
        .into_command(),
        RevertFile {
            file: file.clone(),
            only_unchanged: false,
        }
        .into_command(),
        MoveFile {
            source: file.clone(),
            target: FilePath::new("//depot/main/guide.txt"),
            changelist: 0,
        }
        .into_command(),
        MoveFilesToChangelist {
            files: vec![file.clone()],
            changelist: 2,
        }
        .into_command(),
        CreateChangelist {
            description: "d".into(),
        }
        .into_command(),
        DeleteChangelist { changelist: 2 }.into_command(),
        EditChangelistDescription {
            changelist: 2,
            description: "d".into(),
        }
        .into_command(),
        AddJobToChangelist {
            changelist: 2,
            job: JobId::new("job1"),
        }
        .into_command(),
        RemoveJobFromChangelist {
            changelist: 2,
            job: JobId::new("job1"),
        }
        .into_command(),
        SubmitChangelist::all(2).into_command(),
        FetchFiles {
            path: FilePath::new("//depot/..."),
            force: false,
        }
        .into_command(),
        ShelveFiles {
            changelist: 2,
            files: vec![file],
        }
        .into_command(),
    ]
}

#[test]
fn catalog_has_twenty_six_distinct_commands() {
    let commands = every_command();
    assert_eq!(commands.len(), 26);

    let mut names: Vec<&str> = commands.iter().map(Command::name).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 26);
}

#[test]
fn kind_counts_match_catalog() {
    let commands = every_command();
    let count = |kind: OperationKind| commands.iter().filter(|c| c.kind() == kind).count();

    assert_eq!(count(OperationKind::ServerQuery), 7);
    assert_eq!(count(OperationKind::ClientQuery), 4);
    assert_eq!(count(OperationKind::ServerAction), 2);
    assert_eq!(count(OperationKind::ClientAction), 13);
}

#[test]
fn only_queries_are_cacheable() {
    for command in every_command() {
        if command.kind().is_action() {
            assert!(!command.is_cacheable(), "{} must not be cached", command.name());
        }
    }
    assert!(!ServerInfo {}.into_command().is_cacheable());
    assert!(ListJobs::default().into_command().is_cacheable());
}

#[test]
fn only_some_actions_can_wait_for_a_connection() {
    let queueable: Vec<&str> = every_command()
        .iter()
        .filter(|c| c.is_queueable())
        .map(Command::name)
        .collect();

    assert!(queueable.contains(&"CreateJob"));
    assert!(queueable.contains(&"EditChangelistDescription"));
    assert!(!queueable.contains(&"SubmitChangelist"));
    assert!(!queueable.contains(&"FetchFiles"));
    assert!(!queueable.contains(&"Login"));
    assert!(!queueable.contains(&"ListJobs"));
    assert_eq!(queueable.len(), 12);
}

#[test]
fn kind_axes_are_consistent() {
    for command in every_command() {
        let kind = command.kind();
        assert_eq!(kind.is_action(), kind.mutation() == Mutation::Action);
        let envelope = if kind.is_action() {
            Envelope::action(ActionId::generate(), command.clone())
        } else {
            Envelope::query(command.clone())
        };
        assert_eq!(envelope.kind, kind);
        assert_eq!(envelope.action_id.is_some(), kind.is_action());
    }
}

#[test]
fn typed_kind_matches_command_kind() {
    fn check<R: Request>(request: R) {
        assert_eq!(request.into_command().kind(), R::KIND);
    }

    check(ServerInfo {});
    check(ListOpenedFilesChanges::default());
    check(CreateJob {
        job: Job::new("j", "d"),
    });
    check(SubmitChangelist::all(3));
    check(FetchFiles {
        path: FilePath::new("//depot/..."),
        force: true,
    });
    assert_eq!(<FetchFiles as Request>::Scope::SCOPE, Scope::Client);
    assert_eq!(<Login as Request>::Scope::SCOPE, Scope::Server);
}
