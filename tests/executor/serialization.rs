//! Serialization Tests
//!
//! Commands, outputs and errors cross process boundaries as JSON. Request
//! structs reject unknown fields, and passwords never reach debug output.

use crate::common::*;
use serde_json::json;

#[test]
fn command_uses_externally_tagged_json() {
    let command = ListJobs::by_ids(vec![JobId::new("job1")]).into_command();
    let value = serde_json::to_value(&command).unwrap();
    assert_eq!(
        value,
        json!({ "ListJobs": { "filter": { "ids": ["job1"] }, "max_results": 0 } })
    );

    let back: Command = serde_json::from_value(value).unwrap();
    assert_eq!(back, command);
}

#[test]
fn omitted_defaults_are_filled_in() {
    let command: Command =
        serde_json::from_value(json!({ "AddEditFile": { "file": "//depot/a.txt" } })).unwrap();
    match command {
        Command::AddEditFile(req) => {
            assert_eq!(req.file, FilePath::new("//depot/a.txt"));
            assert_eq!(req.changelist, DEFAULT_CHANGELIST);
        }
        other => panic!("unexpected command {}", other.name()),
    }
}

#[test]
fn unknown_request_fields_are_rejected() {
    let result: std::result::Result<Command, _> = serde_json::from_value(json!({
        "DeleteChangelist": { "changelist": 4, "force": true }
    }));
    assert!(result.is_err());
}

#[test]
fn password_is_hidden_from_debug_output() {
    let login = Login {
        password: Some(Password::new("hunter2")),
    };
    let debug = format!("{:?}", login);
    assert!(!debug.contains("hunter2"));

    // The wire form still carries it
    let value = serde_json::to_value(&login).unwrap();
    assert_eq!(value, json!({ "password": "hunter2" }));
}

#[test]
fn output_survives_json() {
    let output = Output::CreateJob(CreateJobResult {
        job: Job::new("job9", "flaky build"),
        updated: false,
    });
    let text = serde_json::to_string(&output).unwrap();
    let back: Output = serde_json::from_str(&text).unwrap();
    assert_eq!(back, output);
    assert_eq!(back.name(), "CreateJob");
}

#[test]
fn errors_survive_json() {
    let errors = vec![
        Error::backend(ErrorCategory::AccessDenied, "password invalid"),
        Error::DuplicateDispatch {
            action_id: ActionId::generate().to_string(),
        },
        Error::timeout(std::time::Duration::from_millis(250)),
    ];
    for error in errors {
        let text = serde_json::to_string(&error).unwrap();
        let back: Error = serde_json::from_str(&text).unwrap();
        assert_eq!(back, error);
    }
}

#[test]
fn action_id_parses_its_display_form() {
    let id = ActionId::generate();
    assert_eq!(ActionId::parse(&id.to_string()), Some(id));
    assert_eq!(ActionId::parse("not-an-id"), None);
}
