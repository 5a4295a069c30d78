//! End-to-end checks of the step runner's logging contract and of full
//! modes driven by a scripted model client.

use anyhow::{Result, anyhow};
use serde_json::json;

use engineer::core::error::StoreError;
use engineer::core::files::ALL_OUTPUT_KEY;
use engineer::core::mode::StepMode;
use engineer::core::stores::ProjectStores;
use engineer::core::types::Message;
use engineer::io::client::{ModelClient, deserialize_messages};
use engineer::pipeline::{TOKEN_USAGE_KEY, run_mode, run_steps};
use engineer::session;
use engineer::steps::Step;
use engineer::steps::execute::{EXECUTION_LOG_KEY, RUN_SCRIPT_KEY};
use engineer::steps::generate::PROMPT_KEY;
use engineer::test_support::{ScriptedClient, ScriptedOperator, TempProject, project_stores};

fn step_a(_: &mut dyn ModelClient, stores: &ProjectStores) -> Result<Vec<Message>> {
    stores.memory.set("a", true);
    Ok(vec![Message::user("A")])
}

fn step_b(_: &mut dyn ModelClient, stores: &ProjectStores) -> Result<Vec<Message>> {
    stores.memory.set("b", true);
    Ok(vec![Message::user("B")])
}

fn step_c(_: &mut dyn ModelClient, _: &ProjectStores) -> Result<Vec<Message>> {
    Ok(vec![Message::user("C")])
}

fn failing_b(_: &mut dyn ModelClient, stores: &ProjectStores) -> Result<Vec<Message>> {
    stores.input.get_required("missing")?;
    Err(anyhow!("unreachable"))
}

#[test]
fn logs_each_step_in_order_then_token_usage() {
    let stores = project_stores();
    let steps = [
        Step::new("A", step_a),
        Step::new("B", step_b),
        Step::new("C", step_c),
    ];
    let mut client = ScriptedClient::silent();

    let summary = run_steps(&mut client, &stores, &steps).expect("run");

    assert_eq!(summary.completed, vec!["A", "B", "C"]);
    assert_eq!(
        client.events(),
        vec!["serialize:A", "serialize:B", "serialize:C", "usage"]
    );
    assert_eq!(stores.logs.keys(), vec!["A", "B", "C", TOKEN_USAGE_KEY]);
    let transcript = deserialize_messages(&stores.logs.get("B").expect("B logged")).expect("decode");
    assert_eq!(transcript, vec![Message::user("B")]);
}

#[test]
fn failure_keeps_earlier_logs_and_skips_the_rest() {
    let stores = project_stores();
    let steps = [
        Step::new("A", step_a),
        Step::new("B", failing_b),
        Step::new("C", step_c),
    ];
    let mut client = ScriptedClient::silent();

    let err = run_steps(&mut client, &stores, &steps).unwrap_err();

    assert_eq!(
        err.downcast_ref::<StoreError>(),
        Some(&StoreError::key_not_found("input_prompt", "missing"))
    );
    assert_eq!(stores.logs.keys(), vec!["A"]);
    assert_eq!(client.events(), vec!["serialize:A"]);
    assert_eq!(stores.memory.get("a"), Some(json!(true)));
}

#[test]
fn empty_step_list_records_usage_only() {
    let stores = project_stores();
    let mut client = ScriptedClient::silent();

    run_steps(&mut client, &stores, &[]).expect("run");

    assert_eq!(stores.logs.keys(), vec![TOKEN_USAGE_KEY]);
}

#[test]
fn default_mode_generates_and_runs_the_app() {
    let project = TempProject::new();
    let stores = &project.stores;
    let mut operator = ScriptedOperator::new(["a script that writes a greeting"]);
    session::start(stores, StepMode::Default, &mut operator).expect("start");

    let mut client = ScriptedClient::new([
        "The app is one script.\n\ngreet.sh\n```bash\necho hello > greeting.txt\n```\n",
        "```bash\nbash greet.sh\n```\n",
    ]);
    let summary = run_mode(&mut client, stores, StepMode::Default).expect("run");

    assert_eq!(
        summary.completed,
        vec!["simple_gen", "gen_entrypoint", "execute_entrypoint"]
    );
    assert_eq!(
        stores.input.get(PROMPT_KEY),
        Some(json!("a script that writes a greeting"))
    );
    assert_eq!(stores.workspace.get(RUN_SCRIPT_KEY), Some(json!("bash greet.sh\n")));
    assert!(stores.memory.contains(ALL_OUTPUT_KEY));
    assert!(stores.memory.contains(EXECUTION_LOG_KEY));
    let greeting =
        std::fs::read_to_string(project.workspace_dir().join("greeting.txt")).expect("greeting");
    assert_eq!(greeting, "hello\n");

    let usage = stores.logs.get(TOKEN_USAGE_KEY).expect("usage");
    let usage = usage.as_str().expect("csv");
    assert_eq!(usage.lines().count(), 3);
    assert!(usage.lines().nth(1).expect("row").starts_with("simple_gen,"));
    assert_eq!(stores.archive.keys().len(), 1);
    assert_eq!(client.remaining_replies(), 0);
}

#[test]
fn improve_mode_turns_findings_into_edits() {
    let stores = project_stores();
    stores.workspace.set("main.tf", "members = [\"allUsers\"]\n");
    stores.input.set(
        "findings",
        json!([{
            "check_id": "CKV_GCP_28",
            "check_result": {"result": "FAILED"},
            "code_block": [[1, "members = [\"allUsers\"]\n"]],
            "details": ["Do not grant access to allUsers."]
        }]),
    );
    let mut client =
        ScriptedClient::new(["main.tf\n```hcl\nmembers = [\"group:ops@example.com\"]\n```\n"]);

    run_mode(&mut client, &stores, StepMode::ImproveCode).expect("run");

    assert_eq!(
        stores.workspace.get("main.tf"),
        Some(json!("members = [\"group:ops@example.com\"]\n"))
    );
    let (step, sent) = &client.requests[0];
    assert_eq!(step, "improve_existing_code");
    assert!(sent.last().expect("request").content.starts_with(
        "Request: Fix the code lines according to fix instructions: Do not grant access"
    ));
    assert_eq!(
        stores.logs.keys(),
        vec![
            "get_improve_prompt",
            "improve_existing_code",
            "set_improve_filelist",
            TOKEN_USAGE_KEY
        ]
    );
}
