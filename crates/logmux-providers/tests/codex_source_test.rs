//! End-to-end checks over a realistic codex rollout tree.

use logmux_providers::{CodexSource, LogSource};
use logmux_testing::{CodexSessionBuilder, TestWorld};
use logmux_types::{SessionStatus, Source};

const SESSION_ID: &str = "7f2abd2d-7cfc-4447-9ddd-3ca8d14e02e9";
const CWD: &str = "/work/gamma";

const T0: i64 = 1_714_564_800_000;

fn sample_session() -> CodexSessionBuilder {
    CodexSessionBuilder::new(SESSION_ID, CWD)
        .meta(T0)
        .turn_context("gpt-5-codex", T0 + 500)
        .environment_context(T0 + 600)
        .user("map the crate layout", T0 + 1_000)
        .assistant("three modules found", T0 + 9_000)
        .user("now write the docs", T0 + 60_000)
        .function_call("c1", "shell", T0 + 61_000)
        .function_call_output("c1", T0 + 62_000)
        .assistant("docs written", T0 + 70_000)
}

fn source_for(world: &TestWorld) -> CodexSource {
    CodexSource::new(vec![world.codex_root().to_path_buf()])
}

#[test]
fn index_resolves_session_id_from_rollout_name() {
    let world = TestWorld::new();
    world.write_codex_session(&sample_session(), T0).unwrap();

    let mut source = source_for(&world);
    let entries = source.list_session_index(true);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].session_id, SESSION_ID);
    assert_eq!(entries[0].source, Source::Codex);
}

#[test]
fn summary_carries_model_cwd_and_completed_hint() {
    let world = TestWorld::new();
    world.write_codex_session(&sample_session(), T0).unwrap();

    let mut source = source_for(&world);
    let entries = source.list_session_index(true);
    let summary = source.build_summary(&entries[0]).unwrap();

    assert_eq!(summary.input, "now write the docs");
    assert_eq!(summary.output_text, "docs written");
    assert_eq!(summary.model.as_deref(), Some("gpt-5-codex"));
    assert_eq!(summary.cwd.as_deref(), Some(CWD));
    assert_eq!(summary.status_hint, Some(SessionStatus::Completed));
    assert_eq!(summary.status_hint_ts, Some(T0 + 70_000));
    assert!(summary.source_path.is_some());
}

#[test]
fn pending_input_request_hints_waiting_user() {
    let world = TestWorld::new();
    let builder = CodexSessionBuilder::new(SESSION_ID, CWD)
        .meta(T0)
        .user("pick a license", T0 + 1_000)
        .function_call("r1", "request_user_input", T0 + 2_000);
    world.write_codex_session(&builder, T0).unwrap();

    let mut source = source_for(&world);
    let entries = source.list_session_index(true);
    let summary = source.build_summary(&entries[0]).unwrap();
    assert_eq!(summary.status_hint, Some(SessionStatus::WaitingUser));
}

#[test]
fn load_session_skips_synthetic_context_turns() {
    let world = TestWorld::new();
    world.write_codex_session(&sample_session(), T0).unwrap();

    let source = source_for(&world);
    let slice = source.load_session(SESSION_ID, None, 10);
    assert_eq!(slice.blocks.len(), 2);
    assert_eq!(slice.blocks[0].input, "now write the docs");
    assert_eq!(slice.blocks[1].input, "map the crate layout");
    assert!(slice
        .blocks
        .iter()
        .all(|b| !b.input.contains("environment_context")));
    assert!(slice.blocks.iter().all(|b| b.session_id == SESSION_ID));
}

#[test]
fn fork_writes_synthetic_meta_with_lineage() {
    let world = TestWorld::new();
    let source_file = world.write_codex_session(&sample_session(), T0).unwrap();

    let source = source_for(&world);
    let slice = source.load_session(SESSION_ID, None, 10);
    let target = slice
        .blocks
        .iter()
        .find(|b| b.input == "map the crate layout")
        .unwrap();

    let outcome = source.fork(target).expect("fork should succeed");
    assert_eq!(outcome.source, Source::Codex);
    assert_eq!(outcome.command, format!("codex resume {}", outcome.session_id));
    assert_eq!(outcome.file_path.parent(), source_file.parent());

    let content = std::fs::read_to_string(&outcome.file_path).unwrap();
    let mut lines = content.lines();
    let head: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
    assert_eq!(head["type"], "session_meta");
    assert_eq!(head["payload"]["id"], outcome.session_id.as_str());
    assert_eq!(head["payload"]["forked_from_id"], SESSION_ID);
    assert_eq!(head["payload"]["cwd"], CWD);

    // Exactly one meta record: the original one was replaced.
    let meta_lines = content
        .lines()
        .filter(|l| l.contains("session_meta"))
        .count();
    assert_eq!(meta_lines, 1);

    // The target turn and its output survive; later turns do not.
    assert!(content.contains("map the crate layout"));
    assert!(content.contains("three modules found"));
    assert!(!content.contains("now write the docs"));
    assert!(!content.contains("docs written"));

    // The fork resumes as its own session with visible lineage.
    let fork_slice = source.load_session(&outcome.session_id, None, 10);
    assert_eq!(fork_slice.blocks.len(), 1);
    assert_eq!(
        fork_slice.blocks[0].forked_from_id.as_deref(),
        Some(SESSION_ID)
    );
}

#[test]
fn fork_with_repeated_user_text_cuts_at_the_requested_turn() {
    let world = TestWorld::new();
    let builder = CodexSessionBuilder::new(SESSION_ID, CWD)
        .meta(T0)
        .user("continue", T0 + 1_000)
        .assistant("first answer", T0 + 5_000)
        .user("continue", T0 + 60_000)
        .assistant("second answer", T0 + 65_000);
    world.write_codex_session(&builder, T0).unwrap();

    let source = source_for(&world);
    let slice = source.load_session(SESSION_ID, None, 10);
    assert_eq!(slice.blocks.len(), 2);
    // Newest first: the second "continue" and its answer.
    let target = &slice.blocks[0];
    assert_eq!(target.output_text, "second answer");

    let outcome = source.fork(target).expect("fork should succeed");
    let content = std::fs::read_to_string(&outcome.file_path).unwrap();

    // The identical earlier turn must not satisfy the target; the cut lands
    // after the second occurrence, keeping both turns and both answers.
    assert!(content.contains("second answer"));
    assert!(content.contains("first answer"));
    assert_eq!(content.matches("\"continue\"").count(), 2);
}

#[test]
fn fork_of_missing_turn_cleans_up_and_reports() {
    let world = TestWorld::new();
    let source_file = world.write_codex_session(&sample_session(), T0).unwrap();

    let source = source_for(&world);
    let slice = source.load_session(SESSION_ID, None, 10);
    let mut target = slice.blocks[0].clone();
    target.source_id = None;
    target.input = "never said this".to_string();
    // Far from every record so timestamp proximity cannot match either.
    target.created_at = T0 + 9_000_000;

    let failure = source.fork(&target).unwrap_err();
    assert_eq!(failure.error, "target turn not found in source file");
    assert_eq!(failure.detail.stop_reason.as_deref(), Some("target_not_found"));
    assert_eq!(failure.detail.user_entries, 2);

    // The partially written rollout was removed.
    let dir = source_file.parent().unwrap();
    let count = std::fs::read_dir(dir).unwrap().count();
    assert_eq!(count, 1);
}
