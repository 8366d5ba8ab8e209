//! Repository behavior over mixed on-disk fixtures.

use logmux_index::Repository;
use logmux_providers::{ClaudeSource, CodexSource, LogSource};
use logmux_testing::{ClaudeSessionBuilder, CodexSessionBuilder, TestWorld};
use logmux_types::{ConversationBlock, Source};

const CLAUDE_ID: &str = "6f9619ff-8b86-4011-b42d-00cf4fc964ff";
const CODEX_ID: &str = "7f2abd2d-7cfc-4447-9ddd-3ca8d14e02e9";

const T0: i64 = 1_714_564_800_000;

fn claude_fixture() -> ClaudeSessionBuilder {
    ClaudeSessionBuilder::new(CLAUDE_ID, "/work/alpha")
        .user("u-1", "refactor the parser", T0 + 200_000)
        .assistant("a-1", "extracted a lexer", T0 + 209_000)
        .user("u-2", "ship it", T0 + 220_000)
        .assistant("a-2", "tagged the release", T0 + 225_000)
}

fn codex_fixture() -> CodexSessionBuilder {
    CodexSessionBuilder::new(CODEX_ID, "/work/gamma")
        .meta(T0)
        .turn_context("gpt-5-codex", T0 + 500)
        .user("now write the docs", T0 + 1_000)
        .assistant("docs written", T0 + 9_000)
}

struct Fixture {
    world: TestWorld,
}

impl Fixture {
    fn new() -> Self {
        let world = TestWorld::new();
        let claude_path = world
            .write_claude_session(&claude_fixture(), "/work/alpha")
            .unwrap();
        let codex_path = world.write_codex_session(&codex_fixture(), T0).unwrap();
        TestWorld::set_mtime_ms(&claude_path, T0 + 225_000).unwrap();
        TestWorld::set_mtime_ms(&codex_path, T0 + 9_000).unwrap();
        Fixture { world }
    }

    fn repository(&self) -> Repository {
        let sources: Vec<Box<dyn LogSource>> = vec![
            Box::new(ClaudeSource::new(vec![self.world.claude_root().to_path_buf()])),
            Box::new(CodexSource::new(vec![self.world.codex_root().to_path_buf()])),
        ];
        Repository::new(sources)
    }
}

#[test]
fn merged_listing_orders_by_latest_activity() {
    let fixture = Fixture::new();
    let mut repo = fixture.repository();

    let page = repo.list_sessions(50, true);
    assert_eq!(page.sessions.len(), 2);
    assert!(!page.has_more);
    assert_eq!(page.sessions[0].source, Source::Claude);
    assert_eq!(page.sessions[0].input, "ship it");
    assert_eq!(page.sessions[1].source, Source::Codex);
    assert_eq!(page.sessions[1].input, "now write the docs");
}

#[test]
fn listing_limit_truncates_and_flags_more() {
    let fixture = Fixture::new();
    let mut repo = fixture.repository();

    let page = repo.list_sessions(1, true);
    assert_eq!(page.sessions.len(), 1);
    assert!(page.has_more);
    assert_eq!(page.sessions[0].source, Source::Claude);
}

#[test]
fn session_key_addresses_one_session() {
    let fixture = Fixture::new();
    let repo = fixture.repository();

    let slice = repo.load_session(&format!("claude:{}", CLAUDE_ID), 10);
    assert_eq!(slice.blocks.len(), 2);
    assert_eq!(slice.blocks[0].input, "ship it");

    assert!(repo.load_session("unknown-key", 10).blocks.is_empty());
}

#[test]
fn index_stats_cover_one_source() {
    let fixture = Fixture::new();
    let mut repo = fixture.repository();

    let stats = repo.index_stats(Source::Claude, true);
    assert_eq!(stats.file_count, 1);
    assert_eq!(stats.latest_mtime, T0 + 225_000);
}

#[test]
fn chunked_search_visits_every_file_exactly_once() {
    let fixture = Fixture::new();
    let mut repo = fixture.repository();

    // Newest file first: the claude log holds no match, so the first
    // chunk is empty but hands back a cursor.
    let first = repo.search("docs", 0, 1);
    assert!(first.hits.is_empty());
    assert_eq!(first.next_cursor, Some(1));

    let second = repo.search("docs", 1, 1);
    assert_eq!(second.hits.len(), 1);
    assert_eq!(second.hits[0].block.input, "now write the docs");
    assert_eq!(second.hits[0].why, "matched 1/1 term(s)");
    assert!(second.next_cursor.is_none());
}

#[test]
fn search_requires_every_term() {
    let fixture = Fixture::new();
    let mut repo = fixture.repository();

    let page = repo.search("docs parser", 0, 10);
    assert!(page.hits.is_empty());
    assert!(page.next_cursor.is_none());

    let page = repo.search("docs written", 0, 10);
    assert_eq!(page.hits.len(), 1);
}

#[test]
fn input_matches_outrank_output_matches() {
    let fixture = Fixture::new();
    let mut repo = fixture.repository();

    // "docs" sits in both input and output of the same block, "written"
    // only in the output, so single-term queries expose the weighting.
    let input_hit = &repo.search("docs", 0, 10).hits[0];
    let output_hit = &repo.search("written", 0, 10).hits[0];
    assert!(input_hit.score > output_hit.score);
}

#[test]
fn empty_query_is_an_empty_page() {
    let fixture = Fixture::new();
    let mut repo = fixture.repository();
    let page = repo.search("   ", 0, 10);
    assert!(page.hits.is_empty());
    assert!(page.next_cursor.is_none());
}

#[test]
fn fork_on_unconfigured_source_fails_cleanly() {
    let fixture = Fixture::new();
    let sources: Vec<Box<dyn LogSource>> = vec![Box::new(ClaudeSource::new(vec![fixture
        .world
        .claude_root()
        .to_path_buf()]))];
    let repo = Repository::new(sources);

    let block = ConversationBlock::assemble(
        Source::Codex,
        Some("raw".into()),
        CODEX_ID.into(),
        "now write the docs".into(),
        "docs written".into(),
        T0 + 1_000,
        T0 + 9_000,
    )
    .unwrap();
    let failure = repo.fork(&block).unwrap_err();
    assert!(failure.error.contains("not configured"));
}
