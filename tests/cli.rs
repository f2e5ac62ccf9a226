mod board_stub;
mod openai_stub;

use std::fs;
use std::path::Path;

use predicates::prelude::*;

use board_stub::{BoardStub, not_found};
use openai_stub::{OpenAiStub, StubBehavior};

fn write_config(dir: &Path, api_base: &str) -> anyhow::Result<std::path::PathBuf> {
    let config = format!(
        r#"data_dir = "{data_dir}"

[fourchan]
boards = ["g"]
keywords = ["ai"]
thread_limit = 1
request_delay_ms = 0
timeout_secs = 5
api_base = "{api_base}"
boards_base = "{api_base}"

[[fourchan.tracked]]
name = "LLM General"
board = "g"
"#,
        data_dir = dir.join("data").display(),
    );
    let path = dir.join("board-explorer.toml");
    fs::write(&path, config)?;
    Ok(path)
}

fn spawn_board() -> BoardStub {
    BoardStub::spawn(|_host, path| match path {
        "/g/catalog.json" => (
            200,
            serde_json::json!([{ "threads": [
                { "no": 10, "sub": "LLM General", "com": "op", "time": 1740787200 },
                { "no": 20, "sub": "AI safety", "com": "op", "time": 1740787300 },
                { "no": 30, "sub": "AI art", "com": "op", "time": 1740787400 }
            ]}])
            .to_string(),
        ),
        "/g/thread/10.json" | "/g/thread/20.json" | "/g/thread/30.json" => (
            200,
            serde_json::json!({ "posts": [
                { "no": 1, "com": "opening post", "time": 1740787200 },
                { "no": 2, "com": "first reply", "time": 1740787260 }
            ]})
            .to_string(),
        ),
        _ => not_found(),
    })
}

fn only_markdown_file(dir: &Path) -> anyhow::Result<String> {
    let files: Vec<_> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    anyhow::ensure!(files.len() == 1, "expected one markdown file, got {files:?}");
    Ok(fs::read_to_string(&files[0])?)
}

#[test]
fn run_collects_summarizes_and_saves_markdown() -> anyhow::Result<()> {
    let board = spawn_board();
    let openai = OpenAiStub::spawn(StubBehavior::SummarizeTitle);
    let temp = tempfile::tempdir()?;
    let config = write_config(temp.path(), &board.base_url)?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("board-explorer");
    cmd.env("OPENAI_API_KEY", "test-key")
        .env("BOARD_EXPLORER_OPENAI_BASE_URL", &openai.base_url)
        .env("BOARD_EXPLORER_OPENAI_MODEL", "stub-model")
        .args(["run", "--source", "4chan", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("call report"));

    let markdown = only_markdown_file(&temp.path().join("data/fourchan_explorer"))?;
    assert!(markdown.starts_with("# 4chan AI threads ("));
    assert!(markdown.contains("## /g/"));
    assert!(markdown.contains("### LLM General\n"));
    assert!(markdown.contains("**Summary**:\nsummary of LLM General"));
    assert!(markdown.contains("### AI safety\n"));
    // thread_limit = 1
    assert!(!markdown.contains("AI art"));

    let requests = openai.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["model"], "stub-model");
    assert_eq!(requests[0]["max_output_tokens"], 1000);
    assert!(
        requests[0]["input"]
            .as_str()
            .unwrap_or_default()
            .contains("Reply 1: first reply")
    );

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("board-explorer");
    cmd.args(["tracked", "list", "--source", "4chan", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("4chan\tLLM General\t/g/\t10\t2\t"));
    Ok(())
}

#[test]
fn failed_summaries_become_placeholders() -> anyhow::Result<()> {
    let board = spawn_board();
    let openai = OpenAiStub::spawn(StubBehavior::Fail);
    let temp = tempfile::tempdir()?;
    let config = write_config(temp.path(), &board.base_url)?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("board-explorer");
    cmd.env("OPENAI_API_KEY", "test-key")
        .env("BOARD_EXPLORER_OPENAI_BASE_URL", &openai.base_url)
        .args(["run", "--source", "4chan", "--config"])
        .arg(&config)
        .assert()
        .success();

    let markdown = only_markdown_file(&temp.path().join("data/fourchan_explorer"))?;
    assert!(markdown.contains("summary unavailable: api error (500): stub failure"));
    Ok(())
}

#[test]
fn run_without_api_key_fails_before_any_request() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let config = write_config(temp.path(), "http://127.0.0.1:9")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("board-explorer");
    cmd.env_remove("OPENAI_API_KEY")
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing api key"));
    Ok(())
}

#[test]
fn tracked_add_then_list() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let data_dir = temp.path().join("data");
    let missing_config = temp.path().join("absent.toml");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("board-explorer");
    cmd.args(["tracked", "add", "--source", "5chan", "--name", "ローカルLLM総合", "--board", "ai"])
        .arg("--config")
        .arg(&missing_config)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout("tracking: ローカルLLM総合 (/ai/)\n");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("board-explorer");
    cmd.args(["tracked", "add", "--source", "5chan", "--name", "ローカルLLM総合", "--board", "ai"])
        .arg("--config")
        .arg(&missing_config)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout("already tracked: ローカルLLM総合\n");

    assert!(data_dir.join("fivechan_explorer/tracked_threads.json").exists());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("board-explorer");
    cmd.args(["tracked", "list", "--config"])
        .arg(&missing_config)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout("5ch\tローカルLLM総合\t/ai/\t-\t-\t-\n");
    Ok(())
}

#[test]
fn tracked_add_needs_a_single_source() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("board-explorer");
    cmd.args(["tracked", "add", "--source", "all", "--name", "x", "--board", "g"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("single source"));
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("board-explorer");
    cmd.env("RUST_LOG", "debug")
        .args(["tracked", "list", "--config"])
        .arg(temp.path().join("absent.toml"))
        .arg("--data-dir")
        .arg(temp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
    Ok(())
}
