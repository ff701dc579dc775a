//! Unit and behavioural tests for the CLI runtime.
//!
//! Sessions run in-process against a temporary target. The editor and
//! validator are small shell scripts so the full launch path is exercised.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::io::Cursor;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Mutex, PoisonError};

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;
use vigil_config::{Config, FileMode};

use crate::{AppError, ConfigLoader, IoStreams, run_with_loader};

const EDITOR_ARGS: &str = "editor.args";

// Sessions arm the process-wide signal guard, so only one may run at a time.
static SESSION_LOCK: Mutex<()> = Mutex::new(());

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Proves that option handling short-circuits before configuration loads.
struct PanickingLoader;

impl ConfigLoader for PanickingLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        panic!("configuration must not be loaded");
    }
}

fn shell_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

struct TestWorld {
    dir: TempDir,
    config: Config,
    original: Option<String>,
    passes: Vec<String>,
    editor_status: i32,
    answers: String,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<ExitCode>,
}

impl TestWorld {
    fn new() -> Self {
        let dir = TempDir::new().expect("temporary directory");
        let metadata = fs::metadata(dir.path()).expect("temporary directory metadata");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 tempdir");
        let config = Config {
            target_path: root.join("app.conf"),
            staging_path: root.join("app.conf.tmp"),
            editor: Some(format!("/bin/sh {}", root.join("editor.sh"))),
            env_editor: false,
            validator: None,
            owner: metadata.uid(),
            group: metadata.gid(),
            mode: FileMode::new(0o640),
            log_filter: String::from("off"),
            ..Config::default()
        };
        Self {
            dir,
            config,
            original: None,
            passes: Vec::new(),
            editor_status: 0,
            answers: String::new(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn target(&self) -> &Path {
        self.config.target_path.as_std_path()
    }

    fn write_target(&mut self, contents: &str) {
        let text = format!("{contents}\n");
        fs::write(self.target(), &text).expect("write target");
        self.original = Some(text);
    }

    fn write_validator(&mut self, marker: &str) {
        let hits = self.path("validator.hits");
        let script = format!(
            "if grep -n {marker} \"$1\" > {hits}; then\n  \
             line=$(head -n 1 {hits} | cut -d: -f1)\n  \
             echo \"$1:$line: syntax error\" >&2\n  \
             exit 1\nfi\nexit 0\n",
            marker = shell_quote(marker),
            hits = hits.display(),
        );
        let path = self.path("validator.sh");
        fs::write(&path, script).expect("write validator script");
        self.config.validator = Some(format!("/bin/sh {}", path.display()));
    }

    fn write_editor(&self) {
        let args = self.path(EDITOR_ARGS);
        let mut script = format!(
            "for staged; do :; done\nprintf '%s\\n' \"$*\" >> {args}\n\
             pass=$(( $(wc -l < {args}) ))\ncase $pass in\n",
            args = args.display(),
        );
        for (index, contents) in self.passes.iter().enumerate() {
            script.push_str(&format!(
                "  {}) printf '%s\\n' {} > \"$staged\" ;;\n",
                index + 1,
                shell_quote(contents)
            ));
        }
        script.push_str(&format!("esac\nexit {}\n", self.editor_status));
        fs::write(self.path("editor.sh"), script).expect("write editor script");
    }

    fn run(&mut self, extra: &[&str]) {
        self.write_editor();
        self.stdout.clear();
        self.stderr.clear();
        let args: Vec<OsString> = std::iter::once("vigil")
            .chain(extra.iter().copied())
            .map(OsString::from)
            .collect();
        let loader = StaticConfigLoader {
            config: self.config.clone(),
        };
        let stdin = Cursor::new(self.answers.clone().into_bytes());
        let _session = SESSION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut io = IoStreams::new(stdin, &mut self.stdout, &mut self.stderr);
        self.exit_code = Some(run_with_loader(args, &mut io, &loader));
    }

    fn stdout_text(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    fn stderr_text(&self) -> String {
        String::from_utf8(self.stderr.clone()).expect("stderr utf8")
    }

    fn target_text(&self) -> String {
        fs::read_to_string(self.target()).expect("read target")
    }

    fn editor_invocations(&self) -> Vec<String> {
        fs::read_to_string(self.path(EDITOR_ARGS))
            .map(|text| text.lines().map(str::to_owned).collect())
            .unwrap_or_default()
    }
}

#[fixture]
fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

#[given("a target containing {text}")]
fn given_target(world: &RefCell<TestWorld>, text: String) {
    world.borrow_mut().write_target(text.trim_matches('"'));
}

#[given("a validator rejecting {marker}")]
fn given_validator(world: &RefCell<TestWorld>, marker: String) {
    world.borrow_mut().write_validator(marker.trim_matches('"'));
}

#[given("the editor writes {text}")]
fn given_editor_writes(world: &RefCell<TestWorld>, text: String) {
    world
        .borrow_mut()
        .passes
        .push(text.trim_matches('"').to_owned());
}

#[given("the editor then writes {text}")]
fn given_editor_then_writes(world: &RefCell<TestWorld>, text: String) {
    world
        .borrow_mut()
        .passes
        .push(text.trim_matches('"').to_owned());
}

#[given("the editor exits with status {status}")]
fn given_editor_status(world: &RefCell<TestWorld>, status: i32) {
    world.borrow_mut().editor_status = status;
}

#[given("the operator answers {answer}")]
fn given_answer(world: &RefCell<TestWorld>, answer: String) {
    let mut world = world.borrow_mut();
    world.answers.push_str(answer.trim_matches('"'));
    world.answers.push('\n');
}

#[given("the staging slot is occupied")]
fn given_slot_occupied(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    fs::write(world.config.staging_path.as_std_path(), "held\n").expect("occupy staging slot");
}

#[when("vigil runs")]
fn when_vigil_runs(world: &RefCell<TestWorld>) {
    world.borrow_mut().run(&[]);
}

#[then("vigil succeeds")]
fn then_success(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert_eq!(
        world.exit_code,
        Some(ExitCode::SUCCESS),
        "stderr: {}",
        world.stderr_text()
    );
}

#[then("vigil fails")]
fn then_failure(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().exit_code, Some(ExitCode::FAILURE));
}

#[then("the target reads {text}")]
fn then_target_reads(world: &RefCell<TestWorld>, text: String) {
    let expected = format!("{}\n", text.trim_matches('"'));
    assert_eq!(world.borrow().target_text(), expected);
}

#[then("the target is unchanged")]
fn then_target_unchanged(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let original = world.original.clone().expect("target was written");
    assert_eq!(world.target_text(), original);
}

#[then("the target has mode {mode}")]
fn then_target_mode(world: &RefCell<TestWorld>, mode: String) {
    let world = world.borrow();
    let expected = u32::from_str_radix(mode.trim_matches('"'), 8).expect("octal mode");
    let actual = fs::metadata(world.target()).expect("target metadata").mode() & 0o7777;
    assert_eq!(actual, expected);
}

#[then("the staging slot is free")]
fn then_slot_free(world: &RefCell<TestWorld>) {
    assert!(!world.borrow().config.staging_path.exists());
}

#[then("the staging slot is still held")]
fn then_slot_held(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let contents =
        fs::read_to_string(world.config.staging_path.as_std_path()).expect("staging contents");
    assert_eq!(contents, "held\n");
}

#[then("the editor ran {count} times")]
fn then_editor_count(world: &RefCell<TestWorld>, count: usize) {
    assert_eq!(world.borrow().editor_invocations().len(), count);
}

#[then("the second editor pass started with {argument}")]
fn then_second_pass(world: &RefCell<TestWorld>, argument: String) {
    let invocations = world.borrow().editor_invocations();
    let second = invocations.get(1).expect("second editor pass");
    assert!(
        second.starts_with(argument.trim_matches('"')),
        "second pass arguments were {second:?}"
    );
}

#[then("stdout contains {snippet}")]
fn then_stdout_contains(world: &RefCell<TestWorld>, snippet: String) {
    let stdout = world.borrow().stdout_text();
    let snippet = snippet.trim_matches('"');
    assert!(
        stdout.contains(snippet),
        "stdout {stdout:?} did not contain {snippet:?}"
    );
}

#[then("stderr contains {snippet}")]
fn then_stderr_contains(world: &RefCell<TestWorld>, snippet: String) {
    let stderr = world.borrow().stderr_text();
    let snippet = snippet.trim_matches('"');
    assert!(
        stderr.contains(snippet),
        "stderr {stderr:?} did not contain {snippet:?}"
    );
}

#[then("stderr does not mention the target being unchanged")]
fn then_no_unchanged_notice(world: &RefCell<TestWorld>) {
    assert!(!world.borrow().stderr_text().contains("unchanged"));
}

#[scenario(path = "tests/features/vigil_cli.feature", name = "A clean edit is committed with the configured mode")]
fn clean_edit_committed(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/vigil_cli.feature", name = "A parse error reopens the editor at the reported line")]
fn parse_error_reopens_editor(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/vigil_cli.feature", name = "Exiting after a parse error keeps the original")]
fn exit_keeps_original(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/vigil_cli.feature", name = "Unknown answers list the options")]
fn unknown_answers_list_options(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/vigil_cli.feature", name = "A busy staging slot is reported without touching it")]
fn busy_slot_reported(world: RefCell<TestWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/vigil_cli.feature", name = "A failing editor aborts the session")]
fn failing_editor_aborts(world: RefCell<TestWorld>) {
    drop(world);
}

fn run_without_config(args: &[&str]) -> (ExitCode, String, String) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let args: Vec<OsString> = args.iter().map(OsString::from).collect();
    let mut io = IoStreams::new(Cursor::new(Vec::new()), &mut stdout, &mut stderr);
    let exit = run_with_loader(args, &mut io, &PanickingLoader);
    drop(io);
    (
        exit,
        String::from_utf8(stdout).expect("stdout utf8"),
        String::from_utf8(stderr).expect("stderr utf8"),
    )
}

#[test]
fn version_flag_prints_version_without_loading_configuration() {
    let (exit, stdout, stderr) = run_without_config(&["vigil", "-V"]);
    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(
        stdout,
        format!("vigil version {}\n", env!("CARGO_PKG_VERSION"))
    );
    assert!(stderr.is_empty());
}

#[rstest]
#[case(&["vigil", "-x"])]
#[case(&["vigil", "--help"])]
#[case(&["vigil", "extra"])]
fn unknown_arguments_print_usage(#[case] args: &[&str]) {
    let (exit, stdout, stderr) = run_without_config(args);
    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    assert_eq!(stderr, "usage: vigil [-V]\n");
}
