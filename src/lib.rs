mod collector;
mod error;
mod git_api;
mod output;
mod output_stream;
mod process;
mod process_handle;
mod signal;

pub use error::{
    CollectorError, GitError, RunError, SpawnError, TerminationError, WaitError,
};
pub use git_api::{CliGitApi, GitApi};
pub use output::{Completion, LINE_SEPARATOR, RunState};
pub use output_stream::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_CHUNK_SIZE, StreamType};
pub use process::{CliCommand, DEFAULT_INTERRUPT_TIMEOUT, DEFAULT_TERMINATE_TIMEOUT};
pub use process_handle::{ProcessHandle, RunningState};

#[cfg(all(test, unix))]
mod test {
    use crate::{CliCommand, RunError, RunState, SpawnError, WaitError};
    use assertr::prelude::*;
    use std::time::Duration;

    fn sh(script: &str) -> CliCommand {
        CliCommand::new("sh", ["-c", script], ".")
    }

    #[tokio::test]
    async fn stdout_only() {
        let completion = sh("echo 'On branch main'; echo 'nothing to commit'")
            .run()
            .await
            .unwrap();

        assert_that(completion.exit_code()).is_some().is_equal_to(0);
        assert_that(completion.success()).is_true();
        assert_that(completion.output.as_str())
            .is_equal_to("On branch main\nnothing to commit\n");
        assert_that(completion.error_output.as_str()).is_equal_to("");
        assert_that(completion.full_output).is_equal_to(completion.output);
    }

    #[tokio::test]
    async fn stderr_only_with_non_zero_exit_is_not_an_error() {
        let completion = sh("echo 'fatal: not a git repository' >&2; exit 128")
            .run()
            .await
            .unwrap();

        assert_that(completion.exit_code()).is_some().is_equal_to(128);
        assert_that(completion.success()).is_false();
        assert_that(completion.output.as_str()).is_equal_to("");
        assert_that(completion.error_output.as_str())
            .is_equal_to("fatal: not a git repository\n");
        assert_that(completion.full_output).is_equal_to(completion.error_output);
    }

    #[tokio::test]
    async fn every_line_of_both_streams_is_captured_once() {
        let completion = sh("for i in 1 2 3 4 5; do echo out$i; echo err$i >&2; done; echo out6")
            .run()
            .await
            .unwrap();

        let output: Vec<&str> = completion.output.lines().collect();
        let error_output: Vec<&str> = completion.error_output.lines().collect();
        let mut full_output: Vec<&str> = completion.full_output.lines().collect();

        assert_that(output.clone())
            .is_equal_to(vec!["out1", "out2", "out3", "out4", "out5", "out6"]);
        assert_that(error_output.clone()).is_equal_to(vec!["err1", "err2", "err3", "err4", "err5"]);
        assert_that(full_output.len()).is_equal_to(11);

        // Interleaving is up to the OS, but each stream keeps its order within the full output.
        let full_stdout: Vec<&str> = full_output
            .iter()
            .copied()
            .filter(|l| l.starts_with("out"))
            .collect();
        assert_that(full_stdout).is_equal_to(output.clone());

        full_output.sort_unstable();
        let mut expected = [output, error_output].concat();
        expected.sort_unstable();
        assert_that(full_output).is_equal_to(expected);
    }

    #[tokio::test]
    async fn unterminated_last_line_and_empty_lines_are_kept() {
        let completion = sh("printf 'first\\n\\nlast'").run().await.unwrap();

        assert_that(completion.output.as_str()).is_equal_to("first\n\nlast\n");
    }

    #[tokio::test]
    async fn crlf_line_endings_are_normalized() {
        let completion = sh("printf 'a\\r\\nb\\r\\n'").run().await.unwrap();

        assert_that(completion.output.as_str()).is_equal_to("a\nb\n");
    }

    #[tokio::test]
    async fn arguments_are_not_interpreted_by_a_shell() {
        let completion = CliCommand::new("printf", ["%s|", "fix bug", "$HOME", "*"], ".")
            .run()
            .await
            .unwrap();

        assert_that(completion.output.as_str()).is_equal_to("fix bug|$HOME|*|\n");
    }

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let completion = CliCommand::new("pwd", Vec::<String>::new(), dir.path())
            .run()
            .await
            .unwrap();

        let reported = std::fs::canonicalize(completion.output.trim_end()).unwrap();
        assert_that(reported).is_equal_to(std::fs::canonicalize(dir.path()).unwrap());
    }

    #[tokio::test]
    async fn large_output_is_captured_completely() {
        let completion = sh("i=0; while [ $i -lt 5000 ]; do echo line$i; i=$((i+1)); done")
            .chunk_size(64)
            .channel_capacity(2)
            .run()
            .await
            .unwrap();

        let lines: Vec<&str> = completion.output.lines().collect();
        assert_that(lines.len()).is_equal_to(5000);
        assert_that(lines[0]).is_equal_to("line0");
        assert_that(lines[4999]).is_equal_to("line4999");
    }

    #[tokio::test]
    async fn missing_executable_is_a_launch_failure() {
        let cmd = CliCommand::new("./this-command-does-not-exist", ["status"], ".");

        let result = cmd.run().await;
        assert!(matches!(
            result,
            Err(RunError::Spawn(SpawnError::SpawnFailed { .. }))
        ));

        let state = cmd.execute().await;
        assert!(matches!(state, RunState::LaunchFailed(_)));
        assert_that(state.exit_code()).is_none();
        assert_that(state.full_output()).is_none();
    }

    #[tokio::test]
    async fn missing_working_directory_is_a_launch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");

        let state = CliCommand::new("pwd", Vec::<String>::new(), missing)
            .execute()
            .await;

        assert!(matches!(state, RunState::LaunchFailed(_)));
        assert_that(state.exit_code()).is_none();
    }

    #[tokio::test]
    async fn execute_completes_with_real_exit_code() {
        let state = sh("echo done; exit 3").execute().await;

        assert_that(state.is_completed()).is_true();
        assert_that(state.exit_code()).is_some().is_equal_to(3);
        assert_that(state.output()).is_some().is_equal_to("done\n");
        assert_that(state.error_output()).is_some().is_equal_to("");
    }

    #[tokio::test]
    async fn timeout_interrupts_the_run() {
        let state = CliCommand::new("sleep", ["30"], ".")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;

        assert!(matches!(
            state,
            RunState::Interrupted(WaitError::Timeout { .. })
        ));
        assert_that(state.exit_code()).is_none();
    }

    #[tokio::test]
    async fn timeout_covers_output_held_open_by_background_process() {
        let started = std::time::Instant::now();
        let result = sh("sleep 5 & echo started")
            .timeout(Duration::from_millis(200))
            .run()
            .await;

        assert!(matches!(
            result,
            Err(RunError::Wait(WaitError::Timeout { .. }))
        ));
        assert_that(started.elapsed() < Duration::from_secs(3)).is_true();
    }

    #[tokio::test]
    async fn run_until_cancel_interrupts_the_run() {
        let (cancel_tx, cancel_rx) = tokio::sync::oneshot::channel::<()>();
        let cmd = CliCommand::new("sleep", ["30"], ".")
            .termination_timeouts(Duration::from_millis(500), Duration::from_millis(500));

        let run = tokio::spawn(async move {
            cmd.run_until(async {
                let _ = cancel_rx.await;
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel_tx.send(()).unwrap();

        let result = run.await.unwrap();
        assert!(matches!(
            result,
            Err(RunError::Wait(WaitError::Cancelled { .. }))
        ));
    }

    #[tokio::test]
    async fn run_until_returns_output_when_not_cancelled() {
        let completion = sh("echo fast")
            .run_until(tokio::time::sleep(Duration::from_secs(30)))
            .await
            .unwrap();

        assert_that(completion.output.as_str()).is_equal_to("fast\n");
    }
}
