//! Runs `git status` in the current directory and prints everything it captured.
//!
//! Set `RUST_LOG=gitflow_cli=debug` to see the process lifecycle.

use gitflow_cli::{CliCommand, CliGitApi, GitApi, RunState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("gitflow sandbox");
    match std::env::current_dir() {
        Ok(dir) => println!("WorkingDirectory: {}", dir.display()),
        Err(err) => println!("WorkingDirectory: <unknown: {err}>"),
    }

    let cmd = CliCommand::new("git", ["status"], ".");
    println!("> {}", cmd.full_command());

    match cmd.execute().await {
        RunState::Completed(completion) => {
            let exit_code = completion
                .exit_code()
                .map_or_else(|| "<terminated by signal>".to_owned(), |c| c.to_string());
            println!(
                "ExitCode: {exit_code}\nFullOutput:\n{}\nOutput:\n{}\nErrorOutput:\n{}\n",
                completion.full_output, completion.output, completion.error_output
            );
        }
        RunState::LaunchFailed(err) => println!("Could not start git: {err}"),
        RunState::Interrupted(err) => println!("git did not finish: {err}"),
        RunState::NotStarted => println!("git was not run"),
    }

    match CliGitApi::new(".").get_branch_list().await {
        Ok(branches) => {
            println!("Branches:");
            for branch in branches {
                println!("  {branch}");
            }
        }
        Err(err) => println!("Could not list branches: {err}"),
    }
}
