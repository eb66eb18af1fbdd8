//! Git operations on top of [CliCommand].

use crate::error::GitError;
use crate::output::Completion;
use crate::CliCommand;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Remote and branch operations of a git repository.
pub trait GitApi {
    /// Downloads objects and refs from the default remote.
    ///
    /// `prune` removes remote-tracking refs that no longer exist on the remote, `prune_tags`
    /// additionally removes local tags that no longer exist on the remote.
    fn fetch(
        &self,
        prune: bool,
        prune_tags: bool,
    ) -> impl Future<Output = Result<Completion, GitError>> + Send;

    /// Fetches and integrates the upstream of the current branch.
    fn pull(&self) -> impl Future<Output = Result<Completion, GitError>> + Send;

    /// Updates the upstream of the current branch.
    fn push(&self) -> impl Future<Output = Result<Completion, GitError>> + Send;

    /// Names of all local branches.
    fn get_branch_list(&self) -> impl Future<Output = Result<Vec<String>, GitError>> + Send;
}

/// [GitApi] running the `git` executable in a repository directory.
///
/// Every operation fails with [GitError::CommandFailed] when git exits unsuccessfully.
#[derive(Debug, Clone)]
pub struct CliGitApi {
    git: String,
    repository: PathBuf,
    timeout: Option<Duration>,
}

impl CliGitApi {
    pub fn new(repository: impl Into<PathBuf>) -> Self {
        Self {
            git: "git".to_owned(),
            repository: repository.into(),
            timeout: None,
        }
    }

    /// Uses `git` instead of the `git` found in `PATH`.
    pub fn with_git_executable(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    /// Limits how long a single git invocation may run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn repository(&self) -> &Path {
        &self.repository
    }

    fn git<I, S>(&self, arguments: I) -> CliCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cmd = CliCommand::new(&self.git, arguments, &self.repository);
        match self.timeout {
            Some(timeout) => cmd.timeout(timeout),
            None => cmd,
        }
    }

    fn fetch_command(&self, prune: bool, prune_tags: bool) -> CliCommand {
        let mut arguments = vec!["fetch"];
        if prune {
            arguments.push("--prune");
        }
        if prune_tags {
            arguments.push("--prune-tags");
        }
        self.git(arguments)
    }

    fn branch_list_command(&self) -> CliCommand {
        self.git(["branch", "--list", "--format=%(refname:short)"])
    }

    async fn run_checked(&self, cmd: CliCommand) -> Result<Completion, GitError> {
        let completion = cmd.run().await?;
        if !completion.success() {
            tracing::debug!(
                command = %cmd,
                exit_code = ?completion.exit_code(),
                "Git command failed"
            );
            return Err(GitError::CommandFailed {
                command: cmd.full_command(),
                exit_code: completion.exit_code(),
                error_output: completion.error_output,
            });
        }
        Ok(completion)
    }
}

impl GitApi for CliGitApi {
    async fn fetch(&self, prune: bool, prune_tags: bool) -> Result<Completion, GitError> {
        self.run_checked(self.fetch_command(prune, prune_tags)).await
    }

    async fn pull(&self) -> Result<Completion, GitError> {
        self.run_checked(self.git(["pull"])).await
    }

    async fn push(&self) -> Result<Completion, GitError> {
        self.run_checked(self.git(["push"])).await
    }

    async fn get_branch_list(&self) -> Result<Vec<String>, GitError> {
        let completion = self.run_checked(self.branch_list_command()).await?;
        Ok(parse_branch_list(&completion.output))
    }
}

fn parse_branch_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}
