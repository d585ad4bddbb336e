//! Git publishing of the build directory.
//!
//! The build directory becomes its own git repository whose single branch
//! (`deploy.branch`) holds the generated site:
//!
//! ```text
//! git init                                   # first deploy only
//! git remote add origin <project remote url> # first deploy only
//! git checkout -B master
//! git add --all
//! git commit --allow-empty -m "Automated commit by docsite"
//! git push --force origin master
//! ```
//!
//! The remote URL is taken from the project's own repository. Each step runs
//! the external `git`; the first non-zero exit aborts the deploy. There are no
//! retries.

use crate::config::{DeployConfig, DeployMethod};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Build directory not found: {0} (run `docsite build` first)")]
    MissingBuild(PathBuf),
    #[error("Could not determine the URL of remote {remote:?} in {}", project.display())]
    NoRemote { remote: String, project: PathBuf },
    #[error("Failed to run `{step}`: {source}")]
    Spawn {
        step: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{step}` failed with exit code {}", code.map_or("none".to_string(), |c| c.to_string()))]
    StepFailed { step: String, code: Option<i32> },
}

/// One `git` invocation of a deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitStep {
    pub args: Vec<String>,
}

impl GitStep {
    fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Shell-style rendering for display and error messages.
    pub fn command_line(&self) -> String {
        let quoted: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                if a.is_empty() || a.contains(char::is_whitespace) {
                    format!("{a:?}")
                } else {
                    a.clone()
                }
            })
            .collect();
        format!("git {}", quoted.join(" "))
    }
}

/// Steps to publish `build_dir`.
///
/// `remote_url` is only needed when the build directory is not yet a
/// repository; pass `None` to skip the `remote add` step.
pub fn plan(deploy: &DeployConfig, build_dir: &Path, remote_url: Option<&str>) -> Vec<GitStep> {
    let DeployMethod::Git = deploy.method;
    let mut steps = Vec::new();

    if !is_repository(build_dir) {
        steps.push(GitStep::new(["init"]));
        if let Some(url) = remote_url {
            steps.push(GitStep::new([
                "remote",
                "add",
                deploy.remote.as_str(),
                url,
            ]));
        }
    }
    steps.push(GitStep::new(["checkout", "-B", deploy.branch.as_str()]));
    steps.push(GitStep::new(["add", "--all"]));
    steps.push(GitStep::new([
        "commit",
        "--allow-empty",
        "-m",
        deploy.commit_message.as_str(),
    ]));
    steps.push(GitStep::new([
        "push",
        "--force",
        deploy.remote.as_str(),
        deploy.branch.as_str(),
    ]));
    steps
}

pub fn is_repository(dir: &Path) -> bool {
    dir.join(".git").exists()
}

/// Runs git steps as external processes.
#[derive(Debug, Clone)]
pub struct GitRunner {
    program: OsString,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self {
            program: OsString::from("git"),
        }
    }
}

impl GitRunner {
    /// Use a different executable in place of `git`.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// URL of `remote` in the repository at `project`.
    pub fn remote_url(&self, project: &Path, remote: &str) -> Result<String, DeployError> {
        let no_remote = || DeployError::NoRemote {
            remote: remote.to_string(),
            project: project.to_path_buf(),
        };
        let output = Command::new(&self.program)
            .args(["remote", "get-url", remote])
            .current_dir(project)
            .output()
            .map_err(|_| no_remote())?;
        if !output.status.success() {
            return Err(no_remote());
        }
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if url.is_empty() {
            return Err(no_remote());
        }
        Ok(url)
    }

    /// Run `steps` in order inside `dir`, stopping at the first failure.
    pub fn run(&self, steps: &[GitStep], dir: &Path) -> Result<(), DeployError> {
        for step in steps {
            let line = step.command_line();
            log::info!("deploy: {line}");
            let status = Command::new(&self.program)
                .args(&step.args)
                .current_dir(dir)
                .status()
                .map_err(|source| DeployError::Spawn {
                    step: line.clone(),
                    source,
                })?;
            if !status.success() {
                return Err(DeployError::StepFailed {
                    step: line,
                    code: status.code(),
                });
            }
        }
        Ok(())
    }
}

/// Publish an already built `build_dir` for the project at `project`.
///
/// With `dry_run` the plan is returned without running anything.
pub fn deploy(
    runner: &GitRunner,
    deploy: &DeployConfig,
    project: &Path,
    build_dir: &Path,
    dry_run: bool,
) -> Result<Vec<GitStep>, DeployError> {
    if !build_dir.is_dir() {
        return Err(DeployError::MissingBuild(build_dir.to_path_buf()));
    }
    let remote_url = if is_repository(build_dir) {
        None
    } else {
        Some(runner.remote_url(project, &deploy.remote)?)
    };
    let steps = plan(deploy, build_dir, remote_url.as_deref());
    if !dry_run {
        runner.run(&steps, build_dir)?;
    }
    Ok(steps)
}
