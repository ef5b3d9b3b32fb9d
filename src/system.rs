use crate::command::ExitCode;
use crate::env::Environment;
use anyhow::{Context, Result};
use std::process::{Command, ExitStatus};
use tracing::debug;

/// Join `exec_path` and `args` into one command line and run it through the platform
/// shell, blocking until it finishes.
///
/// The child runs in `env.current_dir` with `env.vars`. When `verbose` is set the
/// command line is echoed as `$ <line>` first. Shell syntax in the line (globs,
/// redirections) is interpreted by the shell, exactly as written.
pub fn run_system_command<S: AsRef<str>>(
    env: &Environment,
    exec_path: &str,
    args: &[S],
    verbose: bool,
) -> Result<ExitCode> {
    let cmd_line = command_line(exec_path, args);
    if verbose {
        println!("$ {}", cmd_line);
    }
    debug!("running in {}: {}", env.current_dir.display(), cmd_line);

    let status = shell(&cmd_line)
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir)
        .status()
        .with_context(|| format!("failed to spawn: {}", cmd_line))?;
    Ok(exit_code(status))
}

fn command_line<S: AsRef<str>>(exec_path: &str, args: &[S]) -> String {
    let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
    format!("{} {}", exec_path, args.join(" "))
}

#[cfg(unix)]
fn shell(cmd_line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(cmd_line);
    cmd
}

#[cfg(windows)]
fn shell(cmd_line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(cmd_line);
    cmd
}

fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = exit_status.signal() {
        128 + signal
    } else if exit_status.core_dumped() {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    -1
}
