use crate::binder::{BoundArgs, ParameterSpec, rebind};
use crate::command::{EMPTY_ARGUMENTS, ExitCode, WRONG_PROCESS};
use crate::env::Environment;
use crate::error::Error;
use crate::registry::RegisteredCommand;
use anyhow::{Result, anyhow};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

/// Parses command lines against the registered commands and invokes their handlers.
///
/// Built by [`CommandRegistry::build`](crate::CommandRegistry::build).
pub struct Dispatcher {
    parser: clap::Command,
    commands: Vec<RegisteredCommand>,
    common: Vec<ParameterSpec>,
    env: Environment,
}

impl Dispatcher {
    pub(crate) fn new(
        parser: clap::Command,
        commands: Vec<RegisteredCommand>,
        common: Vec<ParameterSpec>,
        env: Environment,
    ) -> Self {
        Self {
            parser: parser.no_binary_name(true),
            commands,
            common,
            env,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Full help text of the program, listing every command.
    pub fn usage(&mut self) -> String {
        self.parser.render_help().to_string()
    }

    /// Run one command line (without the program name).
    ///
    /// - no arguments: prints the usage and returns [`EMPTY_ARGUMENTS`];
    /// - unparsable arguments: returns the [`clap::Error`], nothing is invoked;
    /// - a handler failing with a framework [`Error`]: prints it and returns [`WRONG_PROCESS`];
    /// - any other handler error is returned as is;
    /// - otherwise the handler's exit code.
    pub fn dispatch<S: AsRef<str>>(&mut self, argv: &[S]) -> Result<ExitCode> {
        if argv.is_empty() {
            self.parser.print_help()?;
            return Ok(EMPTY_ARGUMENTS);
        }

        let matches = self
            .parser
            .try_get_matches_from_mut(argv.iter().map(|a| a.as_ref()))?;
        let (name, sub_matches) = matches
            .subcommand()
            .ok_or_else(|| anyhow!("no command given"))?;
        let command = self
            .commands
            .iter()
            .find(|c| c.spec.name == name)
            .ok_or_else(|| anyhow!("command not found: {}", name))?;

        let args = BoundArgs::new(
            rebind(&command.spec.parameters, sub_matches),
            rebind(&self.common, &matches),
        );
        debug!("dispatching {} with {:?}", name, args);

        match (command.handler)(&args, &mut self.env) {
            Ok(code) => Ok(code),
            Err(e) => match e.downcast_ref::<Error>() {
                Some(_) => {
                    println!();
                    println!("{:#}", e);
                    Ok(WRONG_PROCESS)
                }
                None => Err(e),
            },
        }
    }

    /// Read command lines interactively and dispatch each of them.
    ///
    /// Errors are printed and the prompt continues; `exit`, `quit`, Ctrl-C or Ctrl-D end it.
    pub fn repl(&mut self, prompt: &str) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline(prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line)?;
                    if matches!(line, "exit" | "quit") {
                        break;
                    }
                    let argv = match shell_words::split(line) {
                        Ok(argv) => argv,
                        Err(e) => {
                            println!("Error: {}", e);
                            continue;
                        }
                    };
                    match self.dispatch(&argv) {
                        Ok(code) => debug!("exit code {}", code),
                        Err(e) => report_error(&e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    println!("Error: {:?}", err);
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Print a failed prompt line: clap renders its own errors, the rest get `Error: ...`.
fn report_error(e: &anyhow::Error) {
    match e.downcast_ref::<clap::Error>() {
        Some(parse_error) => {
            if let Err(print_error) = parse_error.print() {
                warn!("can't print parse error: {}", print_error);
            }
        }
        None => println!("Error: {:#}", e),
    }
}
