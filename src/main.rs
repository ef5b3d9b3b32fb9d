use argh::FromArgs;
use project_manager::logging::init_logging;
use project_manager::{CommandRegistry, register_builtins};

#[derive(FromArgs)]
/// Project maintenance commands: find files and directories, fix BOMs, clean build trees
/// and run programs.
struct TopLevel {
    #[argh(switch, short = 'i')]
    /// read commands from an interactive prompt instead of the command line.
    interactive: bool,

    #[argh(switch, short = 'v')]
    /// log debug messages to stderr.
    verbose: bool,

    #[argh(positional, greedy)]
    /// command name followed by its arguments. Start with `--` to pass program-wide
    /// options such as `-C <dir>` or `--help`.
    command: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let top: TopLevel = argh::from_env();
    init_logging(top.verbose);

    let mut registry = CommandRegistry::new("pm")
        .about("Project maintenance commands");
    register_builtins(&mut registry)?;
    let mut dispatcher = registry.build();

    if top.interactive {
        dispatcher.repl("pm> ")?;
        return Ok(());
    }

    match dispatcher.dispatch(&top.command) {
        Ok(code) => std::process::exit(code),
        Err(e) => match e.downcast::<clap::Error>() {
            Ok(parse_error) => parse_error.exit(),
            Err(e) => Err(e),
        },
    }
}
