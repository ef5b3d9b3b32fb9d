use crate::binder::BoundArgs;
use crate::env::Environment;
use crate::options::OptionTable;
use anyhow::Result;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Returned by the dispatcher when it was given no arguments at all.
pub const EMPTY_ARGUMENTS: ExitCode = -1;

/// Returned by the dispatcher when a handler failed with a framework [`Error`](crate::Error).
pub const WRONG_PROCESS: ExitCode = -2;

/// Boxed invocation target stored for every registered command.
pub type Handler = Box<dyn Fn(&BoundArgs, &mut Environment) -> Result<ExitCode>>;

/// Everything needed to register one command: its name, help text, the parameter names
/// its handler reads (in declaration order) and the handler itself.
///
/// ```
/// use project_manager::{CommandDescriptor, CommandRegistry, OptionSpec, OptionTable, Arity};
///
/// let mut registry = CommandRegistry::new("pm");
/// registry
///     .register(
///         CommandDescriptor::new("echo", &["messages"], |args, _env| {
///             println!("{}", args.strings("messages")?.join(" "));
///             Ok(0)
///         })
///         .help("print the messages"),
///         OptionTable::new().option("messages", OptionSpec::new().nargs(Arity::OneOrMore)),
///     )
///     .unwrap();
/// let mut dispatcher = registry.build();
/// assert_eq!(dispatcher.dispatch(&["echo", "hi"]).unwrap(), 0);
/// ```
pub struct CommandDescriptor {
    pub(crate) name: String,
    pub(crate) help: Option<String>,
    pub(crate) parameters: Vec<String>,
    pub(crate) handler: Handler,
}

impl CommandDescriptor {
    pub fn new<F>(name: impl Into<String>, parameters: &[&str], handler: F) -> Self
    where
        F: Fn(&BoundArgs, &mut Environment) -> Result<ExitCode> + 'static,
    {
        Self {
            name: name.into(),
            help: None,
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            handler: Box::new(handler),
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A command known at compile time.
///
/// This is the typed counterpart of [`CommandDescriptor`]: the registry reads the name,
/// help, parameter names and option table from the implementing type.
pub trait Command {
    /// Canonical name of the command, e.g. "find_files".
    fn name() -> &'static str;

    fn help() -> &'static str {
        ""
    }

    /// Parameter names read by [`run`](Command::run), in declaration order.
    fn parameters() -> &'static [&'static str];

    fn options() -> OptionTable;

    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn run(args: &BoundArgs, env: &mut Environment) -> Result<ExitCode>;
}

impl CommandDescriptor {
    /// Describe the typed command `T`.
    pub fn of<T: Command + 'static>() -> Self {
        let descriptor = Self::new(T::name(), T::parameters(), T::run);
        match T::help() {
            "" => descriptor,
            help => descriptor.help(help),
        }
    }
}
