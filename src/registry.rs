use crate::binder::{ParameterSpec, bind_parameters};
use crate::command::{Command, CommandDescriptor, Handler};
use crate::dispatcher::Dispatcher;
use crate::env::Environment;
use crate::error::ConfigurationError;
use crate::options::{OptionSpec, OptionTable};
use tracing::debug;

/// Name, help and derived parameters of a registered command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub help: Option<String>,
    pub parameters: Vec<ParameterSpec>,
}

pub(crate) struct RegisteredCommand {
    pub(crate) spec: CommandSpec,
    pub(crate) handler: Handler,
}

/// Collects commands before anything is dispatched.
///
/// Registration validates each command against its option table right away, so a
/// misdeclared command fails here and never at dispatch time. [`build`](Self::build)
/// consumes the registry: once a [`Dispatcher`] exists no more commands can be added.
pub struct CommandRegistry {
    program: String,
    about: Option<String>,
    commands: Vec<RegisteredCommand>,
    common: Vec<ParameterSpec>,
    common_options: OptionTable,
    common_names: Vec<String>,
}

impl CommandRegistry {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            about: None,
            commands: Vec::new(),
            common: Vec::new(),
            common_options: OptionTable::new(),
            common_names: Vec::new(),
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// Register a command, deriving its CLI arguments from `options`.
    pub fn register(
        &mut self,
        descriptor: CommandDescriptor,
        options: OptionTable,
    ) -> Result<&mut Self, ConfigurationError> {
        let CommandDescriptor {
            name,
            help,
            parameters,
            handler,
        } = descriptor;

        if self.commands.iter().any(|c| c.spec.name == name) {
            return Err(ConfigurationError::DuplicateCommand(name));
        }
        let parameters = bind_parameters(&name, &parameters, &options)?;
        debug!("registered command {} with {} parameters", name, parameters.len());

        self.commands.push(RegisteredCommand {
            spec: CommandSpec {
                name,
                help,
                parameters,
            },
            handler,
        });
        Ok(self)
    }

    /// Register the typed command `T` with its own option table.
    pub fn register_command<T: Command + 'static>(&mut self) -> Result<&mut Self, ConfigurationError> {
        self.register(CommandDescriptor::of::<T>(), T::options())
    }

    /// Add a program-wide option, accepted before the command name.
    ///
    /// Handlers read it through [`BoundArgs::common`](crate::BoundArgs::common).
    pub fn common_option(
        &mut self,
        name: impl Into<String>,
        spec: OptionSpec,
    ) -> Result<&mut Self, ConfigurationError> {
        let name = name.into();
        if spec.flag.is_none() {
            return Err(ConfigurationError::InvalidOption {
                command: self.program.clone(),
                parameter: name,
                reason: "common options need a short flag".to_string(),
            });
        }
        let mut names = self.common_names.clone();
        names.push(name.clone());
        let options = self.common_options.clone().option(name, spec);

        self.common = bind_parameters(&self.program, &names, &options)?;
        self.common_names = names;
        self.common_options = options;
        Ok(self)
    }

    /// Specs of every registered command, in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter().map(|c| &c.spec)
    }

    /// Finish registration and build the parser tree.
    pub fn build(self) -> Dispatcher {
        self.build_with(Environment::new())
    }

    /// Like [`build`](Self::build), handing commands `env` instead of the process environment.
    pub fn build_with(self, env: Environment) -> Dispatcher {
        let mut parser = clap::Command::new(self.program)
            .subcommand_required(true)
            .args_override_self(true)
            .args(self.common.iter().map(ParameterSpec::to_arg));
        if let Some(about) = self.about {
            parser = parser.about(about);
        }
        for command in &self.commands {
            let mut sub = clap::Command::new(command.spec.name.clone())
                .args_override_self(true)
                .args(command.spec.parameters.iter().map(ParameterSpec::to_arg));
            if let Some(help) = &command.spec.help {
                sub = sub.about(help.clone());
            }
            parser = parser.subcommand(sub);
        }

        Dispatcher::new(parser, self.commands, self.common, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Arity;

    fn noop() -> CommandDescriptor {
        CommandDescriptor::new("noop", &[], |_, _| Ok(0))
    }

    #[test]
    fn registration_records_specs_in_order() {
        let mut registry = CommandRegistry::new("pm");
        registry
            .register(
                CommandDescriptor::new("build", &["target", "jobs"], |_, _| Ok(0))
                    .help("build a target"),
                OptionTable::new()
                    .option("target", OptionSpec::new())
                    .option("jobs", OptionSpec::new().flag('j').nargs(Arity::Single)),
            )
            .unwrap()
            .register(noop(), OptionTable::new())
            .unwrap();

        let specs: Vec<&CommandSpec> = registry.commands().collect();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "build");
        assert_eq!(specs[0].help.as_deref(), Some("build a target"));
        let names: Vec<&str> = specs[0].parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["target", "jobs"]);
    }

    #[test]
    fn uncovered_parameter_fails_at_registration() {
        let mut registry = CommandRegistry::new("pm");
        let err = registry
            .register(
                CommandDescriptor::new("build", &["target"], |_, _| Ok(0)),
                OptionTable::new(),
            )
            .err()
            .unwrap();
        assert!(matches!(err, ConfigurationError::MissingOption { .. }));
        assert_eq!(registry.commands().count(), 0);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = CommandRegistry::new("pm");
        registry.register(noop(), OptionTable::new()).unwrap();
        let err = registry.register(noop(), OptionTable::new()).err().unwrap();
        assert_eq!(err, ConfigurationError::DuplicateCommand("noop".into()));
    }

    #[test]
    fn common_options_are_validated() {
        let mut registry = CommandRegistry::new("pm");
        registry
            .common_option("directory", OptionSpec::new().flag('C'))
            .unwrap();
        assert!(
            registry
                .common_option("dir", OptionSpec::new().flag('C'))
                .is_err()
        );
        assert!(registry.common_option("base", OptionSpec::new()).is_err());
        registry.common_option("verbose", OptionSpec::switch('v')).unwrap();
        assert_eq!(registry.common.len(), 2);
    }
}
