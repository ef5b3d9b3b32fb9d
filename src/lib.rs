//! Building blocks for project maintenance command lines.
//!
//! Commands are plain Rust functions (or types implementing [`Command`]) registered on a
//! [`CommandRegistry`] together with an [`OptionTable`] describing how each parameter is
//! spelled on the command line. [`CommandRegistry::build`] turns the registrations into a
//! [`Dispatcher`], which parses an argument vector, binds it back into keyword form
//! ([`BoundArgs`]) and invokes the handler.
//!
//! Around that core sit the filesystem helpers the bundled commands are made of:
//! [`PathPattern`] for relative-path matching, [`TreeWalker`] for lazy filtered traversal,
//! [`resolve_first`] for turning partial names into paths, plus the operations in
//! [`fsops`] and [`run_system_command`].

mod binder;
mod builtin;
pub mod command;
mod dispatcher;
pub mod env;
pub mod error;
pub mod fsops;
pub mod logging;
pub mod options;
mod pattern;
mod registry;
mod resolver;
mod system;
mod walker;

pub use binder::{BoundArgs, ParameterKind, ParameterSpec, bind_parameters};
pub use builtin::register_builtins;
pub use command::{Command, CommandDescriptor, EMPTY_ARGUMENTS, ExitCode, WRONG_PROCESS};
pub use dispatcher::Dispatcher;
pub use env::{DirectoryGuard, Environment};
pub use error::{ConfigurationError, Error};
pub use options::{Arity, OptionSpec, OptionTable, Value, ValueKind};
pub use pattern::{PathPattern, RECURSIVE_MARKER};
pub use registry::{CommandRegistry, CommandSpec};
pub use resolver::{resolve_candidates, resolve_first};
pub use system::run_system_command;
pub use walker::TreeWalker;
