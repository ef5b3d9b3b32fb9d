use crate::binder::BoundArgs;
use crate::command::{Command, ExitCode};
use crate::env::Environment;
use crate::error::{ConfigurationError, Error};
use crate::fsops;
use crate::options::{Arity, OptionSpec, OptionTable, Value, ValueKind};
use crate::registry::CommandRegistry;
use crate::resolver::{resolve_candidates, resolve_first};
use crate::system::run_system_command;
use crate::walker::TreeWalker;
use anyhow::Result;
use std::io::{self, Write};

/// Common option naming the directory commands run in.
pub const DIRECTORY: &str = "directory";

/// Maintenance commands bundled with the crate.
///
/// Builtins write to the given output instead of straight to stdout, which keeps them
/// testable; the blanket [`Command`] impl hands them the process stdout.
pub trait BuiltinCommand {
    fn name() -> &'static str;

    fn help() -> &'static str;

    fn parameters() -> &'static [&'static str];

    fn options() -> OptionTable;

    fn execute(args: &BoundArgs, stdout: &mut dyn Write, env: &mut Environment)
    -> Result<ExitCode>;
}

impl<T: BuiltinCommand> Command for T {
    fn name() -> &'static str {
        <T as BuiltinCommand>::name()
    }

    fn help() -> &'static str {
        <T as BuiltinCommand>::help()
    }

    fn parameters() -> &'static [&'static str] {
        <T as BuiltinCommand>::parameters()
    }

    fn options() -> OptionTable {
        <T as BuiltinCommand>::options()
    }

    fn run(args: &BoundArgs, env: &mut Environment) -> Result<ExitCode> {
        let mut stdout = io::stdout();
        match args.common(DIRECTORY).and_then(Value::as_path) {
            Some(dir) => env.within_directory(dir, |env| T::execute(args, &mut stdout, env)),
            None => T::execute(args, &mut stdout, env),
        }
    }
}

/// Register every builtin plus the `-C/--directory` common option.
pub fn register_builtins(registry: &mut CommandRegistry) -> Result<(), ConfigurationError> {
    registry
        .common_option(
            DIRECTORY,
            OptionSpec::new()
                .flag('C')
                .kind(ValueKind::Path)
                .help("run the command inside this directory"),
        )?
        .register_command::<Echo>()?
        .register_command::<FindDirs>()?
        .register_command::<FindFiles>()?
        .register_command::<Which>()?
        .register_command::<Touch>()?
        .register_command::<MakeDirs>()?
        .register_command::<Link>()?
        .register_command::<AddBom>()?
        .register_command::<RemoveBom>()?
        .register_command::<Clean>()?
        .register_command::<Run>()?;
    Ok(())
}

fn base_option() -> OptionSpec {
    OptionSpec::new()
        .nargs(Arity::Optional)
        .default_value(".")
        .help("directory to search; defaults to the current one")
}

fn walker_for(args: &BoundArgs, env: &Environment) -> Result<TreeWalker> {
    Ok(TreeWalker::new(env.resolve(args.str("base")?))
        .patterns(args.strings("patterns")?)?
        .include_hidden(args.flag("all")?)
        .absolute(!args.flag("literal")?))
}

fn walker_options() -> OptionTable {
    OptionTable::new()
        .option("base", base_option())
        .option(
            "patterns",
            OptionSpec::new()
                .flag('p')
                .nargs(Arity::OneOrMore)
                .help("relative path patterns; `...` spans directories"),
        )
        .option(
            "all",
            OptionSpec::switch('a').help("include hidden entries"),
        )
        .option(
            "literal",
            OptionSpec::switch('l').help("print paths as joined under base instead of canonical"),
        )
}

/// Print the messages separated by spaces.
pub struct Echo;

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn help() -> &'static str {
        "print the messages separated by spaces"
    }

    fn parameters() -> &'static [&'static str] {
        &["messages"]
    }

    fn options() -> OptionTable {
        OptionTable::new().option("messages", OptionSpec::new().nargs(Arity::OneOrMore))
    }

    fn execute(
        args: &BoundArgs,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", args.strings("messages")?.join(" "))?;
        Ok(0)
    }
}

/// List directories below a base.
pub struct FindDirs;

impl BuiltinCommand for FindDirs {
    fn name() -> &'static str {
        "find_dirs"
    }

    fn help() -> &'static str {
        "list directories below a base directory"
    }

    fn parameters() -> &'static [&'static str] {
        &["base", "patterns", "all", "literal"]
    }

    fn options() -> OptionTable {
        walker_options()
    }

    fn execute(args: &BoundArgs, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        for dir in walker_for(args, env)?.walk_directories() {
            writeln!(stdout, "{}", dir.display())?;
        }
        Ok(0)
    }
}

/// List files below a base, optionally restricted to some extensions.
pub struct FindFiles;

impl BuiltinCommand for FindFiles {
    fn name() -> &'static str {
        "find_files"
    }

    fn help() -> &'static str {
        "list files below a base directory"
    }

    fn parameters() -> &'static [&'static str] {
        &["base", "patterns", "extensions", "all", "literal"]
    }

    fn options() -> OptionTable {
        walker_options().option(
            "extensions",
            OptionSpec::new()
                .flag('e')
                .nargs(Arity::OneOrMore)
                .help("keep only these extensions, e.g. `rs` or `.toml`"),
        )
    }

    fn execute(args: &BoundArgs, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let extensions: Vec<String> = args
            .strings("extensions")?
            .into_iter()
            .map(|ext| match ext.trim_start_matches('.') {
                "" => Err(Error::Argument(format!("empty extension `{ext}`"))),
                bare => Ok(format!(".{}", bare.to_lowercase())),
            })
            .collect::<Result<_, _>>()?;

        let mut walker = walker_for(args, env)?;
        if !extensions.is_empty() {
            walker = walker.filter_file_ext(move |ext| extensions.iter().any(|e| e == ext));
        }
        for file in walker.walk_files() {
            writeln!(stdout, "{}", file.display())?;
        }
        Ok(0)
    }
}

/// Resolve a partial name to a file path.
pub struct Which;

impl BuiltinCommand for Which {
    fn name() -> &'static str {
        "which"
    }

    fn help() -> &'static str {
        "resolve a path or partial file name, searching below a base directory"
    }

    fn parameters() -> &'static [&'static str] {
        &["hint", "base", "all"]
    }

    fn options() -> OptionTable {
        OptionTable::new()
            .option("hint", OptionSpec::new().help("path or file name prefix; $VARS are expanded"))
            .option(
                "base",
                OptionSpec::new()
                    .flag('b')
                    .default_value(".")
                    .help("directory searched when the hint is not an existing path"),
            )
            .option("all", OptionSpec::switch('a').help("print every candidate"))
    }

    fn execute(args: &BoundArgs, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let hint = args.str("hint")?;
        let base = args.str("base")?;

        if !args.flag("all")? {
            writeln!(stdout, "{}", resolve_first(hint, base, env)?.display())?;
            return Ok(0);
        }

        let mut found = false;
        for path in resolve_candidates(hint, base, env)? {
            found = true;
            writeln!(stdout, "{}", path.display())?;
        }
        if !found {
            return Err(Error::NotFound {
                base: base.into(),
                hint: hint.to_string(),
            }
            .into());
        }
        Ok(0)
    }
}

/// Create files, or bump the modification time of existing ones.
pub struct Touch;

impl BuiltinCommand for Touch {
    fn name() -> &'static str {
        "touch"
    }

    fn help() -> &'static str {
        "create empty files or refresh existing ones"
    }

    fn parameters() -> &'static [&'static str] {
        &["files"]
    }

    fn options() -> OptionTable {
        OptionTable::new().option(
            "files",
            OptionSpec::new().kind(ValueKind::Path).nargs(Arity::OneOrMore),
        )
    }

    fn execute(args: &BoundArgs, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        for file in args.paths("files")? {
            fsops::touch_file(&env.resolve(file))?;
        }
        Ok(0)
    }
}

pub struct MakeDirs;

impl BuiltinCommand for MakeDirs {
    fn name() -> &'static str {
        "mkdir"
    }

    fn help() -> &'static str {
        "create directories and their parents"
    }

    fn parameters() -> &'static [&'static str] {
        &["dirs"]
    }

    fn options() -> OptionTable {
        OptionTable::new().option(
            "dirs",
            OptionSpec::new().kind(ValueKind::Path).nargs(Arity::OneOrMore),
        )
    }

    fn execute(args: &BoundArgs, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        for dir in args.paths("dirs")? {
            let dir = env.resolve(dir);
            if !fsops::make_directory(&dir)? {
                writeln!(stdout, "already exists: {}", dir.display())?;
            }
        }
        Ok(0)
    }
}

pub struct Link;

impl BuiltinCommand for Link {
    fn name() -> &'static str {
        "link"
    }

    fn help() -> &'static str {
        "create a symbolic link at target pointing to source"
    }

    fn parameters() -> &'static [&'static str] {
        &["source", "target"]
    }

    fn options() -> OptionTable {
        OptionTable::new()
            .option("source", OptionSpec::new().kind(ValueKind::Path))
            .option("target", OptionSpec::new().kind(ValueKind::Path))
    }

    fn execute(args: &BoundArgs, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let source = env.resolve(args.path("source")?);
        let target = env.resolve(args.path("target")?);
        if target.symlink_metadata().is_ok() {
            return Err(Error::Failed(format!("{} already exists", target.display())).into());
        }
        fsops::make_symbolic_link(&source, &target)?;
        Ok(0)
    }
}

fn bom_options() -> OptionTable {
    OptionTable::new().option(
        "files",
        OptionSpec::new().kind(ValueKind::Path).nargs(Arity::OneOrMore),
    )
}

pub struct AddBom;

impl BuiltinCommand for AddBom {
    fn name() -> &'static str {
        "add_bom"
    }

    fn help() -> &'static str {
        "prepend a UTF-8 byte order mark to files missing one"
    }

    fn parameters() -> &'static [&'static str] {
        &["files"]
    }

    fn options() -> OptionTable {
        bom_options()
    }

    fn execute(args: &BoundArgs, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        for file in args.paths("files")? {
            let file = env.resolve(file);
            if fsops::add_utf8_bom(&file)? {
                writeln!(stdout, "{}", file.display())?;
            }
        }
        Ok(0)
    }
}

pub struct RemoveBom;

impl BuiltinCommand for RemoveBom {
    fn name() -> &'static str {
        "remove_bom"
    }

    fn help() -> &'static str {
        "strip the UTF-8 byte order mark from files"
    }

    fn parameters() -> &'static [&'static str] {
        &["files"]
    }

    fn options() -> OptionTable {
        bom_options()
    }

    fn execute(args: &BoundArgs, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        for file in args.paths("files")? {
            let file = env.resolve(file);
            if fsops::remove_utf8_bom(&file)? {
                writeln!(stdout, "{}", file.display())?;
            }
        }
        Ok(0)
    }
}

/// Remove directories or files matching patterns. Only reports unless forced.
pub struct Clean;

impl BuiltinCommand for Clean {
    fn name() -> &'static str {
        "clean"
    }

    fn help() -> &'static str {
        "remove directories or files whose relative path matches the patterns"
    }

    fn parameters() -> &'static [&'static str] {
        &["patterns", "base", "kind", "force"]
    }

    fn options() -> OptionTable {
        OptionTable::new()
            .option(
                "patterns",
                OptionSpec::new()
                    .nargs(Arity::OneOrMore)
                    .help("relative path patterns; `...` spans directories"),
            )
            .option("base", OptionSpec::new().flag('b').default_value("."))
            .option(
                "kind",
                OptionSpec::new()
                    .flag('t')
                    .choices(["dirs", "files"])
                    .default_value("dirs"),
            )
            .option(
                "force",
                OptionSpec::switch('f').help("really remove; without it nothing is touched"),
            )
    }

    fn execute(args: &BoundArgs, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let patterns = args.strings("patterns")?;
        let base = env.resolve(args.str("base")?);
        let dry_run = !args.flag("force")?;

        let removed = match args.str("kind")? {
            "files" => fsops::remove_files_by_patterns(&patterns, &base, dry_run)?,
            _ => fsops::remove_trees_by_patterns(&patterns, &base, dry_run)?,
        };
        let verb = if dry_run { "would remove" } else { "removed" };
        for path in removed {
            writeln!(stdout, "{}: {}", verb, path.display())?;
        }
        Ok(0)
    }
}

/// Run a command line through the system shell.
pub struct Run;

impl BuiltinCommand for Run {
    fn name() -> &'static str {
        "run"
    }

    fn help() -> &'static str {
        "run a program through the system shell and return its exit code"
    }

    fn parameters() -> &'static [&'static str] {
        &["exec_path", "args", "quiet"]
    }

    fn options() -> OptionTable {
        OptionTable::new()
            .option("exec_path", OptionSpec::new())
            .option(
                "args",
                OptionSpec::new()
                    .nargs(Arity::ZeroOrMore)
                    .help("arguments; put them after `--` when they start with a dash"),
            )
            .option("quiet", OptionSpec::switch('q').help("do not echo the command line"))
    }

    fn execute(args: &BoundArgs, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        run_system_command(
            env,
            args.str("exec_path")?,
            &args.strings("args")?,
            !args.flag("quiet")?,
        )
    }
}
