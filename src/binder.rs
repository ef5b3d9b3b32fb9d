//! Turns a handler's parameter names plus its option table into CLI arguments, and the
//! parsed matches back into keyword values for the handler.

use crate::error::ConfigurationError;
use crate::options::{Arity, OptionSpec, OptionTable, Value, ValueKind};
use anyhow::{Result, anyhow};
use clap::builder::{PossibleValuesParser, ValueRange};
use clap::{Arg, ArgAction, ArgMatches, value_parser};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Where a parameter appears on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Positional,
    /// `-<short>/--<name>`
    Flagged { short: char },
}

/// CLI declaration derived for one handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub value_kind: ValueKind,
    pub arity: Arity,
    pub default: Option<Value>,
    pub help: Option<String>,
    pub choices: Vec<String>,
    pub required: bool,
}

/// Build one [`ParameterSpec`] per declared parameter, in declaration order.
///
/// Every parameter must have an entry in `options`. A spec with a flag becomes an
/// optional flagged argument (long name = parameter name); any other spec becomes a
/// positional argument, required unless its arity allows no values.
pub fn bind_parameters<S: AsRef<str>>(
    command: &str,
    parameters: &[S],
    options: &OptionTable,
) -> Result<Vec<ParameterSpec>, ConfigurationError> {
    let mut specs = Vec::with_capacity(parameters.len());
    let mut seen = HashSet::new();
    let mut shorts = HashSet::new();

    for parameter in parameters {
        let parameter = parameter.as_ref();
        let invalid = |reason: &str| ConfigurationError::InvalidOption {
            command: command.to_string(),
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        };

        let option = options
            .get(parameter)
            .ok_or_else(|| ConfigurationError::MissingOption {
                command: command.to_string(),
                parameter: parameter.to_string(),
            })?;

        if !seen.insert(parameter) {
            return Err(invalid("declared more than once"));
        }
        if parameter == "help" || option.flag == Some('h') {
            return Err(invalid("`-h/--help` is reserved"));
        }
        if let Some(short) = option.flag {
            if !shorts.insert(short) {
                return Err(invalid("short flag already used by another option"));
            }
        }
        if option.kind == ValueKind::Switch && option.flag.is_none() {
            return Err(invalid("a switch needs a short flag"));
        }
        if option.arity == Arity::Exactly(0) {
            return Err(invalid("arity must be at least one"));
        }
        if !option.choices.is_empty() && option.kind != ValueKind::Str {
            return Err(invalid("choices are only supported for string options"));
        }

        specs.push(ParameterSpec::from_option(parameter, option));
    }

    check_positional_order(command, &specs)?;
    Ok(specs)
}

/// A positional that may be empty cannot precede a required one, and a positional
/// taking several values must be the last one.
fn check_positional_order(
    command: &str,
    specs: &[ParameterSpec],
) -> Result<(), ConfigurationError> {
    let positionals: Vec<&ParameterSpec> = specs
        .iter()
        .filter(|s| s.kind == ParameterKind::Positional)
        .collect();

    for (i, spec) in positionals.iter().enumerate() {
        let rest = &positionals[i + 1..];
        let reason = if spec.arity.is_list() && !rest.is_empty() {
            Some("only the last positional may take several values")
        } else if spec.arity.may_be_empty() && rest.iter().any(|r| !r.arity.may_be_empty()) {
            Some("an optional positional cannot precede a required one")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ConfigurationError::InvalidOption {
                command: command.to_string(),
                parameter: spec.name.clone(),
                reason: reason.to_string(),
            });
        }
    }
    Ok(())
}

impl ParameterSpec {
    fn from_option(name: &str, option: &OptionSpec) -> Self {
        Self {
            name: name.to_string(),
            kind: match option.flag {
                Some(short) => ParameterKind::Flagged { short },
                None => ParameterKind::Positional,
            },
            value_kind: option.kind,
            arity: option.arity,
            default: option.default.clone(),
            help: option.help.clone(),
            choices: option.choices.clone(),
            required: option.required,
        }
    }

    /// The clap argument declaring this parameter.
    pub(crate) fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone());
        if let Some(help) = &self.help {
            arg = arg.help(help.clone());
        }

        arg = match self.kind {
            ParameterKind::Flagged { short } => arg
                .short(short)
                .long(self.name.clone())
                .required(self.required),
            ParameterKind::Positional => arg.required(!self.arity.may_be_empty()),
        };

        if self.value_kind == ValueKind::Switch {
            return arg.action(ArgAction::SetTrue);
        }

        if let ParameterKind::Flagged { .. } = self.kind {
            arg = arg.value_name(self.name.to_uppercase());
        }

        let arg = arg.action(ArgAction::Set).num_args(self.value_range());
        match self.value_kind {
            ValueKind::Str if !self.choices.is_empty() => {
                arg.value_parser(PossibleValuesParser::new(self.choices.clone()))
            }
            ValueKind::Str | ValueKind::Switch => arg.value_parser(value_parser!(String)),
            ValueKind::Int => arg.value_parser(value_parser!(i64)),
            ValueKind::Float => arg.value_parser(value_parser!(f64)),
            ValueKind::Path => arg.value_parser(value_parser!(PathBuf)),
        }
    }

    fn value_range(&self) -> ValueRange {
        let positional = self.kind == ParameterKind::Positional;
        match self.arity {
            Arity::Single => 1.into(),
            Arity::Exactly(n) => n.into(),
            // positionals express "may be empty" through `required(false)`
            Arity::Optional if positional => 1.into(),
            Arity::Optional => (0..=1).into(),
            Arity::ZeroOrMore if positional => (1..).into(),
            Arity::ZeroOrMore => (0..).into(),
            Arity::OneOrMore => (1..).into(),
        }
    }

    /// The keyword value for this parameter out of the parsed `matches`.
    pub(crate) fn extract(&self, matches: &ArgMatches) -> Value {
        let values = match self.value_kind {
            ValueKind::Switch => return Value::Bool(matches.get_flag(&self.name)),
            ValueKind::Str => collect::<String>(matches, &self.name),
            ValueKind::Int => collect::<i64>(matches, &self.name),
            ValueKind::Float => collect::<f64>(matches, &self.name),
            ValueKind::Path => collect::<PathBuf>(matches, &self.name),
        };

        match values {
            Some(values) if self.arity.is_list() => Value::List(values),
            // an arity of exactly one still parses as a one-element sequence
            Some(values) => values.into_iter().next().unwrap_or(Value::None),
            None => self.absent_value(),
        }
    }

    fn absent_value(&self) -> Value {
        match &self.default {
            Some(default) => default.clone(),
            None if self.kind == ParameterKind::Positional && self.arity.is_list() => {
                Value::List(Vec::new())
            }
            None => Value::None,
        }
    }
}

fn collect<T>(matches: &ArgMatches, id: &str) -> Option<Vec<Value>>
where
    T: Clone + Send + Sync + 'static + Into<Value>,
{
    matches
        .get_many::<T>(id)
        .map(|values| values.cloned().map(Into::into).collect())
}

/// Rebind parsed `matches` into keyword form, one value per spec.
pub fn rebind(specs: &[ParameterSpec], matches: &ArgMatches) -> Vec<(String, Value)> {
    specs
        .iter()
        .map(|spec| (spec.name.clone(), spec.extract(matches)))
        .collect()
}

/// Keyword arguments handed to a command handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: Vec<(String, Value)>,
    common: Vec<(String, Value)>,
}

impl BoundArgs {
    pub fn new(values: Vec<(String, Value)>, common: Vec<(String, Value)>) -> Self {
        Self { values, common }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        lookup(&self.values, name)
    }

    /// A program-wide option declared with
    /// [`CommandRegistry::common_option`](crate::CommandRegistry::common_option).
    pub fn common(&self, name: &str) -> Option<&Value> {
        lookup(&self.common, name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn value(&self, name: &str) -> Result<&Value> {
        self.get(name)
            .ok_or_else(|| anyhow!("no parameter named `{}`", name))
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        self.opt_str(name)?
            .ok_or_else(|| anyhow!("parameter `{}` has no value", name))
    }

    pub fn opt_str(&self, name: &str) -> Result<Option<&str>> {
        match self.value(name)? {
            Value::None => Ok(None),
            v => v
                .as_str()
                .map(Some)
                .ok_or_else(|| anyhow!("parameter `{}` is not a string: {}", name, v)),
        }
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        let v = self.value(name)?;
        v.as_int()
            .ok_or_else(|| anyhow!("parameter `{}` is not an integer: {}", name, v))
    }

    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.value(name)? {
            Value::None => Ok(false),
            v => v
                .as_bool()
                .ok_or_else(|| anyhow!("parameter `{}` is not a switch: {}", name, v)),
        }
    }

    pub fn path(&self, name: &str) -> Result<&Path> {
        let v = self.value(name)?;
        v.as_path()
            .ok_or_else(|| anyhow!("parameter `{}` is not a path: {}", name, v))
    }

    /// Values of a list parameter as strings. A scalar counts as a one-element list and
    /// a missing value as an empty one.
    pub fn strings(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.items(name)?.iter().map(|v| v.to_string()).collect())
    }

    /// Values of a list parameter as paths, with the same shape rules as [`strings`](Self::strings).
    pub fn paths(&self, name: &str) -> Result<Vec<PathBuf>> {
        self.items(name)?
            .into_iter()
            .map(|v| {
                v.as_path()
                    .map(Path::to_path_buf)
                    .ok_or_else(|| anyhow!("parameter `{}` holds a non-path value: {}", name, v))
            })
            .collect()
    }

    fn items(&self, name: &str) -> Result<Vec<&Value>> {
        Ok(match self.value(name)? {
            Value::None => Vec::new(),
            Value::List(items) => items.iter().collect(),
            v => vec![v],
        })
    }
}

fn lookup<'a>(values: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    values.iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(specs: &[ParameterSpec], argv: &[&str]) -> Result<Vec<(String, Value)>, clap::Error> {
        let cmd = clap::Command::new("test")
            .no_binary_name(true)
            .args(specs.iter().map(ParameterSpec::to_arg));
        let matches = cmd.try_get_matches_from(argv)?;
        Ok(rebind(specs, &matches))
    }

    fn value_of<'a>(bound: &'a [(String, Value)], name: &str) -> &'a Value {
        lookup(bound, name).unwrap()
    }

    #[test]
    fn missing_option_is_a_configuration_error() {
        let table = OptionTable::new().option("base", OptionSpec::new());
        let err = bind_parameters("build", &["base", "target"], &table).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingOption {
                command: "build".into(),
                parameter: "target".into()
            }
        );
    }

    #[test]
    fn flag_decides_between_positional_and_flagged() {
        let table = OptionTable::new()
            .option("target", OptionSpec::new())
            .option("mode", OptionSpec::new().flag('m').default_value("debug"));
        let specs = bind_parameters("build", &["target", "mode"], &table).unwrap();

        assert_eq!(specs[0].name, "target");
        assert_eq!(specs[0].kind, ParameterKind::Positional);
        assert_eq!(specs[1].kind, ParameterKind::Flagged { short: 'm' });

        let bound = parse(&specs, &["app"]).unwrap();
        assert_eq!(value_of(&bound, "target"), &Value::from("app"));
        assert_eq!(value_of(&bound, "mode"), &Value::from("debug"));

        let bound = parse(&specs, &["app", "-m", "release"]).unwrap();
        assert_eq!(value_of(&bound, "mode"), &Value::from("release"));
        let bound = parse(&specs, &["--mode", "profile", "app"]).unwrap();
        assert_eq!(value_of(&bound, "mode"), &Value::from("profile"));
    }

    #[test]
    fn arity_of_one_is_unwrapped() {
        let table = OptionTable::new()
            .option("name", OptionSpec::new().nargs(Arity::Exactly(1)))
            .option("pair", OptionSpec::new().flag('p').nargs(Arity::Exactly(2)));
        let specs = bind_parameters("x", &["name", "pair"], &table).unwrap();

        let bound = parse(&specs, &["solo", "-p", "a", "b"]).unwrap();
        assert_eq!(value_of(&bound, "name"), &Value::from("solo"));
        assert_eq!(value_of(&bound, "pair"), &Value::from(vec!["a", "b"]));
    }

    #[test]
    fn list_arities_and_absent_values() {
        let table = OptionTable::new()
            .option("files", OptionSpec::new().nargs(Arity::ZeroOrMore))
            .option("exclude", OptionSpec::new().flag('x').nargs(Arity::OneOrMore));
        let specs = bind_parameters("x", &["files", "exclude"], &table).unwrap();

        let bound = parse(&specs, &[]).unwrap();
        assert_eq!(value_of(&bound, "files"), &Value::List(Vec::new()));
        assert_eq!(value_of(&bound, "exclude"), &Value::None);

        let bound = parse(&specs, &["a", "b", "-x", "c", "d"]).unwrap();
        assert_eq!(value_of(&bound, "files"), &Value::from(vec!["a", "b"]));
        assert_eq!(value_of(&bound, "exclude"), &Value::from(vec!["c", "d"]));
    }

    #[test]
    fn typed_values_are_parsed() {
        let table = OptionTable::new()
            .option("count", OptionSpec::new().kind(ValueKind::Int))
            .option("ratio", OptionSpec::new().flag('r').kind(ValueKind::Float))
            .option("out", OptionSpec::new().flag('o').kind(ValueKind::Path))
            .option("force", OptionSpec::switch('f'));
        let specs = bind_parameters("x", &["count", "ratio", "out", "force"], &table).unwrap();

        let bound = parse(&specs, &["3", "-r", "0.5", "-o", "dist", "-f"]).unwrap();
        assert_eq!(value_of(&bound, "count"), &Value::Int(3));
        assert_eq!(value_of(&bound, "ratio"), &Value::Float(0.5));
        assert_eq!(value_of(&bound, "out"), &Value::Path(PathBuf::from("dist")));
        assert_eq!(value_of(&bound, "force"), &Value::Bool(true));

        let bound = parse(&specs, &["3"]).unwrap();
        assert_eq!(value_of(&bound, "force"), &Value::Bool(false));
        assert_eq!(value_of(&bound, "ratio"), &Value::None);

        assert!(parse(&specs, &["three"]).is_err());
    }

    #[test]
    fn choices_restrict_values() {
        let table = OptionTable::new().option(
            "level",
            OptionSpec::new().choices(["low", "high"]),
        );
        let specs = bind_parameters("x", &["level"], &table).unwrap();
        assert!(parse(&specs, &["high"]).is_ok());
        assert!(parse(&specs, &["medium"]).is_err());
    }

    #[test]
    fn invalid_options_are_rejected() {
        let positional_switch = OptionTable::new().option(
            "force",
            OptionSpec::new().kind(ValueKind::Switch),
        );
        assert!(matches!(
            bind_parameters("x", &["force"], &positional_switch),
            Err(ConfigurationError::InvalidOption { .. })
        ));

        let help_flag = OptionTable::new().option("host", OptionSpec::new().flag('h'));
        assert!(bind_parameters("x", &["host"], &help_flag).is_err());

        let same_short = OptionTable::new()
            .option("all", OptionSpec::switch('a'))
            .option("any", OptionSpec::switch('a'));
        assert!(bind_parameters("x", &["all", "any"], &same_short).is_err());

        let table = OptionTable::new().option("a", OptionSpec::new());
        assert!(bind_parameters("x", &["a", "a"], &table).is_err());
    }

    #[test]
    fn positional_order_is_checked() {
        let table = OptionTable::new()
            .option("many", OptionSpec::new().nargs(Arity::OneOrMore))
            .option("last", OptionSpec::new())
            .option("maybe", OptionSpec::new().nargs(Arity::Optional));

        assert!(bind_parameters("x", &["many", "last"], &table).is_err());
        assert!(bind_parameters("x", &["maybe", "last"], &table).is_err());
        assert!(bind_parameters("x", &["last", "many"], &table).is_ok());
        assert!(bind_parameters("x", &["last", "maybe"], &table).is_ok());
    }

    #[test]
    fn bound_args_accessors() {
        let args = BoundArgs::new(
            vec![
                ("name".into(), Value::from("x")),
                ("none".into(), Value::None),
                ("list".into(), Value::from(vec!["a", "b"])),
                ("n".into(), Value::Int(2)),
            ],
            vec![("directory".into(), Value::from("/tmp"))],
        );
        assert_eq!(args.str("name").unwrap(), "x");
        assert_eq!(args.opt_str("none").unwrap(), None);
        assert!(args.str("none").is_err());
        assert_eq!(args.strings("list").unwrap(), vec!["a", "b"]);
        assert_eq!(args.strings("name").unwrap(), vec!["x"]);
        assert!(args.strings("none").unwrap().is_empty());
        assert_eq!(
            args.paths("list").unwrap(),
            vec![PathBuf::from("a"), PathBuf::from("b")]
        );
        assert!(args.paths("n").is_err());
        assert_eq!(args.int("n").unwrap(), 2);
        assert!(!args.flag("none").unwrap());
        assert!(args.value("missing").is_err());
        assert_eq!(args.common("directory"), Some(&Value::from("/tmp")));
        assert_eq!(args.iter().count(), 4);
    }
}
