//! The clap engine: builds a `clap::Command` from the declarative tree and
//! runs it.

use std::any::Any;
use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};

use crate::builder::{CommandBuilder, build};
use crate::config::AppConfig;
use crate::context::Context;
use crate::error::ClappError;
use crate::logger::update_logger_pre_run;
use crate::types::{Command, Flag, FlagScope, Invocation, ValueRef};

/// Id of the positional arguments accepted by leaf commands.
const ARGS_ID: &str = "args";
const HELP_LONG: &str = "help";
const HELP_SHORT: char = 'h';
const VERSION_LONG: &str = "version";
const VERSION_SHORT: char = 'V';

/// Runs a command tree against a set of arguments.
pub trait Executor<C: AppConfig> {
    /// Parse `args` (including the program name) against `root`, write flag
    /// values into `config` and run the matched handler.
    fn execute(
        &self,
        root: &Command<C>,
        base: &Context<'_>,
        config: &mut C,
        args: Vec<OsString>,
    ) -> Result<(), ClappError>;
}

/// [`CommandBuilder`] producing `clap::Command`s.
#[derive(Debug, Default)]
pub struct ClapBuilder;

impl ClapBuilder {
    pub fn new() -> Self {
        Self
    }

    fn arg<C>(flag: &Flag<C>, scope: FlagScope) -> Arg {
        let mut arg = Arg::new(flag.name().to_string())
            .long(flag.name().to_string())
            .help(flag.help().to_string())
            .global(scope == FlagScope::Persistent);
        if let Some(short) = flag.short_name() {
            arg = arg.short(short);
        }

        match flag.value() {
            ValueRef::String(_) => arg.action(ArgAction::Set),
            ValueRef::StringList(_) => arg.action(ArgAction::Append).value_delimiter(','),
            ValueRef::Int(_) => arg
                .action(ArgAction::Set)
                .value_parser(clap::value_parser!(i64))
                .allow_negative_numbers(true),
            ValueRef::IntList(_) => arg
                .action(ArgAction::Append)
                .value_delimiter(',')
                .value_parser(clap::value_parser!(i64))
                .allow_negative_numbers(true),
            ValueRef::Bool(_) => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_parser(clap::value_parser!(bool)),
        }
    }
}

impl<C> CommandBuilder<C> for ClapBuilder {
    type Node = clap::Command;

    fn node(&mut self, command: &Command<C>) -> clap::Command {
        let descriptions = command.descriptions();
        let mut node = clap::Command::new(command.name().to_string())
            .about(descriptions.short.clone())
            .long_about(descriptions.long.clone());

        if command.children().is_empty() {
            node = node.arg(
                Arg::new(ARGS_ID)
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .value_name("ARGS"),
            );
        }
        node
    }

    fn register_flag(
        &mut self,
        node: clap::Command,
        flag: &Flag<C>,
        scope: FlagScope,
        inherited: &[&Flag<C>],
    ) -> Result<clap::Command, ClappError> {
        let name = flag.name();
        let short = flag.short_name();

        let reserved =
            name == HELP_LONG || name == ARGS_ID || short == Some(HELP_SHORT);
        let taken = node.get_arguments().any(|existing| {
            existing.get_id() == name
                || existing.get_long() == Some(name)
                || (short.is_some() && existing.get_short() == short)
        });
        let shadows = inherited
            .iter()
            .any(|up| up.name() == name || (short.is_some() && up.short_name() == short));
        if reserved || taken || shadows {
            return Err(ClappError::DuplicateFlag {
                command: node.get_name().to_string(),
                flag: name.to_string(),
            });
        }

        Ok(node.arg(Self::arg(flag, scope)))
    }

    /// Local flags become clap-required. Clap cannot require global
    /// arguments, so required persistent flags are checked by
    /// [`ClapExecutor`] once the arguments are parsed.
    fn mark_required(
        &mut self,
        node: clap::Command,
        flag: &Flag<C>,
        scope: FlagScope,
    ) -> Result<clap::Command, ClappError> {
        let name = flag.name();
        if !node.get_arguments().any(|arg| arg.get_id() == name) {
            return Err(ClappError::RequiredFlagNotRegistered {
                flag: name.to_string(),
            });
        }

        match scope {
            FlagScope::Local => Ok(node.mut_arg(name, |arg| arg.required(true))),
            FlagScope::Persistent => Ok(node),
        }
    }

    fn add_child(&mut self, parent: clap::Command, child: clap::Command) -> clap::Command {
        parent.subcommand(child)
    }

    /// Runs the hook, then checks that no flag collides with the
    /// `--version`/`-V` clap generates once a version is set.
    fn customize(
        &mut self,
        node: clap::Command,
        command: &Command<C>,
        inherited: &[&Flag<C>],
    ) -> Result<clap::Command, ClappError> {
        let node = match command.customization() {
            Some(customize) => customize(node),
            None => node,
        };
        if node.is_disable_version_flag_set() {
            return Ok(node);
        }

        let clash = inherited
            .iter()
            .find(|up| up.name() == VERSION_LONG || up.short_name() == Some(VERSION_SHORT))
            .map(|up| (node.get_name().to_string(), up.name().to_string()))
            .or_else(|| version_clash(&node, node.is_propagate_version_set()));
        match clash {
            Some((command, flag)) => Err(ClappError::DuplicateFlag { command, flag }),
            None => Ok(node),
        }
    }
}

/// The first argument of `node`, and of its subcommands when `recurse`,
/// that uses `--version` or `-V`.
fn version_clash(node: &clap::Command, recurse: bool) -> Option<(String, String)> {
    let own = node.get_arguments().find(|arg| {
        !matches!(arg.get_action(), ArgAction::Version)
            && (arg.get_long() == Some(VERSION_LONG) || arg.get_short() == Some(VERSION_SHORT))
    });
    if let Some(arg) = own {
        return Some((node.get_name().to_string(), arg.get_id().to_string()));
    }
    if !recurse {
        return None;
    }
    node.get_subcommands().find_map(|sub| version_clash(sub, true))
}

/// [`Executor`] backed by clap.
#[derive(Debug, Default)]
pub struct ClapExecutor;

impl ClapExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl<C: AppConfig> Executor<C> for ClapExecutor {
    fn execute(
        &self,
        root: &Command<C>,
        base: &Context<'_>,
        config: &mut C,
        args: Vec<OsString>,
    ) -> Result<(), ClappError> {
        let mut cli = build(&mut ClapBuilder::new(), root)?;

        let matches = match cli.try_get_matches_from_mut(args) {
            Ok(matches) => matches,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                e.print()?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let levels = matched_levels(root, &matches);
        let (leaf, leaf_matches) = levels[levels.len() - 1];
        let path: Vec<String> = levels.iter().map(|(cmd, _)| cmd.name().to_string()).collect();
        tracing::debug!(command = %path.join(" "), "matched command");

        for (cmd, level_matches) in &levels {
            for flag in cmd.local_flags() {
                write_flag(flag, level_matches, config)?;
            }
            for flag in cmd.persistent_flags() {
                write_flag(flag, leaf_matches, config)?;
            }
        }

        for (cmd, _) in &levels {
            for flag in cmd.persistent_flags().iter().filter(|f| f.is_required()) {
                if !supplied(leaf_matches, flag.name()) {
                    return Err(matched_command(&cli, &path)
                        .clone()
                        .error(
                            ErrorKind::MissingRequiredArgument,
                            format!(
                                "the following required argument was not provided: --{}",
                                flag.name()
                            ),
                        )
                        .into());
                }
            }
        }

        let ctx = base.with_config(&*config);
        update_logger_pre_run(&ctx)?;

        let Some(handler) = leaf.handler_fn() else {
            return print_help(&cli, &path);
        };

        let invocation = Invocation {
            args: positional_args(leaf_matches),
            path,
            matches: leaf_matches,
        };
        let dispatch = ctx.logger();
        tracing::dispatcher::with_default(&dispatch, || handler(&ctx, &invocation))
            .map_err(ClappError::Handler)
    }
}

/// Pair each command on the matched path with its matches, root first.
/// Subcommands added through a customization hook have no declarative
/// counterpart; the walk stops at their parent.
fn matched_levels<'t, 'm, C>(
    root: &'t Command<C>,
    matches: &'m ArgMatches,
) -> Vec<(&'t Command<C>, &'m ArgMatches)> {
    let mut levels = vec![(root, matches)];
    let (mut cmd, mut current) = (root, matches);
    while let Some((name, sub)) = current.subcommand() {
        let Some(child) = cmd.find_child(name) else {
            break;
        };
        levels.push((child, sub));
        cmd = child;
        current = sub;
    }
    levels
}

fn supplied(matches: &ArgMatches, id: &str) -> bool {
    matches!(matches.try_contains_id(id), Ok(true))
        && matches.value_source(id) == Some(ValueSource::CommandLine)
}

/// Store a flag's value in its slot, if it was given on the command line.
fn write_flag<C>(flag: &Flag<C>, matches: &ArgMatches, config: &mut C) -> Result<(), ClappError> {
    if !supplied(matches, flag.name()) {
        return Ok(());
    }

    match flag.value() {
        ValueRef::String(slot) => slot.store(config, one(matches, flag)?),
        ValueRef::StringList(slot) => slot.store(config, many(matches, flag)?),
        ValueRef::Int(slot) => slot.store(config, one(matches, flag)?),
        ValueRef::IntList(slot) => slot.store(config, many(matches, flag)?),
        ValueRef::Bool(slot) => slot.store(config, one(matches, flag)?),
    }
    Ok(())
}

fn mismatch<C>(flag: &Flag<C>) -> ClappError {
    ClappError::IncorrectValueRefForFlag {
        flag: flag.name().to_string(),
        expected_type: flag.kind().as_str(),
    }
}

fn one<T, C>(matches: &ArgMatches, flag: &Flag<C>) -> Result<T, ClappError>
where
    T: Any + Clone + Send + Sync + 'static,
{
    matches
        .try_get_one::<T>(flag.name())
        .map_err(|_| mismatch(flag))?
        .cloned()
        .ok_or_else(|| mismatch(flag))
}

fn many<T, C>(matches: &ArgMatches, flag: &Flag<C>) -> Result<Vec<T>, ClappError>
where
    T: Any + Clone + Send + Sync + 'static,
{
    Ok(matches
        .try_get_many::<T>(flag.name())
        .map_err(|_| mismatch(flag))?
        .map(|values| values.cloned().collect())
        .unwrap_or_default())
}

fn positional_args(matches: &ArgMatches) -> Vec<String> {
    matches
        .try_get_many::<String>(ARGS_ID)
        .ok()
        .flatten()
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// The clap command at `path` (root name first).
fn matched_command<'c>(cli: &'c clap::Command, path: &[String]) -> &'c clap::Command {
    let mut node = cli;
    for name in path.iter().skip(1) {
        match node.find_subcommand(name) {
            Some(sub) => node = sub,
            None => break,
        }
    }
    node
}

fn print_help(cli: &clap::Command, path: &[String]) -> Result<(), ClappError> {
    matched_command(cli, path).clone().print_help()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{LoggingConfig, TestConfig};
    use std::cell::RefCell;
    use std::rc::Rc;
    use tracing::level_filters::LevelFilter;

    use crate::types::Slot;

    fn argv(args: &[&str]) -> Vec<OsString> {
        std::iter::once("app")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    fn run(root: &Command<TestConfig>, config: &mut TestConfig, args: &[&str]) -> Result<(), ClappError> {
        ClapExecutor::new().execute(root, &Context::new(), config, argv(args))
    }

    fn flagged_root() -> Command<TestConfig> {
        Command::new("app")
            .local_flag(Flag::string("name", |c: &mut TestConfig| &mut c.name).short('n'))
            .local_flag(Flag::int("port", |c: &mut TestConfig| &mut c.port).short('p'))
            .local_flag(Flag::bool("debug", |c: &mut TestConfig| &mut c.debug).short('d'))
            .local_flag(Flag::string_list("tag", |c: &mut TestConfig| &mut c.tags))
            .handler(|_, _| Ok(()))
    }

    #[test]
    fn long_flags_write_into_config() {
        let mut config = TestConfig::default();
        run(
            &flagged_root(),
            &mut config,
            &["--name", "cli", "--port", "-1", "--debug", "--tag", "a,b", "--tag", "c"],
        )
        .unwrap();

        assert_eq!(config.name, "cli");
        assert_eq!(config.port, -1);
        assert!(config.debug);
        assert_eq!(config.tags, ["a", "b", "c"]);
    }

    #[test]
    fn short_flags_write_into_config() {
        let mut config = TestConfig::default();
        run(&flagged_root(), &mut config, &["-n", "short", "-p", "9", "-d"]).unwrap();
        assert_eq!(config.name, "short");
        assert_eq!(config.port, 9);
        assert!(config.debug);
    }

    #[test]
    fn bool_flag_can_be_cleared() {
        let mut config = TestConfig {
            debug: true,
            ..TestConfig::default()
        };
        run(&flagged_root(), &mut config, &["--debug=false"]).unwrap();
        assert!(!config.debug);
    }

    #[test]
    fn absent_flags_keep_existing_values() {
        let mut config = TestConfig {
            name: "from-env".into(),
            ..TestConfig::default()
        };
        run(&flagged_root(), &mut config, &[]).unwrap();
        assert_eq!(config.name, "from-env");
        assert_eq!(config.tags, ["base"]);
    }

    #[test]
    fn invalid_int_is_a_parse_error() {
        let mut config = TestConfig::default();
        let err = run(&flagged_root(), &mut config, &["--port", "eighty"]).unwrap_err();
        match err {
            ClappError::Cli(e) => assert_eq!(e.kind(), ErrorKind::ValueValidation),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn shared_slots_are_written_outside_config() {
        let ids = Rc::new(RefCell::new(Vec::<i64>::new()));
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::new("id", ValueRef::IntList(Slot::Shared(Rc::clone(&ids)))))
            .handler(|_, _| Ok(()));

        let mut config = TestConfig::default();
        run(&root, &mut config, &["--id", "1,2", "--id", "3"]).unwrap();
        assert_eq!(*ids.borrow(), [1, 2, 3]);
        assert_eq!(config, TestConfig::default());
    }

    #[test]
    fn handler_sees_config_path_and_positional_args() {
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let root = Command::<TestConfig>::new("app")
            .persistent_flag(Flag::int("port", |c: &mut TestConfig| &mut c.port))
            .child(
                Command::new("serve")
                    .local_flag(Flag::string("name", |c: &mut TestConfig| &mut c.name))
                    .handler(move |ctx, inv| {
                        *sink.borrow_mut() = Some((
                            ctx.config().port,
                            ctx.config().name.clone(),
                            inv.path.clone(),
                            inv.args.clone(),
                        ));
                        Ok(())
                    }),
            );

        let mut config = TestConfig::default();
        run(&root, &mut config, &["--port", "1", "serve", "--name", "x", "extra", "more"]).unwrap();

        let (port, name, path, args) = seen.borrow_mut().take().unwrap();
        assert_eq!(port, 1);
        assert_eq!(name, "x");
        assert_eq!(path, ["app", "serve"]);
        assert_eq!(args, ["extra", "more"]);
    }

    #[test]
    fn persistent_flag_accepted_after_subcommand() {
        let root = Command::<TestConfig>::new("app")
            .persistent_flag(Flag::bool("debug", |c: &mut TestConfig| &mut c.debug))
            .child(Command::new("serve").handler(|_, _| Ok(())));

        let mut config = TestConfig::default();
        run(&root, &mut config, &["serve", "--debug"]).unwrap();
        assert!(config.debug);
    }

    #[test]
    fn local_flag_not_visible_on_children() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::bool("debug", |c: &mut TestConfig| &mut c.debug))
            .child(Command::new("serve").handler(|_, _| Ok(())));

        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["serve", "--debug"]).unwrap_err();
        assert!(matches!(err, ClappError::Cli(e) if e.kind() == ErrorKind::UnknownArgument));
    }

    #[test]
    fn missing_required_local_flag() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::int("port", |c: &mut TestConfig| &mut c.port).required())
            .handler(|_, _| Ok(()));

        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &[]).unwrap_err();
        assert!(
            matches!(err, ClappError::Cli(e) if e.kind() == ErrorKind::MissingRequiredArgument)
        );
        run(&root, &mut config, &["--port", "3"]).unwrap();
        assert_eq!(config.port, 3);
    }

    #[test]
    fn missing_required_persistent_flag() {
        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);
        let root = Command::<TestConfig>::new("app")
            .persistent_flag(Flag::string("name", |c: &mut TestConfig| &mut c.name).required())
            .child(Command::new("serve").handler(move |_, _| {
                *flag.borrow_mut() = true;
                Ok(())
            }));

        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["serve"]).unwrap_err();
        assert!(
            matches!(err, ClappError::Cli(e) if e.kind() == ErrorKind::MissingRequiredArgument)
        );
        assert!(!*ran.borrow());

        run(&root, &mut config, &["serve", "--name", "ok"]).unwrap();
        assert!(*ran.borrow());
    }

    #[test]
    fn missing_required_persistent_flag_reports_matched_command() {
        let root = Command::<TestConfig>::new("app")
            .persistent_flag(Flag::string("name", |c: &mut TestConfig| &mut c.name).required())
            .child(Command::new("serve").handler(|_, _| Ok(())));

        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["serve"]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("--name"), "{message}");
        assert!(message.contains("app serve"), "{message}");
    }

    #[test]
    fn duplicate_flags_are_rejected() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::string("name", |c: &mut TestConfig| &mut c.name))
            .persistent_flag(Flag::int("name", |c: &mut TestConfig| &mut c.port));
        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &[]).unwrap_err();
        assert!(matches!(err, ClappError::DuplicateFlag { flag, .. } if flag == "name"));
    }

    #[test]
    fn duplicate_short_names_are_rejected() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::string("name", |c: &mut TestConfig| &mut c.name).short('x'))
            .local_flag(Flag::int("port", |c: &mut TestConfig| &mut c.port).short('x'));
        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &[]).unwrap_err();
        assert!(matches!(err, ClappError::DuplicateFlag { flag, .. } if flag == "port"));
    }

    #[test]
    fn reserved_names_are_rejected() {
        for flag in [
            Flag::bool("help", |c: &mut TestConfig| &mut c.debug),
            Flag::bool("hide", |c: &mut TestConfig| &mut c.debug).short('h'),
            Flag::string("args", |c: &mut TestConfig| &mut c.name),
        ] {
            let root = Command::<TestConfig>::new("app").local_flag(flag);
            let mut config = TestConfig::default();
            let err = run(&root, &mut config, &[]).unwrap_err();
            assert!(matches!(err, ClappError::DuplicateFlag { .. }));
        }
    }

    #[test]
    fn child_flag_reusing_inherited_short_is_rejected() {
        let root = Command::<TestConfig>::new("app")
            .persistent_flag(Flag::bool("debug", |c: &mut TestConfig| &mut c.debug).short('x'))
            .child(
                Command::new("serve")
                    .local_flag(Flag::string("name", |c: &mut TestConfig| &mut c.name).short('x'))
                    .handler(|_, _| Ok(())),
            );
        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["serve"]).unwrap_err();
        assert!(matches!(
            err,
            ClappError::DuplicateFlag { command, flag } if command == "serve" && flag == "name"
        ));
    }

    #[test]
    fn grandchild_flag_reusing_inherited_name_is_rejected() {
        let root = Command::<TestConfig>::new("app")
            .persistent_flag(Flag::int("port", |c: &mut TestConfig| &mut c.port))
            .child(Command::new("db").child(
                Command::new("migrate")
                    .persistent_flag(Flag::int("port", |c: &mut TestConfig| &mut c.database.pool_size)),
            ));
        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &[]).unwrap_err();
        assert!(matches!(
            err,
            ClappError::DuplicateFlag { command, flag } if command == "migrate" && flag == "port"
        ));
    }

    #[test]
    fn sibling_and_parent_local_flags_may_share_names() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::string("name", |c: &mut TestConfig| &mut c.name).short('n'))
            .child(
                Command::new("serve")
                    .local_flag(Flag::string("name", |c: &mut TestConfig| &mut c.name).short('n'))
                    .handler(|_, _| Ok(())),
            );
        let mut config = TestConfig::default();
        run(&root, &mut config, &["serve", "-n", "child"]).unwrap();
        assert_eq!(config.name, "child");
    }

    #[test]
    fn flag_using_version_short_clashes_once_a_version_is_set() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::bool("verbose", |c: &mut TestConfig| &mut c.debug).short('V'))
            .customize(|cmd| cmd.version("1.0.0"))
            .handler(|_, _| Ok(()));
        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &[]).unwrap_err();
        assert!(matches!(
            err,
            ClappError::DuplicateFlag { command, flag } if command == "app" && flag == "verbose"
        ));
    }

    #[test]
    fn inherited_version_short_clashes_with_child_version() {
        let root = Command::<TestConfig>::new("app")
            .persistent_flag(Flag::bool("verbose", |c: &mut TestConfig| &mut c.debug).short('V'))
            .child(
                Command::new("serve")
                    .customize(|cmd| cmd.version("2.0.0"))
                    .handler(|_, _| Ok(())),
            );
        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["serve"]).unwrap_err();
        assert!(matches!(
            err,
            ClappError::DuplicateFlag { command, flag } if command == "serve" && flag == "verbose"
        ));
    }

    #[test]
    fn propagated_version_clashes_with_descendant_flag() {
        let root = Command::<TestConfig>::new("app")
            .customize(|cmd| cmd.version("1.0.0").propagate_version(true))
            .child(
                Command::new("serve")
                    .local_flag(Flag::bool("version", |c: &mut TestConfig| &mut c.debug))
                    .handler(|_, _| Ok(())),
            );
        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["serve"]).unwrap_err();
        assert!(matches!(
            err,
            ClappError::DuplicateFlag { command, flag } if command == "serve" && flag == "version"
        ));
    }

    #[test]
    fn version_flag_is_free_without_a_version() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::bool("version", |c: &mut TestConfig| &mut c.debug).short('V'))
            .handler(|_, _| Ok(()));
        let mut config = TestConfig::default();
        run(&root, &mut config, &["-V"]).unwrap();
        assert!(config.debug);
    }

    #[test]
    fn required_unregistered_flag_is_reported() {
        let flag = Flag::<TestConfig>::int("port", |c: &mut TestConfig| &mut c.port);
        let err = ClapBuilder::new()
            .mark_required(clap::Command::new("app"), &flag, FlagScope::Local)
            .unwrap_err();
        assert!(matches!(err, ClappError::RequiredFlagNotRegistered { flag } if flag == "port"));
    }

    #[test]
    fn customized_parser_mismatch_is_reported() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::int("port", |c: &mut TestConfig| &mut c.port))
            .customize(|cmd| {
                cmd.mut_arg("port", |arg| {
                    arg.value_parser(clap::builder::NonEmptyStringValueParser::new())
                })
            })
            .handler(|_, _| Ok(()));

        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["--port", "80"]).unwrap_err();
        assert!(matches!(
            err,
            ClappError::IncorrectValueRefForFlag { flag, expected_type: "int" } if flag == "port"
        ));
    }

    #[test]
    fn customized_parser_mismatch_for_string() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::string("name", |c: &mut TestConfig| &mut c.name))
            .customize(|cmd| cmd.mut_arg("name", |arg| arg.value_parser(clap::value_parser!(i64))))
            .handler(|_, _| Ok(()));

        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["--name", "5"]).unwrap_err();
        assert!(matches!(
            err,
            ClappError::IncorrectValueRefForFlag { flag, expected_type: "string" } if flag == "name"
        ));
    }

    #[test]
    fn customized_parser_mismatch_for_string_list() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::string_list("tag", |c: &mut TestConfig| &mut c.tags))
            .customize(|cmd| cmd.mut_arg("tag", |arg| arg.value_parser(clap::value_parser!(i64))))
            .handler(|_, _| Ok(()));

        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["--tag", "1,2"]).unwrap_err();
        assert!(matches!(
            err,
            ClappError::IncorrectValueRefForFlag { flag, expected_type: "string list" } if flag == "tag"
        ));
        assert_eq!(config.tags, ["base"]);
    }

    #[test]
    fn customized_parser_mismatch_for_int_list() {
        let ids = Rc::new(RefCell::new(Vec::<i64>::new()));
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::new("id", ValueRef::IntList(Slot::Shared(Rc::clone(&ids)))))
            .customize(|cmd| {
                cmd.mut_arg("id", |arg| {
                    arg.value_parser(clap::builder::NonEmptyStringValueParser::new())
                })
            })
            .handler(|_, _| Ok(()));

        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["--id", "1"]).unwrap_err();
        assert!(matches!(
            err,
            ClappError::IncorrectValueRefForFlag { flag, expected_type: "int list" } if flag == "id"
        ));
        assert!(ids.borrow().is_empty());
    }

    #[test]
    fn customized_parser_mismatch_for_bool() {
        let root = Command::<TestConfig>::new("app")
            .local_flag(Flag::bool("debug", |c: &mut TestConfig| &mut c.debug))
            .customize(|cmd| {
                cmd.mut_arg("debug", |arg| {
                    arg.value_parser(clap::builder::NonEmptyStringValueParser::new())
                })
            })
            .handler(|_, _| Ok(()));

        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &["--debug=true"]).unwrap_err();
        assert!(matches!(
            err,
            ClappError::IncorrectValueRefForFlag { flag, expected_type: "bool" } if flag == "debug"
        ));
        assert!(!config.debug);
    }

    #[test]
    fn customize_can_add_arguments_read_by_handler() {
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let root = Command::<TestConfig>::new("app")
            .customize(|cmd| cmd.arg(Arg::new("mode").long("mode")))
            .handler(move |_, inv| {
                *sink.borrow_mut() = inv.matches.get_one::<String>("mode").cloned();
                Ok(())
            });

        let mut config = TestConfig::default();
        run(&root, &mut config, &["--mode", "fast"]).unwrap();
        assert_eq!(seen.borrow().as_deref(), Some("fast"));
    }

    #[test]
    fn missing_handler_prints_help() {
        let root = Command::<TestConfig>::new("app").child(Command::new("serve"));
        let mut config = TestConfig::default();
        run(&root, &mut config, &[]).unwrap();
        run(&root, &mut config, &["serve"]).unwrap();
    }

    #[test]
    fn help_and_version_return_ok() {
        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);
        let root = Command::<TestConfig>::new("app")
            .customize(|cmd| cmd.version("1.2.3"))
            .handler(move |_, _| {
                *flag.borrow_mut() = true;
                Ok(())
            });

        let mut config = TestConfig::default();
        run(&root, &mut config, &["--help"]).unwrap();
        run(&root, &mut config, &["--version"]).unwrap();
        assert!(!*ran.borrow());
    }

    #[test]
    fn handler_error_is_wrapped() {
        let root = Command::<TestConfig>::new("app").handler(|_, _| anyhow::bail!("boom"));
        let mut config = TestConfig::default();
        let err = run(&root, &mut config, &[]).unwrap_err();
        assert!(matches!(&err, ClappError::Handler(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn logger_adjusted_before_handler() {
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let root = Command::<LoggingConfig>::new("app")
            .local_flag(Flag::int("log-level", |c: &mut LoggingConfig| &mut c.log_level))
            .handler(move |ctx, _| {
                *sink.borrow_mut() = Some(ctx.log_manager().level());
                Ok(())
            });

        let mut config = LoggingConfig {
            log_level: 1,
            log_format: "console".into(),
        };
        ClapExecutor::new()
            .execute(&root, &Context::new(), &mut config, argv(&["--log-level", "2"]))
            .unwrap();
        assert_eq!(*seen.borrow(), Some(LevelFilter::WARN));
    }

    #[test]
    fn invalid_log_format_stops_before_handler() {
        let root = Command::<LoggingConfig>::new("app").handler(|_, _| anyhow::bail!("ran"));
        let mut config = LoggingConfig {
            log_level: 1,
            log_format: "xml".into(),
        };
        let err = ClapExecutor::new()
            .execute(&root, &Context::new(), &mut config, argv(&[]))
            .unwrap_err();
        assert!(matches!(err, ClappError::InvalidLogFormat { .. }));
    }
}
