use clap::{Args, Parser, Subcommand};
use std::time::Duration;

/// Control jobs on a remote scheduler master node
#[derive(Debug, Parser)]
#[clap(name = "scheduler", arg_required_else_help = true)]
pub struct ArgParser {
    /// Give up on a connect, call or log read that takes longer than this (e.g. "30s")
    #[clap(
        long,
        global = true,
        env = "SCHEDULER_TIMEOUT",
        parse(try_from_str = humantime::parse_duration)
    )]
    pub timeout: Option<Duration>,
    /// The sub-command to use
    #[clap(subcommand)]
    pub sub_command: SubCommand,
}

#[derive(Clone, Debug, PartialEq, Eq, Subcommand)]
pub enum SubCommand {
    /// create or start a job and assign a name to it
    Start {
        /// The docker image name
        #[clap(long, forbid_empty_values = true, allow_hyphen_values = true)]
        image: String,

        /// The name of the job
        #[clap(long, forbid_empty_values = true, allow_hyphen_values = true)]
        name: String,

        #[clap(flatten)]
        target: Target,
    },
    /// terminate a job
    Stop {
        /// The name of the job
        #[clap(long, forbid_empty_values = true, allow_hyphen_values = true)]
        name: String,

        #[clap(flatten)]
        target: Target,
    },
    /// print the current status of a job
    Query {
        /// The name of the job
        #[clap(long, forbid_empty_values = true, allow_hyphen_values = true)]
        name: String,

        #[clap(flatten)]
        target: Target,
    },
    /// stream the log output of a job
    Log {
        /// The name of the job
        #[clap(long, forbid_empty_values = true, allow_hyphen_values = true)]
        name: String,

        #[clap(flatten)]
        target: Target,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Args)]
pub struct Target {
    /// The hostname of the master node, optionally with a port
    #[clap(
        long,
        env = "SCHEDULER_HOST",
        default_value = "localhost",
        allow_hyphen_values = true
    )]
    pub host: String,
}

/// Single-dash spellings of the long flags, as in `-name web`.
const LONG_FLAGS: &[&str] = &["image", "name", "host", "timeout", "help"];

/// Flags whose value may come as the next argument.
const VALUE_FLAGS: &[&str] = &["image", "name", "host", "timeout"];

/// Rewrite `-flag` and `-flag=value` into the `--flag` form clap expects.
///
/// Only the flags this tool defines are rewritten, and never the argument that
/// carries a flag's value, so `-name -help` names a job `-help`.
pub fn normalize_flags<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut awaiting_value = false;
    args.into_iter()
        .map(|arg| {
            if std::mem::take(&mut awaiting_value) {
                return arg;
            }
            let (dashes, flag) = match arg.strip_prefix("--") {
                Some(flag) => ("", flag),
                None => match arg.strip_prefix('-') {
                    Some(flag) => ("-", flag),
                    None => return arg,
                },
            };
            let (name, inline_value) = match flag.split_once('=') {
                Some((name, _)) => (name, true),
                None => (flag, false),
            };
            if !LONG_FLAGS.contains(&name) {
                return arg;
            }
            awaiting_value = !inline_value && VALUE_FLAGS.contains(&name);
            format!("{}{}", dashes, arg)
        })
        .collect()
}
