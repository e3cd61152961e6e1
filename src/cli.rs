//! Command-line interface.
//!
//! Schedulers append their own arguments (execution time, run ids) to the
//! command line. Only `--env`, `--team` and the help/version flags are
//! recognized; everything else is dropped before parsing.

use std::ffi::OsString;

use clap::Parser;

use crate::job::{Environment, RunContext, Team};

const VALUE_FLAGS: [&str; 2] = ["--env", "--team"];
const BARE_FLAGS: [&str; 4] = ["-h", "--help", "-V", "--version"];

#[derive(Debug, Parser)]
#[command(name = "athena-batch", version)]
#[command(about = "Batch job reading its configuration from Athena", long_about = None)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = Environment::Dev, help = "Environment")]
    pub env: Environment,

    #[arg(
        long,
        value_enum,
        help = "Team name (for athena). You must set the ATHENA_SECRET environment variable."
    )]
    pub team: Team,
}

impl Cli {
    /// Parse `args`, ignoring anything not understood.
    ///
    /// Exits the process with status 2 on invalid or missing flags.
    pub fn parse_lenient<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::parse_from(known_args(args))
    }

    pub fn run_context(&self) -> RunContext {
        RunContext::new(self.env, self.team)
    }
}

/// Keep the program name and the arguments [`Cli`] understands.
///
/// A value flag keeps the argument following it, whatever it is. Everything
/// after `--` is dropped.
pub fn known_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut kept: Vec<OsString> = args.next().into_iter().collect();

    while let Some(arg) = args.next() {
        let Some(text) = arg.to_str() else {
            continue;
        };
        if text == "--" {
            break;
        }

        if VALUE_FLAGS.contains(&text) {
            kept.push(arg);
            if let Some(value) = args.next() {
                kept.push(value);
            }
        } else if BARE_FLAGS.contains(&text)
            || VALUE_FLAGS
                .iter()
                .any(|flag| text.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')))
        {
            kept.push(arg);
        }
    }

    kept
}
