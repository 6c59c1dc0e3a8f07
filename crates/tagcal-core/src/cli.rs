use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tagcal",
    version,
    about = "Tag-based day calendar with free-time tracking",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Override a config value, e.g. `--set calendar.work_start=9`.
    #[arg(
        long = "set",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub overrides: Vec<KeyVal>,

    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Day to select at startup (today, tomorrow, monday, +2d, 2026-10-19, ...).
    #[arg(long = "day")]
    pub day: Option<String>,

    /// Tag to select at startup.
    #[arg(long = "tag")]
    pub tag: Option<String>,

    #[arg(long = "no-color")]
    pub no_color: bool,

    /// A single command to run; without one, commands are read from stdin.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{GlobalCli, KeyVal};

    #[test]
    fn parses_overrides_and_trailing_command() {
        let cli = GlobalCli::parse_from([
            "tagcal",
            "-vv",
            "--set",
            "calendar.work_start=9",
            "--tag",
            "meeting",
            "add",
            "Review",
            "10:00",
            "11:00",
        ]);

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.overrides.len(), 1);
        assert_eq!(cli.overrides[0].key, "calendar.work_start");
        assert_eq!(cli.overrides[0].value, "9");
        assert_eq!(cli.tag.as_deref(), Some("meeting"));
        assert_eq!(cli.rest, vec!["add", "Review", "10:00", "11:00"]);
    }

    #[test]
    fn key_val_requires_equals() {
        assert!("calendar.work_end".parse::<KeyVal>().is_err());
        let kv: KeyVal = " site.name = Home ".parse().expect("valid pair");
        assert_eq!((kv.key.as_str(), kv.value.as_str()), ("site.name", "Home"));
    }
}
