//! Purpose: `resolve-glib-patch` CLI entry point.
//! Role: Binary crate root; parses args, builds `PatchConfig`, delegates to dispatch.
//! Invariants: Every failure prints one error block on stderr and exits with status 1.
//! Invariants: `--help`, `--version` and `--completions` take no filesystem action.
//! Invariants: No config files or environment variables are consulted.
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{
    ArgAction, CommandFactory, Parser, ValueEnum, ValueHint,
    error::{ContextKind, ContextValue, ErrorKind as ClapErrorKind},
};
use clap_complete::aot::Shell;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod console;

use command_dispatch::Action;
use console::Console;
use resolve_glib_patch::core::config::{DEFAULT_LIB_DIR, PatchConfig};
use resolve_glib_patch::core::error::{Error, ErrorKind, FAILURE_EXIT_CODE};

const BIN_NAME: &str = "resolve-glib-patch";

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run(std::env::args_os()) {
        Ok(outcome) => outcome.exit_code,
        Err((err, console)) => {
            console.error(&err);
            if err.kind() == ErrorKind::Usage {
                eprintln!("\n{}", Cli::command().render_usage());
            }
            FAILURE_EXIT_CODE
        }
    };
    std::process::exit(exit_code);
}

fn run<I>(args: I) -> Result<RunOutcome, (Error, Console)>
where
    I: IntoIterator<Item = OsString>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        Console::new(ColorMode::Auto.use_color(streams_are_terminals())),
                    )
                })?;
                return Ok(RunOutcome::ok());
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint(format!("Try `{BIN_NAME} --help`.")),
                    Console::new(ColorMode::Auto.use_color(streams_are_terminals())),
                ));
            }
        },
    };

    init_tracing(cli.verbose);
    let config = PatchConfig::new(&cli.lib_dir)
        .with_color(cli.color.use_color(streams_are_terminals()));
    let console = Console::new(config.color);

    command_dispatch::dispatch_command(cli.action(), cli.dry_run, &config, console)
        .map_err(|err| (err, console))
}

#[derive(Parser)]
#[command(
    name = "resolve-glib-patch",
    version,
    about = "Move DaVinci Resolve's bundled glib libraries aside so the system copies load",
    long_about = None,
    after_help = r#"With no options the patch is applied: libgio*, libglib*, libgmodule* and
libgobject* are moved from the library directory into its
`disabled-libraries` subdirectory. Root privileges are requested through
sudo only when the directories are not writable.

EXAMPLES
  $ resolve-glib-patch               # apply
  $ resolve-glib-patch --status      # show current state
  $ resolve-glib-patch --revert      # restore the bundled libraries"#
)]
struct Cli {
    #[arg(long, conflicts_with = "status", help = "Move the disabled libraries back")]
    revert: bool,

    #[arg(long, help = "Report whether the patch is applied; changes nothing")]
    status: bool,

    #[arg(long, requires = "status", help = "With --status, print one JSON object")]
    json: bool,

    #[arg(
        long,
        conflicts_with = "status",
        help = "Print the moves that would happen; changes nothing"
    )]
    dry_run: bool,

    #[arg(
        long,
        value_name = "DIR",
        default_value = DEFAULT_LIB_DIR,
        value_hint = ValueHint::DirPath,
        help = "Library directory of the Resolve install"
    )]
    lib_dir: PathBuf,

    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize status lines: auto|always|never"
    )]
    color: ColorMode,

    #[arg(short, long, action = ArgAction::Count, help = "Log more detail to stderr (repeatable)")]
    verbose: u8,

    #[arg(
        long,
        value_name = "SHELL",
        value_enum,
        exclusive = true,
        help = "Print a shell completion script"
    )]
    completions: Option<Shell>,
}

impl Cli {
    fn action(&self) -> Action {
        if let Some(shell) = self.completions {
            Action::Completions(shell)
        } else if self.status {
            Action::Status { json: self.json }
        } else if self.revert {
            Action::Revert
        } else {
            Action::Apply
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

fn streams_are_terminals() -> bool {
    io::stdout().is_terminal() && io::stderr().is_terminal()
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    if err.kind() == ClapErrorKind::UnknownArgument {
        if let Some(ContextValue::String(arg)) = err.get(ContextKind::InvalidArg) {
            return format!("unknown option '{arg}'");
        }
    }
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
