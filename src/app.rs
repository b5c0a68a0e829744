//! Application orchestration and command routing.
//!
//! Parses command-line arguments and delegates to the command handlers.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

/// Terminal microphone tester with a live waveform
#[derive(Parser)]
#[command(name = "mictest")]
#[command(version)]
#[command(about = "Record up to 10 seconds from the microphone with a live waveform")]
#[command(long_about = "Record up to 10 seconds from the microphone with a live waveform,\nthen play the clip back or save it as mic-test.<ext>.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used by default.\n\nKEYS:\n    Enter/Space   start or stop recording\n    p             play the last clip\n    d             save the last clip to the download directory\n    q/Esc         quit\n\nEXAMPLES:\n    $ mictest\n    $ mictest --device 2\n    $ mictest record --download-dir ~/Downloads\n\nSending SIGUSR1 to the process toggles recording.")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/mictest/mictest.toml\n    Logs:               ~/.local/state/mictest/mictest.log.*"
)]
struct Cli {
    /// Input device: "default", an ID, or a name from `list-devices`
    #[arg(short, long, value_name = "DEVICE", global = true)]
    device: Option<String>,

    /// Directory the clip is saved to on download
    #[arg(long, value_name = "DIR", global = true)]
    download_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive microphone test (default)
    ///
    /// Press Enter to start, Enter again to stop. Recording stops by itself
    /// after 10 seconds.
    #[command(visible_alias = "r")]
    Record,

    /// Open configuration file in your preferred editor
    ///
    /// Writes the default configuration first if none exists.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input devices
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries from the application
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   mictest completions bash > mictest.bash
    ///   mictest completions zsh > _mictest
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If the selected command fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            generate(shell, &mut Cli::command(), "mictest", &mut io::stdout());
            Ok(())
        }
        Some(Commands::ListDevices) => commands::handle_list_devices(),
        Some(Commands::Logs) => commands::handle_logs(),
        Some(Commands::Config) => {
            logging::init_logging()?;
            commands::handle_config()
        }
        None | Some(Commands::Record) => {
            logging::init_logging()?;
            commands::handle_record(cli.device, cli.download_dir).await
        }
    }
}
