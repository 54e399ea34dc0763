//! # toolstash
//!
//! Downloads prebuilt command-line tools for the running platform.
//!
//! ```bash
//! toolstash get                      # list available tools
//! toolstash get helm                 # latest helm into ~/.toolstash/bin
//! toolstash get kubectl -v v1.28.0   # a specific version
//! toolstash get kind --stash=false   # into a temporary directory
//! ```

mod commands;
mod progress;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use toolstash_core::{Error, EXIT_CANCELLED};
use tracing_subscriber::EnvFilter;

/// Fetch prebuilt CLI tools without a package manager.
#[derive(Parser)]
#[command(
    name = "toolstash",
    author,
    version,
    about = "Fetch prebuilt CLI tools without a package manager",
    after_help = "\
ENVIRONMENT VARIABLES:
    TOOLSTASH_HOME          State directory (default: ~/.toolstash)
    TOOLSTASH_PROGRESS      Override --progress (1/t/true or 0/f/false)
    TOOLSTASH_GITHUB_API    GitHub API base URL (default: https://api.github.com)
    GITHUB_TOKEN, GH_TOKEN  Token for GitHub API requests
    RUST_LOG                Log filter (default: toolstash=warn)"
)]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a tool.
    ///
    /// Downloads a CLI from the tool's releases or downloads page, in binary
    /// form, for the current operating system and architecture. Without a
    /// tool name, lists every tool that can be downloaded.
    #[command(visible_aliases = ["g", "d", "download"])]
    Get(commands::get::GetArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => handle_error(&e),
    };
    std::process::exit(code);
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "toolstash=debug"
    } else {
        "toolstash=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Starting toolstash v{}", toolstash_core::VERSION);
}

/// Prints the error and returns the process exit code.
fn handle_error(e: &anyhow::Error) -> i32 {
    exit_code(e, |message| eprintln!("{message}"))
}

fn exit_code(e: &anyhow::Error, print: impl Fn(&str)) -> i32 {
    if e.downcast_ref::<Error>().is_some_and(Error::is_cancelled) {
        print("Download cancelled");
        return EXIT_CANCELLED;
    }
    print(&format!("Error: {e:#}"));
    1
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Get(args) => commands::get::execute(&args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use clap::CommandFactory;
    use std::cell::RefCell;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_get_aliases() {
        for alias in ["get", "g", "d", "download"] {
            let cli = Cli::try_parse_from(["toolstash", alias, "helm"]).unwrap();
            let Commands::Get(args) = cli.command;
            assert_eq!(args.tool.as_deref(), Some("helm"));
        }
    }

    #[test]
    fn test_cancellation_exits_130() {
        let err = anyhow::Error::new(Error::Cancelled {
            tool: "helm".to_string(),
        })
        .context("the download was interrupted");

        let printed = RefCell::new(String::new());
        let code = exit_code(&err, |m| printed.borrow_mut().push_str(m));
        assert_eq!(code, 130);
        assert_eq!(*printed.borrow(), "Download cancelled");
    }

    #[test]
    fn test_other_errors_exit_1_with_hint() {
        let err: Result<()> = Err(Error::HttpStatus {
            tool: "kind".to_string(),
            version: "v0.23.0".to_string(),
            url: "https://example.com/kind".to_string(),
            status: 404,
        })
        .context("check with the vendor whether this tool is available for your system");

        let printed = RefCell::new(String::new());
        let code = exit_code(&err.unwrap_err(), |m| printed.borrow_mut().push_str(m));
        assert_eq!(code, 1);
        let printed = printed.borrow();
        assert!(printed.starts_with("Error: check with the vendor"));
        assert!(printed.contains("404"));
    }
}
