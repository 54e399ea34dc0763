//! `toolstash get`: list tools or download one.

use anyhow::{Context, Result};
use clap::{ArgAction, Args};
use std::path::Path;
use toolstash_core::{
    CancellationSupervisor, Catalog, DestinationMode, DownloadRequest, DownloadResult, Fetcher,
    Platform, Settings,
};

use crate::progress::DownloadBar;
use crate::render::{self, OutputFormat};

#[derive(Args, Debug)]
#[command(after_help = "\
EXAMPLES:
    toolstash get helm
    toolstash get kind --stash=false
    toolstash get terraform --version=1.9.2
    toolstash get kubectl --progress=false

    # List every tool that can be downloaded:
    toolstash get")]
pub struct GetArgs {
    /// Name of the tool to download.
    pub tool: Option<String>,

    /// Download a specific version instead of the latest.
    #[arg(short = 'v', long)]
    pub version: Option<String>,

    /// Keep the binary in ~/.toolstash/bin; with --stash=false, use a temporary directory.
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub stash: bool,

    /// Display a progress bar.
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub progress: Option<bool>,

    /// Output format of the tool list.
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

impl GetArgs {
    fn destination(&self) -> DestinationMode {
        if self.stash {
            DestinationMode::StashDirectory
        } else {
            DestinationMode::TemporaryDirectory
        }
    }

    /// `TOOLSTASH_PROGRESS` beats the flag, which beats the config file.
    fn progress_enabled(&self, settings: &Settings, env_override: Option<bool>) -> bool {
        env_override
            .or(self.progress)
            .unwrap_or(settings.progress)
    }
}

pub async fn execute(args: &GetArgs) -> Result<()> {
    let settings = Settings::load();
    let catalog = Catalog::with_user_file(&settings.catalog_path())?;

    let Some(name) = args.tool.as_deref() else {
        print!("{}", render::tools(catalog.list_all(), args.output));
        return Ok(());
    };

    let platform = Platform::detect()?;
    let progress = args.progress_enabled(&settings, Settings::progress_override()?);
    let request = DownloadRequest::for_tool(&catalog, name, platform)?
        .version(args.version.clone().unwrap_or_default())
        .destination(args.destination())
        .progress(progress);

    println!("Downloading: {}", name);

    let fetcher = Fetcher::new(&settings).context("Failed to create HTTP client")?;
    let supervisor =
        CancellationSupervisor::install().context("Failed to install signal handlers")?;

    let bar = DownloadBar::new(progress);
    let outcome = fetcher
        .fetch(&request, &supervisor.token(), bar.observer())
        .await;
    bar.finish();

    let result = outcome.map_err(|e| {
        let hint = e.kind().hint();
        anyhow::Error::new(e).context(hint)
    })?;

    print!(
        "{}",
        instructions(&result, request.destination, fetcher.stash_dir())
    );
    Ok(())
}

/// What to tell the user once the binary is in place.
fn instructions(result: &DownloadResult, mode: DestinationMode, stash_dir: &Path) -> String {
    let path = result.output_file_path.display();
    let name = &result.final_name;

    let mut out = format!("Tool written to: {}\n\n", path);
    match mode {
        DestinationMode::TemporaryDirectory => {
            out.push_str(&format!(
                "Run the following to install the tool:\n\n\
                 chmod +x {path}\n\
                 sudo install -m 755 {path} /usr/local/bin/{name}\n"
            ));
        }
        DestinationMode::StashDirectory => {
            out.push_str(&format!(
                "# Add ({name}) to your PATH variable\n\
                 export PATH=$PATH:{stash}\n\n\
                 # Test the binary:\n\
                 {path}\n\n\
                 # Or install with:\n\
                 sudo mv {path} /usr/local/bin/\n\n",
                stash = stash_dir.display(),
            ));
        }
    }
    out
}
