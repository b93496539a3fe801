use clap::Parser;
use garmin_sync::cli::commands;
use garmin_sync::config::{Settings, DEFAULT_DOMAIN, DEFAULT_MEDIA_ROOT};
use garmin_sync::logging::{init_logging, Verbosity};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "garmin-sync")]
#[command(author, version, about = "Refresh a mounted Garmin device's EPO file and upload its activities", long_about = None)]
struct Cli {
    /// Directory holding per-user mount points
    #[arg(long, env = "GARMIN_SYNC_MEDIA_ROOT", default_value = DEFAULT_MEDIA_ROOT)]
    media_root: PathBuf,

    /// User whose mount directory holds the device
    #[arg(long, env = "USER", default_value = "")]
    user: String,

    /// Credentials file (defaults to ~/.garmin-sync.json)
    #[arg(long, env = "GARMIN_SYNC_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Recorded EPO request body shipped with garmin-sync
    /// (defaults to ~/.config/garmin-sync/garmin-postdata, then the copy next to the binary)
    #[arg(long, env = "GARMIN_SYNC_POSTDATA")]
    postdata: Option<PathBuf>,

    /// Garmin domain (garmin.com or garmin.cn)
    #[arg(long, default_value = DEFAULT_DOMAIN)]
    domain: String,

    /// Do not touch the EPO file
    #[arg(long)]
    skip_epo: bool,

    /// Do not upload activities
    #[arg(long)]
    skip_upload: bool,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn into_settings(self) -> garmin_sync::Result<Settings> {
        let mut settings = Settings::new(self.user)?
            .with_domain(&self.domain)
            .with_media_root(self.media_root);

        if let Some(path) = self.credentials {
            settings = settings.with_credentials_path(path);
        }
        if let Some(path) = self.postdata {
            settings = settings.with_postdata_path(path);
        }
        settings.skip_epo = self.skip_epo;
        settings.skip_upload = self.skip_upload;

        Ok(settings)
    }
}

async fn run(cli: Cli) -> garmin_sync::Result<commands::SyncSummary> {
    let settings = cli.into_settings()?;
    commands::validate_settings(&settings)?;
    commands::sync_run(&settings).await
}

#[tokio::main]
async fn main() -> garmin_sync::Result<()> {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.quiet, cli.verbose));

    match run(cli).await {
        Ok(summary) => commands::print_summary(&summary),
        Err(e) => {
            eprintln!("Error: {}", garmin_sync::error::format_user_error(&e));
            std::process::exit(1);
        }
    }

    Ok(())
}
