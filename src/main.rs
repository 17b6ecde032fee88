use anyhow::Result;
use clap::Parser;
use foodappeal_processor::app::{App, RunOutput};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "foodappeal-processor")]
#[command(about = "Edit a food photo to look appetizing and professional")]
struct CliArgs {
    /// Path to the photo to edit.
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Edit instruction; defaults to the built-in suggestion.
    #[arg(long)]
    prompt: Option<String>,

    /// Declared mime type; sniffed from the file when omitted.
    #[arg(long)]
    mime_type: Option<String>,

    /// Where to write an edited-image result.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foodappeal_processor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    match App::new() {
        Ok(app) => match app
            .run(&args.image, args.prompt, args.mime_type, args.output)
            .await
        {
            Ok(RunOutput::SavedImage(path)) => {
                info!("Edited image written to {}", path.display());
                Ok(())
            }
            Ok(RunOutput::Text(text)) => {
                println!("{}", text);
                Ok(())
            }
            Err(e) => {
                error!("Edit failed (status {}): {}", e.status(), e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    }
}
