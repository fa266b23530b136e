use anyhow::Result;
use clap::Parser;
use docchat_cli::console::{self, ChatOptions};
use docchat_cli::{App, Cli, Command, IngestOutcome};
use docchat_telemetry::{SpanCapture, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let capture = cli.global.timings.then(SpanCapture::new);
    let mut telemetry = TelemetryConfig::new("docchat")
        .with_format(cli.global.log_format.into())
        .with_default_filter("warn,docchat_rag=info,docchat_cli=info");
    if let Some(capture) = &capture {
        telemetry = telemetry.with_capture(capture.clone());
    }
    docchat_telemetry::try_init(&telemetry)?;

    tracing::debug!(command = cli.command.name(), "starting");
    let app = App::from_args(&cli.global)?;

    match cli.command {
        Command::Ingest { force } => match app.ingest(force).await? {
            IngestOutcome::AlreadyBuilt { entries } => {
                println!(
                    "Index already exists with {entries} chunks; nothing to do. Use --force to rebuild."
                );
            }
            IngestOutcome::Built { documents, chunks } => {
                println!("Indexed {documents} documents into {chunks} chunks.");
            }
        },
        Command::Ask { question } => {
            let pipeline = app.pipeline().await?;
            let result = pipeline.answer(&question.join(" "), &[]).await?;
            console::print_answer(&result, true);
            if let Some(capture) = &capture {
                console::print_timings(capture);
            }
        }
        Command::Chat => {
            let pipeline = app.pipeline().await?;
            console::run_chat(&pipeline, ChatOptions { show_sources: false, timings: capture })
                .await?;
        }
    }

    Ok(())
}
