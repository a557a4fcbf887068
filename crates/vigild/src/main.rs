use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod input;

use config::Config;
use engine::{spawn_engine, EngineHandle, EngineOptions, EngineUpdate};
use input::{Command, InputLine};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(config.log_json);

    let run_id = uuid::Uuid::new_v4();
    run(config)
        .instrument(tracing::info_span!("run", %run_id))
        .await
}

async fn run(config: Config) -> Result<()> {
    tracing::info!(
        input = ?config.input,
        seed = ?config.seed,
        fusion = config.fusion_enabled,
        "vigild starting"
    );

    let (handle, updates) = spawn_engine(EngineOptions {
        liveness: config.liveness.clone(),
        seed: config.seed,
        fusion_enabled: config.fusion_enabled,
        channel_capacity: config.channel_capacity,
    })?;

    let printer = tokio::spawn(print_updates(updates));

    let reader: Box<dyn AsyncRead + Unpin + Send> = match &config.input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open input {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    tracing::info!("vigild ready");

    tokio::select! {
        res = feed(reader, handle) => res?,
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
    }

    // The handle is gone at this point; the engine drains and closes the
    // update channel, which ends the printer.
    let printed = printer.await.context("printer task panicked")??;
    tracing::info!(updates = printed, "vigild shutting down");

    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Read input lines and forward them to the engine until EOF.
async fn feed(reader: impl AsyncRead + Unpin, handle: EngineHandle) -> Result<()> {
    let mut lines = BufReader::new(reader).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let parsed = match InputLine::parse(&line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed input line");
                continue;
            }
        };

        match parsed {
            InputLine::Command(Command::Reset) => handle.reset().await?,
            InputLine::Command(Command::SetActive { active }) => handle.set_active(active).await?,
            InputLine::Frame(event) => {
                let timestamp = match event.timestamp() {
                    Ok(t) => t,
                    Err(e) => {
                        tracing::warn!(line = line_no, error = %e, "skipping frame");
                        continue;
                    }
                };
                handle.submit(event.frame(), timestamp, event.texture).await?;
            }
        }
    }

    tracing::info!(lines = line_no, "input closed");
    Ok(())
}

/// Print every update as one JSON line on stdout.
async fn print_updates(mut updates: mpsc::Receiver<EngineUpdate>) -> Result<u64> {
    let mut stdout = tokio::io::stdout();
    let mut count = 0u64;
    while let Some(update) = updates.recv().await {
        let mut line = serde_json::to_string(&update).context("failed to encode update")?;
        line.push('\n');
        stdout
            .write_all(line.as_bytes())
            .await
            .context("failed to write update")?;
        count += 1;
    }
    stdout.flush().await.context("failed to flush stdout")?;
    Ok(count)
}
