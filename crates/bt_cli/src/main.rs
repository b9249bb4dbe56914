use std::io::Write;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use bt_inference::{Config, Engine, ModelLoader, DEFAULT_ARCH, DEFAULT_CHECKPOINT};
use bt_web::{AppState, WebConfig};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info, Level};

#[derive(Parser, Debug)]
#[command(author, version, about = "Brain MRI tumor detection with a Vision Transformer", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the web interface
    Serve(ServeArgs),
    /// Classify image files and print the results
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Fine-tuned weights (.pth, .pt, .bin or .safetensors)
    #[arg(long, default_value = DEFAULT_CHECKPOINT)]
    checkpoint: PathBuf,
    #[arg(long, default_value = "vit", help = "Model to use for inference. Available models: vit (default), dummy")]
    model: String,
    /// Architecture preset for the ViT backbone
    #[arg(long, default_value = DEFAULT_ARCH)]
    arch: String,
    /// HuggingFace config.json overriding the preset
    #[arg(long)]
    config_json: Option<PathBuf>,
    /// HuggingFace preprocessor_config.json
    #[arg(long)]
    preprocessor_config: Option<PathBuf>,
}

impl From<ModelArgs> for Config {
    fn from(args: ModelArgs) -> Self {
        Self {
            model_name: args.model,
            arch: args.arch,
            config_json: args.config_json,
            checkpoint: args.checkpoint,
            preprocessor_config: args.preprocessor_config,
        }
    }
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    model: ModelArgs,
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,
    #[arg(long, default_value_t = 8501)]
    port: u16,
    /// Pause after each prediction before showing the result
    #[arg(long, default_value_t = 0)]
    reveal_delay_ms: u64,
    #[arg(long, default_value_t = bt_web::state::DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
    /// Idle time after which a browser session is discarded
    #[arg(long, default_value_t = 3600)]
    session_ttl_secs: u64,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Images to classify
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn init_logging(verbose: u8, format: LogFormat) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let builder = tracing_subscriber::fmt().with_max_level(level);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn load_model(args: ModelArgs) -> anyhow::Result<std::sync::Arc<Engine>> {
    let loader = ModelLoader::new(Config::from(args));
    let config = loader.config();
    info!("🧠 Loading {} model from {}", config.model_name, config.checkpoint.display());
    match loader.load().await {
        Ok(engine) => Ok(engine),
        Err(e) => {
            error!("❌ Model could not be loaded: {}", e);
            Err(e).context("model loading failed")
        }
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let engine = load_model(args.model).await?;
    let config = WebConfig {
        reveal_delay: Duration::from_millis(args.reveal_delay_ms),
        max_upload_bytes: args.max_upload_bytes,
        session_ttl: Duration::from_secs(args.session_ttl_secs),
    };
    let addr = SocketAddr::new(args.host, args.port);
    bt_web::serve(AppState::new(engine, config), addr)
        .await
        .with_context(|| format!("server on {} failed", addr))
}

/// Print one line per classified image and return how many could not be read.
async fn classify_files(engine: &Engine, images: &[PathBuf], out: &mut impl Write) -> anyhow::Result<usize> {
    let mut failures = 0;
    for path in images {
        let result = tokio::fs::read(path)
            .await
            .map_err(bt_core::Error::from)
            .and_then(|bytes| engine.predict_bytes(&bytes));
        match result {
            Ok(prediction) => writeln!(
                out,
                "{}: {} ({})",
                path.display(),
                prediction.class.headline(),
                prediction.confidence_display()
            )?,
            Err(e) => {
                failures += 1;
                error!("{}: {}", path.display(), e);
            }
        }
    }
    Ok(failures)
}

async fn predict(args: PredictArgs) -> anyhow::Result<()> {
    let engine = load_model(args.model).await?;
    let failures = classify_files(&engine, &args.images, &mut std::io::stdout()).await?;
    if failures > 0 {
        bail!("{} of {} images could not be classified", failures, args.images.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Predict(args) => predict(args).await,
    }
}
