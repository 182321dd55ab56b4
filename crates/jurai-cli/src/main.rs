use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jurai")]
#[command(about = "JurAI - multi-agent legal compliance screening")]
#[command(version)]
struct Cli {
    /// JSON file with the feature context (an object, or a list whose first
    /// element is used)
    context: PathBuf,

    /// Critique/refine rounds before the judge takes the last report
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Disable streamed model output
    #[arg(long)]
    no_stream: bool,

    /// Config file (defaults to <config dir>/jurai/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// LLM provider for every role (groq, openai, together, openrouter, ollama, lmstudio)
    #[arg(long)]
    provider: Option<String>,

    /// LLM model for every role
    #[arg(short, long)]
    model: Option<String>,

    /// Legal corpus for the retrieval tool (JSON list of {content, metadata})
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Where verdict history is kept
    #[arg(long)]
    history_dir: Option<PathBuf>,

    /// Skip the compliance diff and risk assessment after the verdict
    #[arg(long)]
    no_analysis: bool,

    /// Print the whole report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = match cli.config {
        Some(ref path) => jurai_core::Settings::load_from(path)?,
        None => jurai_core::Settings::load(),
    };

    settings.override_models(cli.provider.as_deref(), cli.model.as_deref());
    if let Some(max_iterations) = cli.max_iterations {
        settings.deliberation.max_iterations = max_iterations;
    }
    if cli.no_stream {
        settings.deliberation.streaming = false;
    }
    if cli.no_analysis {
        settings.analysis.compliance_diff = false;
        settings.analysis.risk = false;
    }
    if let Some(corpus) = cli.corpus {
        settings.retrieval.corpus = Some(corpus);
    }
    if let Some(dir) = cli.history_dir {
        settings.history.dir = Some(dir);
    }

    let context = jurai_cli::load_context(&cli.context)?;
    jurai_cli::run_screening(&settings, context, cli.json).await?;

    Ok(())
}
