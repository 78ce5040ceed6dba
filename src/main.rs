//! postcrew command line entry point

use clap::{Parser, Subcommand};
use postcrew::config::{GeneratorConfig, RuntimeCredentials};
use postcrew::error::{GeneratorError, GeneratorResult};
use postcrew::llm::provider::LlmProvider;
use postcrew::llm::providers::{AnthropicConfig, AnthropicProvider, OpenAiConfig, OpenAiProvider};
use postcrew::observability::init_default_logging;
use postcrew::output::FileArtifactStore;
use postcrew::pipeline::{
    until_cancelled, PipelineError, PipelineOrchestrator, Stage, StageExecutor,
};
use postcrew::progress::{ConsoleReporter, LogReporter, ProgressFanout};
use postcrew::prompts::DefaultPrompts;
use postcrew::search::{SearchProvider, SerperConfig, SerperSearch};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Research, draft and iteratively refine LinkedIn posts with an LLM crew
#[derive(Parser)]
#[command(name = "postcrew")]
#[command(about = "Multi-stage LLM pipeline that researches, writes and refines LinkedIn posts")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a post about a topic
    Generate(GenerateArgs),
    /// Show example topics
    Examples,
    /// Describe the agents, the workflow and the current configuration
    Info,
    /// Validate the configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Topic for the post; prompted for when omitted
    #[arg(short, long)]
    topic: Option<String>,

    /// Directory for saved posts
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Maximum refinement iterations
    #[arg(short, long)]
    iterations: Option<u32>,

    /// Hide intermediate drafts and critiques
    #[arg(long)]
    no_thinking: bool,

    /// Research from model knowledge only
    #[arg(long)]
    no_search: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);
    info!("Starting postcrew v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Generate(args) => generate(cli.config, args).await,
        Commands::Examples => {
            print_examples();
            Ok(())
        }
        Commands::Info => {
            print_info(cli.config);
            Ok(())
        }
        Commands::Config { show } => handle_config_command(cli.config, show),
    };

    if let Err(e) = result {
        if e.is_cancelled() {
            println!("\n❌ Generation cancelled by user");
        } else {
            error!(error = %e, "Command failed");
            println!("❌ {}", e.user_message());
        }
        process::exit(1);
    }
}

fn load_configuration(path: Option<PathBuf>) -> GeneratorResult<GeneratorConfig> {
    Ok(GeneratorConfig::load(path.as_deref())?)
}

/// Provider factory for creating LLM providers from configuration
struct LlmProviderFactory;

impl LlmProviderFactory {
    fn create_provider(
        config: &GeneratorConfig,
        credentials: &RuntimeCredentials,
    ) -> GeneratorResult<Arc<dyn LlmProvider>> {
        let api_key = credentials.llm_api_key.clone();

        match config.llm.provider.as_str() {
            "openai" => {
                let mut openai_config = OpenAiConfig {
                    api_key,
                    ..Default::default()
                };
                if let Some(base_url) = &config.llm.base_url {
                    openai_config.base_url = base_url.clone();
                }
                Ok(Arc::new(OpenAiProvider::new(openai_config)?))
            }
            "anthropic" => {
                let mut anthropic_config = AnthropicConfig {
                    api_key,
                    ..Default::default()
                };
                if let Some(base_url) = &config.llm.base_url {
                    anthropic_config.base_url = base_url.clone();
                }
                Ok(Arc::new(AnthropicProvider::new(anthropic_config)?))
            }
            provider => Err(GeneratorError::InvalidInput(format!(
                "Unsupported LLM provider: {provider}"
            ))),
        }
    }
}

fn create_search_provider(
    config: &GeneratorConfig,
    credentials: &RuntimeCredentials,
) -> GeneratorResult<Option<Arc<dyn SearchProvider>>> {
    let Some(api_key) = credentials.search_api_key.clone() else {
        return Ok(None);
    };

    let mut serper_config = SerperConfig {
        api_key,
        ..Default::default()
    };
    if let Some(base_url) = &config.search.base_url {
        serper_config.base_url = base_url.clone();
    }
    Ok(Some(Arc::new(SerperSearch::new(serper_config)?)))
}

async fn read_topic() -> GeneratorResult<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Enter your topic: ").await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line.trim().to_string())
}

/// Cancel `cancel` on the first Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling run");
            cancel.cancel();
        }
    });
}

async fn generate(config_path: Option<PathBuf>, args: GenerateArgs) -> GeneratorResult<()> {
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut config = load_configuration(config_path)?;
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if let Some(iterations) = args.iterations {
        config.pipeline.max_iterations = iterations;
    }
    if args.no_thinking {
        config.output.show_thinking = false;
    }
    if args.no_search {
        config.search.enabled = false;
    }
    config.validate()?;

    let credentials = config.resolve_credentials()?;

    let topic = match args.topic {
        Some(topic) => topic,
        None => until_cancelled(&cancel, read_topic()).await??,
    };
    if topic.trim().is_empty() {
        return Err(PipelineError::InvalidTopic.into());
    }

    println!("{}", ConsoleReporter::header());
    println!("{}", ConsoleReporter::section("⚙️  Configuration"));
    println!("ℹ️  Topic: {topic}");
    println!("ℹ️  Max Iterations: {}", config.pipeline.max_iterations);
    println!("ℹ️  Output Directory: {}", config.output.dir.display());
    println!("ℹ️  Show Thinking: {}", config.output.show_thinking);
    println!("ℹ️  Web Search: {}", credentials.search_api_key.is_some());

    let llm = LlmProviderFactory::create_provider(&config, &credentials)?;
    let mut executor = StageExecutor::new(
        llm,
        Arc::new(DefaultPrompts::new()),
        config.executor_settings(),
    );
    if let Some(search) = create_search_provider(&config, &credentials)? {
        executor = executor.with_search(search);
    }

    let progress = ProgressFanout::new()
        .with(Arc::new(ConsoleReporter::new(config.output.show_thinking)))
        .with(Arc::new(LogReporter));

    let orchestrator = PipelineOrchestrator::new(
        config.pipeline_settings(),
        executor,
        Arc::new(progress),
        Arc::new(FileArtifactStore::new(config.output.dir.clone())),
    )
    .with_cancellation(cancel);

    match orchestrator.run(&topic).await {
        Ok(result) => {
            ConsoleReporter::print_final_output(&result.artifact, &result.metadata);
            println!("\n✅ ✨ Post generation completed successfully!");
            println!("ℹ️  📁 Saved to: {}", result.location);
            Ok(())
        }
        Err(PipelineError::Persistence { source, post }) => {
            ConsoleReporter::print_final_output(&post.artifact, &post.metadata);
            println!("\n⚠️  The post was generated but could not be saved. Full artifact:\n");
            ConsoleReporter::print_unsaved_artifact(&post.artifact, &post.metadata);
            Err(GeneratorError::Persistence(source))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_examples() {
    println!("{}", ConsoleReporter::header());
    println!("{}", ConsoleReporter::section("📚 Example Topics"));

    let examples: [(&str, [&str; 5]); 4] = [
        (
            "AI & Machine Learning",
            [
                "Latest trends in Large Language Models",
                "AI agents and autonomous systems",
                "Multimodal AI applications",
                "AI safety and alignment",
                "AI in healthcare and drug discovery",
            ],
        ),
        (
            "Software Development",
            [
                "Modern web development frameworks",
                "Cloud-native architecture patterns",
                "DevOps and platform engineering trends",
                "Low-code/no-code platforms evolution",
                "Software testing automation innovations",
            ],
        ),
        (
            "Emerging Technologies",
            [
                "Quantum computing breakthroughs",
                "Edge computing and IoT",
                "Blockchain and Web3 developments",
                "AR/VR in enterprise applications",
                "5G and network innovations",
            ],
        ),
        (
            "IT Industry & Career",
            [
                "Future of remote work and collaboration",
                "Tech skills in highest demand",
                "Sustainable tech and green computing",
                "Cybersecurity trends and challenges",
                "Tech leadership and management",
            ],
        ),
    ];

    for (category, topics) in examples {
        println!("\n{category}:");
        for topic in topics {
            println!("  • {topic}");
        }
    }

    println!("\nUsage:");
    println!("  postcrew generate --topic \"Your chosen topic\"");
}

fn print_info(config_path: Option<PathBuf>) {
    println!("{}", ConsoleReporter::header());
    println!("{}", ConsoleReporter::section("🤖 Agent System Architecture"));

    for stage in Stage::ALL {
        let description = match stage {
            Stage::Research => "Performs multi-query web searches to gather current information",
            Stage::Analysis => "Synthesizes research findings and identifies key insights",
            Stage::Writing => "Crafts engaging LinkedIn posts following best practices",
            Stage::Critique => "Evaluates content quality and provides scored feedback",
            Stage::Editing => "Refines posts based on critique to maximize impact",
        };
        println!("\n{}\n   {description}", stage.agent_name());
    }

    println!("{}", ConsoleReporter::section("🔄 Workflow Process"));
    for step in [
        "1. Research: Multi-query web search for current information",
        "2. Analysis: Identify trends, insights, and narrative angles",
        "3. Writing: Create initial LinkedIn post draft",
        "4. Critique: Score the draft and list concrete improvements",
        "5. Refinement: Edit and re-critique until ready or out of iterations",
        "6. Finalization: Save the post with run metadata",
    ] {
        println!("  {step}");
    }

    match load_configuration(config_path) {
        Ok(config) => {
            println!("{}", ConsoleReporter::section("⚙️  Current Configuration"));
            println!("  Provider: {}", config.llm.provider);
            println!("  Model: {}", config.llm.model);
            println!("  Max Iterations: {}", config.pipeline.max_iterations);
            println!("  Search Queries: {}", config.search.queries_count);
            println!("  Output Directory: {}", config.output.dir.display());
        }
        Err(e) => println!("\nℹ️  Configuration unavailable: {}", e.user_message()),
    }
}

fn handle_config_command(config_path: Option<PathBuf>, show: bool) -> GeneratorResult<()> {
    let config = load_configuration(config_path)?;

    if show {
        println!("Current configuration:");
        println!("{}", config.to_toml()?);
    }

    let credentials = config.resolve_credentials()?;
    info!(credentials = ?credentials, "Credentials resolved");
    if config.search.enabled && credentials.search_api_key.is_none() {
        println!(
            "ℹ️  {} is not set; research will run without web search",
            config.search.api_key_env
        );
    }

    println!("✅ Configuration is valid");
    Ok(())
}
