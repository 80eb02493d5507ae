//! CLI binary for quizify.
//!
//! A thin shim over the library crate that maps CLI flags to `QuizConfig`
//! and dispatches to one of three modes: one-shot generation, the local web
//! server, or replaying a storage notification.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use quizify::pipeline::input;
use quizify::server::{self, AppState};
use quizify::{
    check_content_length, extract, handle_storage_event, open_store, Difficulty,
    LocalObjectStore, Pipeline, QuestionGenerator, QuestionSet, QuizConfig, StorageEvent,
    StoreBackend,
};
use std::io::{self, Write};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Questions from a local file
  quizify generate lecture-notes.pdf

  # Three MCQs and two short questions, JSON output
  quizify --mcqs 3 --shorts 2 generate notes.docx --json > questions.json

  # From a URL, forcing the topic
  quizify generate https://example.org/notes.txt --topic "Cell Biology"

  # Local web server backed by SQLite, serving a frontend from ./static
  quizify serve --port 5000 --db quizify.db --static-dir static

  # Replay an object-storage notification against local storage
  quizify event s3-event.json --objects-dir ./objects

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides --verbose / --quiet
"#;

/// Generate exam questions from study notes using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "quizify",
    version,
    about = "Generate exam questions from PDF, DOCX and TXT study notes",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Multiple-choice questions per document.
    #[arg(long, global = true, env = "QUIZIFY_MCQS", default_value_t = 5)]
    mcqs: usize,

    /// Short-answer questions per document.
    #[arg(long, global = true, env = "QUIZIFY_SHORTS", default_value_t = 5)]
    shorts: usize,

    /// LLM model ID (e.g. gemini-2.5-flash, gpt-4.1-mini).
    /// Required with --provider unless it is gemini or openai.
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "QUIZIFY_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, global = true, env = "QUIZIFY_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Maximum characters of source text sent to the provider.
    #[arg(long, global = true, env = "QUIZIFY_MAX_SOURCE_CHARS", default_value_t = 30_000)]
    max_source_chars: usize,

    /// Provider call timeout in seconds.
    #[arg(long, global = true, env = "QUIZIFY_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Path to libpdfium (file or directory).
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "QUIZIFY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "QUIZIFY_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate questions for one local file or URL and print them.
    Generate {
        /// Local file path or HTTP/HTTPS URL (.pdf, .docx, .doc, .txt).
        input: String,

        /// Use this topic instead of the one the model detects.
        #[arg(long)]
        topic: Option<String>,

        /// Print the question set as JSON.
        #[arg(long, env = "QUIZIFY_JSON")]
        json: bool,

        /// HTTP download timeout in seconds.
        #[arg(long, env = "QUIZIFY_DOWNLOAD_TIMEOUT", default_value_t = 120)]
        download_timeout: u64,
    },

    /// Run the local web server.
    Serve {
        #[arg(long, env = "QUIZIFY_HOST", default_value = "127.0.0.1")]
        host: IpAddr,

        #[arg(long, env = "QUIZIFY_PORT", default_value_t = 5000)]
        port: u16,

        /// Directory served for any path the API does not handle.
        #[arg(long, env = "QUIZIFY_STATIC_DIR")]
        static_dir: Option<PathBuf>,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Process an object-storage notification read from a JSON file.
    Event {
        /// Notification JSON (`{"Records": [...]}`).
        event: PathBuf,

        #[command(flatten)]
        storage: StorageArgs,
    },
}

#[derive(Args, Debug)]
struct StorageArgs {
    /// SQLite database file.
    #[arg(long, env = "QUIZIFY_DB", default_value = "quizify.db")]
    db: PathBuf,

    /// Keep uploads and questions in memory only.
    #[arg(long, env = "QUIZIFY_MEMORY", conflicts_with = "db")]
    memory: bool,

    /// Root directory of the local object store.
    #[arg(long, env = "QUIZIFY_OBJECTS_DIR", default_value = "objects")]
    objects_dir: PathBuf,
}

impl StorageArgs {
    fn backend(&self) -> StoreBackend {
        if self.memory {
            StoreBackend::Memory
        } else {
            StoreBackend::Sqlite(self.db.clone())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    match cli.command {
        Command::Generate {
            ref input,
            ref topic,
            json,
            download_timeout,
        } => {
            let generator = QuestionGenerator::from_config(config)
                .context("No LLM provider available")?;
            let document = input::resolve_input(input, download_timeout)
                .await
                .with_context(|| format!("Failed to read {input}"))?;
            let text = extract(&document, generator.config())
                .await
                .with_context(|| format!("Failed to extract text from {}", document.filename))?;
            check_content_length(&text, generator.config().min_text_chars)?;
            let questions = generator
                .generate(&text.content, cli.mcqs, cli.shorts, topic.as_deref())
                .await
                .context("Question generation failed")?;

            if json {
                let out = serde_json::to_string_pretty(&questions)
                    .context("Failed to serialise questions")?;
                println!("{out}");
            } else {
                print_questions(&questions).context("Failed to write to stdout")?;
            }
            if !cli.quiet && !json {
                eprintln!(
                    "{} {} questions from {} characters of {}",
                    green("✔"),
                    questions.total_questions(),
                    text.char_count(),
                    document.filename
                );
            }
        }

        Command::Serve {
            host,
            port,
            ref static_dir,
            ref storage,
        } => {
            let pipeline = build_pipeline(config, storage)?;
            let objects = Arc::new(LocalObjectStore::new(&storage.objects_dir));
            let app = server::router(AppState::new(pipeline, objects), static_dir.clone());
            let addr = SocketAddr::new(host, port);
            if !cli.quiet {
                eprintln!("{} Quizify server on {}", cyan("◆"), bold(&format!("http://{addr}")));
            }
            server::serve(addr, app).await.context("Server error")?;
        }

        Command::Event {
            ref event,
            ref storage,
        } => {
            let raw = tokio::fs::read_to_string(event)
                .await
                .with_context(|| format!("Failed to read event from {}", event.display()))?;
            let event: StorageEvent =
                serde_json::from_str(&raw).context("Event is not valid notification JSON")?;
            let pipeline = build_pipeline(config, storage)?;
            let objects = LocalObjectStore::new(&storage.objects_dir);
            let outcome = handle_storage_event(&event, &objects, &pipeline)
                .await
                .context("Event processing failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("Failed to serialise outcome")?
            );
        }
    }

    Ok(())
}

/// Map CLI args to `QuizConfig`.
fn build_config(cli: &Cli) -> Result<QuizConfig> {
    if cli.mcqs > 50 || cli.shorts > 50 {
        bail!("At most 50 questions of each kind can be requested");
    }
    let mut builder = QuizConfig::builder()
        .mcq_count(cli.mcqs)
        .short_count(cli.shorts)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_source_chars(cli.max_source_chars)
        .api_timeout_secs(cli.api_timeout);
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }
    if let Command::Generate {
        download_timeout, ..
    } = cli.command
    {
        builder = builder.download_timeout_secs(download_timeout);
    }
    builder.build().context("Invalid configuration")
}

/// The server and the event handler start even without credentials; each
/// upload then fails with a provider-unavailable message.
fn build_pipeline(config: QuizConfig, storage: &StorageArgs) -> Result<Pipeline> {
    let store = open_store(&storage.backend()).context("Failed to open store")?;
    let generator = QuestionGenerator::from_config_lenient(config);
    Ok(Pipeline::new(generator, store))
}

fn print_questions(set: &QuestionSet) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "{}", bold(&format!("Topic: {}", set.topic)))?;

    if !set.mcqs.is_empty() {
        writeln!(out, "\n{}", bold("Multiple choice"))?;
        for (i, mcq) in set.mcqs.iter().enumerate() {
            writeln!(out, "\n{}. {}", i + 1, mcq.question)?;
            for option in &mcq.options {
                writeln!(out, "   {option}")?;
            }
            if !mcq.correct_answer.is_empty() {
                writeln!(out, "   {} {}", green("Answer:"), mcq.correct_answer)?;
            }
            if !mcq.explanation.is_empty() {
                writeln!(out, "   {}", dim(&mcq.explanation))?;
            }
        }
    }

    if !set.short_questions.is_empty() {
        writeln!(out, "\n{}", bold("Short answer"))?;
        for (i, sq) in set.short_questions.iter().enumerate() {
            let level = match sq.difficulty {
                Difficulty::Easy => green(sq.difficulty.as_str()),
                Difficulty::Medium => cyan(sq.difficulty.as_str()),
                Difficulty::Hard => bold(sq.difficulty.as_str()),
            };
            writeln!(out, "\n{}. {} [{}]", i + 1, sq.question, level)?;
            for point in &sq.expected_points {
                writeln!(out, "   - {point}")?;
            }
        }
    }
    Ok(())
}
