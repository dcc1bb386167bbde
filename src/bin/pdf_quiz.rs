use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pdf_quiz::client::QuizClient;
use pdf_quiz::clients::claude::{ClaudeClient, ClaudeConfig, ClaudeModel};
use pdf_quiz::composer::{QuizRequestComposer, SelectedFile, SelectionSource};
use pdf_quiz::config::{KeyFromEnv, ServerConfig};
use pdf_quiz::core::{LowLevelClient, QuizGenerator};
use pdf_quiz::quiz::{AnswerLetter, QuestionCount};
use pdf_quiz::renderer::{FinishedQuiz, QuizRenderer, RenderState};
use pdf_quiz::server::{app, AppState};
use pdf_quiz::session::QuizSession;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about = "Generate multiple-choice quizzes from PDFs", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    ANTHROPIC_API_KEY       API key for the model (required by `serve`)
    QUIZ_BIND_ADDR          Address to listen on [default: 0.0.0.0:3000]
    QUIZ_MODEL              Model alias or id [default: claude-sonnet-4-20250514]
    QUIZ_MAX_TOKENS         Output token limit [default: 8192]
    QUIZ_MAX_DURATION_SECS  Generation time limit [default: 60]
    RUST_LOG                Log filter [default: pdf_quiz=info,tower_http=info]

EXAMPLES:
    pdf-quiz serve
    pdf-quiz generate syllabus.pdf --questions 5
    pdf-quiz generate notes.pdf --server http://localhost:3000 --take")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Model alias (sonnet-4, opus-4, haiku-3.5) or full model id
        #[arg(long)]
        model: Option<String>,
        /// Maximum seconds a single quiz generation may take
        #[arg(long)]
        max_duration: Option<u64>,
    },
    /// Upload PDFs to a running server and render the quiz as it streams
    Generate {
        /// PDF files; the first one is used for the quiz
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Number of questions (3, 4, 5, 6, 8 or 10)
        #[arg(short, long, default_value_t = 4)]
        questions: u32,
        /// Server base URL
        #[arg(long, default_value = "http://localhost:3000")]
        server: String,
        /// Take the quiz interactively once it is ready
        #[arg(long)]
        take: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_quiz=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Args::parse().command {
        Command::Serve { bind, model, max_duration } => serve(bind, model, max_duration).await,
        Command::Generate { files, questions, server, take } => generate(files, questions, server, take).await,
    }
}

async fn serve(bind: Option<SocketAddr>, model: Option<String>, max_duration: Option<u64>) -> Result<()> {
    let mut config = ServerConfig::from_env().map_err(anyhow::Error::msg)?;
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    if let Some(model) = model {
        config.model = ClaudeModel::from_name(&model);
    }
    if let Some(secs) = max_duration {
        config.max_duration = Duration::from_secs(secs);
    }

    let api_key = ClaudeClient::find_key()
        .with_context(|| format!("{} must be set to serve quizzes", ClaudeClient::KEY_NAME))?;
    let claude = ClaudeClient::new(
        ClaudeConfig::anthropic(api_key, config.model.clone()).with_max_tokens(config.max_tokens),
    );
    let client: Box<dyn LowLevelClient> = Box::new(claude);
    let state = AppState::new(QuizGenerator::new(client, config.generator_config()));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, model = %config.model, "pdf-quiz API listening");

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}

async fn generate(files: Vec<PathBuf>, questions: u32, server: String, take: bool) -> Result<()> {
    let count = QuestionCount::new(questions)?;

    let mut selected = Vec::with_capacity(files.len());
    for path in &files {
        let file = SelectedFile::from_path(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        selected.push(file);
    }

    let mut composer = QuizRequestComposer::new();
    composer.set_question_count(count);
    if let Some(notice) = composer.select(selected, SelectionSource::Picker) {
        eprintln!("{}", notice.message());
    }
    if !composer.can_submit() {
        bail!("no valid PDF selected");
    }

    let client = QuizClient::new(server);
    let mut renderer = QuizRenderer::new();
    let mut last_status = String::new();

    let quiz = client
        .generate(&mut composer, &mut renderer, |state| {
            if let RenderState::Generating(progress) = state {
                let line = format!("[{:>3.0}%] {}", progress.percent(), progress.status());
                if line != last_status {
                    eprintln!("{line}");
                    last_status = line;
                }
            }
        })
        .await;

    let Some(quiz) = quiz else {
        bail!(renderer.notice().unwrap_or("quiz generation failed"));
    };

    if take {
        take_quiz(quiz).await
    } else {
        print_quiz(&quiz);
        Ok(())
    }
}

fn print_quiz(quiz: &FinishedQuiz) {
    println!("# {}\n", quiz.title);
    for (i, q) in quiz.questions.iter().enumerate() {
        println!("{}. {}", i + 1, q.question);
        for (letter, option) in AnswerLetter::ALL.iter().zip(&q.options) {
            println!("   {letter}) {option}");
        }
        println!();
    }
    let key: Vec<String> = quiz.questions.iter().enumerate().map(|(i, q)| format!("{}{}", i + 1, q.answer)).collect();
    println!("Answer key: {}", key.join(" "));
}

async fn take_quiz(quiz: FinishedQuiz) -> Result<()> {
    let mut session = QuizSession::new(quiz);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("# {}\n", session.title());
    loop {
        let Some(question) = session.current() else { break };
        println!("{}. {}", session.current_index() + 1, question.question);
        for (letter, option) in AnswerLetter::ALL.iter().zip(&question.options) {
            println!("   {letter}) {option}");
        }
        print!("Your answer (A-D): ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else { break };
        match AnswerLetter::parse(&line) {
            Some(letter) => {
                session.select_answer(letter);
                if !session.next() {
                    break;
                }
            }
            None => println!("Please answer with A, B, C or D."),
        }
    }

    if !session.submit() {
        bail!("quiz abandoned before every question was answered");
    }

    println!("\nScore: {}/{} ({:.0}%)", session.score(), session.len(), session.percent());
    for (i, review) in session.review().iter().enumerate() {
        let mark = if review.correct { "correct" } else { "wrong" };
        println!(
            "{}. {} (answer {}: {})",
            i + 1,
            mark,
            review.question.answer,
            review.question.correct_option()
        );
    }
    Ok(())
}
