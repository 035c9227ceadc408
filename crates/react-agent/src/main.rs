//! A terminal chat with a ReAct agent backed by an OpenAI-compatible API.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use react_agent::core::scratchpad::{ScratchpadEntry, Step};
use react_agent::core::{AgentErrorKind, AgentOutcome};
use react_agent::{SessionBuilder, settings};
use react_agent_openai_model::OpenAIProvider;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::sync::mpsc;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let lookup = |name: &str| env::var(name).ok();
    let provider_config = match settings::openai_config(lookup) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let agent_config = match settings::agent_config(lookup) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("provider: {provider_config:?}, agent: {agent_config:?}");

    let (step_tx, mut step_rx) = mpsc::unbounded_channel();
    let session = SessionBuilder::with_model_provider(OpenAIProvider::new(
        provider_config,
    ))
    .with_config(agent_config)
    .on_step(move |entry| {
        step_tx.send(entry.clone()).ok();
    })
    .build();
    let session = match session {
        Ok(session) => session,
        Err(err) => {
            eprintln!("failed to set up the agent: {err}");
            return;
        }
    };

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    println!(
        "Ctrl-C cancels a running turn. Ctrl-C or Ctrl-D at the prompt quits."
    );
    let mut stdin = BufReader::new(io::stdin());
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let line = match read_line(&mut stdin, tokio::signal::ctrl_c()).await {
            Input::Line(line) => line,
            Input::Eof => break,
            Input::Interrupted => {
                println!();
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));

        let mut turn = pin!(session.send_message(&line));
        let outcome = loop {
            select! {
                outcome = &mut turn => break outcome,
                Some(entry) = step_rx.recv() => {
                    progress_bar.suspend(|| print_step(&entry));
                }
                Ok(()) = tokio::signal::ctrl_c() => {
                    session.cancel();
                    progress_bar.set_message("Cancelling...");
                }
            }
        };

        // Finish the progress bar before printing anything else.
        progress_bar.finish_and_clear();
        while let Ok(entry) = step_rx.try_recv() {
            print_step(&entry);
        }
        print_outcome(&outcome);
    }
}

fn print_step(entry: &ScratchpadEntry) {
    let bar = BAR_CHAR.bright_black();
    if !entry.thought.is_empty() {
        println!("{bar}💭 {}", entry.thought.dimmed());
    }
    match &entry.step {
        Step::Tool { call, observation } => {
            println!(
                "{bar}🔧 {} {}",
                call.tool_name.bright_yellow(),
                call.argument
            );
            println!("{bar}👀 {observation}");
        }
        Step::Malformed { observation, .. } => {
            let summary = observation.lines().next().unwrap_or_default();
            println!("{bar}⚠️  {}", summary.yellow());
        }
    }
}

fn print_outcome(outcome: &AgentOutcome) {
    match outcome {
        AgentOutcome::Answer(answer) => {
            println!("{}🤖 {}", BAR_CHAR.bright_cyan(), answer.bright_white());
        }
        AgentOutcome::Error(err) if err.kind() == AgentErrorKind::Cancelled => {
            println!("{}⏹  Cancelled", BAR_CHAR.yellow());
        }
        AgentOutcome::Error(err) => {
            println!("{}❌ {}", BAR_CHAR.bright_red(), err.bright_red());
        }
    }
}

/// What the prompt produced.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Line(String),
    Eof,
    Interrupted,
}

/// Reads one line, giving up when `interrupt` fires first.
async fn read_line<R, I>(reader: &mut R, interrupt: I) -> Input
where
    R: AsyncBufRead + Unpin,
    I: Future,
{
    let mut line = String::new();
    let result = select! {
        result = reader.read_line(&mut line) => result,
        _ = interrupt => return Input::Interrupted,
    };
    match result {
        Ok(0) => Input::Eof,
        Ok(_) => Input::Line(line),
        Err(err) => {
            error!("error reading input: {}", err);
            Input::Eof
        }
    }
}
