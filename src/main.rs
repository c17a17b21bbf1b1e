// ai-completion - Local chat cache and completion request layer
// Author: kelexine (https://github.com/kelexine)

use ai_completion::cache::{Cacher, Record, TokenCounters, DEFAULT_DROP_COUNT};
use ai_completion::cli::{Args, Command};
use ai_completion::config::AppConfig;
use ai_completion::error::CompletionError;
use ai_completion::models::AssistantSettings;
use ai_completion::network::{NetworkClient, StreamEvent, StreamingResponse};
use ai_completion::request::RequestBuilder;
use ai_completion::utils::logging;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tracing::{debug, info, warn};

/// How many times `ask` prunes history and retries after the provider
/// reports the context is too long.
const MAX_PRUNE_ATTEMPTS: usize = 3;

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(namespace) = args.namespace {
        config.cache.namespace = Some(namespace);
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    debug!("Starting ai-completion v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Open the cache for this namespace
    let cacher = Cacher::from_config(&config.cache)
        .with_context(|| format!("failed to open cache at {}", config.cache.root))?;

    match args.command {
        Command::Ask {
            text,
            use_saved,
            no_advertisement,
        } => {
            let assistant = if use_saved {
                cacher
                    .read_assistant()?
                    .unwrap_or_else(|| config.assistant.clone())
            } else {
                config.assistant.clone()
            };
            ask(&config, &cacher, &assistant, Args::joined(&text), no_advertisement)?;
        }
        Command::History { last } => {
            let history = match last {
                Some(n) => cacher.read_last(n)?,
                None => cacher.read_all()?,
            };
            for record in &history.records {
                println!("{:?}: {}", record.role, record.content);
            }
            if !history.is_clean() {
                eprintln!(
                    "warning: {} history lines could not be read",
                    history.skipped.len()
                );
            }
        }
        Command::Tokens => {
            println!("{}", cacher.read_tokens_count()?.status_message());
        }
        Command::Drop { count } => {
            cacher.drop_first(count)?;
        }
        Command::Reset => {
            cacher.drop_all()?;
            cacher.reset_tokens_count()?;
            info!("Cleared history and token counters");
        }
        Command::Assistant { save } => {
            if save {
                cacher.save_assistant(&config.assistant)?;
                println!("Saved assistant {:?}", config.assistant.name);
            } else {
                match cacher.read_assistant()? {
                    Some(assistant) => print!("{}", toml::to_string_pretty(&assistant)?),
                    None => println!("No assistant saved"),
                }
            }
        }
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// One exchange: build, send, stream, then record the turn.
fn ask(
    config: &AppConfig,
    cacher: &Cacher,
    assistant: &AssistantSettings,
    text: String,
    no_advertisement: bool,
) -> Result<()> {
    let question = Record::user(text);
    let mut attempts = 0;

    let reply = loop {
        let mut builder =
            RequestBuilder::new(cacher).with_advertisement_text(&config.request.advertisement_text);
        if no_advertisement {
            builder = builder.with_gate(false);
        }
        let payload = builder.prepare_payload(assistant, std::slice::from_ref(&question))?;

        let mut client = NetworkClient::new(&config.network, assistant)?;
        client.send(payload.body)?;
        let outcome = match client.receive() {
            Ok(stream) => print_stream(stream),
            Err(e) => Err(e),
        };
        client.close();

        match outcome {
            Ok(reply) => break reply,
            Err(e)
                if e.is_context_length_exceeded()
                    && assistant.prompt_mode.merges_history()
                    && attempts < MAX_PRUNE_ATTEMPTS =>
            {
                attempts += 1;
                warn!(
                    "{}; dropping the oldest {} history lines (attempt {}/{})",
                    e, DEFAULT_DROP_COUNT, attempts, MAX_PRUNE_ATTEMPTS
                );
                cacher.drop_first(DEFAULT_DROP_COUNT)?;
            }
            Err(e) => return Err(e.into()),
        }
    };
    println!();

    let answer = Record::assistant(reply);
    cacher.accumulate_tokens(&TokenCounters::completion(answer.approx_tokens()))?;
    if assistant.prompt_mode.merges_history() {
        cacher.append_batch(&[question, answer])?;
    }

    debug!("{}", cacher.read_tokens_count()?.status_message());
    Ok(())
}

/// Echo deltas as they arrive and return the full reply.
fn print_stream(stream: &mut StreamingResponse) -> std::result::Result<String, CompletionError> {
    let mut stdout = std::io::stdout().lock();
    let mut reply = String::new();

    for event in stream.events() {
        if let StreamEvent::Delta(delta) = event? {
            stdout.write_all(delta.as_bytes())?;
            stdout.flush()?;
            reply.push_str(&delta);
        }
    }

    Ok(reply)
}
