// CLI module for ai-completion
// Author: kelexine (https://github.com/kelexine)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ai-completion - chat with a completion API, keeping history in a local cache
#[derive(Parser, Debug)]
#[command(name = "ai-completion", version, about, long_about = None)]
pub struct Args {
    /// Config file (default: ~/.ai-completion/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache namespace isolating this session's history and counters
    #[arg(long, short = 'n', global = true)]
    pub namespace: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a message and stream the reply to stdout
    Ask {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Use the assistant saved in the cache instead of the configured one
        #[arg(long)]
        use_saved: bool,

        /// Never append the advertisement text to the system message
        #[arg(long)]
        no_advertisement: bool,
    },

    /// Print the cached conversation
    History {
        /// Only the last N records
        #[arg(long)]
        last: Option<usize>,
    },

    /// Print the token usage status line
    Tokens,

    /// Drop the oldest N history lines
    Drop {
        #[arg(default_value_t = crate::cache::DEFAULT_DROP_COUNT)]
        count: usize,
    },

    /// Clear history and token counters
    Reset,

    /// Show the saved assistant, or save the configured one
    Assistant {
        #[arg(long)]
        save: bool,
    },

    /// Print the effective configuration (secrets omitted)
    Config,
}

impl Args {
    /// The message of an `ask` command as one string.
    pub fn joined(text: &[String]) -> String {
        text.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_global_flags() {
        let args = Args::parse_from([
            "ai-completion",
            "ask",
            "hello",
            "there",
            "--namespace",
            "proj",
            "--no-advertisement",
        ]);

        assert_eq!(args.namespace.as_deref(), Some("proj"));
        match args.command {
            Command::Ask {
                text,
                use_saved,
                no_advertisement,
            } => {
                assert_eq!(Args::joined(&text), "hello there");
                assert!(!use_saved);
                assert!(no_advertisement);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_drop_defaults_to_four() {
        let args = Args::parse_from(["ai-completion", "drop"]);
        assert!(matches!(args.command, Command::Drop { count: 4 }));
    }
}
