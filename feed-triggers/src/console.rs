//! Line commands accepted by `feed-triggers run` on stdin.

use clap::{Parser, Subcommand};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Status,
    #[command(alias = "ls")]
    List,
    /// Without an id, every trigger.
    Start { id: Option<String> },
    Stop { id: Option<String> },
    Test { id: String, max_items: Option<usize> },
    Help,
    #[command(alias = "exit")]
    Quit,
}

#[derive(Parser, Debug)]
#[command(
    name = "console",
    no_binary_name = true,
    disable_help_flag = true,
    disable_help_subcommand = true
)]
struct ConsoleLine {
    #[command(subcommand)]
    command: ConsoleCommand,
}

pub const HELP: &str = "commands: status | list | start [ID] | stop [ID] | test ID [MAX_ITEMS] | help | quit";

impl ConsoleCommand {
    /// `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args = std::iter::once(verb.to_lowercase()).chain(words.map(str::to_string));
        ConsoleLine::try_parse_from(args)
            .map(|parsed| Some(parsed.command))
            .map_err(|e| format!("{}\n{}", e.to_string().trim_end(), HELP))
    }
}
