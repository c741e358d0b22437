//! `cadv analyze` and `cadv chat` command runners.
//!
//! `chat` runs an interactive loop on stdin. Lines starting with `:` are
//! commands; anything else is a question about the selected risk. Errors
//! from a single command are printed and the loop continues with the
//! session unchanged.

use anyhow::{bail, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::models::Upload;
use crate::prompts::PromptSettings;
use crate::risk::RiskAnalysis;
use crate::scan::collect_uploads;
use crate::session::{Advisor, Session};

const HELP: &str = "\
Commands:
  :risks              list the analyzed risks
  :risk N             select risk N (1-5)
  :followups          suggest follow-up questions for the selected risk
  :ask N              ask suggested question N
  :prompts            show the system and persona prompts
  :set KEY TEXT       replace a prompt (system, contractor, owner, arbitrator)
  :reanalyze          analyze the uploaded documents again
  :help               show this help
  :quit               leave
Anything else is asked as a question about the selected risk.";

/// One line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Risks,
    Select(usize),
    FollowUps,
    AskFollowUp(usize),
    Prompts,
    SetPrompt { key: String, text: String },
    Reanalyze,
    Help,
    Quit,
    Ask(String),
    Empty,
}

/// Parse a line of chat input. Numbers are one-based on input and
/// converted to zero-based indexes.
pub fn parse_command(line: &str) -> Result<ChatCommand> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ChatCommand::Empty);
    }
    let Some(command) = line.strip_prefix(':') else {
        return Ok(ChatCommand::Ask(line.to_string()));
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(n, r)| (n, r.trim()))
        .unwrap_or((command, ""));

    match name {
        "risks" => Ok(ChatCommand::Risks),
        "risk" => Ok(ChatCommand::Select(parse_ordinal(rest)?)),
        "followups" => Ok(ChatCommand::FollowUps),
        "ask" => Ok(ChatCommand::AskFollowUp(parse_ordinal(rest)?)),
        "prompts" => Ok(ChatCommand::Prompts),
        "set" => {
            let (key, text) = rest
                .split_once(char::is_whitespace)
                .map(|(k, t)| (k, t.trim()))
                .unwrap_or((rest, ""));
            if key.is_empty() || text.is_empty() {
                bail!("usage: :set KEY TEXT");
            }
            Ok(ChatCommand::SetPrompt {
                key: key.to_string(),
                text: text.to_string(),
            })
        }
        "reanalyze" => Ok(ChatCommand::Reanalyze),
        "help" => Ok(ChatCommand::Help),
        "quit" | "exit" | "q" => Ok(ChatCommand::Quit),
        other => bail!("unknown command ':{}' (try :help)", other),
    }
}

fn parse_ordinal(text: &str) -> Result<usize> {
    match text.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => bail!("expected a number starting at 1, got '{}'", text),
    }
}

/// Apply a `:set` command to a copy of the current prompts.
pub fn with_prompt(current: &PromptSettings, key: &str, text: &str) -> Result<PromptSettings> {
    let mut prompts = current.clone();
    match key {
        "system" => prompts.system = text.to_string(),
        "contractor" => prompts.contractor = text.to_string(),
        "owner" => prompts.owner = text.to_string(),
        "arbitrator" => prompts.arbitrator = text.to_string(),
        other => bail!(
            "unknown prompt '{}'. Use system, contractor, owner or arbitrator.",
            other
        ),
    }
    Ok(prompts)
}

fn print_analysis(analysis: &RiskAnalysis) {
    if analysis.fallback {
        println!("The risk analysis could not be parsed.");
        println!("Model response: {}...", analysis.raw_excerpt());
        println!();
    }
    println!("Risk Top {}", analysis.risks.len());
    for (i, risk) in analysis.risks.iter().enumerate() {
        println!("{}. {}", i + 1, risk.title);
        for line in risk.description.lines() {
            println!("    {}", line);
        }
        println!();
    }
}

fn print_uploads(uploads: &[Upload]) {
    println!("Documents: {}", uploads.len());
    for upload in uploads {
        println!("  - {}: {}", upload.category.label(), upload.filename);
    }
    println!();
}

async fn start_session(
    config: &Config,
    input_dir: Option<&Path>,
    files: &[String],
) -> Result<Session> {
    let uploads = collect_uploads(input_dir, files, &config.input)?;
    if uploads.is_empty() {
        bail!("No documents found. Pass --input DIR or --file CATEGORY=PATH.");
    }
    print_uploads(&uploads);

    let advisor = Arc::new(Advisor::from_config(config).await?);
    let mut session = Session::new(advisor, PromptSettings::from(&config.prompts));
    for upload in uploads {
        session.add_upload(upload);
    }
    Ok(session)
}

/// `cadv analyze`: extract, index and print the top risks.
pub async fn run_analyze(
    config: &Config,
    input_dir: Option<&Path>,
    files: &[String],
) -> Result<()> {
    let mut session = start_session(config, input_dir, files).await?;
    let analysis = session.analyze().await?;
    print_analysis(&analysis);
    println!("ok");
    Ok(())
}

/// `cadv chat`: analyze, then answer questions interactively.
pub async fn run_chat(config: &Config, input_dir: Option<&Path>, files: &[String]) -> Result<()> {
    let mut session = start_session(config, input_dir, files).await?;
    let analysis = session.analyze().await?;
    print_analysis(&analysis);
    println!("Select a risk with :risk N, then ask questions. :help lists commands.");

    let interactive = atty::is(atty::Stream::Stdin);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            print!("{}> ", session.state());
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("error: {}", e);
                continue;
            }
        };
        if command == ChatCommand::Quit {
            break;
        }
        if let Err(e) = handle_command(&mut session, command).await {
            println!("error: {}", e);
        }
    }

    Ok(())
}

async fn handle_command(session: &mut Session, command: ChatCommand) -> Result<()> {
    match command {
        ChatCommand::Empty | ChatCommand::Quit => {}
        ChatCommand::Help => println!("{}", HELP),
        ChatCommand::Risks => {
            let selected = session.selected_risk().map(|(i, _)| i);
            for (i, risk) in session.risks().iter().enumerate() {
                let marker = if Some(i) == selected { "*" } else { " " };
                println!("{} {}. {}", marker, i + 1, risk.title);
            }
        }
        ChatCommand::Select(index) => {
            let risk = session.select_risk(index)?;
            println!("Selected: {}", risk.title);
            println!("{}", risk.description);
            println!();
            if let Some(last) = session.transcript().last() {
                println!("{}", last.content);
            }
        }
        ChatCommand::Ask(question) => {
            let answer = session.ask(&question).await?;
            println!("{}", answer);
            println!();
        }
        ChatCommand::FollowUps => {
            let questions = session.follow_up_questions().await?;
            if questions.is_empty() {
                println!("No suggestions yet. Ask a question first.");
            }
            for (i, question) in questions.iter().enumerate() {
                println!("{}. {}", i + 1, question);
            }
        }
        ChatCommand::AskFollowUp(index) => {
            let questions = session.follow_up_questions().await?;
            let Some(question) = questions.get(index).cloned() else {
                bail!("no suggested question {}", index + 1);
            };
            println!("> {}", question);
            let answer = session.ask(&question).await?;
            println!("{}", answer);
            println!();
        }
        ChatCommand::Prompts => {
            let prompts = session.prompts();
            println!("[system]\n{}\n", prompts.system);
            println!("[contractor]\n{}\n", prompts.contractor);
            println!("[owner]\n{}\n", prompts.owner);
            println!("[arbitrator]\n{}", prompts.arbitrator);
        }
        ChatCommand::SetPrompt { key, text } => {
            let prompts = with_prompt(session.prompts(), &key, &text)?;
            session.update_prompts(prompts);
            println!("Prompt '{}' updated.", key);
        }
        ChatCommand::Reanalyze => {
            let analysis = session.analyze().await?;
            print_analysis(&analysis);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            parse_command("  Who pays for the delay?  ").unwrap(),
            ChatCommand::Ask("Who pays for the delay?".to_string())
        );
        assert_eq!(parse_command("   ").unwrap(), ChatCommand::Empty);
    }

    #[test]
    fn risk_numbers_are_one_based() {
        assert_eq!(parse_command(":risk 1").unwrap(), ChatCommand::Select(0));
        assert_eq!(parse_command(":ask 3").unwrap(), ChatCommand::AskFollowUp(2));
        assert!(parse_command(":risk 0").is_err());
        assert!(parse_command(":risk two").is_err());
    }

    #[test]
    fn set_takes_key_and_text() {
        assert_eq!(
            parse_command(":set owner Argue for the employer.").unwrap(),
            ChatCommand::SetPrompt {
                key: "owner".to_string(),
                text: "Argue for the employer.".to_string(),
            }
        );
        assert!(parse_command(":set owner").is_err());
    }

    #[test]
    fn unknown_command_is_rejected() {
        let err = parse_command(":frobnicate").unwrap_err();
        assert!(err.to_string().contains("unknown command"));
        assert_eq!(parse_command(":q").unwrap(), ChatCommand::Quit);
    }

    #[test]
    fn with_prompt_replaces_one_field() {
        let current = PromptSettings::default();
        let updated = with_prompt(&current, "arbitrator", "Be neutral.").unwrap();
        assert_eq!(updated.arbitrator, "Be neutral.");
        assert_eq!(updated.system, current.system);
        assert!(with_prompt(&current, "judge", "x").is_err());
    }
}
