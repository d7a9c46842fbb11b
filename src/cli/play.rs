//! Terminal player
//!
//! Runs a story file with the console surfaces and silent audio. The arrow,
//! the dialogue continue button and the developer shortcuts are typed
//! commands.

use crate::app::{Capabilities, Journey};
use crate::cli::console::{ConsoleDialogue, ConsoleSurface};
use crate::config::StoryConfig;
use crate::infrastructure::memory::{MemoryAudioBackend, MemoryRenderer};
use crate::infrastructure::story::StoryFile;
use crate::progression::Advance;
use crate::puzzles::Attempt;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enter: continue the dialogue or press the arrow
    Next,
    /// Option number, 1-based as printed
    Choose(usize),
    /// Answer to a code-word challenge
    Say(String),
    Solve(String),
    Unlock,
    Jump(String),
    Stone,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let (word, rest) = match input.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (input, ""),
        };
        match (word, rest) {
            ("", _) => Command::Next,
            ("q" | "quit", "") => Command::Quit,
            ("h" | "help", "") => Command::Help,
            ("unlock", "") => Command::Unlock,
            ("stone", "") => Command::Stone,
            ("say", text) if !text.is_empty() => Command::Say(text.to_string()),
            ("solve", id) if !id.is_empty() => Command::Solve(id.to_string()),
            ("jump", id) if !id.is_empty() => Command::Jump(id.to_string()),
            (number, "") => match number.parse::<usize>() {
                Ok(n) if n > 0 => Command::Choose(n),
                _ => Command::Unknown(input.to_string()),
            },
            _ => Command::Unknown(input.to_string()),
        }
    }
}

/// Run the player until the reader quits or stdin closes
pub async fn run_play(story: StoryFile, debug: bool) -> anyhow::Result<()> {
    let surface = Arc::new(ConsoleSurface::new(story));
    let title = surface.title().unwrap_or("storyscroll").to_string();
    let capabilities = Capabilities {
        surface,
        dialogue: Arc::new(ConsoleDialogue),
        audio: Arc::new(MemoryAudioBackend::default()),
        renderer: Arc::new(MemoryRenderer::default()),
    };
    let mut config = StoryConfig::default();
    if debug {
        config = config.with_debug(true);
    }
    let journey = Journey::new(config, capabilities);
    journey.initialize();

    println!("=== {} ===", title);
    println!();
    print_help(journey.store.debug_mode());
    println!();
    println!("Press Enter to start...");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    if lines.next_line().await?.is_none() {
        return Ok(());
    }
    journey.start();

    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Command::Quit => break,
            Command::Help => print_help(journey.store.debug_mode()),
            Command::Next => next(&journey).await,
            Command::Choose(n) => choose(&journey, n - 1),
            Command::Say(text) => say(&journey, &text),
            Command::Solve(id) => match journey.debug.complete_challenge(&id) {
                Ok(id) => println!("(debug) '{}' completed", id),
                Err(err) => println!("(debug) {}", err),
            },
            Command::Unlock => match journey.debug.force_unlock() {
                Ok(()) => println!("(debug) unlocked"),
                Err(err) => println!("(debug) {}", err),
            },
            Command::Jump(id) => match journey.debug.jump_to_section(&id).await {
                Ok(index) => println!("(debug) at section {}", index),
                Err(err) => println!("(debug) {}", err),
            },
            Command::Stone => {
                let cinematics = journey.cinematics.clone();
                journey.scheduler.spawn(async move {
                    if let Ok(false) = cinematics.use_stone().await {
                        println!("Nothing happens.");
                    }
                });
            }
            Command::Unknown(input) => println!("Unknown command '{}', type 'help'", input),
        }
    }

    journey.reset();
    println!("Goodbye!");
    Ok(())
}

async fn next(journey: &Journey) {
    if journey.dialogue.is_active() {
        journey.dialogue.advance();
        return;
    }
    match journey.progression.attempt_advance().await {
        Ok(Advance::Blocked(challenge)) => present(journey, &challenge),
        Ok(Advance::Refused) => {
            if let Some(challenge) = journey.store.current_challenge() {
                present(journey, &challenge);
            }
        }
        Ok(Advance::End) => println!("== THE END =="),
        Ok(Advance::Moved(_)) | Ok(Advance::InTransit) => {}
        Err(err) => println!("{}", err),
    }
}

/// Print what the blocking challenge asks for; a finished scored quiz
/// moves on from its score screen
fn present(journey: &Journey, challenge: &str) {
    let puzzles = journey.puzzles();
    if let Some(quiz) = puzzles.quiz(challenge) {
        if let Some(question) = quiz.question() {
            println!("  ? {}", question.prompt);
            for (i, option) in question.options.iter().enumerate() {
                println!("    {}. {}", i + 1, option);
            }
        } else if let Some((correct, total)) = quiz.score() {
            println!("  {}/{}", correct, total);
            quiz.continue_on();
        }
    } else if puzzles.code_word(challenge).is_some() {
        println!("  ? type 'say <word>'");
    } else {
        println!("  ? '{}' cannot be played here", challenge);
    }
}

fn choose(journey: &Journey, index: usize) {
    if journey.dialogue.has_choice() {
        journey.dialogue.choose(index);
        return;
    }
    let Some(challenge) = journey.store.current_challenge() else {
        println!("Nothing to choose");
        return;
    };
    let puzzles = journey.puzzles();
    let Some(quiz) = puzzles.quiz(&challenge) else {
        println!("Nothing to choose");
        return;
    };
    match quiz.answer(index) {
        Attempt::Solved | Attempt::Incomplete => {}
        Attempt::Rejected => println!("  x"),
        Attempt::Ignored => println!("Not now"),
    }
}

fn say(journey: &Journey, text: &str) {
    let puzzles = journey.puzzles();
    let puzzle = journey
        .store
        .current_challenge()
        .and_then(|challenge| puzzles.code_word(&challenge));
    match puzzle {
        Some(puzzle) => {
            puzzle.submit(text);
        }
        None => println!("Nobody is listening"),
    }
}

fn print_help(debug: bool) {
    println!("Controls:");
    println!("  Enter:       continue");
    println!("  1-9:         pick an option");
    println!("  say <word>:  answer a code-word challenge");
    println!("  stone:       touch the stone");
    println!("  q:           quit");
    if debug {
        println!("Debug:");
        println!("  solve <id>   complete a challenge");
        println!("  unlock       lift the scroll lock");
        println!("  jump <id>    go to a section");
    }
}
