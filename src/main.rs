//! CLI entry point for storyscroll
//!
//! Plays a story file in the terminal.

use std::path::PathBuf;
use std::process;
use storyscroll::infrastructure::StoryFile;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storyscroll=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "play" => {
            if args.len() < 3 {
                eprintln!("Error: Missing story file path");
                eprintln!();
                print_usage();
                process::exit(1);
            }
            let file_path = PathBuf::from(&args[2]);
            let debug = args.get(3).map(|s| s == "--debug").unwrap_or(false);
            if let Err(err) = run_play(file_path, debug).await {
                eprintln!("Error: {:#}", err);
                process::exit(1);
            }
        }
        "--help" | "-h" => {
            print_usage();
        }
        _ => {
            eprintln!("Error: Unknown command '{}'", command);
            eprintln!();
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("storyscroll - Scroll-driven story player");
    println!();
    println!("USAGE:");
    println!("    storyscroll play <story.json> [--debug]");
    println!();
    println!("COMMANDS:");
    println!("    play <file> [--debug]    Play a story in the terminal");
    println!("    --help, -h               Show this help message");
    println!();
    println!("OPTIONS:");
    println!("    --debug    Enable the developer shortcuts (solve, unlock, jump)");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG             Log filter, default storyscroll=info");
    println!("    STORYSCROLL_DEBUG    Enable the developer shortcuts");
}

async fn run_play(file_path: PathBuf, debug: bool) -> anyhow::Result<()> {
    let story = StoryFile::load(&file_path).await?;
    storyscroll::cli::run_play(story, debug).await
}
