use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use cipherforge::config::ScoringWeights;
use cipherforge::scorer::Scorer;
use std::process;
use std::sync::Arc;
use tracing::{info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// N-gram TSV file(s) replacing the embedded English tables
    #[arg(global = true, long)]
    ngrams: Vec<String>,

    /// Scoring weights JSON
    #[arg(global = true, long)]
    weights: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Brute-force a ciphertext
    Crack(cmd::crack::CrackArgs),
    Encrypt(cmd::encrypt::EncryptArgs),
    Decrypt(cmd::encrypt::DecryptArgs),
    /// Score a text with every method
    Analyze(cmd::analyze::AnalyzeArgs),
}

fn build_scorer(cli: &Cli, cli_weights: &ScoringWeights, sub_matches: Option<&ArgMatches>) -> Arc<Scorer> {
    // A. Weights: JSON file as the base, explicit CLI flags on top
    let weights = match &cli.weights {
        Some(path) => {
            info!("Loading weights from {}", path);
            let mut file_weights = ScoringWeights::load_from_file(path)
                .unwrap_or_else(|e| cmd::fail("Cannot load weights", e));
            if let Some(m) = sub_matches {
                file_weights.merge_from_cli(cli_weights, m);
            }
            file_weights
        }
        None => cli_weights.clone(),
    };

    // B. Reference tables
    let scorer = if cli.ngrams.is_empty() {
        Scorer::new(weights)
    } else {
        info!("Loading n-grams from {}", cli.ngrams.join(", "));
        Scorer::from_ngram_files(&cli.ngrams, weights)
    };

    match scorer {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("\n❌ FATAL ERROR INITIALIZING SCORER:");
            eprintln!("   {}", e);
            process::exit(1);
        }
    }
}

fn main() {
    // 1. Parse Raw Matches (to distinguish user input from defaults)
    let matches = Cli::command().get_matches();

    // 2. Construct CLI struct (populated with defaults)
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    // 3. Logging goes to stderr; stdout carries results
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // 4. Execute
    match &cli.command {
        Commands::Crack(args) => {
            let scorer = build_scorer(
                &cli,
                &args.config.weights,
                matches.subcommand_matches("crack"),
            );
            cmd::crack::run(args.clone(), scorer);
        }
        Commands::Analyze(args) => {
            let scorer = build_scorer(&cli, &args.weights, matches.subcommand_matches("analyze"));
            cmd::analyze::run(args.clone(), &scorer);
        }
        Commands::Encrypt(args) => cmd::encrypt::run_encrypt(args.clone()),
        Commands::Decrypt(args) => cmd::encrypt::run_decrypt(args.clone()),
    }
}
