use super::read_input;
use crate::reports;
use cipherforge::config::ScoringWeights;
use cipherforge::scorer::{Scorer, ScoringMethod};
use clap::Args;
use strum::IntoEnumIterator;

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Text to score
    pub text: Option<String>,

    #[arg(short = 'f', long)]
    pub file: Option<String>,

    #[command(flatten)]
    pub weights: ScoringWeights,
}

pub fn run(args: AnalyzeArgs, scorer: &Scorer) {
    let text = read_input(args.text.as_deref(), args.file.as_deref());

    println!("\n🔎 === TEXT ANALYSIS === 🔎");
    let scores: Vec<(ScoringMethod, f64)> = ScoringMethod::iter()
        .map(|m| (m, scorer.score(m, &text)))
        .collect();
    let breakdown = scorer.breakdown(&text);
    reports::print_analysis(&text, &scores, &breakdown);
}
