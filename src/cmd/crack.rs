use super::{fail, read_input};
use crate::reports;
use cipherforge::alphabet::{Alphabet, ENGLISH};
use cipherforge::config::Config;
use cipherforge::export::{default_file_name, ExportPayload};
use cipherforge::scorer::{Scorer, ScoringMethod};
use cipherforge::search::{
    crack, AttackParams, EngineEvent, Orchestrator, ProgressSnapshot, RunReport,
};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct CrackArgs {
    /// Ciphertext to attack
    pub ciphertext: Option<String>,

    #[arg(short = 'f', long)]
    pub file: Option<String>,

    #[command(flatten)]
    pub config: Config,

    #[arg(short = 'a', long, default_value = ENGLISH)]
    pub alphabet: String,

    #[arg(short = 's', long = "method", default_value_t = ScoringMethod::Combined)]
    pub method: ScoringMethod,

    /// Only keep decryptions containing this text (case-insensitive)
    #[arg(short = 'k', long)]
    pub known: Option<String>,

    /// Rows to print
    #[arg(short = 'n', long, default_value_t = 10)]
    pub show: usize,

    /// Write results as JSON. Without a path, a dated file name is used.
    #[arg(long)]
    pub export: Option<Option<String>>,

    /// Single call on a rayon pool instead of the worker coordinator
    #[arg(long, default_value_t = false)]
    pub oneshot: bool,
}

struct ConsoleProgress;

impl cipherforge::search::ProgressCallback for ConsoleProgress {
    fn on_progress(&self, snapshot: &ProgressSnapshot) -> bool {
        reports::print_progress(snapshot);
        true
    }
}

pub fn run(args: CrackArgs, scorer: Arc<Scorer>) {
    // 1. Resolve input
    let ciphertext = read_input(args.ciphertext.as_deref(), args.file.as_deref());
    let attack = AttackParams::builder()
        .ciphertext(ciphertext.trim_end().to_string())
        .method(args.method)
        .known_plaintext(args.known.clone())
        .build();
    let params = &args.config.engine;

    println!(
        "\n🔐 Cracking {} chars | method: {} | keys up to {} | {} workers",
        attack.ciphertext.chars().count(),
        attack.method,
        params.max_key_length,
        params.workers
    );

    // 2. Run
    let (report, payload) = if args.oneshot {
        run_oneshot(&args, scorer, &attack)
    } else {
        run_threaded(&args, scorer, attack)
    };

    // 3. Report
    reports::print_run_summary(&report);
    reports::print_results(&report.results, args.show);

    if let Some(target) = &args.export {
        save_export(target, &payload);
    }
}

fn save_export(target: &Option<String>, payload: &ExportPayload) {
    let path = target.clone().unwrap_or_else(default_file_name);
    match payload.write_to(&path) {
        Ok(()) => println!("\n💾 Results saved to {}", path),
        Err(e) => fail("Export failed", e),
    }
}

fn run_oneshot(
    args: &CrackArgs,
    scorer: Arc<Scorer>,
    attack: &AttackParams,
) -> (RunReport, ExportPayload) {
    let params = &args.config.engine;
    let alphabet = Alphabet::new(&args.alphabet).unwrap_or_else(|e| fail("Invalid alphabet", e));
    let report = crack(scorer, &alphabet, params, attack, &ConsoleProgress)
        .unwrap_or_else(|e| fail("Search failed", e));
    let payload = ExportPayload::new(&report, attack, &alphabet, params.max_key_length);
    (report, payload)
}

fn run_threaded(
    args: &CrackArgs,
    scorer: Arc<Scorer>,
    attack: AttackParams,
) -> (RunReport, ExportPayload) {
    let params = &args.config.engine;
    let mut orch = Orchestrator::new(scorer, params.clone());
    orch.init(&args.alphabet, params.workers, params.max_key_length)
        .unwrap_or_else(|e| fail("Initialisation failed", e));

    let events = orch
        .start(attack)
        .unwrap_or_else(|e| fail("Cannot start", e));

    for event in events.iter() {
        match event {
            EngineEvent::Progress(p) => reports::print_progress(&p),
            EngineEvent::Warning(w) => eprintln!("⚠️  {}", w),
            EngineEvent::Error(e) => eprintln!("❌ {:?}: {}", e.kind, e.message),
            EngineEvent::Results(_) => {}
            EngineEvent::Finished(_) => break,
        }
    }

    let report = match orch.wait() {
        Ok(r) => r,
        Err(e) => {
            // Results aggregated before the failure stay valid.
            if let Some(partial) = orch.report() {
                reports::print_run_summary(&partial);
                reports::print_results(&partial.results, args.show);
            }
            if let (Some(target), Some(payload)) = (&args.export, orch.export()) {
                save_export(target, &payload);
            }
            fail("Search failed", e)
        }
    };
    let payload = orch
        .export()
        .unwrap_or_else(|| fail("Export failed", "no run data"));
    (report, payload)
}
