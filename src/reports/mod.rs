use cipherforge::scorer::{ScoreBreakdown, ScoringMethod};
use cipherforge::search::{ProgressSnapshot, RunReport, ScoredCandidate};
use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

const PREVIEW_CHARS: usize = 60;

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        out.push_str("...");
    }
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{:.3}", x),
        None => "-".to_string(),
    }
}

pub fn print_progress(p: &ProgressSnapshot) {
    println!(
        "{:6.2}% | {:>10}/{} keys | Best: {} | {:.0} keys/s | ETA {}",
        p.percent(),
        p.keys_tested,
        p.total_keys,
        fmt_opt(p.best_score),
        p.keys_per_sec,
        p.eta_display()
    );
}

pub fn print_results(results: &[ScoredCandidate], limit: usize) {
    if results.is_empty() {
        println!("\n(no candidates cleared the filters)");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Key").add_attribute(Attribute::Bold),
        Cell::new("Score").fg(Color::Cyan),
        Cell::new("Bigrams"),
        Cell::new("Words"),
        Cell::new("Plaintext"),
    ]);

    for i in 2..=4 {
        if let Some(col) = table.column_mut(i) {
            col.set_cell_alignment(CellAlignment::Right);
        }
    }

    for (rank, c) in results.iter().take(limit).enumerate() {
        let (bigrams, words) = match &c.breakdown {
            Some(b) => (b.bigram_hits.to_string(), b.word_hits.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&c.key).add_attribute(Attribute::Bold),
            Cell::new(format!("{:.3}", c.score)).fg(Color::Cyan),
            Cell::new(bigrams),
            Cell::new(words),
            Cell::new(preview(&c.plaintext)),
        ]);
    }
    println!("\n{}", table);
}

pub fn print_run_summary(report: &RunReport) {
    let p = report.progress();
    println!("\n=== 🏁 RUN SUMMARY ===");
    println!("Outcome:    {}", report.outcome);
    println!("Keys:       {}/{}", report.keys_tested, report.total_keys);
    println!(
        "Batches:    {}/{}",
        report.batches_completed, report.batches_total
    );
    println!("Best score: {}", fmt_opt(report.best_score));
    println!(
        "Elapsed:    {} ({:.0} keys/s)",
        cipherforge::search::format_eta(report.elapsed_ms as f64 / 1000.0),
        p.keys_per_sec
    );
}

pub fn print_analysis(text: &str, scores: &[(ScoringMethod, f64)], b: &ScoreBreakdown) {
    println!("\nText: {}", preview(text));

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![
        Cell::new("Method").add_attribute(Attribute::Bold),
        Cell::new("Score").fg(Color::Cyan),
    ]);
    if let Some(col) = table.column_mut(1) {
        col.set_cell_alignment(CellAlignment::Right);
    }
    for (method, score) in scores {
        let s = if score.is_finite() {
            format!("{:.3}", score)
        } else {
            "unscoreable".to_string()
        };
        table.add_row(vec![Cell::new(method), Cell::new(s)]);
    }
    println!("\n{}", table);

    let mut stats = Table::new();
    stats.load_preset(ASCII_FULL);
    stats.add_row(vec![
        Cell::new("IC (raw)"),
        Cell::new(fmt_opt(b.index_of_coincidence)),
    ]);
    stats.add_row(vec![Cell::new("Chi-squared"), Cell::new(fmt_opt(b.chi_squared))]);
    stats.add_row(vec![Cell::new("Common bigrams"), Cell::new(b.bigram_hits)]);
    stats.add_row(vec![Cell::new("Known words"), Cell::new(b.word_hits)]);
    stats.add_row(vec![
        Cell::new("Impossible bigrams").fg(Color::Red),
        Cell::new(b.impossible_bigrams),
    ]);
    println!("{}", stats);
}
