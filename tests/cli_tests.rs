use regex::Regex;
use std::fs::File;
use std::io::Write;
use std::process::{Command, Output};

const PLAINTEXT: &str = "Send reinforcements to the eastern bridge before the river floods the valley";

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cipherforge"))
        .args(args)
        .output()
        .expect("Failed to execute binary")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "CLI failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn capture(stdout: &str, pattern: &str) -> String {
    let re = Regex::new(pattern).unwrap();
    re.captures(stdout)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| panic!("'{}' not found in output:\n{}", pattern, stdout))
}

#[test]
fn test_encrypt_then_decrypt() {
    let out = stdout_of(&run_cli(&["encrypt", "Attack at dawn!", "--key", "lemon"]));
    assert_eq!(capture(&out, r"Key: (\S+)"), "LEMON");
    let ct = capture(&out, r"Ciphertext: (.+)");
    assert_eq!(ct, "Lxfopv ef rnhr!");

    let out = stdout_of(&run_cli(&["decrypt", &ct, "-K", "LEMON"]));
    assert_eq!(capture(&out, r"Plaintext: (.+)"), "Attack at dawn!");
}

#[test]
fn test_random_key_is_seeded() {
    let args = ["encrypt", PLAINTEXT, "--random-key", "4", "--seed", "7"];
    let a = stdout_of(&run_cli(&args));
    let b = stdout_of(&run_cli(&args));
    let key = capture(&a, r"Key: ([A-Z]+)");
    assert_eq!(key.len(), 4);
    assert_eq!(a, b);
}

#[test]
fn test_crack_recovers_key() {
    let out = stdout_of(&run_cli(&["encrypt", PLAINTEXT, "-K", "CAT"]));
    let ct = capture(&out, r"Ciphertext: (.+)");

    for mode in [&[][..], &["--oneshot"][..]] {
        let mut args = vec!["crack", ct.as_str(), "-m", "3", "-w", "2", "-n", "3"];
        args.extend_from_slice(mode);
        let out = stdout_of(&run_cli(&args));
        assert!(out.contains("RUN SUMMARY"));
        assert_eq!(capture(&out, r"Outcome:\s+(\w+)"), "Completed");
        assert_eq!(capture(&out, r"Keys:\s+(\d+/\d+)"), "18278/18278");
        // First table row carries the best key.
        assert_eq!(capture(&out, r"\|\s*1\s*\|\s*([A-Z]+)\s*\|"), "CAT");
    }
}

#[test]
fn test_crack_reads_file_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ct.txt");
    let export = dir.path().join("out.json");

    let out = stdout_of(&run_cli(&["encrypt", PLAINTEXT, "-K", "Z"]));
    let ct = capture(&out, r"Ciphertext: (.+)");
    let mut f = File::create(&input).unwrap();
    writeln!(f, "{}", ct).unwrap();
    drop(f);

    let out = stdout_of(&run_cli(&[
        "crack",
        "-f",
        input.to_str().unwrap(),
        "-m",
        "1",
        "--known",
        "eastern",
        "--export",
        export.to_str().unwrap(),
    ]));
    assert!(out.contains("Results saved to"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(json["results"][0]["key"], "Z");
    assert_eq!(json["results"].as_array().map(|r| r.len()), Some(1));
}

#[test]
fn test_analyze_lists_every_method() {
    let out = stdout_of(&run_cli(&["analyze", PLAINTEXT]));
    for name in [
        "bigram",
        "trigram",
        "quadgram",
        "ic",
        "chi-squared",
        "words",
        "heuristic",
        "combined",
    ] {
        let re = Regex::new(&format!(r"\|\s*{}\s*\|\s*-?\d+\.\d{{3}}\s*\|", name)).unwrap();
        assert!(re.is_match(&out), "missing row for {}:\n{}", name, out);
    }
    assert!(out.contains("Known words"));
}

#[test]
fn test_bad_key_fails() {
    let output = run_cli(&["encrypt", "hello", "-K", "K3Y"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Encryption failed"));
}

#[test]
fn test_log_lines_stay_off_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let weights = dir.path().join("weights.json");
    std::fs::write(&weights, r#"{ "bonus_top_word": 20.0 }"#).unwrap();

    let output = run_cli(&["analyze", PLAINTEXT, "--weights", weights.to_str().unwrap()]);
    let out = stdout_of(&output);
    assert!(!out.contains("Loading weights"), "log line on stdout:\n{}", out);
    assert!(String::from_utf8_lossy(&output.stderr).contains("Loading weights"));
}
