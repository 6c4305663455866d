use cipherforge::config::{Config, EngineParams, ScoringWeights};
use cipherforge::error::CipherForgeError;
use clap::{CommandFactory, FromArgMatches, Parser};
use std::fs;

#[derive(Parser, Debug)]
struct TestCli {
    #[command(flatten)]
    config: Config,
}

#[test]
fn test_defaults_match_cli_defaults() {
    let cli = TestCli::try_parse_from(["test"]).unwrap();
    let d = EngineParams::default();
    assert_eq!(cli.config.engine.workers, d.workers);
    assert_eq!(cli.config.engine.top_k, d.top_k);
    assert_eq!(cli.config.engine.cache_limit, d.cache_limit);
    assert_eq!(cli.config.weights.ngram_floor, ScoringWeights::default().ngram_floor);
    assert_eq!(d.resolved_batch_size(4), 400);
}

#[test]
fn test_weights_partial_json_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.json");
    fs::write(&path, r#"{ "weight_quadgram": 0.9, "bonus_top_word": 20.0 }"#).unwrap();

    let w = ScoringWeights::load_from_file(&path).unwrap();
    assert_eq!(w.weight_quadgram, 0.9);
    assert_eq!(w.bonus_top_word, 20.0);
    assert_eq!(w.weight_bigram, ScoringWeights::default().weight_bigram);
}

#[test]
fn test_weights_invalid_floor_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weights.json");
    fs::write(&path, r#"{ "ngram_floor": 0.0 }"#).unwrap();
    assert!(matches!(
        ScoringWeights::load_from_file(&path),
        Err(CipherForgeError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_merge_only_takes_explicit_flags() {
    let matches = TestCli::command()
        .try_get_matches_from(["test", "--weight-words", "0.5"])
        .unwrap();
    let cli = TestCli::from_arg_matches(&matches).unwrap();

    let mut file_weights = ScoringWeights {
        weight_words: 0.01,
        weight_ic: 0.42,
        ..ScoringWeights::default()
    };
    file_weights.merge_from_cli(&cli.config.weights, &matches);

    assert_eq!(file_weights.weight_words, 0.5);
    assert_eq!(file_weights.weight_ic, 0.42);
}

#[test]
fn test_engine_params_validation() {
    let bad = EngineParams {
        top_k: 0,
        ..EngineParams::default()
    };
    assert!(bad.validate().is_err());
    let nan = EngineParams {
        min_score: Some(f64::NAN),
        ..EngineParams::default()
    };
    assert!(nan.validate().is_err());
    assert!(EngineParams::default().validate().is_ok());
}

#[test]
fn test_word_bonus_defaults_and_override() {
    let d = ScoringWeights::default();
    assert_eq!(d.bonus_two_letter_word, 8.0);
    assert_eq!(d.bonus_top_word, 15.0);

    let cli = TestCli::try_parse_from(["test", "--bonus-top-word", "6"]).unwrap();
    assert_eq!(cli.config.weights.bonus_top_word, 6.0);
    assert!(cli.config.weights.bonus_top_word < cli.config.weights.bonus_two_letter_word);
}
