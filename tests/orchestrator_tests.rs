use cipherforge::alphabet::{Alphabet, ENGLISH};
use cipherforge::cipher::encrypt;
use cipherforge::config::{EngineParams, ScoringWeights};
use cipherforge::error::CipherForgeError;
use cipherforge::scorer::{Scorer, ScoringMethod};
use cipherforge::search::{AttackParams, EngineEvent, Orchestrator, RunOutcome, RunPhase};
use crossbeam_channel::TryRecvError;
use std::sync::Arc;
use std::time::Duration;

const PLAINTEXT: &str = "The quick brown fox jumps over the lazy dog and then it runs into the \
                         forest where the other animals are waiting for the evening to begin";

fn orchestrator(params: EngineParams) -> Orchestrator {
    let scorer = Arc::new(Scorer::new(ScoringWeights::default()).unwrap());
    Orchestrator::new(scorer, params)
}

fn fast_params() -> EngineParams {
    EngineParams {
        poll_interval_ms: 5,
        report_interval_ms: 10,
        ..EngineParams::default()
    }
}

fn drain(rx: &crossbeam_channel::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.recv_timeout(Duration::from_secs(120)) {
        let done = matches!(ev, EngineEvent::Finished(_));
        events.push(ev);
        if done {
            break;
        }
    }
    events
}

#[test]
fn test_init_validation() {
    let mut orch = orchestrator(fast_params());
    assert_eq!(orch.phase(), RunPhase::Idle);
    assert!(matches!(
        orch.init("", 2, 3),
        Err(CipherForgeError::InvalidAlphabet { .. })
    ));
    assert!(matches!(
        orch.init("ABCA", 2, 3),
        Err(CipherForgeError::InvalidAlphabet { .. })
    ));
    assert!(matches!(
        orch.init(ENGLISH, 0, 3),
        Err(CipherForgeError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        orch.init(ENGLISH, 2, 0),
        Err(CipherForgeError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        orch.init(ENGLISH, 2, 20),
        Err(CipherForgeError::Overflow { .. })
    ));
    assert_eq!(orch.phase(), RunPhase::Idle);

    orch.init(ENGLISH, 2, 3).unwrap();
    assert_eq!(orch.phase(), RunPhase::Initializing);
}

#[test]
fn test_start_requires_init_and_ciphertext() {
    let mut orch = orchestrator(fast_params());
    let attack = AttackParams::builder().ciphertext("KHOOR").build();
    assert!(orch.start(attack).is_err());

    orch.init(ENGLISH, 1, 1).unwrap();
    let empty = AttackParams::builder().ciphertext("   \n").build();
    assert!(matches!(
        orch.start(empty),
        Err(CipherForgeError::EmptyCiphertext)
    ));
    assert_eq!(orch.phase(), RunPhase::Initializing);
}

#[test]
fn test_run_completes_and_finds_key() {
    let alphabet = Alphabet::english();
    let ciphertext = encrypt(&alphabet, PLAINTEXT, "KEY").unwrap();

    let mut orch = orchestrator(fast_params());
    orch.init(ENGLISH, 3, 3).unwrap();
    let rx = orch
        .start(
            AttackParams::builder()
                .ciphertext(ciphertext)
                .method(ScoringMethod::Combined)
                .build(),
        )
        .unwrap();
    let events = drain(&rx);
    let report = orch.wait().unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(orch.phase(), RunPhase::Completed);
    assert_eq!(report.keys_tested, 18278);
    assert_eq!(report.total_keys, 18278);
    assert_eq!(report.batches_completed, report.batches_total);
    assert_eq!(report.results[0].key, "KEY");
    assert_eq!(report.results[0].plaintext, PLAINTEXT);
    assert!(report.results.len() <= 50);
    assert!(report
        .results
        .windows(2)
        .all(|w| w[0].score >= w[1].score));

    assert!(matches!(events.last(), Some(EngineEvent::Finished(_))));
    // Channel closes once the run is over.
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
}

#[test]
fn test_progress_is_monotonic() {
    let mut orch = orchestrator(EngineParams {
        batch_size: Some(50),
        progress_every: 10,
        ..fast_params()
    });
    orch.init(ENGLISH, 4, 3).unwrap();
    let rx = orch
        .start(AttackParams::builder().ciphertext(PLAINTEXT).build())
        .unwrap();

    let mut last = 0;
    let mut seen = 0;
    for ev in drain(&rx) {
        if let EngineEvent::Progress(p) = ev {
            assert!(p.keys_tested >= last, "{} < {}", p.keys_tested, last);
            assert!(p.keys_tested <= p.total_keys);
            last = p.keys_tested;
            seen += 1;
        }
    }
    assert!(seen >= 1);
    assert_eq!(last, 18278);
    orch.wait().unwrap();
}

#[test]
fn test_known_plaintext_filter_with_no_match() {
    // Decryptions of a run of consecutive letters under single-symbol keys
    // are again consecutive runs, so none contains "THE".
    let mut orch = orchestrator(fast_params());
    orch.init(ENGLISH, 2, 1).unwrap();

    let unfiltered = AttackParams::builder()
        .ciphertext("ABCDEFGHIJ")
        .method(ScoringMethod::Heuristic)
        .build();
    orch.start(unfiltered).unwrap();
    assert!(!orch.wait().unwrap().results.is_empty());

    let filtered = AttackParams::builder()
        .ciphertext("ABCDEFGHIJ")
        .method(ScoringMethod::Heuristic)
        .known_plaintext("the".to_string())
        .build();
    orch.start(filtered).unwrap();
    let report = orch.wait().unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.keys_tested, 26);
    assert!(report.results.is_empty());
    assert_eq!(report.best_score, None);
}

#[test]
fn test_known_plaintext_filter_keeps_matches() {
    let alphabet = Alphabet::english();
    let ciphertext = encrypt(&alphabet, PLAINTEXT, "Q").unwrap();
    let mut orch = orchestrator(fast_params());
    orch.init(ENGLISH, 2, 1).unwrap();
    orch.start(
        AttackParams::builder()
            .ciphertext(ciphertext)
            .known_plaintext("LAZY DOG".to_string())
            .build(),
    )
    .unwrap();
    let report = orch.wait().unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].key, "Q");
}

#[test]
fn test_cancel_mid_run() {
    let mut orch = orchestrator(EngineParams {
        batch_size: Some(1000),
        ..fast_params()
    });
    // 26 + .. + 26^5 keys: far more than finishes before the stop.
    orch.init(ENGLISH, 2, 5).unwrap();
    let rx = orch
        .start(AttackParams::builder().ciphertext(PLAINTEXT).build())
        .unwrap();
    assert_eq!(orch.phase(), RunPhase::Running);

    // Wait until the run is visibly under way.
    loop {
        match rx.recv_timeout(Duration::from_secs(30)) {
            Ok(EngineEvent::Progress(p)) if p.keys_tested > 0 => break,
            Ok(_) => continue,
            Err(e) => panic!("no progress before timeout: {:?}", e),
        }
    }

    orch.stop();
    orch.stop();
    assert_eq!(orch.phase(), RunPhase::Idle);

    // Whatever was queued before the stop may still be read; nothing after.
    let _queued = rx.try_iter().count();
    assert_eq!(rx.try_recv(), Err(TryRecvError::Disconnected));

    let report = orch.wait().unwrap();
    assert_eq!(report.outcome, RunOutcome::Cancelled);
    assert!(report.keys_tested < report.total_keys);
    assert_eq!(orch.phase(), RunPhase::Idle);

    // Partial results remain exportable.
    let payload = orch.export().unwrap();
    assert_eq!(payload.stats.outcome, RunOutcome::Cancelled);
    assert_eq!(payload.max_key_length, 5);
}

#[test]
fn test_stop_without_run_is_noop() {
    let mut orch = orchestrator(fast_params());
    orch.stop();
    orch.init(ENGLISH, 1, 1).unwrap();
    orch.stop();
    assert_eq!(orch.phase(), RunPhase::Initializing);
}

#[test]
fn test_min_score_threshold() {
    let mut orch = orchestrator(EngineParams {
        min_score: Some(1000.0),
        ..fast_params()
    });
    orch.init(ENGLISH, 2, 2).unwrap();
    orch.start(AttackParams::builder().ciphertext(PLAINTEXT).build())
        .unwrap();
    let report = orch.wait().unwrap();
    assert_eq!(report.keys_tested, 702);
    assert!(report.results.is_empty());
}
