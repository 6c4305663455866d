use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Point-in-time view of a run, as sent to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub keys_tested: u64,
    pub total_keys: u64,
    pub best_score: Option<f64>,
    pub elapsed_ms: u64,
    pub keys_per_sec: f64,
    pub eta_secs: Option<f64>,
}

impl ProgressSnapshot {
    pub fn new(keys_tested: u64, total_keys: u64, best_score: Option<f64>, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let keys_per_sec = if secs > 0.0 {
            keys_tested as f64 / secs
        } else {
            0.0
        };
        let eta_secs = if keys_per_sec > 0.0 {
            Some(total_keys.saturating_sub(keys_tested) as f64 / keys_per_sec)
        } else {
            None
        };
        Self {
            keys_tested,
            total_keys,
            best_score,
            elapsed_ms: elapsed.as_millis() as u64,
            keys_per_sec,
            eta_secs,
        }
    }

    /// Percentage complete, 0..100.
    pub fn percent(&self) -> f64 {
        if self.total_keys == 0 {
            return 100.0;
        }
        (self.keys_tested as f64 / self.total_keys as f64 * 100.0).min(100.0)
    }

    pub fn eta_display(&self) -> String {
        match self.eta_secs {
            Some(s) => format_eta(s),
            None => "-".to_string(),
        }
    }
}

/// `Xh Ym`, `Xm Ys` or `Xs`.
pub fn format_eta(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h {}m", h, m)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// A trait for receiving updates during a one-shot crack.
/// Boolean return value indicates if the search should continue (true) or abort (false).
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot) -> bool;
}

impl<F> ProgressCallback for F
where
    F: Fn(&ProgressSnapshot) -> bool + Send + Sync,
{
    fn on_progress(&self, snapshot: &ProgressSnapshot) -> bool {
        self(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_eta() {
        assert_eq!(format_eta(0.4), "0s");
        assert_eq!(format_eta(59.0), "59s");
        assert_eq!(format_eta(61.0), "1m 1s");
        assert_eq!(format_eta(3720.0), "1h 2m");
        assert_eq!(format_eta(f64::INFINITY), "0s");
    }

    #[test]
    fn test_snapshot_rates() {
        let s = ProgressSnapshot::new(500, 1500, None, Duration::from_secs(2));
        assert_eq!(s.keys_per_sec, 250.0);
        assert_eq!(s.eta_secs, Some(4.0));
        assert_eq!(s.eta_display(), "4s");
        assert!((s.percent() - 33.333).abs() < 0.01);
    }
}
