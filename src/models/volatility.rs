use crate::errors::{EngineError, EngineResult};
use crate::models::Volatility;

/// Trading days per year used to annualize daily return volatility
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Default trailing window (number of closes)
pub const DEFAULT_TRADING_DAYS: usize = 30;

/// Annualized trailing volatility from daily closes, in percentage points.
///
/// Uses the last `trading_days` closes (all of them if fewer are available),
/// simple daily returns and the sample standard deviation (n - 1).
pub fn trailing_volatility(closes: &[f64], trading_days: usize) -> EngineResult<Volatility> {
    if let Some(bad) = closes.iter().find(|c| !c.is_finite() || **c <= 0.0) {
        return Err(EngineError::InvalidInput(format!("close price must be positive, got {bad}")));
    }

    let window = if closes.len() < trading_days {
        tracing::warn!(
            available = closes.len(),
            requested = trading_days,
            "short price history, using all available closes"
        );
        closes
    } else {
        &closes[closes.len() - trading_days..]
    };

    // Need at least two returns for a sample deviation
    if window.len() < 3 {
        return Err(EngineError::InsufficientHistory(format!(
            "need at least 3 closes, got {}",
            window.len()
        )));
    }

    let returns: Vec<f64> = window.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let daily_std = sample_std(&returns);

    Ok(Volatility::percent(daily_std * TRADING_DAYS_PER_YEAR.sqrt() * 100.0))
}

#[inline]
fn sample_std(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let var = data.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VolUnit;

    #[test]
    fn test_flat_series_has_zero_vol() {
        let closes = vec![100.0; 40];
        let vol = trailing_volatility(&closes, DEFAULT_TRADING_DAYS).expect("enough history");
        assert_eq!(vol.unit, VolUnit::Percent);
        assert!(vol.value.abs() < 1e-12, "flat closes should give zero vol: {}", vol.value);
    }

    #[test]
    fn test_known_series() {
        // Returns alternate +1% / -1%-ish; std ~1.0% daily
        let mut closes = vec![100.0];
        for i in 0..30 {
            let last = closes[closes.len() - 1];
            closes.push(if i % 2 == 0 { last * 1.01 } else { last * 0.99 });
        }
        let vol = trailing_volatility(&closes, DEFAULT_TRADING_DAYS).expect("enough history");
        // std of alternating +/-0.01 over 29 returns, annualized
        let expected = 0.01 * (29.0_f64 / 28.0).sqrt() * 252.0_f64.sqrt() * 100.0;
        assert!((vol.value - expected).abs() < 0.2, "vol={} expected ~{expected}", vol.value);
    }

    #[test]
    fn test_window_uses_latest_closes() {
        // Wild early history must be ignored when the window is short
        let mut closes = vec![50.0, 150.0, 40.0, 160.0];
        closes.extend(std::iter::repeat(100.0).take(10));
        let vol = trailing_volatility(&closes, 5).expect("enough history");
        assert!(vol.value.abs() < 1e-12, "only the flat tail should count: {}", vol.value);
    }

    #[test]
    fn test_short_history_uses_everything() {
        let closes = [100.0, 101.0, 100.0, 102.0];
        let vol = trailing_volatility(&closes, DEFAULT_TRADING_DAYS).expect("3 returns is enough");
        assert!(vol.value > 0.0);
    }

    #[test]
    fn test_too_little_history() {
        let err = trailing_volatility(&[100.0, 101.0], DEFAULT_TRADING_DAYS);
        assert!(matches!(err, Err(EngineError::InsufficientHistory(_))));
    }

    #[test]
    fn test_bad_close_rejected() {
        let err = trailing_volatility(&[100.0, 0.0, 101.0, 99.0], DEFAULT_TRADING_DAYS);
        assert!(matches!(err, Err(EngineError::InvalidInput(_))));
    }
}
