use crate::errors::{EngineError, EngineResult};
use crate::models::volatility::DEFAULT_TRADING_DAYS;
use crate::models::{JumpParameters, LatticeConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    /// Used when a snapshot arrives without a rate
    pub default_risk_free_rate: f64,
    pub vol_trading_days: usize,
    pub lattice: LatticeConfig,
    pub jump: JumpParameters,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3001,
            default_risk_free_rate: 0.05,
            vol_trading_days: DEFAULT_TRADING_DAYS,
            lattice: LatticeConfig::default(),
            jump: JumpParameters::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = parse_env::<u16>("SERVER_PORT", "3001")?;
        let default_risk_free_rate = parse_env::<f64>("DEFAULT_RISK_FREE_RATE", "0.05")?;
        let vol_trading_days = parse_env::<usize>("VOL_TRADING_DAYS", "30")?;

        let lattice = LatticeConfig {
            steps: parse_env::<usize>("LATTICE_STEPS", "100")?,
            american: parse_env::<bool>("LATTICE_AMERICAN", "false")?,
            dividend_yield: parse_env::<f64>("DIVIDEND_YIELD", "0.0")?,
        };

        let jump = JumpParameters {
            intensity_per_year: parse_env::<f64>("JUMP_INTENSITY", "2.0")?,
            mean_jump_log_return: parse_env::<f64>("JUMP_MEAN", "-0.02")?,
            jump_volatility: parse_env::<f64>("JUMP_VOLATILITY", "0.05")?,
        };

        let cfg = Self {
            server_port,
            default_risk_free_rate,
            vol_trading_days,
            lattice,
            jump,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.vol_trading_days < 3 {
            return Err(EngineError::Config("VOL_TRADING_DAYS must be at least 3".into()));
        }
        validate_lattice(&self.lattice).map_err(EngineError::Config)?;
        validate_jump(&self.jump).map_err(EngineError::Config)?;
        Ok(())
    }
}

/// Upper bound on tree depth; cost is O(steps^2) time and O(steps) memory
pub const MAX_LATTICE_STEPS: usize = 10_000;

pub fn validate_lattice(lattice: &LatticeConfig) -> Result<(), String> {
    if lattice.steps < 1 {
        return Err("lattice steps must be at least 1".into());
    }
    if lattice.steps > MAX_LATTICE_STEPS {
        return Err(format!(
            "lattice steps must be at most {MAX_LATTICE_STEPS}, got {}",
            lattice.steps
        ));
    }
    if lattice.dividend_yield.is_nan() || lattice.dividend_yield < 0.0 {
        return Err(format!("dividend yield must be >= 0, got {}", lattice.dividend_yield));
    }
    Ok(())
}

pub fn validate_jump(jump: &JumpParameters) -> Result<(), String> {
    if jump.intensity_per_year.is_nan() || jump.intensity_per_year < 0.0 {
        return Err(format!("jump intensity must be >= 0, got {}", jump.intensity_per_year));
    }
    if jump.jump_volatility.is_nan() || jump.jump_volatility < 0.0 {
        return Err(format!("jump volatility must be >= 0, got {}", jump.jump_volatility));
    }
    if !jump.mean_jump_log_return.is_finite() {
        return Err("jump mean must be finite".into());
    }
    Ok(())
}

fn parse_env<T>(key: &str, default: &str) -> EngineResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_var_or(key, default)
        .parse::<T>()
        .map_err(|e| EngineError::Config(format!("{key}: {e}")))
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.lattice.steps, 100);
        assert_eq!(cfg.jump.intensity_per_year, 2.0);
    }

    #[test]
    fn test_zero_steps_rejected() {
        let mut cfg = AppConfig::default();
        cfg.lattice.steps = 0;
        assert!(matches!(cfg.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_negative_jump_vol_rejected() {
        let mut cfg = AppConfig::default();
        cfg.jump.jump_volatility = -0.1;
        assert!(matches!(cfg.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_huge_steps_rejected() {
        let lattice = LatticeConfig { steps: usize::MAX, ..LatticeConfig::default() };
        assert!(validate_lattice(&lattice).is_err());

        let at_limit = LatticeConfig { steps: MAX_LATTICE_STEPS, ..LatticeConfig::default() };
        assert!(validate_lattice(&at_limit).is_ok());
    }

    #[test]
    fn test_nan_dividend_rejected() {
        let lattice = LatticeConfig { dividend_yield: f64::NAN, ..LatticeConfig::default() };
        assert!(validate_lattice(&lattice).is_err());
    }
}
