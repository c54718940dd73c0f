pub mod black_scholes;
pub mod binomial;
pub mod jump_diffusion;
pub mod volatility;

use crate::errors::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// All pricing models implement this trait.
/// price() must be a pure function: deterministic output from inputs only.
/// Send + Sync so a host can price strikes concurrently from shared instances.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Theoretical option value. Degenerate inputs (T <= 0, sigma == 0) are
    /// not guarded here and may produce NaN or infinity.
    fn price(&self, input: &PricingInput, kind: OptionType) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    #[inline]
    pub fn intrinsic(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolUnit {
    Decimal,
    Percent,
}

/// Annualized volatility tagged with its unit, so 20.0 and 0.20 can never be
/// confused by a pricer. A bare JSON number is accepted and read with
/// `Volatility::infer`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "VolatilityRepr")]
pub struct Volatility {
    pub value: f64,
    pub unit: VolUnit,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VolatilityRepr {
    Tagged { value: f64, unit: VolUnit },
    Bare(f64),
}

impl From<VolatilityRepr> for Volatility {
    fn from(repr: VolatilityRepr) -> Self {
        match repr {
            VolatilityRepr::Tagged { value, unit } => Self { value, unit },
            VolatilityRepr::Bare(value) => Self::infer(value),
        }
    }
}

impl Volatility {
    pub fn decimal(value: f64) -> Self {
        Self { value, unit: VolUnit::Decimal }
    }

    pub fn percent(value: f64) -> Self {
        Self { value, unit: VolUnit::Percent }
    }

    /// Magnitude heuristic for bare numbers: anything above 1 is read as
    /// percentage points.
    pub fn infer(value: f64) -> Self {
        if value > 1.0 {
            Self::percent(value)
        } else {
            Self::decimal(value)
        }
    }

    #[inline]
    pub fn to_decimal(self) -> f64 {
        match self.unit {
            VolUnit::Decimal => self.value,
            VolUnit::Percent => self.value / 100.0,
        }
    }

    #[inline]
    pub fn to_percent(self) -> f64 {
        self.to_decimal() * 100.0
    }
}

/// Everything a pricer needs for one valuation. Value type, created per request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub spot: f64,
    pub strike: f64,
    pub time_to_expiry_years: f64,
    pub risk_free_rate: f64,
    pub volatility: Volatility,
}

impl PricingInput {
    pub fn new(
        spot: f64,
        strike: f64,
        time_to_expiry_years: f64,
        risk_free_rate: f64,
        volatility: Volatility,
    ) -> Self {
        Self {
            spot,
            strike,
            time_to_expiry_years,
            risk_free_rate,
            volatility,
        }
    }

    /// Reject inputs the pricers would turn into NaN or infinity.
    pub fn validate(&self) -> EngineResult<()> {
        let checks = [
            ("spot", self.spot),
            ("strike", self.strike),
            ("time_to_expiry_years", self.time_to_expiry_years),
            ("volatility", self.volatility.value),
        ];
        for (field, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::InvalidInput(format!(
                    "{field} must be positive and finite, got {value}"
                )));
            }
        }
        if !self.risk_free_rate.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "risk_free_rate must be finite, got {}",
                self.risk_free_rate
            )));
        }
        Ok(())
    }
}

/// Cox-Ross-Rubinstein tree settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeConfig {
    pub steps: usize,
    pub american: bool,
    pub dividend_yield: f64,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            american: false,
            dividend_yield: 0.0,
        }
    }
}

/// Poisson jump process parameters (lambda, mu_j, sigma_j).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpParameters {
    pub intensity_per_year: f64,
    pub mean_jump_log_return: f64,
    pub jump_volatility: f64,
}

impl Default for JumpParameters {
    fn default() -> Self {
        Self {
            intensity_per_year: 2.0,
            mean_jump_log_return: -0.02,
            jump_volatility: 0.05,
        }
    }
}

/// Output of a single pricer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceQuote {
    pub model: &'static str,
    pub theoretical_price: f64,
}

impl PriceQuote {
    pub fn from_model(model: &dyn PricingModel, input: &PricingInput, kind: OptionType) -> Self {
        Self {
            model: model.name(),
            theoretical_price: model.price(input, kind),
        }
    }
}
