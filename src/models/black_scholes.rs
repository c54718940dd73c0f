use crate::models::{OptionType, PricingInput, PricingModel};
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes-Merton European option pricing.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
/// Call = S*Phi(d1) - K*e^(-rT)*Phi(d2)
/// Put  = K*e^(-rT)*Phi(-d2) - S*Phi(-d1)
///
/// Inputs are not bounds-checked. T <= 0 or sigma <= 0 propagate NaN/inf to
/// the caller instead of being clamped.
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self { normal: Normal::standard() }
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingModel for BlackScholes {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    #[inline]
    fn price(&self, input: &PricingInput, kind: OptionType) -> f64 {
        closed_form(
            &self.normal,
            input.spot,
            input.strike,
            input.time_to_expiry_years,
            input.risk_free_rate,
            input.volatility.to_decimal(),
            kind,
        )
    }
}

/// Analytic price for a single contract.
#[cfg(test)]
pub fn black_scholes_price(input: &PricingInput, kind: OptionType) -> f64 {
    BlackScholes::new().price(input, kind)
}

/// Raw formula on decimal sigma. Shared with the jump mixture, which feeds it
/// a shifted spot, the compensated drift and a widened sigma per jump count.
#[inline]
pub(crate) fn closed_form(
    normal: &Normal,
    spot: f64,
    strike: f64,
    t: f64,
    rate: f64,
    sigma: f64,
    kind: OptionType,
) -> f64 {
    let sigma_sqrt_t = sigma * t.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * sigma * sigma) * t) / sigma_sqrt_t;
    let d2 = d1 - sigma_sqrt_t;
    let discounted_strike = strike * (-rate * t).exp();

    match kind {
        OptionType::Call => spot * normal.cdf(d1) - discounted_strike * normal.cdf(d2),
        OptionType::Put => discounted_strike * normal.cdf(-d2) - spot * normal.cdf(-d1),
    }
}
