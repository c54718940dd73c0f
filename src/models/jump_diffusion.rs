use crate::models::black_scholes::closed_form;
use crate::models::{JumpParameters, OptionType, PricingInput, PricingModel};
use statrs::distribution::Normal;

/// Jump-diffusion price as a Poisson-weighted mixture of Black-Scholes prices.
///
/// drift = r - lambda * (e^(mu_j + sigma_j^2/2) - 1)
/// P(n)  = e^(-lambda*T) * (lambda*T)^n / n!
/// sigma_n^2 = sigma^2 + n * sigma_j^2 / T,  S_n = S * e^(n*mu_j)
///
/// price = sum_{n=0}^{MAX_JUMPS-1} P(n) * BS(S_n, K, T, drift, sigma_n)
///
/// The compensated drift replaces r everywhere inside each term, discounting
/// included. Terms with P(n) below MIN_WEIGHT are skipped. Divergent results
/// are left for the comparator to catch.
const MAX_JUMPS: usize = 10;

/// Poisson weights below this contribute nothing measurable
const MIN_WEIGHT: f64 = 1e-10;

pub struct JumpDiffusion {
    pub params: JumpParameters,
    normal: Normal,
}

impl JumpDiffusion {
    pub fn new(params: JumpParameters) -> Self {
        Self { params, normal: Normal::standard() }
    }
}

impl PricingModel for JumpDiffusion {
    #[inline]
    fn name(&self) -> &'static str {
        "Jump-Diffusion"
    }

    fn price(&self, input: &PricingInput, kind: OptionType) -> f64 {
        let lambda = self.params.intensity_per_year;
        let mu_j = self.params.mean_jump_log_return;
        let delta_sq = self.params.jump_volatility * self.params.jump_volatility;
        let t = input.time_to_expiry_years;
        let sigma = input.volatility.to_decimal();
        let sigma_sq = sigma * sigma;

        let drift = input.risk_free_rate - lambda * ((mu_j + 0.5 * delta_sq).exp() - 1.0);

        let lambda_t = lambda * t;
        let mut poisson_term = (-lambda_t).exp(); // n = 0
        let mut price = 0.0;

        for n in 0..MAX_JUMPS {
            if n > 0 {
                poisson_term *= lambda_t / n as f64;
            }
            if poisson_term < MIN_WEIGHT {
                continue;
            }

            let nf = n as f64;
            let sigma_n = (sigma_sq + nf * delta_sq / t).sqrt();
            let spot_n = input.spot * (nf * mu_j).exp();

            price += poisson_term
                * closed_form(&self.normal, spot_n, input.strike, t, drift, sigma_n, kind);
        }

        price
    }
}

#[cfg(test)]
pub fn jump_diffusion_price(
    input: &PricingInput,
    kind: OptionType,
    jump: &JumpParameters,
) -> f64 {
    JumpDiffusion::new(*jump).price(input, kind)
}
