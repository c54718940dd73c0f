use crate::models::{LatticeConfig, OptionType, PricingInput, PricingModel};

/// Cox-Ross-Rubinstein recombining binomial tree.
///
/// dt = T / n, u = e^(sigma*sqrt(dt)), d = 1/u
/// p  = (e^((r - q)*dt) - d) / (u - d)
///
/// Node (i, j) is i steps in with j down-moves: S * u^(i-j) * d^j.
/// Backward induction overwrites a single row of n+1 values in place, so
/// memory is O(n) and time O(n^2). With `american` set, each node takes the
/// larger of continuation and immediate exercise.
///
/// sigma == 0 makes u == d and p divides by zero; not guarded.
pub struct BinomialTree {
    pub config: LatticeConfig,
}

impl BinomialTree {
    pub fn new(config: LatticeConfig) -> Self {
        Self { config }
    }
}

impl PricingModel for BinomialTree {
    #[inline]
    fn name(&self) -> &'static str {
        "Binomial"
    }

    fn price(&self, input: &PricingInput, kind: OptionType) -> f64 {
        binomial_price(input, kind, &self.config)
    }
}

pub fn binomial_price(input: &PricingInput, kind: OptionType, config: &LatticeConfig) -> f64 {
    let steps = config.steps;
    let spot = input.spot;
    let strike = input.strike;
    let sigma = input.volatility.to_decimal();

    let dt = input.time_to_expiry_years / steps as f64;
    let u = (sigma * dt.sqrt()).exp();
    let d = 1.0 / u;
    let growth = ((input.risk_free_rate - config.dividend_yield) * dt).exp();
    let p = (growth - d) / (u - d);
    let discount = (-input.risk_free_rate * dt).exp();

    // Terminal payoffs, top node (all up-moves) first
    let mut values: Vec<f64> = (0..=steps)
        .map(|i| {
            let terminal = spot * u.powi((steps - i) as i32) * d.powi(i as i32);
            kind.intrinsic(terminal, strike)
        })
        .collect();

    for i in (0..steps).rev() {
        for j in 0..=i {
            let continuation = discount * (p * values[j] + (1.0 - p) * values[j + 1]);
            values[j] = if config.american {
                let node_price = spot * u.powi((i - j) as i32) * d.powi(j as i32);
                continuation.max(kind.intrinsic(node_price, strike))
            } else {
                continuation
            };
        }
    }

    values[0]
}
