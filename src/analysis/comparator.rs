use crate::errors::{EngineError, EngineResult};
use crate::models::binomial::BinomialTree;
use crate::models::black_scholes::BlackScholes;
use crate::models::jump_diffusion::JumpDiffusion;
use crate::models::{
    JumpParameters, LatticeConfig, OptionType, PriceQuote, PricingInput, PricingModel,
};
use smallvec::SmallVec;

/// Prices from all three models for one contract, plus any sanity warnings.
/// Built once per evaluation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ComparisonResult {
    pub analytic_price: f64,
    pub lattice_price: f64,
    pub jump_price: f64,
    /// True when jump_price was replaced by analytic_price
    pub fallback_applied: bool,
    pub warnings: SmallVec<[String; 2]>,
}

impl ComparisonResult {
    /// Per-model view, in display order.
    pub fn quotes(&self) -> [PriceQuote; 3] {
        [
            PriceQuote { model: "Black-Scholes", theoretical_price: self.analytic_price },
            PriceQuote { model: "Binomial", theoretical_price: self.lattice_price },
            PriceQuote { model: "Jump-Diffusion", theoretical_price: self.jump_price },
        ]
    }

    pub fn all_finite(&self) -> bool {
        self.analytic_price.is_finite()
            && self.lattice_price.is_finite()
            && self.jump_price.is_finite()
    }

    /// Non-finite prices are an error state for callers that publish results.
    pub fn ensure_finite(&self) -> EngineResult<()> {
        if self.all_finite() {
            return Ok(());
        }
        Err(EngineError::NonFinite(format!(
            "analytic={} lattice={} jump={}",
            self.analytic_price, self.lattice_price, self.jump_price
        )))
    }
}

/// Runs the analytic, lattice and jump-diffusion pricers side by side.
///
/// The models are stateless after construction, so one comparator can be
/// shared across threads and strikes without locking.
pub struct ModelComparator {
    analytic: BlackScholes,
    lattice: BinomialTree,
    jump: JumpDiffusion,
}

impl ModelComparator {
    pub fn new(lattice: LatticeConfig, jump: JumpParameters) -> Self {
        Self {
            analytic: BlackScholes::new(),
            lattice: BinomialTree::new(lattice),
            jump: JumpDiffusion::new(jump),
        }
    }

    pub fn models(&self) -> [&dyn PricingModel; 3] {
        [&self.analytic, &self.lattice, &self.jump]
    }

    /// Validates the input, prices with every model and applies the
    /// jump-model sanity rule.
    pub fn compare(
        &self,
        input: &PricingInput,
        kind: OptionType,
    ) -> EngineResult<ComparisonResult> {
        input.validate()?;

        let [analytic, lattice, jump] =
            self.models().map(|m| PriceQuote::from_model(m, input, kind));

        tracing::debug!(
            %kind,
            spot = input.spot,
            strike = input.strike,
            t = input.time_to_expiry_years,
            analytic = analytic.theoretical_price,
            lattice = lattice.theoretical_price,
            jump = jump.theoretical_price,
            "model prices"
        );

        Ok(reconcile(
            analytic.theoretical_price,
            lattice.theoretical_price,
            jump.theoretical_price,
        ))
    }
}

/// One-shot comparison with explicit model settings.
pub fn compare(
    input: &PricingInput,
    kind: OptionType,
    lattice: LatticeConfig,
    jump: JumpParameters,
) -> EngineResult<ComparisonResult> {
    ModelComparator::new(lattice, jump).compare(input, kind)
}

/// Sanity rules over raw model prices.
///
/// A jump price that is non-finite or more than 100% away from the analytic
/// price is replaced by the analytic price. A non-finite lattice price is kept
/// as-is but flagged.
pub fn reconcile(analytic_price: f64, lattice_price: f64, jump_price: f64) -> ComparisonResult {
    let mut warnings = SmallVec::new();
    let mut final_jump = jump_price;
    let mut fallback_applied = false;

    if !jump_price.is_finite() || (jump_price - analytic_price).abs() > analytic_price {
        tracing::warn!(
            jump = jump_price,
            analytic = analytic_price,
            "jump-diffusion price diverged, falling back to analytic"
        );
        warnings.push(format!(
            "Jump-Diffusion price {jump_price:.4} diverged from Black-Scholes {analytic_price:.4}; \
             using Black-Scholes price instead"
        ));
        final_jump = analytic_price;
        fallback_applied = true;
    }

    if !lattice_price.is_finite() {
        tracing::warn!(lattice = lattice_price, "binomial price is not finite");
        warnings.push(format!("Binomial price {lattice_price} is not finite"));
    }

    ComparisonResult {
        analytic_price,
        lattice_price,
        jump_price: final_jump,
        fallback_applied,
        warnings,
    }
}
