use crate::analysis::comparator::{ComparisonResult, ModelComparator};
use crate::config::AppConfig;
use crate::errors::{EngineError, EngineResult};
use crate::models::volatility::trailing_volatility;
use crate::models::{OptionType, PricingInput, Volatility};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Preferred minimum days to expiration when choosing a chain
const TARGET_DAYS: i64 = 30;

/// Strike targets relative to spot
const CALL_STRIKE_FACTOR: f64 = 1.10;
const PUT_STRIKE_FACTOR: f64 = 0.90;

const DAYS_PER_YEAR: f64 = 365.0;

// ── Market data handed in by the retrieval layer ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    pub strike: f64,
    pub last_price: f64,
    /// Market implied volatility as a decimal, if the provider has one
    #[serde(default)]
    pub implied_volatility: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChain {
    pub expiration: NaiveDate,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub spot: f64,
    /// Daily closes, oldest first
    pub closes: Vec<f64>,
    /// Decimal rate; falls back to the configured default when absent
    #[serde(default)]
    pub risk_free_rate: Option<f64>,
    /// Valuation date; today (UTC) when absent
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
    pub chains: Vec<OptionChain>,
}

// ── Analysis output ──

#[derive(Debug, Clone, Serialize)]
pub struct ModelDifference {
    pub model: &'static str,
    pub theoretical_price: f64,
    /// Market minus model; positive means the market trades at a premium
    pub difference: f64,
    pub difference_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionAnalysis {
    pub kind: OptionType,
    pub strike: f64,
    /// Strike relative to spot, in percent
    pub moneyness_pct: f64,
    pub market_price: f64,
    pub implied_volatility_pct: Option<f64>,
    /// Implied minus trailing volatility, in percentage points
    pub volatility_difference_pct: Option<f64>,
    pub comparison: ComparisonResult,
    pub market_vs_model: Vec<ModelDifference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockAnalysis {
    pub ticker: String,
    pub company_name: Option<String>,
    pub spot: f64,
    pub volatility: Volatility,
    pub risk_free_rate: f64,
    pub expiration: NaiveDate,
    pub days_to_expiration: i64,
    pub call: OptionAnalysis,
    pub put: OptionAnalysis,
}

/// First expiration at least TARGET_DAYS out, else the furthest available.
pub fn select_expiration(expirations: &[NaiveDate], today: NaiveDate) -> Option<NaiveDate> {
    let mut sorted = expirations.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .copied()
        .find(|exp| (*exp - today).num_days() >= TARGET_DAYS)
        .or_else(|| sorted.last().copied())
}

/// Contract with the strike closest to `target`. Earlier contracts win ties.
pub fn nearest_strike(contracts: &[OptionContract], target: f64) -> Option<&OptionContract> {
    contracts
        .iter()
        .min_by(|a, b| (a.strike - target).abs().total_cmp(&(b.strike - target).abs()))
}

/// Full call/put analysis for one ticker: trailing volatility, chain and
/// strike selection, then a three-model comparison per contract.
pub fn analyze(
    snapshot: &MarketSnapshot,
    comparator: &ModelComparator,
    config: &AppConfig,
) -> EngineResult<StockAnalysis> {
    let ticker = snapshot.ticker.to_uppercase();
    let volatility = trailing_volatility(&snapshot.closes, config.vol_trading_days)?;
    let risk_free_rate = snapshot.risk_free_rate.unwrap_or(config.default_risk_free_rate);
    let today = snapshot.as_of.unwrap_or_else(|| chrono::Utc::now().date_naive());

    let expirations: Vec<NaiveDate> = snapshot.chains.iter().map(|c| c.expiration).collect();
    let expiration = select_expiration(&expirations, today)
        .ok_or_else(|| EngineError::NoOptionsData(format!("no expirations for {ticker}")))?;
    let chain = snapshot
        .chains
        .iter()
        .find(|c| c.expiration == expiration)
        .ok_or_else(|| EngineError::NoOptionsData(format!("missing chain for {expiration}")))?;

    let days_to_expiration = (expiration - today).num_days();
    let t = days_to_expiration as f64 / DAYS_PER_YEAR;

    tracing::info!(
        ticker = %ticker,
        spot = snapshot.spot,
        vol_pct = volatility.to_percent(),
        rate = risk_free_rate,
        %expiration,
        days = days_to_expiration,
        "analyzing options"
    );

    let call_contract = nearest_strike(&chain.calls, snapshot.spot * CALL_STRIKE_FACTOR)
        .ok_or_else(|| EngineError::NoOptionsData(format!("no calls for {ticker} {expiration}")))?;
    let put_contract = nearest_strike(&chain.puts, snapshot.spot * PUT_STRIKE_FACTOR)
        .ok_or_else(|| EngineError::NoOptionsData(format!("no puts for {ticker} {expiration}")))?;

    let leg = |contract: &OptionContract, kind: OptionType| -> EngineResult<OptionAnalysis> {
        let input =
            PricingInput::new(snapshot.spot, contract.strike, t, risk_free_rate, volatility);
        let comparison = comparator.compare(&input, kind)?;
        comparison.ensure_finite()?;
        Ok(analyze_contract(contract, kind, snapshot.spot, volatility, comparison))
    };

    Ok(StockAnalysis {
        call: leg(call_contract, OptionType::Call)?,
        put: leg(put_contract, OptionType::Put)?,
        ticker,
        company_name: snapshot.company_name.clone(),
        spot: snapshot.spot,
        volatility,
        risk_free_rate,
        expiration,
        days_to_expiration,
    })
}

fn analyze_contract(
    contract: &OptionContract,
    kind: OptionType,
    spot: f64,
    volatility: Volatility,
    comparison: ComparisonResult,
) -> OptionAnalysis {
    let market_vs_model = comparison
        .quotes()
        .iter()
        .map(|q| {
            let difference = contract.last_price - q.theoretical_price;
            let difference_pct = if q.theoretical_price > 0.0 {
                difference / q.theoretical_price * 100.0
            } else {
                0.0
            };
            ModelDifference {
                model: q.model,
                theoretical_price: q.theoretical_price,
                difference,
                difference_pct,
            }
        })
        .collect();

    let implied_volatility_pct = contract.implied_volatility.map(|iv| iv * 100.0);

    OptionAnalysis {
        kind,
        strike: contract.strike,
        moneyness_pct: (contract.strike / spot - 1.0) * 100.0,
        market_price: contract.last_price,
        implied_volatility_pct,
        volatility_difference_pct: implied_volatility_pct.map(|iv| iv - volatility.to_percent()),
        comparison,
        market_vs_model,
    }
}
