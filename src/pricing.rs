//! # Pricing Engine
//!
//! Converts a shop price in yuan into the rouble price quoted to the customer.
//!
//! ```text
//! price = ceil(amount * rate * 1.09 + cross_border_fee * rate + local_fee)
//! ```
//!
//! `cross_border_fee` (yuan) depends on the item category, `local_fee`
//! (roubles) on delivery type and origin. Express delivery has one local fee
//! for every origin.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{Category, Location, Meta, OrderType};
use crate::errors::PricingError;

/// Service markup of 9%, kept in percent so whole amounts scale exactly
pub const SERVICE_MARKUP_PERCENT: f64 = 109.0;

/// Upper bound of a quoted price; keeps cart sums and BIGINT columns in range
pub const MAX_PRICE_RUB: f64 = 1e15;

/// One leaf of the formula table
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Formula {
    pub cross_border_fee_yuan: f64,
    pub local_fee_rub: f64,
}

impl Formula {
    pub fn apply(&self, amount: u64, rate: f64) -> Result<u64, PricingError> {
        let price = (amount as f64 * rate * SERVICE_MARKUP_PERCENT / 100.0
            + self.cross_border_fee_yuan * rate
            + self.local_fee_rub)
            .ceil();
        if !price.is_finite() || !(0.0..=MAX_PRICE_RUB).contains(&price) {
            return Err(PricingError::OutOfRange(price));
        }
        Ok(price as u64)
    }
}

fn cross_border_fee(category: Category) -> f64 {
    match category {
        Category::Light => 40.0,
        Category::Other => 75.0,
        Category::Heavy => 120.0,
    }
}

fn local_fee(order_type: OrderType, location: Location) -> f64 {
    match (order_type, location) {
        (OrderType::Express, _) => 764.0,
        (OrderType::Normal, Location::SaintPetersburg) => 774.0,
        (OrderType::Normal, Location::Izhevsk) => 1075.0,
        (OrderType::Normal, Location::Other) => 1199.0,
    }
}

/// Selects the formula for delivery type × origin × category
pub fn formula_for(order_type: OrderType, location: Location, category: Category) -> Formula {
    Formula {
        cross_border_fee_yuan: cross_border_fee(category),
        local_fee_rub: local_fee(order_type, location),
    }
}

/// Inputs of a single conversion
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvertYuanArgs {
    pub amount: u64,
    pub rate: f64,
    pub order_type: OrderType,
    pub location: Location,
    pub category: Category,
}

/// Pure conversion; same arguments always give the same price
pub fn convert_yuan(args: ConvertYuanArgs) -> Result<u64, PricingError> {
    formula_for(args.order_type, args.location, args.category).apply(args.amount, args.rate)
}

/// Source of the current yuan to rouble rate
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn yuan_rate(&self) -> Result<f64, PricingError>;
}

/// Rate configured by the operator, updatable at runtime
#[derive(Debug)]
pub struct FixedRateProvider {
    rate: RwLock<f64>,
}

impl FixedRateProvider {
    pub fn new(rate: f64) -> Self {
        Self { rate: RwLock::new(rate) }
    }

    pub fn set_rate(&self, rate: f64) {
        *self.rate.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = rate;
    }
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    async fn yuan_rate(&self) -> Result<f64, PricingError> {
        let rate = *self.rate.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if rate.is_finite() && rate > 0.0 {
            Ok(rate)
        } else {
            Err(PricingError::RateUnavailable(format!("configured rate {rate} is not positive")))
        }
    }
}

#[derive(Debug, Deserialize)]
struct DailyRates {
    #[serde(rename = "Valute")]
    valute: Valutes,
}

#[derive(Debug, Deserialize)]
struct Valutes {
    #[serde(rename = "CNY")]
    cny: Valute,
}

#[derive(Debug, Deserialize)]
struct Valute {
    #[serde(rename = "Nominal")]
    nominal: f64,
    #[serde(rename = "Value")]
    value: f64,
}

/// Daily central bank rate fetched over HTTP and cached for `ttl`
pub struct RemoteRateProvider {
    client: reqwest::Client,
    url: String,
    ttl: Duration,
    cached: Mutex<Option<(f64, Instant)>>,
}

impl RemoteRateProvider {
    pub fn new(url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            ttl,
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<f64, PricingError> {
        let unavailable = |e: reqwest::Error| PricingError::RateUnavailable(e.to_string());
        let rates: DailyRates = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)?;

        let cny = rates.valute.cny;
        if cny.nominal <= 0.0 {
            return Err(PricingError::RateUnavailable(format!("invalid nominal {}", cny.nominal)));
        }
        Ok(cny.value / cny.nominal)
    }
}

#[async_trait]
impl RateProvider for RemoteRateProvider {
    async fn yuan_rate(&self) -> Result<f64, PricingError> {
        let mut cached = self.cached.lock().await;
        if let Some((rate, fetched_at)) = *cached {
            if fetched_at.elapsed() < self.ttl {
                return Ok(rate);
            }
        }

        match self.fetch().await {
            Ok(rate) => {
                debug!(rate, "Fetched yuan rate");
                *cached = Some((rate, Instant::now()));
                Ok(rate)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch yuan rate");
                Err(e)
            }
        }
    }
}

/// Resolves formulas against the current rate
#[derive(Clone)]
pub struct PricingEngine {
    rates: Arc<dyn RateProvider>,
}

impl PricingEngine {
    pub fn new(rates: Arc<dyn RateProvider>) -> Self {
        Self { rates }
    }

    pub async fn yuan_rate(&self) -> Result<f64, PricingError> {
        self.rates.yuan_rate().await
    }

    /// Fails when the rate is unavailable or any delivery parameter is unset
    pub async fn apply_formula(&self, amount: u64, meta: &Meta) -> Result<u64, PricingError> {
        let order_type = meta.order_type.ok_or(PricingError::MissingOrderType)?;
        let location = meta.location.ok_or(PricingError::MissingLocation)?;
        let category = meta.category.ok_or(PricingError::MissingCategory)?;
        let rate = self.rates.yuan_rate().await?;

        convert_yuan(ConvertYuanArgs {
            amount,
            rate,
            order_type,
            location,
            category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(order_type: OrderType, location: Location, category: Category) -> ConvertYuanArgs {
        ConvertYuanArgs {
            amount: 100,
            rate: 1.0,
            order_type,
            location,
            category,
        }
    }

    fn quote(args: ConvertYuanArgs) -> u64 {
        convert_yuan(args).unwrap()
    }

    #[test]
    fn test_express_ignores_location() {
        for category in [Category::Light, Category::Heavy, Category::Other] {
            let spb = quote(args(OrderType::Express, Location::SaintPetersburg, category));
            let izh = quote(args(OrderType::Express, Location::Izhevsk, category));
            let other = quote(args(OrderType::Express, Location::Other, category));
            assert_eq!(spb, izh);
            assert_eq!(izh, other);
        }
    }

    #[test]
    fn test_known_values_at_unit_rate() {
        // 100 * 1.09 = 109
        assert_eq!(quote(args(OrderType::Express, Location::Izhevsk, Category::Other)), 109 + 75 + 764);
        assert_eq!(quote(args(OrderType::Express, Location::Other, Category::Light)), 109 + 40 + 764);
        assert_eq!(quote(args(OrderType::Express, Location::Other, Category::Heavy)), 109 + 120 + 764);
        assert_eq!(quote(args(OrderType::Normal, Location::Izhevsk, Category::Other)), 109 + 75 + 1075);
        assert_eq!(
            quote(args(OrderType::Normal, Location::SaintPetersburg, Category::Light)),
            109 + 40 + 774
        );
        assert_eq!(quote(args(OrderType::Normal, Location::Other, Category::Heavy)), 109 + 120 + 1199);
    }

    #[test]
    fn test_result_is_rounded_up() {
        let price = quote(ConvertYuanArgs {
            amount: 1,
            rate: 11.96,
            order_type: OrderType::Normal,
            location: Location::SaintPetersburg,
            category: Category::Light,
        });
        // 13.0364 + 478.4 + 774 = 1265.4364
        assert_eq!(price, 1266);
    }

    #[test]
    fn test_out_of_range_price_is_rejected() {
        let formula = formula_for(OrderType::Express, Location::Other, Category::Light);
        assert!(matches!(formula.apply(u64::MAX, 11.96), Err(PricingError::OutOfRange(_))));
        assert!(matches!(formula.apply(100, f64::INFINITY), Err(PricingError::OutOfRange(_))));
        assert!(matches!(formula.apply(100, f64::NAN), Err(PricingError::OutOfRange(_))));
        assert!(formula.apply(10_000_000, 11.96).is_ok());
    }

    #[tokio::test]
    async fn test_apply_formula_requires_every_parameter() {
        let engine = PricingEngine::new(Arc::new(FixedRateProvider::new(1.0)));
        let mut meta = Meta::default();

        assert_eq!(engine.apply_formula(100, &meta).await, Err(PricingError::MissingOrderType));
        meta.order_type = Some(OrderType::Normal);
        assert_eq!(engine.apply_formula(100, &meta).await, Err(PricingError::MissingLocation));
        meta.location = Some(Location::Izhevsk);
        assert_eq!(engine.apply_formula(100, &meta).await, Err(PricingError::MissingCategory));
        meta.category = Some(Category::Other);
        assert_eq!(engine.apply_formula(100, &meta).await, Ok(109 + 75 + 1075));
    }

    #[tokio::test]
    async fn test_fixed_rate_provider() {
        let provider = FixedRateProvider::new(11.96);
        assert_eq!(provider.yuan_rate().await, Ok(11.96));

        provider.set_rate(0.0);
        assert!(matches!(provider.yuan_rate().await, Err(PricingError::RateUnavailable(_))));
    }
}
