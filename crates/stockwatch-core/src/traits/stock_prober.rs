// # Stock Prober Trait
//
// Defines the interface for observing whether a product can be ordered.
//
// ## Implementations
//
// - HTTP order page: `stockwatch-probe-http` crate
//
// ## Usage
//
// ```rust,ignore
// use stockwatch_core::{StockProber, StockStatus};
//
// #[tokio::main]
// async fn main() {
//     let prober = /* StockProber implementation */;
//
//     match prober.probe(&product).await {
//         StockStatus::InStock => println!("go buy it"),
//         StockStatus::OutOfStock => println!("sold out"),
//         StockStatus::Unknown => println!("check failed"),
//     }
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Product;

/// Marker shown on the order page of a sold-out product
pub const OUT_OF_STOCK_MARKER: &str = "Out of Stock";

/// Billing-cycle labels that only appear on a priced order form
pub const BILLING_CYCLE_MARKERS: [&str; 2] = ["Annually", "Monthly"];

/// Stock status of one product for one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// The order form is available
    InStock,
    /// The product is sold out
    OutOfStock,
    /// The check failed; says nothing about stock
    Unknown,
}

impl StockStatus {
    /// Human-readable label with its status icon
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::InStock => "🟢 In Stock",
            StockStatus::OutOfStock => "🔴 Out of Stock",
            StockStatus::Unknown => "⚠️ Unknown",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StockStatus::InStock => "in stock",
            StockStatus::OutOfStock => "out of stock",
            StockStatus::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A product paired with the status observed for it this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The product that was checked
    pub product: Product,
    /// What the check found
    pub status: StockStatus,
}

impl Observation {
    /// Create a new observation
    pub fn new(product: Product, status: StockStatus) -> Self {
        Self { product, status }
    }
}

/// Classify a successfully fetched order page
///
/// The sold-out marker wins over everything else. A page with neither
/// marker counts as out of stock, not unknown: an unrecognized layout is
/// treated the same as a confirmed sell-out.
pub fn classify_page(body: &str) -> StockStatus {
    if body.contains(OUT_OF_STOCK_MARKER) {
        return StockStatus::OutOfStock;
    }
    if BILLING_CYCLE_MARKERS
        .iter()
        .any(|marker| body.contains(marker))
    {
        return StockStatus::InStock;
    }
    StockStatus::OutOfStock
}

/// Trait for stock prober implementations
///
/// # Contract
///
/// `probe` never fails. Transport errors, timeouts and unreadable
/// responses are logged by the implementation and reported as
/// [`StockStatus::Unknown`]. A fetched page is classified with
/// [`classify_page`].
///
/// Probers perform exactly one request per call. Pacing between probes and
/// any decision about notifications belong to the run controller.
#[async_trait]
pub trait StockProber: Send + Sync {
    /// Check the current stock status of a product
    async fn probe(&self, product: &Product) -> StockStatus;

    /// Get the prober name (for logging/debugging)
    fn prober_name(&self) -> &'static str;
}
