//! Message rendering
//!
//! Pure functions from products and statuses to [`Message`]s. Nothing here
//! performs I/O or reads the clock; the caller supplies the timestamp.

use chrono::{DateTime, FixedOffset, Utc};

use crate::config::Product;
use crate::traits::{Message, MessageKind, Observation, StockStatus};

/// Timestamp layout used in messages and in the state file
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SOURCE_LINE: &str = "_Source: Official Site Direct_";

/// Format a UTC instant in the report time zone
pub fn format_timestamp(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string()
}

/// Render the "back in stock" notification for a single product
pub fn back_in_stock(product: &Product, order_url_template: &str) -> Message {
    let url = product.order_url(order_url_template);
    let body = format!(
        "🎉 *BWG Back in Stock!*\n\n\
         *{name}*\n\
         💰 ${price}/year\n\
         📦 {desc}\n\
         🔗 [Buy Now]({url})\n\n\
         {SOURCE_LINE}",
        name = product.name,
        price = product.price,
        desc = product.description,
    );

    Message {
        kind: MessageKind::BackInStock,
        title: "BWG In Stock!".to_string(),
        body,
        summary: format!("{} ${}/year", product.name, product.price),
    }
}

/// Render the daily digest covering every observed product
pub fn daily_report(
    observations: &[Observation],
    order_url_template: &str,
    timestamp: &str,
) -> Message {
    let mut lines = vec![
        "📊 *BWG CN2 GIA-E Daily Stock Report*".to_string(),
        format!("⏰ {} Beijing Time", timestamp),
        "📡 Source: Official Site Direct".to_string(),
        String::new(),
    ];

    for observation in observations {
        let product = &observation.product;
        lines.push(format!(
            "{} *${}/year* - {}",
            observation.status.label(),
            product.price,
            product.name
        ));
        lines.push(format!("   {}", product.description));
        lines.push(format!(
            "   [View Details]({})",
            product.order_url(order_url_template)
        ));
        lines.push(String::new());
    }

    lines.push("_Auto-check every few minutes, instant notification when in stock_".to_string());

    let count = |status: StockStatus| {
        observations
            .iter()
            .filter(|observation| observation.status == status)
            .count()
    };

    Message {
        kind: MessageKind::DailyReport,
        title: "BWG Daily Stock Report".to_string(),
        body: lines.join("\n"),
        summary: format!(
            "{} in stock, {} out of stock, {} unknown",
            count(StockStatus::InStock),
            count(StockStatus::OutOfStock),
            count(StockStatus::Unknown)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_ORDER_URL_TEMPLATE, default_products};
    use chrono::TimeZone;

    fn three_observations() -> Vec<Observation> {
        let statuses = [
            StockStatus::InStock,
            StockStatus::OutOfStock,
            StockStatus::Unknown,
        ];
        default_products()
            .into_iter()
            .zip(statuses)
            .map(|(product, status)| Observation::new(product, status))
            .collect()
    }

    #[test]
    fn timestamp_uses_report_zone() {
        let now = Utc.with_ymd_and_hms(2025, 1, 9, 12, 0, 0).unwrap();
        let beijing = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(format_timestamp(now, beijing), "2025-01-09 20:00:00");

        let late = Utc.with_ymd_and_hms(2025, 1, 9, 20, 30, 5).unwrap();
        assert_eq!(format_timestamp(late, beijing), "2025-01-10 04:30:05");
    }

    #[test]
    fn back_in_stock_message() {
        let product = &default_products()[0];
        let message = back_in_stock(product, DEFAULT_ORDER_URL_TEMPLATE);

        assert_eq!(message.kind, MessageKind::BackInStock);
        assert_eq!(message.title, "BWG In Stock!");
        assert_eq!(message.summary, "CN2 GIA-E 10G $49.99/year");
        assert_eq!(
            message.body,
            "🎉 *BWG Back in Stock!*\n\n\
             *CN2 GIA-E 10G*\n\
             💰 $49.99/year\n\
             📦 10G SSD / 0.5G RAM / 1Gbps\n\
             🔗 [Buy Now](https://bwh81.net/cart.php?a=add&pid=94)\n\n\
             _Source: Official Site Direct_"
        );
    }

    #[test]
    fn daily_report_has_one_block_per_product() {
        let message = daily_report(
            &three_observations(),
            DEFAULT_ORDER_URL_TEMPLATE,
            "2025-01-09 20:00:00",
        );

        assert_eq!(message.kind, MessageKind::DailyReport);
        let body = &message.body;
        assert!(body.starts_with("📊 *BWG CN2 GIA-E Daily Stock Report*\n⏰ 2025-01-09 20:00:00 Beijing Time\n"));
        assert!(body.contains("🟢 In Stock *$49.99/year* - CN2 GIA-E 10G\n   10G SSD / 0.5G RAM / 1Gbps\n   [View Details](https://bwh81.net/cart.php?a=add&pid=94)\n"));
        assert!(body.contains("🔴 Out of Stock *$89.99/year* - CN2 GIA-E 20G\n   20G SSD / 1G RAM / 1Gbps\n"));
        assert!(body.contains("⚠️ Unknown *$89.90/year* - CN2 GIA-E 20G\n   20G SSD / 1G RAM / 2.5Gbps\n"));
        assert!(body.ends_with("\n\n_Auto-check every few minutes, instant notification when in stock_"));
        assert_eq!(body.matches("[View Details]").count(), 3);

        assert_eq!(message.summary, "1 in stock, 1 out of stock, 1 unknown");
    }

    #[test]
    fn daily_report_keeps_catalog_order() {
        let message = daily_report(&three_observations(), DEFAULT_ORDER_URL_TEMPLATE, "t");
        let first = message.body.find("pid=94").unwrap();
        let second = message.body.find("pid=105").unwrap();
        let third = message.body.find("pid=132").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn daily_report_with_no_products() {
        let message = daily_report(&[], DEFAULT_ORDER_URL_TEMPLATE, "t");
        assert!(!message.body.contains("View Details"));
        assert_eq!(message.summary, "0 in stock, 0 out of stock, 0 unknown");
    }
}
