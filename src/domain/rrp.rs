//! RRP (receive & reconciliation/payment) cost breakdowns.
//!
//! Each line item is converted to local currency with its forex rate, then picks up a share
//! of the order-level freight and customs-service charges proportional to its converted
//! price. VAT is charged on the landed cost of the item when the item is VAT-able.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::amount::{
    default_forex_rate, lenient_amount, lenient_flag, lenient_percentage, lenient_quantity,
    lenient_rate,
};

pub const DEFAULT_VAT_RATE_PERCENT: f64 = 13.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RrpError {
    #[error("expected a list of RRP items but found {found}")]
    ItemsNotAList { found: &'static str },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RrpLineItem {
    #[serde(default, alias = "itemName", alias = "name", deserialize_with = "lenient_text")]
    pub item_name: String,
    #[serde(default, alias = "partNumber", deserialize_with = "lenient_text")]
    pub part_number: String,
    #[serde(
        default,
        alias = "item_price",
        alias = "itemPrice",
        deserialize_with = "lenient_amount"
    )]
    pub price: f64,
    /// Shown on the document only; never multiplied into `price`.
    #[serde(default, alias = "qty", deserialize_with = "lenient_quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub vat: bool,
    /// Overrides the order VAT rate for this item when present.
    #[serde(
        default,
        alias = "vatPercentage",
        deserialize_with = "lenient_percentage"
    )]
    pub vat_percentage: Option<f64>,
    #[serde(default, alias = "customsCharge", deserialize_with = "lenient_amount")]
    pub customs_charge: f64,
    #[serde(
        default = "default_forex_rate",
        alias = "forexRate",
        deserialize_with = "lenient_rate"
    )]
    pub forex_rate: f64,
}

impl Default for RrpLineItem {
    fn default() -> Self {
        Self {
            item_name: String::new(),
            part_number: String::new(),
            price: 0.0,
            quantity: 0,
            vat: false,
            vat_percentage: None,
            customs_charge: 0.0,
            forex_rate: default_forex_rate(),
        }
    }
}

impl RrpLineItem {
    /// Price converted to local currency.
    pub fn local_price(&self) -> f64 {
        self.price * self.forex_rate
    }

    fn vat_rate_percent(&self, charges: &RrpCharges) -> f64 {
        self.vat_percentage.unwrap_or(charges.vat_rate_percent)
    }
}

/// Order-level charges that are spread across the line items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RrpCharges {
    pub freight_charge: f64,
    /// Only applied to foreign purchases.
    pub custom_service_charge: f64,
    pub vat_rate_percent: f64,
    pub is_foreign: bool,
}

impl Default for RrpCharges {
    fn default() -> Self {
        Self {
            freight_charge: 0.0,
            custom_service_charge: 0.0,
            vat_rate_percent: DEFAULT_VAT_RATE_PERCENT,
            is_foreign: false,
        }
    }
}

/// What each item's share of the order-level charges is measured against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AllocationBasis {
    pub total_item_price: f64,
    pub item_count: usize,
}

impl AllocationBasis {
    pub fn from_items(items: &[RrpLineItem]) -> Self {
        Self {
            total_item_price: items.iter().map(RrpLineItem::local_price).sum(),
            item_count: items.len(),
        }
    }

    /// Fraction of the order charges carried by an item with the given local price.
    ///
    /// Falls back to an equal split when the order has no priced items.
    pub fn share_of(&self, item_price: f64) -> f64 {
        if self.total_item_price != 0.0 {
            item_price / self.total_item_price
        } else if self.item_count > 0 {
            1.0 / self.item_count as f64
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemBreakdown {
    pub item_price: f64,
    pub freight_charge: f64,
    pub customs_amount: f64,
    pub custom_service_charge: f64,
    pub vat_amount: f64,
    pub total: f64,
}

impl AddAssign for ItemBreakdown {
    fn add_assign(&mut self, other: Self) {
        self.item_price += other.item_price;
        self.freight_charge += other.freight_charge;
        self.customs_amount += other.customs_amount;
        self.custom_service_charge += other.custom_service_charge;
        self.vat_amount += other.vat_amount;
        self.total += other.total;
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RrpTotals {
    pub items: Vec<ItemBreakdown>,
    pub aggregate: ItemBreakdown,
}

impl RrpTotals {
    pub fn grand_total(&self) -> f64 {
        self.aggregate.total
    }
}

pub fn calculate_item_total(
    item: &RrpLineItem,
    basis: &AllocationBasis,
    charges: &RrpCharges,
) -> ItemBreakdown {
    let item_price = item.local_price();
    let share = basis.share_of(item_price);
    let freight_charge = share * charges.freight_charge;
    let custom_service_charge = if charges.is_foreign {
        share * charges.custom_service_charge
    } else {
        0.0
    };
    let customs_amount = item.customs_charge;

    let landed = item_price + freight_charge + customs_amount + custom_service_charge;
    let vat_amount = if item.vat {
        landed * item.vat_rate_percent(charges) / 100.0
    } else {
        0.0
    };

    ItemBreakdown {
        item_price,
        freight_charge,
        customs_amount,
        custom_service_charge,
        vat_amount,
        total: landed + vat_amount,
    }
}

pub fn calculate_totals(items: &[RrpLineItem], charges: &RrpCharges) -> RrpTotals {
    let basis = AllocationBasis::from_items(items);
    let breakdowns: Vec<ItemBreakdown> = items
        .iter()
        .map(|item| calculate_item_total(item, &basis, charges))
        .collect();

    let mut aggregate = ItemBreakdown::default();
    for breakdown in &breakdowns {
        aggregate += *breakdown;
    }

    RrpTotals {
        items: breakdowns,
        aggregate,
    }
}

/// Decodes an untyped item list, coercing every field that cannot be read.
pub fn decode_line_items(items: &Value) -> Result<Vec<RrpLineItem>, RrpError> {
    let entries = items.as_array().ok_or(RrpError::ItemsNotAList {
        found: json_kind(items),
    })?;

    Ok(entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value::<RrpLineItem>(entry.clone()).unwrap_or_else(|err| {
                tracing::warn!(index, %err, "RRP item could not be decoded; using zero values");
                RrpLineItem::default()
            })
        })
        .collect())
}

/// Totals for an untyped payload.
///
/// A payload that is not a list yields the zero aggregate together with the error, so
/// callers can keep rendering while telling the user what went wrong.
pub fn calculate_totals_from_value(
    items: &Value,
    charges: &RrpCharges,
) -> (RrpTotals, Option<RrpError>) {
    match decode_line_items(items) {
        Ok(items) => (calculate_totals(&items, charges), None),
        Err(err) => {
            tracing::error!(%err, "RRP totals fell back to zero");
            (RrpTotals::default(), Some(err))
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    })
}

/// Two decimals with thousands separators, e.g. `-1,234.50`.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "0.00".to_string();
    }
    let rounded = format!("{:.2}", value.abs());
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn priced(price: f64) -> RrpLineItem {
        RrpLineItem {
            price,
            quantity: 1,
            ..RrpLineItem::default()
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn single_local_item_without_charges_totals_its_price() {
        let totals = calculate_totals(&[priced(100.0)], &RrpCharges::default());
        assert_eq!(totals.items.len(), 1);
        assert_close(totals.aggregate.item_price, 100.0);
        assert_close(totals.aggregate.total, 100.0);
        assert_close(totals.aggregate.vat_amount, 0.0);
    }

    #[test]
    fn freight_splits_evenly_between_equal_items() {
        let charges = RrpCharges {
            freight_charge: 100.0,
            ..RrpCharges::default()
        };
        let totals = calculate_totals(&[priced(40.0), priced(40.0)], &charges);
        assert_close(totals.items[0].freight_charge, 50.0);
        assert_close(totals.items[1].freight_charge, 50.0);
        assert_close(totals.aggregate.total, 180.0);
    }

    #[test]
    fn zero_priced_order_splits_freight_equally() {
        let charges = RrpCharges {
            freight_charge: 100.0,
            ..RrpCharges::default()
        };
        let totals = calculate_totals(&[priced(0.0), priced(0.0)], &charges);
        assert_close(totals.items[0].freight_charge, 50.0);
        assert_close(totals.items[1].freight_charge, 50.0);
        assert_close(totals.aggregate.freight_charge, 100.0);
    }

    #[test]
    fn zero_priced_foreign_order_splits_custom_service_equally() {
        let charges = RrpCharges {
            custom_service_charge: 90.0,
            is_foreign: true,
            ..RrpCharges::default()
        };
        let totals = calculate_totals(&[priced(0.0), priced(0.0), priced(0.0)], &charges);
        for item in &totals.items {
            assert_close(item.custom_service_charge, 30.0);
        }
    }

    #[test]
    fn freight_follows_forex_adjusted_price() {
        let usd = RrpLineItem {
            price: 10.0,
            forex_rate: 3.0,
            ..RrpLineItem::default()
        };
        let local = priced(10.0);
        let charges = RrpCharges {
            freight_charge: 40.0,
            ..RrpCharges::default()
        };
        let totals = calculate_totals(&[usd, local], &charges);
        assert_close(totals.items[0].item_price, 30.0);
        assert_close(totals.items[0].freight_charge, 30.0);
        assert_close(totals.items[1].freight_charge, 10.0);
    }

    #[test]
    fn foreign_item_carries_customs_service_and_vat() {
        let item = RrpLineItem {
            price: 100.0,
            forex_rate: 2.0,
            vat: true,
            customs_charge: 20.0,
            ..RrpLineItem::default()
        };
        let charges = RrpCharges {
            freight_charge: 30.0,
            custom_service_charge: 50.0,
            vat_rate_percent: 13.0,
            is_foreign: true,
        };
        let basis = AllocationBasis::from_items(&[item.clone()]);
        let breakdown = calculate_item_total(&item, &basis, &charges);
        assert_close(breakdown.item_price, 200.0);
        assert_close(breakdown.freight_charge, 30.0);
        assert_close(breakdown.customs_amount, 20.0);
        assert_close(breakdown.custom_service_charge, 50.0);
        assert_close(breakdown.vat_amount, 300.0 * 0.13);
        assert_close(breakdown.total, 339.0);
    }

    #[test]
    fn custom_service_charge_ignored_for_local_purchases() {
        let charges = RrpCharges {
            custom_service_charge: 500.0,
            ..RrpCharges::default()
        };
        let totals = calculate_totals(&[priced(100.0)], &charges);
        assert_close(totals.aggregate.custom_service_charge, 0.0);
        assert_close(totals.aggregate.total, 100.0);
    }

    #[test]
    fn item_vat_percentage_overrides_order_rate() {
        let item = RrpLineItem {
            price: 200.0,
            vat: true,
            vat_percentage: Some(5.0),
            ..RrpLineItem::default()
        };
        let totals = calculate_totals(&[item], &RrpCharges::default());
        assert_close(totals.aggregate.vat_amount, 10.0);
    }

    #[test]
    fn quantity_is_not_multiplied_into_price() {
        let item = RrpLineItem {
            price: 25.0,
            quantity: 4,
            ..RrpLineItem::default()
        };
        let totals = calculate_totals(&[item], &RrpCharges::default());
        assert_close(totals.aggregate.total, 25.0);
    }

    #[test]
    fn calculating_does_not_touch_inputs() {
        let items = vec![priced(10.0), priced(20.0)];
        let snapshot = items.clone();
        let _ = calculate_totals(&items, &RrpCharges::default());
        assert_eq!(items, snapshot);
    }

    #[test]
    fn empty_order_totals_zero() {
        let charges = RrpCharges {
            freight_charge: 100.0,
            ..RrpCharges::default()
        };
        let totals = calculate_totals(&[], &charges);
        assert!(totals.items.is_empty());
        assert_eq!(totals.aggregate, ItemBreakdown::default());
    }

    #[test]
    fn non_numeric_price_decodes_as_zero() {
        let item: RrpLineItem =
            serde_json::from_value(json!({"item_price": "abc", "vat": true})).unwrap();
        assert_eq!(item.price, 0.0);
        assert_eq!(item.forex_rate, 1.0);

        let breakdown = calculate_item_total(
            &item,
            &AllocationBasis::from_items(&[item.clone()]),
            &RrpCharges::default(),
        );
        assert_close(breakdown.item_price, 0.0);
        assert_close(breakdown.total, 0.0);
    }

    #[rstest]
    #[case(json!({"items": []}), "an object")]
    #[case(json!("oops"), "a string")]
    #[case(json!(null), "null")]
    #[case(json!(12), "a number")]
    fn non_list_payload_yields_zero_totals_and_error(
        #[case] payload: Value,
        #[case] kind: &'static str,
    ) {
        let charges = RrpCharges {
            freight_charge: 100.0,
            ..RrpCharges::default()
        };
        let (totals, error) = calculate_totals_from_value(&payload, &charges);
        assert_eq!(totals, RrpTotals::default());
        assert_eq!(error, Some(RrpError::ItemsNotAList { found: kind }));
    }

    #[test]
    fn undecodable_elements_count_as_zero_items() {
        let payload = json!([
            {"itemPrice": "150", "forexRate": "0", "qty": "3", "customsCharge": null},
            "not an item",
            {"price": 50}
        ]);
        let (totals, error) = calculate_totals_from_value(
            &payload,
            &RrpCharges {
                freight_charge: 20.0,
                ..RrpCharges::default()
            },
        );
        assert!(error.is_none());
        assert_eq!(totals.items.len(), 3);
        assert_close(totals.items[0].item_price, 150.0);
        assert_close(totals.items[0].freight_charge, 15.0);
        assert_close(totals.items[1].total, 0.0);
        assert_close(totals.items[2].freight_charge, 5.0);
    }

    #[rstest]
    #[case(0.0, "0.00")]
    #[case(12.346, "12.35")]
    #[case(1234.5, "1,234.50")]
    #[case(1234567.891, "1,234,567.89")]
    #[case(-9876.5, "-9,876.50")]
    #[case(-0.001, "0.00")]
    #[case(f64::NAN, "0.00")]
    fn amounts_format_for_display(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(format_amount(value), expected);
    }

    proptest! {
        #[test]
        fn allocated_charges_sum_to_order_charges(
            prices in prop::collection::vec(0.0f64..10_000.0, 1..12),
            freight in 0.0f64..5_000.0,
            service in 0.0f64..5_000.0,
        ) {
            let items: Vec<RrpLineItem> = prices.iter().copied().map(priced).collect();
            let charges = RrpCharges {
                freight_charge: freight,
                custom_service_charge: service,
                is_foreign: true,
                ..RrpCharges::default()
            };
            let totals = calculate_totals(&items, &charges);
            prop_assert!((totals.aggregate.freight_charge - freight).abs() < 1e-6);
            prop_assert!((totals.aggregate.custom_service_charge - service).abs() < 1e-6);
        }

        #[test]
        fn aggregate_total_is_sum_of_item_totals(
            prices in prop::collection::vec(0.0f64..10_000.0, 0..12),
            vat in any::<bool>(),
        ) {
            let items: Vec<RrpLineItem> = prices
                .iter()
                .map(|price| RrpLineItem { price: *price, vat, ..RrpLineItem::default() })
                .collect();
            let totals = calculate_totals(&items, &RrpCharges::default());
            let summed: f64 = totals.items.iter().map(|item| item.total).sum();
            prop_assert!((totals.aggregate.total - summed).abs() < 1e-6);
        }
    }
}
