//! RRP cost allocation through the public domain API.

use hangar_stores::domain::{
    calculate_totals, calculate_totals_from_value, validate_draft, PurchaseOrigin, RrpCharges,
    RrpDraft, RrpError, RrpLineItem,
};
use proptest::prelude::*;
use rstest::rstest;
use serde_json::json;

fn no_vat() -> RrpCharges {
    RrpCharges {
        vat_rate_percent: 0.0,
        ..RrpCharges::default()
    }
}

fn priced(price: f64) -> RrpLineItem {
    RrpLineItem {
        price,
        quantity: 1,
        ..RrpLineItem::default()
    }
}

#[test]
fn single_local_item_totals_its_price() {
    let totals = calculate_totals(&[priced(100.0)], &no_vat());
    assert_eq!(totals.items[0].item_price, 100.0);
    assert_eq!(totals.items[0].total, 100.0);
    assert_eq!(totals.grand_total(), 100.0);
}

#[rstest]
#[case::priced(50.0)]
#[case::unpriced(0.0)]
fn equal_items_split_freight_evenly(#[case] price: f64) {
    let charges = RrpCharges {
        freight_charge: 100.0,
        ..no_vat()
    };
    let totals = calculate_totals(&[priced(price), priced(price)], &charges);
    assert_eq!(totals.items[0].freight_charge, 50.0);
    assert_eq!(totals.items[1].freight_charge, 50.0);
}

#[test]
fn untyped_payload_with_bad_price_still_totals() {
    let (totals, err) = calculate_totals_from_value(&json!([{"item_price": "abc"}]), &no_vat());
    assert!(err.is_none());
    assert_eq!(totals.items.len(), 1);
    assert_eq!(totals.items[0].item_price, 0.0);
}

#[test]
fn untyped_payload_that_is_not_a_list_reports_error() {
    let (totals, err) = calculate_totals_from_value(&json!("items"), &no_vat());
    assert_eq!(err, Some(RrpError::ItemsNotAList { found: "a string" }));
    assert_eq!(totals.grand_total(), 0.0);
}

#[test]
fn foreign_draft_evaluates_end_to_end() {
    let mut draft = RrpDraft {
        supplier: "Avio Parts".to_string(),
        invoice_number: "AP-2024-118".to_string(),
        origin: PurchaseOrigin::Foreign,
        freight_charge: "200".to_string(),
        custom_service_charge: "100".to_string(),
        vat_rate_percent: "10".to_string(),
        ..RrpDraft::default()
    };
    {
        let item = &mut draft.items[0];
        item.item_name = "Starter generator".to_string();
        item.price = "10".to_string();
        item.forex_rate = "100".to_string();
        item.customs_charge = "50".to_string();
    }

    assert!(validate_draft(&draft).is_empty());
    let evaluation = draft.evaluate();
    let line = &evaluation.totals.items[0];
    assert_eq!(line.item_price, 1000.0);
    assert_eq!(line.freight_charge, 200.0);
    assert_eq!(line.custom_service_charge, 100.0);
    assert_eq!(line.customs_amount, 50.0);
    assert!((line.vat_amount - 135.0).abs() < 1e-9);
    assert!((evaluation.totals.grand_total() - 1485.0).abs() < 1e-9);
}

proptest! {
    #[test]
    fn freight_shares_add_up_to_the_charge(
        prices in prop::collection::vec(0.0f64..10_000.0, 1..10),
        freight in 0.0f64..5_000.0,
    ) {
        let items: Vec<RrpLineItem> = prices.into_iter().map(priced).collect();
        let charges = RrpCharges { freight_charge: freight, ..no_vat() };
        let totals = calculate_totals(&items, &charges);
        let allocated: f64 = totals.items.iter().map(|item| item.freight_charge).sum();
        prop_assert!((allocated - freight).abs() < 1e-6);
    }
}
