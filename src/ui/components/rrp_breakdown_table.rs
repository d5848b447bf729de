use dioxus::prelude::*;

use crate::domain::{format_amount, ItemBreakdown, RrpLineItem, RrpTotals};

#[derive(Clone, Debug, PartialEq)]
pub struct BreakdownRow {
    pub label: String,
    pub breakdown: ItemBreakdown,
}

/// Pairs each line with its breakdown, labelling unnamed lines by position.
pub fn breakdown_rows(items: &[RrpLineItem], totals: &RrpTotals) -> Vec<BreakdownRow> {
    items
        .iter()
        .zip(totals.items.iter())
        .enumerate()
        .map(|(index, (item, breakdown))| BreakdownRow {
            label: if item.item_name.is_empty() {
                format!("Line {}", index + 1)
            } else {
                item.item_name.clone()
            },
            breakdown: *breakdown,
        })
        .collect()
}

#[component]
pub fn RrpBreakdownTable(rows: Vec<BreakdownRow>, aggregate: ItemBreakdown, foreign: bool) -> Element {
    rsx! {
        table {
            thead {
                tr {
                    th { "Item" }
                    th { class: "num", "Price" }
                    th { class: "num", "Freight" }
                    th { class: "num", "Customs" }
                    if foreign {
                        th { class: "num", "Service charge" }
                    }
                    th { class: "num", "VAT" }
                    th { class: "num", "Total" }
                }
            }
            tbody {
                for row in rows {
                    BreakdownLine { label: row.label, breakdown: row.breakdown, foreign }
                }
            }
            tfoot {
                BreakdownLine { label: "Total".to_string(), breakdown: aggregate, foreign }
            }
        }
    }
}

#[component]
fn BreakdownLine(label: String, breakdown: ItemBreakdown, foreign: bool) -> Element {
    rsx! {
        tr {
            td { "{label}" }
            td { class: "num", "{format_amount(breakdown.item_price)}" }
            td { class: "num", "{format_amount(breakdown.freight_charge)}" }
            td { class: "num", "{format_amount(breakdown.customs_amount)}" }
            if foreign {
                td { class: "num", "{format_amount(breakdown.custom_service_charge)}" }
            }
            td { class: "num", "{format_amount(breakdown.vat_amount)}" }
            td { class: "num", "{format_amount(breakdown.total)}" }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{calculate_totals, RrpCharges};

    #[test]
    fn rows_follow_item_order_and_name_blank_lines() {
        let items = vec![
            RrpLineItem {
                item_name: "Gasket".to_string(),
                price: 30.0,
                ..RrpLineItem::default()
            },
            RrpLineItem {
                price: 70.0,
                ..RrpLineItem::default()
            },
        ];
        let charges = RrpCharges {
            vat_rate_percent: 0.0,
            ..RrpCharges::default()
        };
        let totals = calculate_totals(&items, &charges);
        let rows = breakdown_rows(&items, &totals);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "Gasket");
        assert_eq!(rows[1].label, "Line 2");
        assert_eq!(rows[1].breakdown.item_price, 70.0);
    }
}
