use dioxus::prelude::*;

use crate::domain::RrpItemDraft;

/// Editable text column of a draft line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemField {
    Name,
    PartNumber,
    Quantity,
    Price,
    VatPercentage,
    CustomsCharge,
    ForexRate,
}

impl ItemField {
    pub fn apply(&self, item: &mut RrpItemDraft, value: String) {
        let slot = match self {
            Self::Name => &mut item.item_name,
            Self::PartNumber => &mut item.part_number,
            Self::Quantity => &mut item.quantity,
            Self::Price => &mut item.price,
            Self::VatPercentage => &mut item.vat_percentage,
            Self::CustomsCharge => &mut item.customs_charge,
            Self::ForexRate => &mut item.forex_rate,
        };
        *slot = value;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemEdit {
    pub id: String,
    pub field: ItemField,
    pub value: String,
}

#[component]
pub fn RrpItemTable(
    items: Vec<RrpItemDraft>,
    foreign: bool,
    on_edit: EventHandler<ItemEdit>,
    on_toggle_vat: EventHandler<String>,
    on_remove: EventHandler<String>,
) -> Element {
    rsx! {
        table {
            thead {
                tr {
                    th { "#" }
                    th { "Item" }
                    th { "Part no." }
                    th { class: "num", "Qty" }
                    th { class: "num", "Price" }
                    if foreign {
                        th { class: "num", "Forex" }
                    }
                    th { class: "num", "Customs" }
                    th { "VAT" }
                    th { class: "num", "VAT %" }
                    th {}
                }
            }
            tbody {
                for (index, item) in items.into_iter().enumerate() {
                    tr { key: "{item.id}",
                        td { "{index + 1}" }
                        td { EditCell { id: item.id.clone(), field: ItemField::Name, value: item.item_name.clone(), on_edit } }
                        td { EditCell { id: item.id.clone(), field: ItemField::PartNumber, value: item.part_number.clone(), on_edit } }
                        td { class: "num", EditCell { id: item.id.clone(), field: ItemField::Quantity, value: item.quantity.clone(), on_edit } }
                        td { class: "num", EditCell { id: item.id.clone(), field: ItemField::Price, value: item.price.clone(), on_edit } }
                        if foreign {
                            td { class: "num", EditCell { id: item.id.clone(), field: ItemField::ForexRate, value: item.forex_rate.clone(), on_edit } }
                        }
                        td { class: "num", EditCell { id: item.id.clone(), field: ItemField::CustomsCharge, value: item.customs_charge.clone(), on_edit } }
                        td {
                            input {
                                r#type: "checkbox",
                                checked: item.vat,
                                onchange: {
                                    let id = item.id.clone();
                                    move |_| on_toggle_vat.call(id.clone())
                                },
                            }
                        }
                        td { class: "num", EditCell { id: item.id.clone(), field: ItemField::VatPercentage, value: item.vat_percentage.clone(), on_edit } }
                        td {
                            button {
                                class: "danger",
                                onclick: {
                                    let id = item.id.clone();
                                    move |_| on_remove.call(id.clone())
                                },
                                "Remove"
                            }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn EditCell(id: String, field: ItemField, value: String, on_edit: EventHandler<ItemEdit>) -> Element {
    rsx! {
        input {
            value: "{value}",
            oninput: move |evt| {
                on_edit.call(ItemEdit {
                    id: id.clone(),
                    field,
                    value: evt.value(),
                })
            },
        }
    }
}
