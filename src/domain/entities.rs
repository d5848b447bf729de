use std::fmt;

use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};
use uuid::Uuid;

use super::amount::{
    coerce_amount, coerce_percentage, coerce_quantity, coerce_rate, Coercion, FallbackReason,
    DEFAULT_FOREX_RATE,
};
use super::rrp::{
    calculate_totals, RrpCharges, RrpLineItem, RrpTotals, DEFAULT_VAT_RATE_PERCENT,
};

/// Where the goods on an RRP were purchased.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrigin {
    #[default]
    Local,
    Foreign,
}

impl PurchaseOrigin {
    pub fn is_foreign(&self) -> bool {
        matches!(self, Self::Foreign)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Local => "Local",
            Self::Foreign => "Foreign",
        }
    }

    /// Backend flags arrive as `"local"`/`"foreign"`; anything else is treated as local.
    pub fn from_flag(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("foreign") {
            Self::Foreign
        } else {
            Self::Local
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RrpStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl RrpStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }

    pub fn from_flag(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Draft,
        }
    }
}

/// An RRP as stored by the inventory backend.
#[derive(Clone, Debug, PartialEq)]
pub struct RrpRecord {
    pub rrp_number: String,
    pub supplier: String,
    pub invoice_number: String,
    pub invoice_date: Option<Date>,
    pub currency: String,
    pub origin: PurchaseOrigin,
    pub freight_charge: f64,
    pub custom_service_charge: f64,
    pub vat_rate_percent: f64,
    pub items: Vec<RrpLineItem>,
    pub status: RrpStatus,
}

impl RrpRecord {
    pub fn charges(&self) -> RrpCharges {
        RrpCharges {
            freight_charge: self.freight_charge,
            custom_service_charge: self.custom_service_charge,
            vat_rate_percent: self.vat_rate_percent,
            is_foreign: self.origin.is_foreign(),
        }
    }

    pub fn totals(&self) -> RrpTotals {
        calculate_totals(&self.items, &self.charges())
    }
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates.
pub fn parse_invoice_date(raw: &str) -> Option<Date> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(timestamp) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(timestamp.date());
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]")).ok()
}

pub fn format_invoice_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// A field whose text could not be read as a number and was replaced by its default.
#[derive(Clone, Debug, PartialEq)]
pub struct CoercionWarning {
    /// 1-based line number, `None` for order-level fields.
    pub line: Option<usize>,
    pub field: &'static str,
    pub raw: String,
    pub substituted: f64,
}

impl fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(
                f,
                "Line {line}: {} \"{}\" is not a number; using {}",
                self.field, self.raw, self.substituted
            ),
            None => write!(
                f,
                "{} \"{}\" is not a number; using {}",
                self.field, self.raw, self.substituted
            ),
        }
    }
}

fn note(
    coerced: Coercion,
    line: Option<usize>,
    field: &'static str,
    warnings: &mut Vec<CoercionWarning>,
) -> f64 {
    if let Some(FallbackReason::NotANumber(raw)) = &coerced.fallback {
        warnings.push(CoercionWarning {
            line,
            field,
            raw: raw.clone(),
            substituted: coerced.value,
        });
    }
    coerced.value
}

/// Line item as typed into the RRP form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RrpItemDraft {
    pub id: String,
    pub item_name: String,
    #[serde(default)]
    pub part_number: String,
    pub quantity: String,
    pub price: String,
    pub vat: bool,
    #[serde(default)]
    pub vat_percentage: String,
    pub customs_charge: String,
    pub forex_rate: String,
}

impl Default for RrpItemDraft {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            item_name: String::new(),
            part_number: String::new(),
            quantity: "1".to_string(),
            price: String::new(),
            vat: true,
            vat_percentage: String::new(),
            customs_charge: String::new(),
            forex_rate: "1".to_string(),
        }
    }
}

impl RrpItemDraft {
    pub fn from_line_item(item: &RrpLineItem) -> Self {
        Self {
            item_name: item.item_name.clone(),
            part_number: item.part_number.clone(),
            quantity: item.quantity.to_string(),
            price: item.price.to_string(),
            vat: item.vat,
            vat_percentage: item
                .vat_percentage
                .map(|rate| rate.to_string())
                .unwrap_or_default(),
            customs_charge: item.customs_charge.to_string(),
            forex_rate: item.forex_rate.to_string(),
            ..Self::default()
        }
    }

    /// Local purchases carry no forex input, so their rate is always `1.0`.
    pub fn to_line_item(
        &self,
        line: usize,
        charges: &RrpCharges,
        warnings: &mut Vec<CoercionWarning>,
    ) -> RrpLineItem {
        let line = Some(line);
        let forex_rate = if charges.is_foreign {
            note(coerce_rate(&self.forex_rate), line, "Forex rate", warnings)
        } else {
            DEFAULT_FOREX_RATE
        };
        RrpLineItem {
            item_name: self.item_name.trim().to_string(),
            part_number: self.part_number.trim().to_string(),
            price: note(coerce_amount(&self.price), line, "Price", warnings),
            quantity: coerce_quantity(&self.quantity),
            vat: self.vat,
            vat_percentage: self.vat_override(line, charges.vat_rate_percent, warnings),
            customs_charge: note(
                coerce_amount(&self.customs_charge),
                line,
                "Customs charge",
                warnings,
            ),
            forex_rate,
        }
    }

    /// A blank or unreadable override leaves the item on the order rate.
    fn vat_override(
        &self,
        line: Option<usize>,
        order_rate: f64,
        warnings: &mut Vec<CoercionWarning>,
    ) -> Option<f64> {
        let coerced = coerce_percentage(&self.vat_percentage, order_rate);
        let overridden = coerced.fallback.is_none();
        let rate = note(coerced, line, "VAT %", warnings);
        overridden.then_some(rate)
    }
}

/// RRP form state, persisted between sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RrpDraft {
    #[serde(default)]
    pub rrp_number: String,
    pub supplier: String,
    pub invoice_number: String,
    #[serde(default)]
    pub invoice_date: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub origin: PurchaseOrigin,
    pub freight_charge: String,
    #[serde(default)]
    pub custom_service_charge: String,
    pub vat_rate_percent: String,
    pub items: Vec<RrpItemDraft>,
}

impl Default for RrpDraft {
    fn default() -> Self {
        Self::with_vat_rate(DEFAULT_VAT_RATE_PERCENT)
    }
}

/// Everything the workbench shows for a draft.
#[derive(Clone, Debug, PartialEq)]
pub struct DraftEvaluation {
    pub items: Vec<RrpLineItem>,
    pub charges: RrpCharges,
    pub totals: RrpTotals,
    pub warnings: Vec<CoercionWarning>,
}

impl RrpDraft {
    pub fn with_vat_rate(vat_rate_percent: f64) -> Self {
        Self {
            rrp_number: String::new(),
            supplier: String::new(),
            invoice_number: String::new(),
            invoice_date: String::new(),
            currency: "NPR".to_string(),
            origin: PurchaseOrigin::Local,
            freight_charge: String::new(),
            custom_service_charge: String::new(),
            vat_rate_percent: vat_rate_percent.to_string(),
            items: vec![RrpItemDraft::default()],
        }
    }

    pub fn from_record(record: &RrpRecord) -> Self {
        Self {
            rrp_number: record.rrp_number.clone(),
            supplier: record.supplier.clone(),
            invoice_number: record.invoice_number.clone(),
            invoice_date: record
                .invoice_date
                .map(format_invoice_date)
                .unwrap_or_default(),
            currency: record.currency.clone(),
            origin: record.origin,
            freight_charge: record.freight_charge.to_string(),
            custom_service_charge: record.custom_service_charge.to_string(),
            vat_rate_percent: record.vat_rate_percent.to_string(),
            items: record.items.iter().map(RrpItemDraft::from_line_item).collect(),
        }
    }

    pub fn charges(&self, warnings: &mut Vec<CoercionWarning>) -> RrpCharges {
        let is_foreign = self.origin.is_foreign();
        let vat_rate = note(
            coerce_percentage(&self.vat_rate_percent, DEFAULT_VAT_RATE_PERCENT),
            None,
            "VAT rate",
            warnings,
        );
        RrpCharges {
            freight_charge: note(
                coerce_amount(&self.freight_charge),
                None,
                "Freight charge",
                warnings,
            ),
            custom_service_charge: if is_foreign {
                note(
                    coerce_amount(&self.custom_service_charge),
                    None,
                    "Custom service charge",
                    warnings,
                )
            } else {
                0.0
            },
            vat_rate_percent: vat_rate,
            is_foreign,
        }
    }

    pub fn to_line_items(&self, charges: &RrpCharges) -> (Vec<RrpLineItem>, Vec<CoercionWarning>) {
        let mut warnings = Vec::new();
        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| item.to_line_item(index + 1, charges, &mut warnings))
            .collect();
        (items, warnings)
    }

    pub fn evaluate(&self) -> DraftEvaluation {
        let mut charge_warnings = Vec::new();
        let charges = self.charges(&mut charge_warnings);
        let (items, mut warnings) = self.to_line_items(&charges);
        warnings.extend(charge_warnings);
        let totals = calculate_totals(&items, &charges);
        DraftEvaluation {
            items,
            charges,
            totals,
            warnings,
        }
    }

    pub fn add_item(&mut self) -> String {
        let item = RrpItemDraft::default();
        let id = item.id.clone();
        self.items.push(item);
        id
    }

    pub fn remove_item(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    pub fn item_mut(&mut self, id: &str) -> Option<&mut RrpItemDraft> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}
