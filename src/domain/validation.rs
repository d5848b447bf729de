//! Checks run before an RRP draft is considered complete.
//!
//! Validation never blocks the live totals; the workbench lists the issues next to the
//! breakdown so the clerk can fix them before submitting the document.

use thiserror::Error;

use super::amount::parse_amount;
use super::entities::{parse_invoice_date, RrpDraft, RrpItemDraft};

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationIssue {
    #[error("Supplier is required")]
    MissingSupplier,
    #[error("Invoice number is required")]
    MissingInvoiceNumber,
    #[error("Invoice number \"{0}\" may only contain letters, digits, '-', '/' and '.'")]
    InvalidInvoiceNumber(String),
    #[error("Invoice date \"{0}\" is not a valid YYYY-MM-DD date")]
    InvalidInvoiceDate(String),
    #[error("VAT rate must be a number between 0 and 100")]
    InvalidVatRate,
    #[error("Add at least one item")]
    NoItems,
    #[error("Line {line}: item name is required")]
    MissingItemName { line: usize },
    #[error("Line {line}: quantity \"{raw}\" must be a whole number")]
    InvalidQuantity { line: usize, raw: String },
    #[error("Line {line}: {field} cannot be negative")]
    NegativeItemAmount { line: usize, field: &'static str },
    #[error("{field} cannot be negative")]
    NegativeCharge { field: &'static str },
    #[error("Line {line}: customs charge is required for foreign purchases")]
    MissingCustomsCharge { line: usize },
    #[error("Line {line}: forex rate must be greater than zero")]
    InvalidForexRate { line: usize },
    #[error("Line {line}: VAT % \"{raw}\" must be a number between 0 and 100")]
    InvalidItemVatRate { line: usize, raw: String },
}

pub fn validate_draft(draft: &RrpDraft) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if draft.supplier.trim().is_empty() {
        issues.push(ValidationIssue::MissingSupplier);
    }

    let invoice_number = draft.invoice_number.trim();
    if invoice_number.is_empty() {
        issues.push(ValidationIssue::MissingInvoiceNumber);
    } else if !is_document_number(invoice_number) {
        issues.push(ValidationIssue::InvalidInvoiceNumber(
            invoice_number.to_string(),
        ));
    }

    let invoice_date = draft.invoice_date.trim();
    if !invoice_date.is_empty() && parse_invoice_date(invoice_date).is_none() {
        issues.push(ValidationIssue::InvalidInvoiceDate(invoice_date.to_string()));
    }

    if !is_blank_or_percentage(&draft.vat_rate_percent) {
        issues.push(ValidationIssue::InvalidVatRate);
    }

    for (field, raw) in [
        ("Freight charge", &draft.freight_charge),
        ("Custom service charge", &draft.custom_service_charge),
    ] {
        if parse_amount(raw).is_some_and(|value| value < 0.0) {
            issues.push(ValidationIssue::NegativeCharge { field });
        }
    }

    if draft.items.is_empty() {
        issues.push(ValidationIssue::NoItems);
    }

    let foreign = draft.origin.is_foreign();
    for (index, item) in draft.items.iter().enumerate() {
        validate_item(index + 1, item, foreign, &mut issues);
    }

    issues
}

fn validate_item(line: usize, item: &RrpItemDraft, foreign: bool, issues: &mut Vec<ValidationIssue>) {
    if item.item_name.trim().is_empty() {
        issues.push(ValidationIssue::MissingItemName { line });
    }

    let quantity = item.quantity.trim();
    if !quantity.is_empty() && quantity.parse::<u32>().is_err() {
        issues.push(ValidationIssue::InvalidQuantity {
            line,
            raw: quantity.to_string(),
        });
    }

    for (field, raw) in [("price", &item.price), ("customs charge", &item.customs_charge)] {
        if parse_amount(raw).is_some_and(|value| value < 0.0) {
            issues.push(ValidationIssue::NegativeItemAmount { line, field });
        }
    }

    if !is_blank_or_percentage(&item.vat_percentage) {
        issues.push(ValidationIssue::InvalidItemVatRate {
            line,
            raw: item.vat_percentage.trim().to_string(),
        });
    }

    if foreign {
        if item.customs_charge.trim().is_empty() {
            issues.push(ValidationIssue::MissingCustomsCharge { line });
        }
        if parse_amount(&item.forex_rate).is_some_and(|rate| rate <= 0.0) {
            issues.push(ValidationIssue::InvalidForexRate { line });
        }
    }
}

fn is_blank_or_percentage(raw: &str) -> bool {
    raw.trim().is_empty() || parse_amount(raw).is_some_and(|rate| (0.0..=100.0).contains(&rate))
}

/// Letters, digits and the separators suppliers use on invoice numbers.
fn is_document_number(value: &str) -> bool {
    value
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '/' | '.' | ' '))
        && value.chars().any(|ch| ch.is_ascii_alphanumeric())
}
