//! Domain logic: RRP cost breakdowns and equipment number expansion.

pub mod amount;
pub mod app_state;
pub mod entities;
pub mod equipment_range;
pub mod rrp;
pub mod validation;

pub use app_state::{AppState, CacheResource, CacheTimestamps, PersistedState, Settings};
pub use entities::{
    CoercionWarning, DraftEvaluation, PurchaseOrigin, RrpDraft, RrpItemDraft, RrpRecord,
    RrpStatus,
};
pub use equipment_range::{
    compact_numbers, expand_equipment_numbers, filter_suggestions, selection_to_numbers,
    EquipmentRange, EquipmentSuggestions, SuggestionGroup,
};
pub use rrp::{
    calculate_item_total, calculate_totals, calculate_totals_from_value, format_amount,
    AllocationBasis, ItemBreakdown, RrpCharges, RrpError, RrpLineItem, RrpTotals,
};
pub use validation::{validate_draft, ValidationIssue};
