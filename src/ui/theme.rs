//! Class helpers shared across pages.

use crate::domain::{PurchaseOrigin, RrpStatus};
use crate::infra::inventory_api::CacheStatus;

pub fn origin_badge(origin: PurchaseOrigin) -> &'static str {
    match origin {
        PurchaseOrigin::Local => "badge badge-local",
        PurchaseOrigin::Foreign => "badge badge-foreign",
    }
}

pub fn status_badge(status: RrpStatus) -> &'static str {
    match status {
        RrpStatus::Approved => "badge badge-local",
        RrpStatus::Rejected => "badge badge-stale",
        RrpStatus::Draft | RrpStatus::Pending => "badge badge-foreign",
    }
}

pub fn cache_badge(status: &CacheStatus) -> Option<&'static str> {
    match status {
        CacheStatus::Fresh => None,
        CacheStatus::Cached => Some("badge badge-local"),
        CacheStatus::Stale => Some("badge badge-stale"),
    }
}

pub fn chip(selected: bool) -> &'static str {
    if selected {
        "chip selected"
    } else {
        "chip"
    }
}

pub fn toggle(active: bool) -> &'static str {
    if active {
        "primary"
    } else {
        ""
    }
}
