pub mod equipment_range_select;
pub mod kpi_card;
pub mod rrp_breakdown_table;
pub mod rrp_item_table;
pub mod toast;
