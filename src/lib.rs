//! Stores-office companion: RRP cost breakdowns and equipment number selection.

pub mod app;
pub mod domain;
pub mod infra;
pub mod ui;
pub mod util;
