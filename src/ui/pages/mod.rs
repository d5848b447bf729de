pub mod equipment;
pub mod rrp;
pub mod settings;

pub use equipment::EquipmentPage;
pub use rrp::RrpPage;
pub use settings::SettingsPage;
