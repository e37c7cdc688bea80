//! `SeaORM` entities.
//!
//! The configuration store (`calculations`, `report_templates`,
//! `calculation_audit_log`) and the warehouse (`deal`, `tranche`,
//! `tranchebal`, `deal_cdi_var_rpt`) live in separate databases; the engine
//! only ever reads the warehouse entities.

pub mod calculation_audit_log;
pub mod calculations;
pub mod deal;
pub mod deal_cdi_var_rpt;
pub mod report_templates;
pub mod sea_orm_active_enums;
pub mod tranche;
pub mod tranchebal;

/// Re-exports of every entity under a short alias.
pub mod prelude {
    pub use super::calculation_audit_log::Entity as CalculationAuditLog;
    pub use super::calculations::Entity as Calculations;
    pub use super::deal::Entity as Deal;
    pub use super::deal_cdi_var_rpt::Entity as DealCdiVarRpt;
    pub use super::report_templates::Entity as ReportTemplates;
    pub use super::tranche::Entity as Tranche;
    pub use super::tranchebal::Entity as Tranchebal;
}
