//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod audit_log;
pub mod calculation;
pub mod report_template;
pub mod warehouse;

pub use audit_log::{AuditLogError, AuditLogRepository};
pub use calculation::{
    CalculationFilter, CalculationRepository, CalculationStoreError, CreateCalculationInput,
    UpdateCalculationInput, source_of,
};
pub use report_template::{
    ReportStoreError, ReportTemplateRepository, SavedReport, UpdateReportInput,
};
pub use warehouse::WarehouseRepository;
