//! SQL generation for report execution.
//!
//! Everything that turns calculations into SQL text lives here; executing the
//! result is the resolver's job.

mod builder;
mod error;
mod raw;


pub use builder::{
    BASE_CTE, CYCLE_CODE, CompiledQuery, DEAL_NUMBER, QueryBuilder, RAW_SQL_ALIAS, TRANCHE_ID,
};
pub use error::QueryError;
pub use raw::RawSql;
