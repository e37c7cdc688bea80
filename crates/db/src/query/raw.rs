//! Verbatim SQL as a table reference.

use std::fmt;

use sea_orm::sea_query::{Iden, Quote};

/// A parenthesised SQL text usable wherever sea-query expects a table.
///
/// The text is written exactly as given, without quoting or escaping, so it
/// can be wrapped (`FROM (<text>) AS alias`) but never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSql(String);

impl RawSql {
    /// Wraps SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// The wrapped text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }
}

impl Iden for RawSql {
    fn prepare(&self, s: &mut dyn fmt::Write, _q: Quote) {
        self.unquoted(s);
    }

    fn quoted(&self, _q: Quote) -> String {
        self.to_string()
    }

    fn unquoted(&self, s: &mut dyn fmt::Write) {
        // sea-query's writers are infallible `String`s
        let _ = write!(s, "({})", self.0);
    }
}
