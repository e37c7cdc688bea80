//! Read-only warehouse browsing for deal, tranche and cycle pickers.

use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use vantage_shared::types::PageRequest;

use crate::entities::{deal, tranche, tranchebal};

/// Warehouse browsing repository.
#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    db: DatabaseConnection,
}

impl WarehouseRepository {
    /// Creates a new warehouse repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// One page of deals ordered by deal number, with the total count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_deals(&self, page: &PageRequest) -> Result<(Vec<deal::Model>, u64), DbErr> {
        let paginator = deal::Entity::find()
            .order_by_asc(deal::Column::DlNbr)
            .paginate(&self.db, page.limit());
        let total = paginator.num_items().await?;
        let deals = paginator
            .fetch_page(u64::from(page.page.saturating_sub(1)))
            .await?;
        Ok((deals, total))
    }

    /// Finds a deal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_deal(&self, dl_nbr: i64) -> Result<Option<deal::Model>, DbErr> {
        deal::Entity::find_by_id(dl_nbr).one(&self.db).await
    }

    /// Tranches of a deal ordered by tranche id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_tranches(&self, dl_nbr: i64) -> Result<Vec<tranche::Model>, DbErr> {
        tranche::Entity::find()
            .filter(tranche::Column::DlNbr.eq(dl_nbr))
            .order_by_asc(tranche::Column::TrId)
            .all(&self.db)
            .await
    }

    /// Cycles with balance data, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_cycles(&self) -> Result<Vec<i64>, DbErr> {
        tranchebal::Entity::find()
            .select_only()
            .column(tranchebal::Column::CycleCde)
            .distinct()
            .order_by_desc(tranchebal::Column::CycleCde)
            .into_tuple()
            .all(&self.db)
            .await
    }
}
