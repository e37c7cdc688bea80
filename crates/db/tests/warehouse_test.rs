//! Integration tests for warehouse browsing.

mod common;

use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, Set};
use vantage_db::entities::{deal, tranche, tranchebal};
use vantage_db::migration::warehouse::create_warehouse_tables;
use vantage_db::repositories::WarehouseRepository;
use vantage_shared::types::PageRequest;

#[tokio::test]
async fn test_warehouse_tables_create_on_sqlite() {
    let db = common::memory_db().await;
    create_warehouse_tables(&db)
        .await
        .expect("Failed to create warehouse tables");
    // existing tables are left alone
    create_warehouse_tables(&db)
        .await
        .expect("Second create should be a no-op");

    deal::Entity::insert(deal::ActiveModel {
        dl_nbr: Set(1),
        issr_cde: Set(None),
        cdi_file_nme: Set(None),
        cdb_cdi_file_nme: Set(None),
    })
    .exec_without_returning(&db)
    .await
    .unwrap();
    tranche::Entity::insert(tranche::ActiveModel {
        dl_nbr: Set(1),
        tr_id: Set("A".to_string()),
        tr_cusip_id: Set(None),
    })
    .exec_without_returning(&db)
    .await
    .unwrap();
    tranchebal::Entity::insert(tranchebal::ActiveModel {
        dl_nbr: Set(1),
        tr_id: Set("A".to_string()),
        cycle_cde: Set(202_404),
        tr_end_bal_amt: Set(Some(dec!(98765432.10))),
        tr_pass_thru_rte: Set(Some(dec!(0.0425))),
        tr_accrl_days: Set(Some(30)),
        tr_int_accrl_amt: Set(None),
        tr_int_dstrb_amt: Set(None),
        tr_prin_dstrb_amt: Set(None),
        tr_prin_rel_ls_amt: Set(None),
        tr_cash_dstrb_amt: Set(None),
    })
    .exec_without_returning(&db)
    .await
    .unwrap();

    let stored = tranchebal::Entity::find().one(&db).await.unwrap().unwrap();
    assert_eq!(stored.tr_end_bal_amt, Some(dec!(98765432.10)));
}

#[tokio::test]
async fn test_list_deals_paginates_in_deal_order() {
    let repo = WarehouseRepository::new(common::warehouse().await);

    let (first, total) = repo
        .list_deals(&PageRequest {
            page: 1,
            per_page: 4,
        })
        .await
        .expect("Failed to list deals");
    assert_eq!(total, 6);
    let numbers: Vec<i64> = first.iter().map(|d| d.dl_nbr).collect();
    assert_eq!(numbers, [1001, 1002, 1003, 2001]);

    let (second, _) = repo
        .list_deals(&PageRequest {
            page: 2,
            per_page: 4,
        })
        .await
        .unwrap();
    let numbers: Vec<i64> = second.iter().map(|d| d.dl_nbr).collect();
    assert_eq!(numbers, [2002, 2003]);
}

#[tokio::test]
async fn test_tranches_and_cycles() {
    let repo = WarehouseRepository::new(common::warehouse().await);

    let tranches: Vec<String> = repo
        .list_tranches(1001)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.tr_id)
        .collect();
    assert_eq!(tranches, ["A", "B", "C"]);
    assert!(repo.list_tranches(2001).await.unwrap().is_empty());

    assert_eq!(
        repo.list_cycles().await.unwrap(),
        [common::CYCLE, common::PREVIOUS_CYCLE]
    );

    let deal = repo.find_deal(1002).await.unwrap().unwrap();
    assert_eq!(deal.issr_cde.as_deref(), Some("ISS1002"));
    assert!(repo.find_deal(9999).await.unwrap().is_none());
}
