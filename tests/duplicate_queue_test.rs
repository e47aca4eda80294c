// ==========================================
// 重复队列集成测试
// ==========================================
// 覆盖: keep_existing / update_with_new / ignore / 单向流转 / 并发处理 / 批量处理 / 分页 / CSV 导出
// ==========================================


use item_import::api::{ApiError, DuplicateApi};
use item_import::domain::types::{DuplicateResolution, ImportMode};
use item_import::domain::ImportOutcome;
use item_import::events::{BroadcastEventPublisher, ImportEventKind, OptionalEventPublisher};
use item_import::importer::{ImportOptions, ImportStep, ItemImporter};
use item_import::logging;
use item_import::repository::{DuplicateRepository, ItemRepository};
use std::sync::Arc;
use test_helpers::{
    raw_row, seed_base_attributes, MockConfig, TestContext, YieldingAttributeRepository,
};

/// 预置已存在商品后以 FULL 模式重复导入，返回导入结果
async fn import_duplicates(ctx: &TestContext, skus: &[&str]) -> ImportOutcome {
    seed_base_attributes(ctx).await;
    for sku in skus {
        ctx.seed_item(sku, 5, "RED").await;
    }

    let rows = skus.iter().map(|sku| raw_row(sku, 12, "RED")).collect();
    let step = ctx
        .importer(MockConfig::default())
        .import_rows(rows, ImportOptions::with_mode(ImportMode::Full))
        .await
        .expect("导入失败");

    match step {
        ImportStep::Completed(outcome) => {
            assert_eq!(outcome.duplicates, skus.len());
            assert_eq!(outcome.queued, skus.len());
            outcome
        }
        ImportStep::AwaitingConfirmation(_) => panic!("不应等待确认"),
    }
}

fn duplicate_api(ctx: &TestContext) -> DuplicateApi {
    DuplicateApi::from_connection(ctx.conn.clone(), OptionalEventPublisher::none())
}

#[tokio::test]
async fn test_keep_existing_leaves_item_untouched() {
    logging::init_test();
    let ctx = TestContext::new();
    let outcome = import_duplicates(&ctx, &["B"]).await;
    let api = duplicate_api(&ctx);

    let entries = api.list_by_run(&outcome.run_id).await.unwrap();
    let resolved = api
        .resolve(&entries[0].entry_id, DuplicateResolution::KeepExisting)
        .await
        .expect("处理失败");

    assert_eq!(resolved.resolution, Some(DuplicateResolution::KeepExisting));
    assert!(resolved.resolved_at.is_some());

    let b = ctx.item_repo.find_by_sku("B").await.unwrap().unwrap();
    assert_eq!(b.quantity, 5);
    assert_eq!(b.name, "Seeded B");
}

#[tokio::test]
async fn test_update_with_new_overwrites_item() {
    logging::init_test();
    let ctx = TestContext::new();
    let outcome = import_duplicates(&ctx, &["B"]).await;

    let publisher = Arc::new(BroadcastEventPublisher::new(8));
    let mut receiver = publisher.subscribe();
    let api = DuplicateApi::from_connection(
        ctx.conn.clone(),
        OptionalEventPublisher::with_publisher(publisher),
    );

    let before = ctx.item_repo.find_by_sku("B").await.unwrap().unwrap();
    let entries = api.list_by_run(&outcome.run_id).await.unwrap();
    let resolved = api
        .resolve(&entries[0].entry_id, DuplicateResolution::UpdateWithNew)
        .await
        .expect("处理失败");

    assert_eq!(resolved.resolution, Some(DuplicateResolution::UpdateWithNew));
    assert!(resolved.resolved_at.is_some());

    let after = ctx.item_repo.find_by_sku("B").await.unwrap().unwrap();
    assert_eq!(after.quantity, 12);
    assert_eq!(after.name, "Item B");
    assert_eq!(after.item_id, before.item_id);
    assert_eq!(after.attributes, resolved.incoming_snapshot.attributes);

    let event = receiver.try_recv().expect("未收到事件");
    assert_eq!(event.kind, ImportEventKind::DuplicateOverwritten);
    assert_eq!(event.run_id, outcome.run_id);
}

#[tokio::test]
async fn test_resolved_entry_cannot_be_reopened() {
    logging::init_test();
    let ctx = TestContext::new();
    let outcome = import_duplicates(&ctx, &["B"]).await;
    let api = duplicate_api(&ctx);

    let entry_id = api.list_by_run(&outcome.run_id).await.unwrap()[0]
        .entry_id
        .clone();
    api.resolve(&entry_id, DuplicateResolution::Ignore)
        .await
        .expect("处理失败");

    let err = api
        .resolve(&entry_id, DuplicateResolution::UpdateWithNew)
        .await
        .expect_err("已处理条目应拒绝再次处理");
    assert!(matches!(err, ApiError::AlreadyResolved { ref resolution, .. } if resolution == "ignore"));

    // 商品未被二次处理覆盖
    let b = ctx.item_repo.find_by_sku("B").await.unwrap().unwrap();
    assert_eq!(b.quantity, 5);
    assert_eq!(api.list_pending(10, 0).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_concurrent_keep_existing_wins_over_pending_overwrite() {
    logging::init_test();
    let ctx = TestContext::new();
    let outcome = import_duplicates(&ctx, &["B"]).await;

    // update_with_new 在解析属性时让出调度，keep_existing 先完成认领
    let overwriting = DuplicateApi::new(
        ctx.duplicate_repo.clone(),
        Arc::new(YieldingAttributeRepository {
            inner: ctx.attribute_repo.clone(),
        }),
        OptionalEventPublisher::none(),
    );
    let keeping = duplicate_api(&ctx);

    let entry_id = keeping.list_by_run(&outcome.run_id).await.unwrap()[0]
        .entry_id
        .clone();

    let (overwrite_result, keep_result) = tokio::join!(
        overwriting.resolve(&entry_id, DuplicateResolution::UpdateWithNew),
        keeping.resolve(&entry_id, DuplicateResolution::KeepExisting),
    );

    let err = overwrite_result.expect_err("后到的处理应被拒绝");
    assert!(matches!(err, ApiError::AlreadyResolved { ref resolution, .. } if resolution == "keep_existing"));
    let kept = keep_result.expect("keep_existing 应成功");
    assert_eq!(kept.resolution, Some(DuplicateResolution::KeepExisting));

    // 商品保持原值
    let b = ctx.item_repo.find_by_sku("B").await.unwrap().unwrap();
    assert_eq!(b.quantity, 5);
    assert_eq!(b.name, "Seeded B");
}

#[tokio::test]
async fn test_failed_overwrite_leaves_entry_pending() {
    logging::init_test();
    let ctx = TestContext::new();
    let outcome = import_duplicates(&ctx, &["B"]).await;
    let api = duplicate_api(&ctx);

    let entry_id = api.list_by_run(&outcome.run_id).await.unwrap()[0]
        .entry_id
        .clone();

    // 条目生成后商品被删除
    ctx.conn
        .lock()
        .unwrap()
        .execute("DELETE FROM items WHERE sku = 'B'", [])
        .unwrap();

    let err = api
        .resolve(&entry_id, DuplicateResolution::UpdateWithNew)
        .await
        .expect_err("商品不存在时应失败");
    assert!(matches!(err, ApiError::NotFound(ref msg) if msg.contains("Item")));

    // 认领随覆盖一起回滚
    assert_eq!(ctx.duplicate_repo.count_pending().await.unwrap(), 1);
    let entry = api.get_entry(&entry_id).await.unwrap();
    assert!(!entry.is_resolved());
    assert!(entry.resolved_at.is_none());
}

#[tokio::test]
async fn test_unknown_entry_is_not_found() {
    logging::init_test();
    let ctx = TestContext::new();
    let api = duplicate_api(&ctx);

    let err = api
        .resolve("missing", DuplicateResolution::Ignore)
        .await
        .expect_err("应返回 NotFound");
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_batch_resolve_reports_partial_failure() {
    logging::init_test();
    let ctx = TestContext::new();
    let outcome = import_duplicates(&ctx, &["A", "B"]).await;
    let api = duplicate_api(&ctx);

    let mut ids: Vec<String> = api
        .list_by_run(&outcome.run_id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.entry_id)
        .collect();
    ids.push("missing".to_string());

    let response = api
        .batch_resolve(&ids, DuplicateResolution::KeepExisting)
        .await
        .expect("批量处理失败");

    assert_eq!(response.success_count, 2);
    assert_eq!(response.fail_count, 1);
    assert_eq!(response.failed_ids, vec!["missing".to_string()]);

    let err = api
        .batch_resolve(&[], DuplicateResolution::Ignore)
        .await
        .expect_err("空列表应拒绝");
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn test_list_pending_clamps_paging() {
    logging::init_test();
    let ctx = TestContext::new();
    import_duplicates(&ctx, &["A", "B", "C"]).await;
    let api = duplicate_api(&ctx);

    let page = api.list_pending(2, 0).await.unwrap();
    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.total, 3);

    let page = api.list_pending(2, 2).await.unwrap();
    assert_eq!(page.entries.len(), 1);

    let page = api.list_pending(0, -5).await.unwrap();
    assert_eq!(page.limit, 1);
    assert_eq!(page.offset, 0);
    assert_eq!(page.entries.len(), 1);

    let page = api.list_pending(10_000, 0).await.unwrap();
    assert_eq!(page.limit, 100);
    assert_eq!(page.entries.len(), 3);
}

#[tokio::test]
async fn test_export_pending_csv() {
    logging::init_test();
    let ctx = TestContext::new();
    import_duplicates(&ctx, &["A", "B"]).await;
    let api = duplicate_api(&ctx);

    let mut buffer: Vec<u8> = Vec::new();
    let exported = api
        .export_pending_csv(&mut buffer)
        .await
        .expect("导出失败");
    assert_eq!(exported, 2);

    let mut reader = csv::Reader::from_reader(buffer.as_slice());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "entry_id");
    assert_eq!(&headers[2], "sku");

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(&row[5], "5");
        assert_eq!(&row[6], "12");
    }
}
