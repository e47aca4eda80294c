// ==========================================
// 存储故障下的导入行为集成测试
// ==========================================
// 覆盖: 物化失败整体终止 / 确认期间并发创建的复用 / 批量插入回滚计数
//       按需解析失败 / 数量更新策略的失败隔离 / 重复队列写入失败 / 配置读取失败
// 故障注入: SQLite 触发器 RAISE(ABORT) 或仓储替身
// ==========================================


use item_import::domain::types::{AttributeKind, ImportMode};
use item_import::domain::ImportOutcome;
use item_import::importer::{ImportError, ImportOptions, ImportStep, ItemImporter};
use item_import::logging;
use item_import::repository::{AttributeRepository, DuplicateRepository, ItemRepository};
use std::sync::Arc;
use test_helpers::{
    install_abort_trigger, raw_row, seed_base_attributes, FlakyAttributeRepository, MockConfig,
    TestContext,
};

fn expect_completed(step: ImportStep) -> ImportOutcome {
    match step {
        ImportStep::Completed(outcome) => outcome,
        ImportStep::AwaitingConfirmation(pending) => {
            panic!("不应等待确认: {:?}", pending.prompts())
        }
    }
}

// ==========================================
// 属性物化
// ==========================================

#[tokio::test]
async fn test_materialize_failure_aborts_whole_run() {
    logging::init_test();
    let ctx = TestContext::new();
    install_abort_trigger(&ctx.conn, "reject_boom", "INSERT ON colors", "NEW.name = 'BOOM'");
    let importer = ctx.importer(MockConfig::default());

    let rows = vec![raw_row("A", 1, "red"), raw_row("B", 1, "boom")];
    let step = importer
        .import_rows(rows, ImportOptions::with_mode(ImportMode::Full))
        .await
        .expect("导入失败");
    let ImportStep::AwaitingConfirmation(pending) = step else {
        panic!("空库导入应等待确认");
    };
    assert_eq!(pending.prompts().len(), 5);

    let err = importer.confirm(pending).await.expect_err("物化失败应终止运行");
    match err {
        ImportError::AttributeCreation { values, .. } => {
            assert_eq!(values.len(), 5);
            assert!(values.contains(&"Color: BOOM".to_string()));
        }
        other => panic!("unexpected: {:?}", other),
    }

    // 同一事务内先插入的值也被回滚
    for kind in [
        AttributeKind::Supplier,
        AttributeKind::Category,
        AttributeKind::MainGroup,
        AttributeKind::Color,
    ] {
        assert_eq!(ctx.attribute_repo.count(kind).await.unwrap(), 0);
    }
    assert_eq!(ctx.item_repo.count_items().await.unwrap(), 0);
}

#[tokio::test]
async fn test_value_created_while_awaiting_confirmation_is_reused() {
    logging::init_test();
    let ctx = TestContext::new();
    seed_base_attributes(&ctx).await;
    let importer = ctx.importer(MockConfig::default());

    let step = importer
        .import_rows(vec![raw_row("A", 1, "teal")], ImportOptions::default())
        .await
        .expect("导入失败");
    let ImportStep::AwaitingConfirmation(pending) = step else {
        panic!("TEAL 应等待确认");
    };

    // 另一名操作员在确认前创建了同一个值
    let teal_id = ctx.seed_attribute(AttributeKind::Color, "TEAL").await;

    let outcome = importer.confirm(pending).await.expect("确认失败");
    assert_eq!(outcome.success, 1);
    assert_eq!(ctx.attribute_repo.count(AttributeKind::Color).await.unwrap(), 2);

    let a = ctx.item_repo.find_by_sku("A").await.unwrap().expect("A 不存在");
    assert_eq!(a.attribute_ids.get(&AttributeKind::Color), Some(&teal_id));
}

// ==========================================
// 新商品落库
// ==========================================

#[tokio::test]
async fn test_batch_insert_failure_moves_rows_to_failed() {
    logging::init_test();
    let ctx = TestContext::new();
    seed_base_attributes(&ctx).await;
    install_abort_trigger(&ctx.conn, "reject_sku_c", "INSERT ON items", "NEW.sku = 'C'");

    let rows = vec![raw_row("A", 1, "RED"), raw_row("B", 1, "RED"), raw_row("C", 1, "RED")];
    let outcome = expect_completed(
        ctx.importer(MockConfig::default())
            .import_rows(rows, ImportOptions::with_mode(ImportMode::Full))
            .await
            .expect("导入失败"),
    );

    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.success, 0);
    assert_eq!(outcome.failed, 3);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("批量插入失败（3 行）"));
    assert_eq!(ctx.item_repo.count_items().await.unwrap(), 0);
}

#[tokio::test]
async fn test_lazy_resolution_failure_skips_only_that_row() {
    logging::init_test();
    let ctx = TestContext::new();
    seed_base_attributes(&ctx).await;

    let flaky = Arc::new(FlakyAttributeRepository {
        inner: ctx.attribute_repo.clone(),
        kind: AttributeKind::Color,
        value: "VOID".to_string(),
    });
    let importer = ctx.importer_with(MockConfig::default(), flaky);

    let step = importer
        .import_rows(
            vec![raw_row("A", 1, "RED"), raw_row("B", 1, "void")],
            ImportOptions::with_mode(ImportMode::Full),
        )
        .await
        .expect("导入失败");
    let ImportStep::AwaitingConfirmation(pending) = step else {
        panic!("VOID 应等待确认");
    };

    let outcome = importer.confirm(pending).await.expect("确认失败");
    assert_eq!(outcome.success, 1);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("行 2: SKU B 属性解析失败"));

    assert!(ctx.item_repo.find_by_sku("A").await.unwrap().is_some());
    assert!(ctx.item_repo.find_by_sku("B").await.unwrap().is_none());
}

// ==========================================
// 数量更新策略
// ==========================================

async fn quantity_only_with_failing_b(config: MockConfig) -> (TestContext, ImportOutcome) {
    let ctx = TestContext::new();
    ctx.seed_item("A", 1, "RED").await;
    ctx.seed_item("B", 2, "RED").await;
    install_abort_trigger(
        &ctx.conn,
        "reject_qty_b",
        "UPDATE OF quantity ON items",
        "NEW.sku = 'B'",
    );

    let outcome = expect_completed(
        ctx.importer(config)
            .import_rows(
                vec![raw_row("A", 10, "RED"), raw_row("B", 20, "RED")],
                ImportOptions::with_mode(ImportMode::QuantityOnly),
            )
            .await
            .expect("导入失败"),
    );
    (ctx, outcome)
}

#[tokio::test]
async fn test_per_row_failure_is_isolated() {
    logging::init_test();
    let (ctx, outcome) = quantity_only_with_failing_b(MockConfig::per_row()).await;

    assert_eq!(outcome.success, 1);
    assert_eq!(outcome.failed, 1);
    assert!(outcome.errors[0].contains("SKU B 数量更新失败"));

    assert_eq!(ctx.item_repo.find_by_sku("A").await.unwrap().unwrap().quantity, 10);
    assert_eq!(ctx.item_repo.find_by_sku("B").await.unwrap().unwrap().quantity, 2);
}

#[tokio::test]
async fn test_batch_failure_rolls_back_every_row() {
    logging::init_test();
    let (ctx, outcome) = quantity_only_with_failing_b(MockConfig::default()).await;

    assert_eq!(outcome.success, 0);
    assert_eq!(outcome.failed, 2);
    assert!(outcome.errors[0].contains("批量数量更新失败（2 行）"));

    assert_eq!(ctx.item_repo.find_by_sku("A").await.unwrap().unwrap().quantity, 1);
    assert_eq!(ctx.item_repo.find_by_sku("B").await.unwrap().unwrap().quantity, 2);
}

#[tokio::test]
async fn test_strategy_read_failure_aborts_before_any_write() {
    logging::init_test();
    let ctx = TestContext::new();
    seed_base_attributes(&ctx).await;
    let config = MockConfig {
        fail_strategy: true,
        ..MockConfig::default()
    };

    let err = ctx
        .importer(config)
        .import_rows(
            vec![raw_row("A", 1, "RED"), raw_row("B", 1, "RED")],
            ImportOptions::with_mode(ImportMode::Full),
        )
        .await
        .expect_err("策略读取失败应终止运行");

    assert!(matches!(err, ImportError::Repository(_)));
    assert_eq!(ctx.item_repo.count_items().await.unwrap(), 0);
}

// ==========================================
// 重复队列写入
// ==========================================

#[tokio::test]
async fn test_unqueued_duplicates_are_reported_per_row() {
    logging::init_test();
    let ctx = TestContext::new();
    seed_base_attributes(&ctx).await;
    ctx.seed_item("B", 5, "RED").await;
    install_abort_trigger(&ctx.conn, "reject_entries", "INSERT ON duplicate_entries", "1");

    let outcome = expect_completed(
        ctx.importer(MockConfig::default())
            .import_rows(
                vec![raw_row("A", 1, "RED"), raw_row("B", 12, "RED")],
                ImportOptions::with_mode(ImportMode::Full),
            )
            .await
            .expect("导入失败"),
    );

    assert_eq!(outcome.success, 1);
    assert_eq!(outcome.duplicates, 1);
    assert_eq!(outcome.queued, 0);
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("行 2: SKU B 已存在，但未写入重复队列"));
    assert_eq!(ctx.duplicate_repo.count_pending().await.unwrap(), 0);
}
