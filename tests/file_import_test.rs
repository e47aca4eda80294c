// ==========================================
// 文件导入 + 配置 API 集成测试
// ==========================================


use item_import::api::{ApiError, ConfigApi, ImportApi, ImportApiStep};
use item_import::config::{config_keys, ConfigManager};
use item_import::domain::types::{ImportMode, QuantityUpdateStrategy};
use item_import::events::OptionalEventPublisher;
use item_import::importer::ImportProgress;
use item_import::logging;
use item_import::repository::{ItemRepository, ItemRepositoryImpl};
use std::io::Write;
use std::sync::Arc;
use tempfile::{Builder, NamedTempFile};
use test_helpers::{
    create_test_db, open_test_connection, raw_row, seed_base_attributes, MockConfig, TestContext,
};

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    write!(file, "{}", content).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

const ITEMS_CSV: &str = "\
SKU,Name,Quantity,Price,Cost,Tax,Supplier,Category,Main Group,Color,Size
A1,Linen Shirt,5,19.90,8,0,acme,Shirts,Apparel,red,M
A2,Denim Jacket,2,59.00,25,0,Acme ,Jackets,Apparel,Blue,
";

#[tokio::test]
async fn test_csv_file_import_with_confirmation() {
    logging::init_test();
    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let api = ImportApi::from_db_path(&db_path, OptionalEventPublisher::none())
        .expect("Failed to create ImportApi");

    let csv = write_temp(".csv", ITEMS_CSV);
    let progress = ImportProgress::new();
    let step = api
        .import_file(
            csv.path().to_str().unwrap(),
            Some(ImportMode::Full),
            Some(progress.clone()),
        )
        .await
        .expect("导入失败");

    let pending = match step {
        ImportApiStep::AwaitingConfirmation(pending) => pending,
        ImportApiStep::Completed(_) => panic!("空库导入应等待确认"),
    };

    // ACME 只出现一次（大小写/空白规范化后去重）
    let prompts = pending.prompts();
    let suppliers: Vec<_> = prompts.iter().filter(|p| p.header == "Supplier").collect();
    assert_eq!(suppliers.len(), 1);
    assert_eq!(suppliers[0].value, "ACME");
    assert!(prompts.iter().any(|p| p.header == "Size" && p.value == "M"));

    let response = api.confirm(pending).await.expect("确认失败");
    assert_eq!(response.outcome.total, 2);
    assert_eq!(response.outcome.success, 2);
    assert!(response.error_summary.is_empty());
    assert_eq!(progress.get(), 100);

    let conn = open_test_connection(&db_path).unwrap();
    let items = ItemRepositoryImpl::from_connection(conn);
    let jacket = items.find_by_sku("A2").await.unwrap().expect("A2 不存在");
    assert_eq!(jacket.name, "Denim Jacket");
    assert_eq!(jacket.price, 59.0);
    assert_eq!(jacket.attributes.get(item_import::domain::AttributeKind::Size), None);
}

#[tokio::test]
async fn test_unsupported_format_is_rejected() {
    logging::init_test();
    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let api = ImportApi::from_db_path(&db_path, OptionalEventPublisher::none()).unwrap();

    let file = write_temp(".json", "{}");
    let err = api
        .import_file(file.path().to_str().unwrap(), None, None)
        .await
        .expect_err("不支持的格式应失败");
    assert!(matches!(err, ApiError::ImportError(ref msg) if msg.contains("json")));

    let err = api
        .import_file("  ", None, None)
        .await
        .expect_err("空路径应失败");
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[tokio::test]
async fn test_config_api_round_trip() {
    logging::init_test();
    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).unwrap();
    let config_api = ConfigApi::new(Arc::new(ConfigManager::from_connection(conn).unwrap()));

    let defaults = config_api.get_import_settings().await.unwrap();
    assert_eq!(defaults.max_reported_errors, 10);
    assert_eq!(defaults.quantity_update_strategy, QuantityUpdateStrategy::Batch);
    assert_eq!(defaults.default_mode, ImportMode::Full);

    config_api
        .update_config(config_keys::DEFAULT_IMPORT_MODE, "quantity-only")
        .unwrap();
    config_api
        .update_config(config_keys::QUANTITY_UPDATE_STRATEGY, "per_row")
        .unwrap();
    config_api
        .update_config(config_keys::MAX_REPORTED_ERRORS, " 3 ")
        .unwrap();

    let updated = config_api.get_import_settings().await.unwrap();
    assert_eq!(updated.max_reported_errors, 3);
    assert_eq!(updated.quantity_update_strategy, QuantityUpdateStrategy::PerRow);
    assert_eq!(updated.default_mode, ImportMode::QuantityOnly);

    assert!(matches!(
        config_api.update_config(config_keys::MAX_REPORTED_ERRORS, "-1"),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        config_api.update_config("import.unknown", "1"),
        Err(ApiError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_open_default_uses_env_db_path() {
    logging::init_test();
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap().to_string();

    // 本测试二进制中只有这里读取该环境变量
    std::env::set_var("ITEM_IMPORT_DB_PATH", format!("  {}  ", db_path));
    assert_eq!(item_import::db::default_db_path(), db_path);

    let api = ImportApi::open_default(OptionalEventPublisher::none()).expect("打开默认库失败");
    let step = api
        .import_rows(vec![raw_row("A", 1, "RED")], None, None)
        .await
        .unwrap();
    let ImportApiStep::AwaitingConfirmation(pending) = step else {
        panic!("空库导入应等待确认");
    };
    api.confirm(pending).await.unwrap();
    std::env::remove_var("ITEM_IMPORT_DB_PATH");

    let conn = open_test_connection(&db_path).unwrap();
    let items = ItemRepositoryImpl::from_connection(conn);
    assert!(items.find_by_sku("A").await.unwrap().is_some());
}

#[tokio::test]
async fn test_error_summary_falls_back_when_limit_unreadable() {
    logging::init_test();
    let ctx = TestContext::new();
    seed_base_attributes(&ctx).await;
    let skus: Vec<String> = (1..=12).map(|i| format!("S{:02}", i)).collect();
    for sku in &skus {
        ctx.seed_item(sku, 1, "RED").await;
    }

    let config = MockConfig {
        max_reported_errors: 1,
        fail_max_reported_errors: true,
        ..MockConfig::default()
    };
    let api = ImportApi::new(Arc::new(ctx.importer(config.clone())), Arc::new(config));

    let rows = skus.iter().map(|sku| raw_row(sku, 3, "RED")).collect();
    let step = api
        .import_rows(rows, Some(ImportMode::NewOnly), None)
        .await
        .expect("配置读取失败不应影响已完成的导入");
    let ImportApiStep::Completed(response) = step else {
        panic!("属性值已存在，不应等待确认");
    };

    assert_eq!(response.outcome.failed, 12);
    assert_eq!(response.outcome.errors.len(), 12);
    // 默认上限 10 条 + 截断提示
    assert_eq!(response.error_summary.len(), 11);
    assert!(response.error_summary[10].contains("另有 2 条"));
}

#[tokio::test]
async fn test_error_summary_respects_configured_limit() {
    logging::init_test();
    let (_temp_db, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_test_connection(&db_path).unwrap();

    let config_api =
        ConfigApi::new(Arc::new(ConfigManager::from_connection(conn.clone()).unwrap()));
    config_api
        .update_config(config_keys::MAX_REPORTED_ERRORS, "1")
        .unwrap();

    let api = ImportApi::from_connection(conn, OptionalEventPublisher::none()).unwrap();
    let rows = vec![raw_row("A", 1, "RED"), raw_row("B", 1, "RED"), raw_row("C", 1, "RED")];

    // 第一次导入：全部新增
    let step = api.import_rows(rows.clone(), None, None).await.unwrap();
    let pending = match step {
        ImportApiStep::AwaitingConfirmation(pending) => pending,
        ImportApiStep::Completed(_) => panic!("空库导入应等待确认"),
    };
    api.confirm(pending).await.unwrap();

    // 第二次导入：NEW_ONLY 全部拒绝
    let step = api
        .import_rows(rows, Some(ImportMode::NewOnly), None)
        .await
        .unwrap();
    let response = match step {
        ImportApiStep::Completed(response) => response,
        ImportApiStep::AwaitingConfirmation(_) => panic!("属性值已存在，不应等待确认"),
    };

    assert_eq!(response.outcome.failed, 3);
    assert_eq!(response.outcome.errors.len(), 3);
    assert_eq!(response.error_summary.len(), 2);
    assert!(response.error_summary[1].contains("另有 2 条"));
}
