// ==========================================
// 商品批量导入系统 - 导入事件发布
// ==========================================
// 职责: 导入完成后通知下游视图刷新（库存列表 / 仪表盘 / 报表）
// 说明: 导入层只依赖 trait，具体通道由调用方注入
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use tokio::sync::broadcast;

// ==========================================
// 事件类型
// ==========================================

/// 导入事件触发类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportEventKind {
    /// 导入运行完成且有数据变更
    ImportCompleted,
    /// 重复条目以新数据覆盖
    DuplicateOverwritten,
}

impl ImportEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            ImportEventKind::ImportCompleted => "ImportCompleted",
            ImportEventKind::DuplicateOverwritten => "DuplicateOverwritten",
        }
    }
}

/// 需要失效刷新的下游视图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefreshTarget {
    InventoryList,
    DashboardMetrics,
    Reports,
}

impl RefreshTarget {
    pub const ALL: [RefreshTarget; 3] = [
        RefreshTarget::InventoryList,
        RefreshTarget::DashboardMetrics,
        RefreshTarget::Reports,
    ];
}

/// 导入事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEvent {
    /// 导入运行 ID（重复处理时为条目所属运行）
    pub run_id: String,
    pub kind: ImportEventKind,
    pub targets: Vec<RefreshTarget>,
}

impl ImportEvent {
    /// 通知全部下游视图
    pub fn refresh_all(run_id: impl Into<String>, kind: ImportEventKind) -> Self {
        Self {
            run_id: run_id.into(),
            kind,
            targets: RefreshTarget::ALL.to_vec(),
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 导入事件发布者
///
/// # 返回
/// - `Ok(receivers)`: 收到事件的订阅者数量（不支持时为 0）
/// - `Err`: 发布失败（调用方只记录日志，不影响导入结果）
pub trait ImportEventPublisher: Send + Sync {
    fn publish(&self, event: ImportEvent) -> Result<usize, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者（单元测试 / 无 UI 场景）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl ImportEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: ImportEvent) -> Result<usize, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - run_id={}, kind={}",
            event.run_id,
            event.kind.as_str()
        );
        Ok(0)
    }
}

/// 基于 tokio broadcast 通道的发布者
///
/// 没有订阅者时发送失败，按 0 个接收者处理
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<ImportEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.sender.subscribe()
    }
}

impl ImportEventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: ImportEvent) -> Result<usize, Box<dyn Error + Send + Sync>> {
        match self.sender.send(event) {
            Ok(receivers) => Ok(receivers),
            Err(broadcast::error::SendError(event)) => {
                tracing::debug!(run_id = %event.run_id, "无订阅者，事件丢弃");
                Ok(0)
            }
        }
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn ImportEventPublisher>> 的使用；发布失败只记录告警
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn ImportEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn ImportEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者），失败不向上传播
    pub fn publish(&self, event: ImportEvent) {
        let Some(publisher) = &self.inner else {
            tracing::debug!(
                "OptionalEventPublisher: 未配置发布者，跳过事件 - run_id={}, kind={}",
                event.run_id,
                event.kind.as_str()
            );
            return;
        };

        let run_id = event.run_id.clone();
        let kind = event.kind;
        if let Err(e) = publisher.publish(event) {
            tracing::warn!(
                run_id = %run_id,
                kind = kind.as_str(),
                error = %e,
                "刷新事件发布失败"
            );
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingPublisher;

    impl ImportEventPublisher for FailingPublisher {
        fn publish(&self, _event: ImportEvent) -> Result<usize, Box<dyn Error + Send + Sync>> {
            Err("channel closed".into())
        }
    }

    #[test]
    fn test_refresh_all_targets() {
        let event = ImportEvent::refresh_all("run-1", ImportEventKind::ImportCompleted);
        assert_eq!(event.run_id, "run-1");
        assert_eq!(event.targets.len(), 3);
        assert!(event.targets.contains(&RefreshTarget::Reports));
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpEventPublisher;
        let event = ImportEvent::refresh_all("run-1", ImportEventKind::ImportCompleted);
        assert_eq!(publisher.publish(event).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_publisher_delivers() {
        let publisher = BroadcastEventPublisher::new(8);
        let mut rx = publisher.subscribe();

        let sent = publisher
            .publish(ImportEvent::refresh_all("run-2", ImportEventKind::DuplicateOverwritten))
            .unwrap();
        assert_eq!(sent, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, ImportEventKind::DuplicateOverwritten);
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let publisher = BroadcastEventPublisher::new(8);
        let sent = publisher
            .publish(ImportEvent::refresh_all("run-3", ImportEventKind::ImportCompleted))
            .unwrap();
        assert_eq!(sent, 0);
    }

    #[test]
    fn test_optional_publisher_swallows_failure() {
        let publisher = OptionalEventPublisher::with_publisher(Arc::new(FailingPublisher));
        assert!(publisher.is_configured());
        publisher.publish(ImportEvent::refresh_all("run-4", ImportEventKind::ImportCompleted));

        let empty = OptionalEventPublisher::none();
        assert!(!empty.is_configured());
        empty.publish(ImportEvent::refresh_all("run-4", ImportEventKind::ImportCompleted));
    }
}
