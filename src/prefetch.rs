//! 预热协调器
//!
//! 固定大小的工作池（不是每键一个任务）限制对外部取数源的并发
//! 压力。整批可取消且不泄漏未完成的工作者；单键失败只记日志，
//! 不会中断整批。

use crate::constants::{DEFAULT_PREFETCH_WORKERS, PREFETCH_INTER_CALL_DELAY_MS};
use crate::entry::{CacheCategory, CacheValue};
use crate::error::TierError;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::debug;

/// 调用方提供的取数函数
///
/// `fetch(key)` 异步返回值或缺失，可能失败。
pub type FetchFn = Arc<
    dyn Fn(String) -> Pin<Box<dyn Future<Output = Result<Option<CacheValue>, TierError>> + Send>>
        + Send
        + Sync,
>;

/// 单键预热结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmOutcome {
    /// 已在缓存中，跳过（不计入warmed）
    AlreadyCached,
    /// 取数成功并写入缓存
    Warmed,
    /// 取数返回缺失
    FetchMiss,
    /// 取数失败（已记日志）
    FetchFailed,
}

/// 预热协调器
pub struct PrefetchCoordinator {
    workers: usize,
    inter_call_delay: Duration,
    cancel_tx: watch::Sender<bool>,
    /// 终态标记：关停后不可复位，新批次直接拒绝
    shut_down: AtomicBool,
}

impl PrefetchCoordinator {
    pub fn new(workers: usize) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            workers: workers.max(1),
            inter_call_delay: Duration::from_millis(PREFETCH_INTER_CALL_DELAY_MS),
            cancel_tx,
            shut_down: AtomicBool::new(false),
        }
    }

    /// 取消当前整批预热
    ///
    /// 工作者在处理下一个键之前退出；后续批次不受影响。
    pub fn cancel_all(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// 终止协调器：取消在途批次并拒绝所有后续批次
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// 解除批次级取消标记（新批次开始前调用）；对已关停的协调器无效
    pub fn reset(&self) {
        if !self.is_shut_down() {
            let _ = self.cancel_tx.send(false);
        }
    }

    /// 用固定工作池跑一批键，返回`per_item`返回Warmed的数量
    ///
    /// 工作者从共享队列取键串行处理，彼此之间由队列天然分片；
    /// 同一工作者两次取数之间加入小间隔。
    pub async fn run<F, Fut>(&self, items: Vec<(String, CacheCategory)>, per_item: F) -> usize
    where
        F: Fn(String, CacheCategory) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = WarmOutcome> + Send + 'static,
    {
        if self.is_shut_down() {
            debug!("协调器已关停，拒绝预热批次: items={}", items.len());
            return 0;
        }
        let queue = Arc::new(Mutex::new(VecDeque::from(items)));
        let warmed = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(self.workers);

        for worker_id in 0..self.workers {
            let queue = Arc::clone(&queue);
            let warmed = Arc::clone(&warmed);
            let per_item = per_item.clone();
            let cancel_rx = self.cancel_tx.subscribe();
            let delay = self.inter_call_delay;

            handles.push(tokio::spawn(async move {
                loop {
                    if *cancel_rx.borrow() {
                        debug!("预热工作者退出（批次已取消）: worker={}", worker_id);
                        break;
                    }
                    let item = { queue.lock().await.pop_front() };
                    let Some((key, category)) = item else {
                        break;
                    };
                    if per_item(key, category).await == WarmOutcome::Warmed {
                        warmed.fetch_add(1, Ordering::Relaxed);
                    }
                    tokio::time::sleep(delay).await;
                }
            }));
        }

        // 等待整池结束，取消时也不留下游离任务
        let _ = futures::future::join_all(handles).await;
        warmed.load(Ordering::Relaxed)
    }
}

impl Default for PrefetchCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFETCH_WORKERS)
    }
}
