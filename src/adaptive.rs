//! 自适应容量
//!
//! 每个分类维护一个随写入压力增长、随低命中率收缩的容量目标。
//! 不变式：任意时刻 `min_size <= current_size <= max_size`。

use crate::constants::{
    DEFAULT_ADAPTIVE_MIN_SIZE, DEFAULT_GROWTH_FACTOR, DEFAULT_SHRINK_FACTOR,
};
use crate::entry::CacheCategory;
use parking_lot::Mutex;
use serde::Serialize;

/// 容量调整方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeDirection {
    /// 写入压力，扩容
    Increase,
    /// 低命中率，缩容
    Decrease,
}

/// 分类自适应容量状态
#[derive(Debug, Clone, Serialize)]
pub struct AdaptiveSizeState {
    pub current_size: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub growth_factor: f64,
    pub shrink_factor: f64,
}

impl AdaptiveSizeState {
    /// 以策略容量上限为max_size播种
    ///
    /// 初始容量取上界的四分之一（夹入边界内），给增长留出空间。
    pub fn seeded(max_entries: usize) -> Self {
        let max_size = max_entries.max(1);
        let min_size = DEFAULT_ADAPTIVE_MIN_SIZE.min(max_size);
        let current_size = (max_size / 4).clamp(min_size, max_size);
        Self {
            current_size,
            min_size,
            max_size,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            shrink_factor: DEFAULT_SHRINK_FACTOR,
        }
    }

    fn apply(&mut self, direction: SizeDirection) {
        match direction {
            SizeDirection::Increase => {
                let grown = (self.current_size as f64 * self.growth_factor).ceil() as usize;
                self.current_size = grown.min(self.max_size);
            }
            SizeDirection::Decrease => {
                let shrunk = (self.current_size as f64 * self.shrink_factor).floor() as usize;
                self.current_size = shrunk.max(self.min_size);
            }
        }
    }
}

/// 自适应容量调节器
///
/// 每分类一个状态槽；set路径每次写入调用Increase，后台巡检对
/// 持续低命中率的分类调用Decrease（扩展点，不参与正确性）。
pub struct AdaptiveSizer {
    states: Vec<Mutex<AdaptiveSizeState>>,
}

impl AdaptiveSizer {
    /// 按各分类容量上限创建
    pub fn new(max_entries_by_category: impl Fn(CacheCategory) -> usize) -> Self {
        let states = CacheCategory::ALL
            .iter()
            .map(|category| Mutex::new(AdaptiveSizeState::seeded(max_entries_by_category(*category))))
            .collect();
        Self { states }
    }

    /// 当前容量目标
    pub fn current_size(&self, category: CacheCategory) -> usize {
        self.states[category.ordinal()].lock().current_size
    }

    /// 调整容量
    pub fn update(&self, category: CacheCategory, direction: SizeDirection) {
        self.states[category.ordinal()].lock().apply(direction);
    }

    /// 策略变更后重设边界，当前值夹回新边界内
    pub fn reconfigure(&self, category: CacheCategory, max_entries: usize) {
        let mut state = self.states[category.ordinal()].lock();
        let max_size = max_entries.max(1);
        state.max_size = max_size;
        state.min_size = state.min_size.min(max_size);
        state.current_size = state.current_size.clamp(state.min_size, state.max_size);
    }

    /// 状态快照（仪表盘用）
    pub fn snapshot(&self, category: CacheCategory) -> AdaptiveSizeState {
        self.states[category.ordinal()].lock().clone()
    }
}
