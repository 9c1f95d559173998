//! 测试模块根目录
//!
//! 导出所有功能模块的测试


#[allow(unused_imports)]
pub use eviction::*;
#[allow(unused_imports)]
pub use invalidation::*;
#[allow(unused_imports)]
pub use stats::*;
#[allow(unused_imports)]
pub use tiering::*;
#[allow(unused_imports)]
pub use warming::*;
