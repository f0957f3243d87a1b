//! 测试套件
//!
//! 单线程、严格不嵌套的测试用例记账：开始/结束、计数、完成标记与报告。

mod report;
mod state;

pub use report::{Report, ReportEntry};
pub use state::{HarnessError, Outcome, SuiteState, TestCase, TestSuite};
