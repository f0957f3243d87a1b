//! 套件状态机
//!
//! `Idle` -> `Running(case)` -> `Idle`；非法转换返回 `HarnessError`。

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::report::{Report, ReportEntry};

/// 调用方脚本的编程错误，而不是设备故障。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    #[error("test end without a test begin")]
    EndWithoutBegin,
    #[error("test {requested:?} begun while {open:?} is still open")]
    NestedBegin { open: String, requested: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    NotRun,
    Pass,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub outcome: Outcome,
}

impl TestCase {
    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SuiteState {
    #[default]
    Idle,
    Running(TestCase),
}

#[derive(Debug, Default)]
pub struct TestSuite {
    results: Vec<TestCase>,
    total: u32,
    passed: u32,
    state: SuiteState,
    completed: bool,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[TestCase] {
        &self.results
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn passed(&self) -> u32 {
        self.passed
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn state(&self) -> &SuiteState {
        &self.state
    }

    /// 当前打开的用例
    pub fn running(&self) -> Option<&TestCase> {
        match &self.state {
            SuiteState::Running(t) => Some(t),
            SuiteState::Idle => None,
        }
    }

    /// 全部完成且全部通过
    pub fn all_passed(&self) -> bool {
        self.completed && self.passed == self.total
    }

    pub fn begin(&mut self, name: impl Into<String>) -> Result<(), HarnessError> {
        let name = name.into();
        if let SuiteState::Running(open) = &self.state {
            return Err(HarnessError::NestedBegin {
                open: open.name.clone(),
                requested: name,
            });
        }
        info!(test = %name, "🧪 开始测试");
        self.state = SuiteState::Running(TestCase {
            name,
            outcome: Outcome::NotRun,
        });
        Ok(())
    }

    pub fn end(&mut self, result: bool) -> Result<&TestCase, HarnessError> {
        let SuiteState::Running(mut case) = std::mem::take(&mut self.state) else {
            return Err(HarnessError::EndWithoutBegin);
        };
        case.outcome = if result { Outcome::Pass } else { Outcome::Fail };
        self.total += 1;
        if result {
            self.passed += 1;
        }
        info!(test = %case.name, passed = result, "测试结束");
        self.results.push(case);
        Ok(&self.results[self.results.len() - 1])
    }

    /// 设置完成标记，不检查是否全部通过。
    pub fn complete(&mut self) {
        self.completed = true;
    }

    /// 在一个用例里运行 `body`：无论 body 返回错误还是 panic，都会先记录结果再向上传递。
    pub fn run_case<E, F>(&mut self, name: &str, body: F) -> Result<bool, E>
    where
        E: From<HarnessError>,
        F: FnOnce() -> Result<bool, E>,
    {
        self.begin(name)?;
        println!("-----------------------------------------------------------");
        println!("@@TEST: {}", name);
        println!("-----------------------------------------------------------");

        let res = panic::catch_unwind(AssertUnwindSafe(body));
        let passed = matches!(res, Ok(Ok(true)));
        self.end(passed)?;
        println!("@@RESULT: {}", if passed { "PASS" } else { "FAIL" });

        match res {
            Ok(r) => r,
            Err(payload) => {
                warn!(test = name, "测试体 panic，已记为失败");
                panic::resume_unwind(payload)
            }
        }
    }

    pub fn report(&self) -> Report {
        Report {
            results: self
                .results
                .iter()
                .map(|t| ReportEntry {
                    name: t.name.clone(),
                    passed: t.passed(),
                })
                .collect(),
            passed: self.passed,
            total: self.total,
            completed: self.completed,
        }
    }
}
