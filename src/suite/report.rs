//! 测试报告
//!
//! 固定格式的文本报告，以及同样内容的 JSON。

use serde::Serialize;
use std::fmt;

const RULE: &str = "===========================================================";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub results: Vec<ReportEntry>,
    pub passed: u32,
    pub total: u32,
    pub completed: bool,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "TEST REPORT")?;
        writeln!(f, "{RULE}")?;
        for r in &self.results {
            writeln!(f, "{}: {}", r.name, u8::from(r.passed))?;
        }
        writeln!(f, "Passed: {}/{}", self.passed, self.total)?;
        writeln!(f, "Completed: {}", u8::from(self.completed))
    }
}
