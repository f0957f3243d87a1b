//! 可变字段（variable field）
//!
//! 定义计数器型可变字段及其逐包取值算法。

mod mutator;

pub use mutator::{FieldConfigError, FieldMutator, FieldType, Mode};
