//! 类型模块：查询与出站请求的核心数据类型。
//!
//! # Types Module
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Query`] | Caller-facing request: prompt plus optional sampling/payload fields |
//! | [`GenerateRequest`] | Resolved, decoded request handed to a model backend |
//! | [`ContentPart`] | One ordered content part (text or inline binary) |

pub mod query;
pub mod request;

pub use query::Query;
pub use request::{ContentPart, GenerateRequest, DEFAULT_TEMPERATURE};
