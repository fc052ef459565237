//! Leadflow AI - a thin, closed function-dispatch surface over the
//! pipeline's reporting views, for an out-of-scope
//! conversational front-end to call. Deliberately small: no prompt
//! construction, no LLM client, no arbitrary SQL.

pub mod dispatch;
pub mod views;

pub use dispatch::{dispatch, FUNCTION_NAMES};
