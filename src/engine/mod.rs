//! Grade banding and fee accounting.

pub mod fees;
pub mod grading;
