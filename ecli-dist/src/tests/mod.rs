//! In-crate tests that exercise the planner against mock projects

mod gather;
mod mock;
