//! Command implementations

pub mod common;
pub mod compile;
pub mod dag;
pub mod lineage;
pub mod ls;
pub mod run;
pub mod seed;
