pub mod combiner;
pub mod config;
pub mod context;
pub mod error;
pub mod head_to_head;
pub mod model;
pub mod orchestrator;
pub mod performance;
pub mod reference;
pub mod sqlite_store;
pub mod stat_band;
pub mod store;
pub mod tier;
pub mod value;
pub mod weighting;
