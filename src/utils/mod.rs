//! Utility Module
//!
//! - [`id_table`]: per-graph name interning for parameters, signals,
//!   feedback events, sync groups and samplers
//!
//! # Name Interning
//!
//! ```rust,ignore
//! use myth_animgraph::utils::IdTable;
//! use myth_animgraph::animation::ParamId;
//!
//! let mut params = IdTable::<ParamId>::new();
//! let speed = params.intern("speed");
//! assert_eq!(params.intern("speed"), speed); // stable id
//! ```

pub mod id_table;

pub use id_table::{IdTable, TableId};
