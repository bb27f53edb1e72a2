//! Domain layer for category actions.
//!
//! Holds the category record, the closed set of actions a store consumes and
//! the factory that builds them. Nothing here performs I/O.
pub mod factory;
pub mod ids;
pub mod types;

pub use factory::CategoryActionFactory;
pub use ids::{Clock, IdGenerator, IdStrategy, ParseIdStrategyError};
pub use types::{Category, CategoryAction, CategoryActionKind, ParseActionKindError};
