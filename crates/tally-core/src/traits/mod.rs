pub mod state;

pub use state::{StateRead, StateStore, StateTxn};
