pub mod types;

pub use types::OrderUid;
