pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use common::OrderUid;
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use model::{Delivery, Item, OrderHeader, OrderRecord, Payment};
pub use postgres::PostgresOrderStore;
pub use store::{OrderStore, validate_record};
