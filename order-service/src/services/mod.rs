pub mod database;
pub mod jwt;
pub mod metrics;
pub mod storage;
pub mod store;

pub use database::MongoDb;
pub use jwt::{AccessTokenClaims, JwtService, Role};
pub use metrics::{get_metrics, init_metrics};
pub use storage::{LocalStorage, Storage};
pub use store::{MemoryStore, OrderFilter, OrderPage, OrderStore};
