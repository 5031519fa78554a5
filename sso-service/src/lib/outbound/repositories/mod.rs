pub mod session_store;
pub(crate) mod sql;
pub mod unit_of_work;

pub use session_store::PostgresSessionStore;
pub use unit_of_work::PostgresUnitOfWork;
