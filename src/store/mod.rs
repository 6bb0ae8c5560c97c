//! Persistence layer: collaborator traits and the libSQL backend.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{
    AccountCreator, CLIENTS_COLLECTION, ClientDirectory, ClientRecord, EqualityQuery,
    MealPlanStore, SHARE_CODE_FIELD, TrackingStore,
};
