//! MongoDB 存储后端

pub mod connection;
pub mod repository;

pub use connection::{
    DISCRIMINATOR_FIELD, MongoConnection, MongoConnectionStore, MongoConnectionStoreBuilder,
    short_type_name,
};
pub use repository::{DUPLICATE_KEY_CODE, MongoRepository, RATE_LIMITED_CODE};
