//! Domain - build identity and serialization errors

pub mod errors;
pub mod ids;

pub use self::errors::SerializationError;
pub use self::ids::BuildId;
