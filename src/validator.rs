use crate::errors::ServiceError;

/// Request payloads check themselves before any store access happens.
pub trait Validate {
    fn validate(&self) -> Result<(), ServiceError>;
}
