use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("roster: storage error: {0}")]
    Storage(String),

    #[error("roster: serialization error: {0}")]
    Serialization(String),
}

pub(crate) fn storage<E: std::fmt::Display>(e: E) -> RosterError {
    RosterError::Storage(e.to_string())
}

impl From<rmp_serde::encode::Error> for RosterError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        RosterError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for RosterError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        RosterError::Serialization(e.to_string())
    }
}
