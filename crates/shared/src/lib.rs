pub mod contact;
pub mod domain;
pub mod error;
pub mod protocol;
