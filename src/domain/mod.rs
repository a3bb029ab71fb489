//! Domain models for Warden Core

pub mod approval;
pub mod common;
pub mod grant;
pub mod resource;
pub mod security_domain;

pub use approval::*;
pub use common::*;
pub use grant::*;
pub use resource::*;
pub use security_domain::*;
