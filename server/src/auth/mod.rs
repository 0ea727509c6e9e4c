//! Write authorization: the capability gate and credential extraction.

pub mod capability;
pub mod credential;
