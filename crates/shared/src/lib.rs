//! Plain data shared by the task core, the desktop shell and the CLI tools.

pub mod domain;
pub mod error;
pub mod protocol;
pub mod status;
