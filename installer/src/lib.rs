//! Installation of the privileged helper through the OS installation
//! primitive, with authorization acquired per attempt.

mod command;
mod installer;
mod primitive;

pub use command::CommandInstallPrimitive;
pub use installer::HelperInstaller;
pub use installer::InstallError;
pub use primitive::InstallPrimitive;
