pub mod core;

pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::events::LauncherEvent;
pub use crate::core::java::{JavaArch, JavaEntry, JavaStatus};
pub use crate::core::launch::{LaunchOptions, LaunchOutcome, ProcessPriority};
pub use crate::core::state::{
    LauncherCore, LAUNCH_ERROR, LAUNCH_JAVA_MISSING, LAUNCH_OK,
};
pub use crate::core::version::VersionDescriptor;
