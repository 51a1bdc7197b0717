pub mod index;
pub mod install;
pub mod probe;
pub mod scan;

pub use index::JavaIndex;
pub use install::{component_for_major, JavaInstaller, JavaStatus};
pub use probe::{probe_java, JavaArch, JavaEntry};
