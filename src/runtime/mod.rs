//! The on-target hooking engine: cache/interrupt primitives, branch
//! encoding, trampoline allocation, hook install/remove, pattern
//! scanning, and startup. Usable under `no_std` + `alloc`; only the
//! assembly in [`cache`] is PowerPC-specific, and it no-ops on other
//! targets so the rest of this module builds and tests on the host.

pub mod branch;
pub mod cache;
pub mod hook;
pub mod init;
pub mod pattern;
pub mod trampoline;

pub use hook::{Hook, HookError};
pub use init::{init, is_initialized, set_os_report, BannerSink, NullSink, OsReportFn};
#[cfg(feature = "log")]
pub use init::{OsLogSink, OsReportLogger};
pub use pattern::find_pattern;
pub use trampoline::TrampolinePool;
