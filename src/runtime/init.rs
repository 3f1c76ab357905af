//! Runtime startup: idempotent initialization, banner display, and the
//! `OSReport`-backed logger.
//!
//! Ported from `dh_init` / `dh_log`. Display of the banner over VI/XFB
//! when `OSReport` is unavailable is explicitly out of scope here (see
//! `original_source/runtime/src/vi_banner.c`); this module only
//! declares the seam ([`BannerSink`]) a host integration would fill in.

use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Size of the stack buffer `OsReportLogger` formats into, matching
/// the original `dh_log`'s fixed `char buf[256]`.
const LOG_BUF_LEN: usize = 256;

/// Signature of the weakly-resolved `OSReport`-equivalent: a
/// NUL-terminated, already-formatted string.
pub type OsReportFn = extern "C" fn(*const u8);

static OS_REPORT: AtomicPtr<()> = AtomicPtr::new(core::ptr::null_mut());

/// Register the function `OsReportLogger` forwards formatted log lines
/// to. Mirrors the original's weak `extern void OSReport(...)` symbol,
/// resolved here through an explicit registration call instead of
/// linker weak-symbol magic, since stable Rust has no portable
/// equivalent. Logging is silent until this is called.
pub fn set_os_report(f: OsReportFn) {
    OS_REPORT.store(f as *mut (), Ordering::SeqCst);
}

fn os_report() -> Option<OsReportFn> {
    let ptr = OS_REPORT.load(Ordering::SeqCst);
    if ptr.is_null() {
        None
    } else {
        // SAFETY: only ever stored from `set_os_report`, which requires
        // a value of this exact function-pointer type.
        Some(unsafe { core::mem::transmute::<*mut (), OsReportFn>(ptr) })
    }
}

/// A fixed-capacity byte buffer usable as a `core::fmt::Write` target,
/// silently truncating writes that would overflow it — the same
/// truncation behavior as the original's `vsnprintf(buf, sizeof(buf),
/// ...)`.
struct FixedBuf {
    data: [u8; LOG_BUF_LEN],
    len: usize,
}

impl FixedBuf {
    fn new() -> Self {
        FixedBuf { data: [0u8; LOG_BUF_LEN], len: 0 }
    }

    /// A NUL-terminated view suitable for passing to `OsReportFn`.
    /// Reserves the final byte for the terminator.
    fn as_nul_terminated(&mut self) -> &[u8] {
        let cap = LOG_BUF_LEN - 1;
        if self.len > cap {
            self.len = cap;
        }
        self.data[self.len] = 0;
        &self.data[..=self.len]
    }
}

impl core::fmt::Write for FixedBuf {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let cap = LOG_BUF_LEN - 1; // leave room for the NUL terminator
        let remaining = cap.saturating_sub(self.len);
        let take = remaining.min(s.len());
        self.data[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
        Ok(())
    }
}

/// A [`log::Log`] implementor that formats each record into a fixed
/// stack buffer and forwards it through the registered OS report
/// function, exactly like the original `dh_log`: silent if no sink is
/// registered, silently truncated past 256 bytes otherwise.
#[cfg(feature = "log")]
pub struct OsReportLogger;

#[cfg(feature = "log")]
impl log::Log for OsReportLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let Some(report) = os_report() else { return };
        use core::fmt::Write;
        let mut buf = FixedBuf::new();
        let _ = write!(buf, "{}", record.args());
        report(buf.as_nul_terminated().as_ptr());
    }

    fn flush(&self) {}
}

/// Where the startup banner is rendered. The engine ships [`NullSink`]
/// (does nothing) and [`OsLogSink`] (forwards through `log::info!`);
/// a full VI/XFB text renderer is a separate, excluded concern.
pub trait BannerSink {
    fn show(&self, message: &str);
}

/// Discards the banner. Used when no reporting channel is wired up.
pub struct NullSink;

impl BannerSink for NullSink {
    fn show(&self, _message: &str) {}
}

/// Forwards the banner through the `log` crate at `info` level.
#[cfg(feature = "log")]
pub struct OsLogSink;

#[cfg(feature = "log")]
impl BannerSink for OsLogSink {
    fn show(&self, message: &str) {
        log::info!("{message}");
    }
}

const BANNER: &str = "DolHook runtime initialized";

/// Run runtime startup exactly once: show the banner through `sink`,
/// then call `install_hooks`. Calling this again is a no-op, matching
/// the original's `g_initialized` guard.
///
/// `install_hooks` corresponds to the weakly-resolved
/// `dh_install_all_hooks` callback in the original: the caller's own
/// hook-registration routine (see `demos/hooks.rs` for the shape),
/// invoked at most once.
pub fn init(sink: &dyn BannerSink, install_hooks: impl FnOnce()) {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    sink.show(BANNER);
    install_hooks();
}

/// Whether [`init`] has already run.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}
