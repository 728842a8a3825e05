//! Host facts printed alongside the results. Informational only.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    /// `<os>/<arch>`, e.g. `linux/x86_64`.
    pub platform: String,
    /// Logical CPUs available to this process.
    pub available_cpus: usize,
    pub page_size: u64,
}

impl SystemInfo {
    pub fn collect() -> Self {
        Self {
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
            available_cpus: num_cpus::get(),
            page_size: page_size(),
        }
    }
}

#[cfg(unix)]
fn page_size() -> u64 {
    // SAFETY: sysconf has no memory-safety preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    u64::try_from(size).ok().filter(|&s| s > 0).unwrap_or(4096)
}

#[cfg(windows)]
fn page_size() -> u64 {
    use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

    // SAFETY: GetSystemInfo cannot fail and fills the whole struct.
    let info = unsafe {
        let mut info: SYSTEM_INFO = std::mem::zeroed();
        GetSystemInfo(&mut info);
        info
    };
    u64::from(info.dwPageSize)
}
