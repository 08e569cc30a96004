//! Host facts detection via uname(2)

use std::ffi::CStr;

use tracing::warn;

use crate::domain::value_objects::HostFacts;

/// Read processor, OS and host name from the kernel
pub fn detect_host_facts() -> HostFacts {
    let mut name: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut name) } != 0 {
        warn!("uname failed; implementation matching will not find candidates");
        return HostFacts::new("unknown", "unknown", "localhost");
    }

    HostFacts::new(
        c_chars_to_string(&name.machine),
        c_chars_to_string(&name.sysname),
        c_chars_to_string(&name.nodename),
    )
}

fn c_chars_to_string(chars: &[libc::c_char]) -> String {
    unsafe { CStr::from_ptr(chars.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}
