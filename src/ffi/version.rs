//! Library version as seen from C

use crate::{VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH};

/// `0x00MMmmpp`: major, minor and patch packed one byte each
#[no_mangle]
pub extern "C" fn knxmsg_version() -> u32 {
    (VERSION_MAJOR << 16) | (VERSION_MINOR << 8) | VERSION_PATCH
}

#[no_mangle]
pub extern "C" fn knxmsg_version_major() -> u32 {
    VERSION_MAJOR
}

#[no_mangle]
pub extern "C" fn knxmsg_version_minor() -> u32 {
    VERSION_MINOR
}

#[no_mangle]
pub extern "C" fn knxmsg_version_patch() -> u32 {
    VERSION_PATCH
}

/// Non-zero when a caller built against `major.minor` can use this library.
///
/// Pre-1.0 releases only promise compatibility within one minor version.
#[no_mangle]
pub extern "C" fn knxmsg_version_compatible(major: u32, minor: u32) -> u8 {
    let compatible = if VERSION_MAJOR == 0 {
        major == 0 && minor == VERSION_MINOR
    } else {
        major == VERSION_MAJOR && minor <= VERSION_MINOR
    };
    compatible as u8
}
