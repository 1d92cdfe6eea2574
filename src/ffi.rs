//! C ABI for callers that load the library dynamically.
//!
//! The record layout matches `struct GpuDesc { wchar_t name[128]; size_t ...; int64_t ...; }`
//! with a 16 bit `wchar_t`.

use crate::data::NAME_CAPACITY;
use crate::{enumerate_adapters, AdapterDescriptor, AdapterSource, Options, Result, SoftwarePolicy};
use std::fmt::Display;
use std::io::{self, Write};
use std::ptr;
use tracing::error;
use tracing::subscriber::NoSubscriber;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GpuDesc {
    pub name: [u16; NAME_CAPACITY],
    // all in bytes
    pub dedicated_gpu_memory: usize,
    pub dedicated_system_memory: usize,
    pub shared_system_memory: usize,
    /// -1 means not available
    pub current_gpu_memory_usage: i64,
}

impl From<&AdapterDescriptor> for GpuDesc {
    fn from(adapter: &AdapterDescriptor) -> Self {
        GpuDesc {
            name: *adapter.name.as_raw(),
            dedicated_gpu_memory: saturating_usize(adapter.dedicated_gpu_memory),
            dedicated_system_memory: saturating_usize(adapter.dedicated_system_memory),
            shared_system_memory: saturating_usize(adapter.shared_system_memory),
            current_gpu_memory_usage: adapter.current_gpu_memory_usage,
        }
    }
}

fn saturating_usize(bytes: u64) -> usize {
    usize::try_from(bytes).unwrap_or(usize::MAX)
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetCode {
    Success = 0,
    WinApiInvokeFailed = 1,
}

/// Fill `buf` with up to `max_count` adapters, stopping at the software adapter.
///
/// `buf` and `gpu_count` are only written when `Success` is returned.
///
/// # Safety
///
/// `buf` must be valid for writes of `max_count` records and `gpu_count` valid for a write.
#[no_mangle]
pub unsafe extern "C" fn get_all_gpus(
    buf: *mut GpuDesc,
    max_count: usize,
    gpu_count: *mut usize,
) -> RetCode {
    write_gpus(crate::platform_source(), buf, max_count, gpu_count)
}

/// [`get_all_gpus`] against an arbitrary adapter source.
///
/// # Safety
///
/// Same requirements as [`get_all_gpus`].
pub unsafe fn write_gpus<S: AdapterSource>(
    source: Result<S>,
    buf: *mut GpuDesc,
    max_count: usize,
    gpu_count: *mut usize,
) -> RetCode {
    if gpu_count.is_null() || (buf.is_null() && max_count > 0) {
        report_failure("null output pointer passed to get_all_gpus", io::stderr());
        return RetCode::WinApiInvokeFailed;
    }

    let options = Options::default()
        .with_max_count(max_count)
        .with_software(SoftwarePolicy::Stop);
    let adapters = match source.and_then(|source| enumerate_adapters(source, &options)) {
        Ok(adapters) => adapters,
        Err(e) => {
            report_failure(e, io::stderr());
            return RetCode::WinApiInvokeFailed;
        }
    };

    for (i, adapter) in adapters.iter().enumerate() {
        // the caller's buffer may be uninitialized, don't read or drop the old value
        ptr::write(buf.add(i), GpuDesc::from(adapter));
    }
    *gpu_count = adapters.len();
    RetCode::Success
}

/// Log a failed call, writing to `fallback` when the host process has no tracing subscriber
fn report_failure<E: Display, W: Write>(err: E, mut fallback: W) {
    if tracing::dispatcher::get_default(|dispatch| dispatch.is::<NoSubscriber>()) {
        writeln!(fallback, "get_all_gpus failed: {err}").ok();
    } else {
        error!("{err}");
    }
}
