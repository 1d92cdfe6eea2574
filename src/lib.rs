pub mod data;
pub mod enumerate;
pub mod ffi;
pub mod generation;

#[cfg(not(windows))]
mod sys;
#[cfg(windows)]
mod win;

#[cfg(not(windows))]
pub use crate::sys::platform_source;
#[cfg(windows)]
pub use crate::win::{platform_source, DxgiFactory};

pub use crate::data::{AdapterDescriptor, AdapterName, Vendor};
pub use crate::enumerate::{enumerate_adapters, Options, SoftwarePolicy};

use std::fmt;
use std::fmt::Write;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A failing platform status code, printed the way the platform documents them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HResult(pub i32);

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010X}", self.0 as u32)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create DXGI factory: {hr}")]
    CreateFactory { hr: HResult },
    #[error("failed to enumerate adapter {index}: {hr}")]
    EnumAdapters { index: u32, hr: HResult },
    #[error("failed to get description for adapter {index}: {hr}")]
    AdapterDesc { index: u32, hr: HResult },
    #[error("adapter enumeration is not supported on this platform")]
    Unsupported,
}

/// Adapter properties as reported by the platform, before any filtering
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: AdapterName,
    pub vendor_id: u32,
    pub device_id: u32,
    pub dedicated_video_memory: u64,
    pub dedicated_system_memory: u64,
    pub shared_system_memory: u64,
    /// Software rasterizer such as the "Microsoft Basic Render Driver"
    pub software: bool,
}

/// A platform enumeration context.
///
/// Implementors hold whatever handle the platform needs and release it on drop.
pub trait AdapterSource {
    /// Get the adapter at `index`, `Ok(None)` once the platform has no more adapters.
    fn next_adapter(&mut self, index: u32) -> Result<Option<AdapterInfo>>;
}

impl<S: AdapterSource + ?Sized> AdapterSource for &mut S {
    fn next_adapter(&mut self, index: u32) -> Result<Option<AdapterInfo>> {
        (**self).next_adapter(index)
    }
}

impl<S: AdapterSource + ?Sized> AdapterSource for Box<S> {
    fn next_adapter(&mut self, index: u32) -> Result<Option<AdapterInfo>> {
        (**self).next_adapter(index)
    }
}

pub trait SensorData {
    /// Write sensor data in prometheus compatible format
    fn write<W: Write>(&self, w: W, hostname: &str);
}

#[cfg(test)]
pub(crate) mod test_source {
    use crate::{AdapterInfo, AdapterName, AdapterSource, Error, HResult, Result};
    use std::rc::Rc;
    use std::sync::atomic::{AtomicBool, Ordering};

    pub enum Step {
        Adapter(AdapterInfo),
        Fail(i32),
    }

    /// Scripted adapter source, anything past the script is end-of-sequence
    pub struct FakeSource {
        steps: Vec<Step>,
        pub calls: u32,
        released: Rc<AtomicBool>,
    }

    impl FakeSource {
        pub fn new(steps: Vec<Step>) -> Self {
            FakeSource {
                steps,
                calls: 0,
                released: Rc::default(),
            }
        }

        pub fn release_flag(&self) -> Rc<AtomicBool> {
            self.released.clone()
        }
    }

    impl Drop for FakeSource {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    impl AdapterSource for FakeSource {
        fn next_adapter(&mut self, index: u32) -> Result<Option<AdapterInfo>> {
            self.calls += 1;
            match self.steps.get(index as usize) {
                Some(Step::Adapter(info)) => Ok(Some(info.clone())),
                Some(Step::Fail(hr)) => Err(Error::EnumAdapters {
                    index,
                    hr: HResult(*hr),
                }),
                None => Ok(None),
            }
        }
    }

    pub fn adapter(name: &str, vendor_id: u32, dedicated: u64) -> Step {
        Step::Adapter(AdapterInfo {
            name: AdapterName::from(name),
            vendor_id,
            device_id: 0x2204,
            dedicated_video_memory: dedicated,
            dedicated_system_memory: 0,
            shared_system_memory: 16 * 1024 * 1024 * 1024,
            software: false,
        })
    }

    pub fn software() -> Step {
        Step::Adapter(AdapterInfo {
            name: AdapterName::from("Microsoft Basic Render Driver"),
            vendor_id: 0x1414,
            device_id: 0x8c,
            dedicated_video_memory: 0,
            dedicated_system_memory: 0,
            shared_system_memory: 8 * 1024 * 1024 * 1024,
            software: true,
        })
    }
}
