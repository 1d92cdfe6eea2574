use crate::data::AdapterName;
use crate::generation::{create_with_fallback, Generation};
use crate::{AdapterInfo, AdapterSource, Error, HResult, Result};
use std::ptr;
use tracing::debug;
use winapi::ctypes::c_void;
use winapi::shared::dxgi::{
    CreateDXGIFactory, CreateDXGIFactory1, IDXGIAdapter, IDXGIAdapter1, IDXGIFactory,
    IDXGIFactory1, DXGI_ADAPTER_DESC, DXGI_ADAPTER_DESC1, DXGI_ADAPTER_FLAG_SOFTWARE,
};
use winapi::shared::winerror::{DXGI_ERROR_NOT_FOUND, E_POINTER, SUCCEEDED};
use winapi::Interface;
use wio::com::ComPtr;

const BASIC_RENDER_DRIVER: &str = "Microsoft Basic Render Driver";
const BASIC_RENDER_VENDOR_ID: u32 = 0x1414;
const BASIC_RENDER_DEVICE_ID: u32 = 0x8c;

/// DXGI enumeration context, released when dropped.
///
/// `Modern` is DXGI 1.1, whose adapters report a software flag. `Legacy` is DXGI 1.0,
/// where software adapters are recognized by name.
pub type DxgiFactory = Generation<ComPtr<IDXGIFactory1>, ComPtr<IDXGIFactory>>;

impl DxgiFactory {
    pub fn new() -> Result<DxgiFactory> {
        create_with_fallback(
            || {
                let mut factory: *mut IDXGIFactory1 = ptr::null_mut();
                let hr = unsafe {
                    CreateDXGIFactory1(
                        &IDXGIFactory1::uuidof(),
                        &mut factory as *mut *mut IDXGIFactory1 as *mut *mut c_void,
                    )
                };
                take_com(hr, factory)
            },
            || {
                let mut factory: *mut IDXGIFactory = ptr::null_mut();
                let hr = unsafe {
                    CreateDXGIFactory(
                        &IDXGIFactory::uuidof(),
                        &mut factory as *mut *mut IDXGIFactory as *mut *mut c_void,
                    )
                };
                take_com(hr, factory)
            },
        )
    }

    fn next_modern(factory: &IDXGIFactory1, index: u32) -> Result<Option<AdapterInfo>> {
        let mut adapter: *mut IDXGIAdapter1 = ptr::null_mut();
        let hr = unsafe { factory.EnumAdapters1(index, &mut adapter) };
        let adapter = match check_enum(hr, adapter, index)? {
            Some(adapter) => adapter,
            None => return Ok(None),
        };

        let mut desc = DXGI_ADAPTER_DESC1::default();
        let hr = unsafe { adapter.GetDesc1(&mut desc) };
        check_desc(hr, index)?;

        Ok(Some(AdapterInfo {
            name: AdapterName::from_wide(&desc.Description),
            vendor_id: desc.VendorId,
            device_id: desc.DeviceId,
            dedicated_video_memory: desc.DedicatedVideoMemory as u64,
            dedicated_system_memory: desc.DedicatedSystemMemory as u64,
            shared_system_memory: desc.SharedSystemMemory as u64,
            software: desc.Flags & DXGI_ADAPTER_FLAG_SOFTWARE != 0,
        }))
    }

    fn next_legacy(factory: &IDXGIFactory, index: u32) -> Result<Option<AdapterInfo>> {
        let mut adapter: *mut IDXGIAdapter = ptr::null_mut();
        let hr = unsafe { factory.EnumAdapters(index, &mut adapter) };
        let adapter = match check_enum(hr, adapter, index)? {
            Some(adapter) => adapter,
            None => return Ok(None),
        };

        let mut desc = DXGI_ADAPTER_DESC::default();
        let hr = unsafe { adapter.GetDesc(&mut desc) };
        check_desc(hr, index)?;

        let name = AdapterName::from_wide(&desc.Description);
        let software = is_basic_render_driver(&name, desc.VendorId, desc.DeviceId);
        Ok(Some(AdapterInfo {
            name,
            vendor_id: desc.VendorId,
            device_id: desc.DeviceId,
            dedicated_video_memory: desc.DedicatedVideoMemory as u64,
            dedicated_system_memory: desc.DedicatedSystemMemory as u64,
            shared_system_memory: desc.SharedSystemMemory as u64,
            software,
        }))
    }
}

impl AdapterSource for DxgiFactory {
    fn next_adapter(&mut self, index: u32) -> Result<Option<AdapterInfo>> {
        match self {
            Generation::Modern(factory) => Self::next_modern(factory, index),
            Generation::Legacy(factory) => Self::next_legacy(factory, index),
        }
    }
}

/// Take ownership of an interface pointer returned by a successful call
fn take_com<T: Interface>(hr: i32, ptr: *mut T) -> Result<ComPtr<T>, i32> {
    if !SUCCEEDED(hr) {
        Err(hr)
    } else if ptr.is_null() {
        Err(E_POINTER)
    } else {
        Ok(unsafe { ComPtr::from_raw(ptr) })
    }
}

/// `Ok(None)` when the platform has no adapter at `index`
fn check_enum<T: Interface>(hr: i32, adapter: *mut T, index: u32) -> Result<Option<ComPtr<T>>> {
    if hr == DXGI_ERROR_NOT_FOUND {
        debug!(index, "no more adapters");
        return Ok(None);
    }
    take_com(hr, adapter)
        .map(Some)
        .map_err(|hr| Error::EnumAdapters {
            index,
            hr: HResult(hr),
        })
}

fn check_desc(hr: i32, index: u32) -> Result<()> {
    if SUCCEEDED(hr) {
        Ok(())
    } else {
        Err(Error::AdapterDesc {
            index,
            hr: HResult(hr),
        })
    }
}

fn is_basic_render_driver(name: &AdapterName, vendor_id: u32, device_id: u32) -> bool {
    *name == BASIC_RENDER_DRIVER
        || (vendor_id == BASIC_RENDER_VENDOR_ID && device_id == BASIC_RENDER_DEVICE_ID)
}
