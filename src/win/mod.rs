mod dxgi;

pub use self::dxgi::DxgiFactory;
use crate::Result;

pub fn platform_source() -> Result<DxgiFactory> {
    DxgiFactory::new()
}
