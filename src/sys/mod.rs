use crate::{AdapterInfo, AdapterSource, Error, Result};

/// Adapter source for platforms without DXGI, never constructed
pub enum NoAdapters {}

impl AdapterSource for NoAdapters {
    fn next_adapter(&mut self, _index: u32) -> Result<Option<AdapterInfo>> {
        match *self {}
    }
}

pub fn platform_source() -> Result<NoAdapters> {
    Err(Error::Unsupported)
}
