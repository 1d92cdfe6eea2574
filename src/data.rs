use crate::{AdapterInfo, SensorData};
use std::fmt;
use std::fmt::Write;

/// Capacity of an adapter name in UTF-16 code units, including the terminator
pub const NAME_CAPACITY: usize = 128;

/// Value of `current_gpu_memory_usage` when usage can't be measured
pub const USAGE_UNAVAILABLE: i64 = -1;

/// Adapter name stored the way the platform reports it.
///
/// Always NUL terminated, at most `NAME_CAPACITY - 1` units of content.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AdapterName([u16; NAME_CAPACITY]);

impl AdapterName {
    /// Copy a wide string, stopping at the first NUL and truncating to capacity
    pub fn from_wide(wide: &[u16]) -> Self {
        let end = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
        let mut len = end.min(NAME_CAPACITY - 1);
        // don't split a surrogate pair when truncating
        if len < end && is_high_surrogate(wide[len - 1]) {
            len -= 1;
        }
        let mut buf = [0; NAME_CAPACITY];
        buf[..len].copy_from_slice(&wide[..len]);
        AdapterName(buf)
    }

    /// The name without terminator
    pub fn as_wide(&self) -> &[u16] {
        let len = self.0.iter().position(|&c| c == 0).unwrap_or(0);
        &self.0[..len]
    }

    /// The full buffer including terminator and padding
    pub fn as_raw(&self) -> &[u16; NAME_CAPACITY] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.as_wide().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_wide())
    }
}

fn is_high_surrogate(c: u16) -> bool {
    (0xD800..0xDC00).contains(&c)
}

impl Default for AdapterName {
    fn default() -> Self {
        AdapterName([0; NAME_CAPACITY])
    }
}

impl From<&str> for AdapterName {
    fn from(name: &str) -> Self {
        let wide: Vec<u16> = name.encode_utf16().collect();
        AdapterName::from_wide(&wide)
    }
}

impl PartialEq<str> for AdapterName {
    fn eq(&self, other: &str) -> bool {
        self.as_wide().iter().copied().eq(other.encode_utf16())
    }
}

impl PartialEq<&str> for AdapterName {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl fmt::Display for AdapterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in char::decode_utf16(self.as_wide().iter().copied()) {
            f.write_char(c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl fmt::Debug for AdapterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Nvidia,
    Amd,
    Intel,
    Microsoft,
    Unknown,
}

impl Vendor {
    /// Classify by PCI vendor id, falling back to the adapter name
    pub fn detect(vendor_id: u32, name: &str) -> Vendor {
        match vendor_id {
            0x10DE => Vendor::Nvidia,
            0x1002 | 0x1022 => Vendor::Amd,
            0x8086 => Vendor::Intel,
            0x1414 => Vendor::Microsoft,
            _ => {
                let name = name.to_uppercase();
                if name.contains("NVIDIA") {
                    Vendor::Nvidia
                } else if name.contains("AMD") || name.contains("ATI") {
                    Vendor::Amd
                } else if name.contains("INTEL") {
                    Vendor::Intel
                } else {
                    Vendor::Unknown
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Nvidia => "nvidia",
            Vendor::Amd => "amd",
            Vendor::Intel => "intel",
            Vendor::Microsoft => "microsoft",
            Vendor::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDescriptor {
    /// Position in the platform's enumeration order
    pub index: u32,
    pub name: AdapterName,
    pub vendor_id: u32,
    pub device_id: u32,
    /// All memory sizes in bytes
    pub dedicated_gpu_memory: u64,
    pub dedicated_system_memory: u64,
    pub shared_system_memory: u64,
    /// Not measured, always 0
    pub current_gpu_memory_usage: i64,
}

impl AdapterDescriptor {
    pub fn new(index: u32, info: &AdapterInfo) -> Self {
        AdapterDescriptor {
            index,
            name: info.name,
            vendor_id: info.vendor_id,
            device_id: info.device_id,
            dedicated_gpu_memory: info.dedicated_video_memory,
            dedicated_system_memory: info.dedicated_system_memory,
            shared_system_memory: info.shared_system_memory,
            current_gpu_memory_usage: 0,
        }
    }

    pub fn vendor(&self) -> Vendor {
        Vendor::detect(self.vendor_id, &self.name.to_string_lossy())
    }
}

impl SensorData for AdapterDescriptor {
    fn write<W: Write>(&self, mut w: W, hostname: &str) {
        let name = self.name.to_string_lossy().replace('"', "\\\"");
        let vendor = self.vendor();
        for (metric, value) in [
            ("gpu_dedicated_memory", self.dedicated_gpu_memory),
            ("gpu_dedicated_system_memory", self.dedicated_system_memory),
            ("gpu_shared_system_memory", self.shared_system_memory),
        ] {
            writeln!(
                &mut w,
                r#"{}{{host="{}", adapter="{}", index="{}", vendor="{}"}} {}"#,
                metric, hostname, name, self.index, vendor, value
            )
            .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_stops_at_nul() {
        let mut wide: Vec<u16> = "NVIDIA GeForce RTX 3090".encode_utf16().collect();
        wide.push(0);
        wide.extend("garbage".encode_utf16());
        let name = AdapterName::from_wide(&wide);
        assert_eq!(name, "NVIDIA GeForce RTX 3090");
        assert_eq!(name.len(), 23);
    }

    #[test]
    fn test_name_at_capacity_boundary() {
        let exact = "a".repeat(NAME_CAPACITY - 1);
        let name = AdapterName::from(exact.as_str());
        assert_eq!(name.len(), NAME_CAPACITY - 1);
        assert_eq!(name.as_raw()[NAME_CAPACITY - 1], 0);
        assert_eq!(name.to_string_lossy(), exact);
    }

    #[test]
    fn test_name_truncated() {
        let long = "b".repeat(300);
        let name = AdapterName::from(long.as_str());
        assert_eq!(name.len(), NAME_CAPACITY - 1);
        assert_eq!(name.as_raw()[NAME_CAPACITY - 1], 0);
        assert_eq!(name.to_string_lossy(), "b".repeat(NAME_CAPACITY - 1));
    }

    #[test]
    fn test_name_truncation_keeps_surrogates_paired() {
        // 126 ascii units followed by a 2 unit character straddling the limit
        let long = format!("{}😀tail", "c".repeat(NAME_CAPACITY - 2));
        let name = AdapterName::from(long.as_str());
        assert_eq!(name.len(), NAME_CAPACITY - 2);
        assert_eq!(name.to_string_lossy(), "c".repeat(NAME_CAPACITY - 2));
    }

    #[test]
    fn test_empty_name() {
        let name = AdapterName::from_wide(&[]);
        assert!(name.is_empty());
        assert_eq!(name.to_string(), "");
    }

    #[test]
    fn test_vendor_detect() {
        assert_eq!(Vendor::detect(0x10DE, ""), Vendor::Nvidia);
        assert_eq!(Vendor::detect(0x1002, ""), Vendor::Amd);
        assert_eq!(Vendor::detect(0x8086, ""), Vendor::Intel);
        assert_eq!(Vendor::detect(0x1414, ""), Vendor::Microsoft);
        assert_eq!(Vendor::detect(0, "NVIDIA Tesla T4"), Vendor::Nvidia);
        assert_eq!(Vendor::detect(0, "Radeon (TM) ati"), Vendor::Amd);
        assert_eq!(Vendor::detect(0, "Intel(R) Arc(TM) A770"), Vendor::Intel);
        assert_eq!(Vendor::detect(0, "Virtual Display"), Vendor::Unknown);
    }

    #[test]
    fn test_descriptor_from_info() {
        let info = AdapterInfo {
            name: AdapterName::from("AMD Radeon RX 7900 XTX"),
            vendor_id: 0x1002,
            device_id: 0x744c,
            dedicated_video_memory: 24 << 30,
            dedicated_system_memory: 0,
            shared_system_memory: 32 << 30,
            software: false,
        };
        let desc = AdapterDescriptor::new(1, &info);
        assert_eq!(desc.index, 1);
        assert_eq!(desc.dedicated_gpu_memory, 24 << 30);
        assert_eq!(desc.shared_system_memory, 32 << 30);
        assert_eq!(desc.current_gpu_memory_usage, 0);
        assert_eq!(desc.vendor(), Vendor::Amd);
    }

    #[test]
    fn test_write_metrics() {
        let info = AdapterInfo {
            name: AdapterName::from("NVIDIA \"Titan\""),
            vendor_id: 0x10DE,
            device_id: 0x1b00,
            dedicated_video_memory: 12,
            dedicated_system_memory: 0,
            shared_system_memory: 34,
            software: false,
        };
        let mut out = String::new();
        AdapterDescriptor::new(0, &info).write(&mut out, "box");
        assert_eq!(
            out,
            concat!(
                "gpu_dedicated_memory{host=\"box\", adapter=\"NVIDIA \\\"Titan\\\"\", index=\"0\", vendor=\"nvidia\"} 12\n",
                "gpu_dedicated_system_memory{host=\"box\", adapter=\"NVIDIA \\\"Titan\\\"\", index=\"0\", vendor=\"nvidia\"} 0\n",
                "gpu_shared_system_memory{host=\"box\", adapter=\"NVIDIA \\\"Titan\\\"\", index=\"0\", vendor=\"nvidia\"} 34\n",
            )
        );
    }
}
