use crate::{AdapterDescriptor, AdapterSource, Result};
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// What to do with software adapters like the "Microsoft Basic Render Driver"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoftwarePolicy {
    /// End enumeration at the first software adapter, it's normally listed last
    Stop,
    /// Leave software adapters out but keep enumerating
    #[default]
    Skip,
    /// Report software adapters like any other
    Include,
}

impl FromStr for SoftwarePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stop" => Ok(SoftwarePolicy::Stop),
            "skip" => Ok(SoftwarePolicy::Skip),
            "include" => Ok(SoftwarePolicy::Include),
            _ => Err(format!("unknown software adapter policy {s:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Upper bound on the number of adapters returned, unbounded if `None`
    pub max_count: Option<usize>,
    pub software: SoftwarePolicy,
}

impl Options {
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = Some(max_count);
        self
    }

    pub fn with_software(mut self, software: SoftwarePolicy) -> Self {
        self.software = software;
        self
    }
}

/// List the adapters of `source` in enumeration order.
///
/// Any platform failure fails the whole call, adapters collected before it are discarded.
/// Failures are returned, not logged.
/// The source is consumed and dropped on every return path.
#[instrument(skip(source))]
pub fn enumerate_adapters<S: AdapterSource>(
    mut source: S,
    options: &Options,
) -> Result<Vec<AdapterDescriptor>> {
    let max_count = options.max_count.unwrap_or(usize::MAX);
    let mut adapters = Vec::new();

    let mut index = 0;
    while adapters.len() < max_count {
        let info = match source.next_adapter(index)? {
            Some(info) => info,
            None => break,
        };
        debug!(index, name = %info.name, software = info.software, "found adapter");

        if info.software {
            match options.software {
                SoftwarePolicy::Stop => {
                    info!(index, name = %info.name, "software adapter reached, stopping");
                    break;
                }
                SoftwarePolicy::Skip => {
                    info!(index, name = %info.name, "skipping software adapter");
                    index += 1;
                    continue;
                }
                SoftwarePolicy::Include => {}
            }
        }

        adapters.push(AdapterDescriptor::new(index, &info));
        index += 1;
    }

    Ok(adapters)
}
