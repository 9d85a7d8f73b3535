//! Clock offsets used to synchronize process-local timestamps.
//!
//! Offsets stay in the local manager; they are never unified.

use super::{Definition, HandleType};
use crate::context::Definitions;
use crate::error::{DefinitionsError, Result};
use crate::manager::{DefinitionHeader, DefinitionManager, Interned};
use crate::types::Handle;

/// Handle to a [`ClockOffsetDef`].
pub type ClockOffsetHandle = Handle<ClockOffsetDef>;

/// Offset of the local clock against the reference clock at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockOffsetDef {
    pub(crate) header: DefinitionHeader,
    pub(crate) time: u64,
    pub(crate) offset: i64,
    pub(crate) standard_deviation: f64,
}

impl ClockOffsetDef {
    /// Local timestamp of the measurement.
    #[must_use]
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Offset to the reference clock.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Standard deviation of the offset.
    #[must_use]
    pub fn standard_deviation(&self) -> f64 {
        self.standard_deviation
    }
}

impl Definition for ClockOffsetDef {
    const SUBSTRATE_AWARE: bool = false;

    fn equal(_existing: &Self, _candidate: &Self) -> bool {
        false
    }
}

impl DefinitionManager {
    /// Append a clock offset. Timestamps must not decrease.
    pub fn define_clock_offset(
        &mut self,
        time: u64,
        offset: i64,
        standard_deviation: f64,
    ) -> Result<Interned<ClockOffsetDef>> {
        let last: ClockOffsetHandle = Handle::from_any(self.entry(HandleType::ClockOffset).tail());
        if let Some(previous) = self.try_get(last) {
            if time < previous.time {
                return Err(DefinitionsError::ClockOffsetOutOfOrder {
                    time,
                    previous: previous.time,
                });
            }
        }
        self.intern(ClockOffsetDef {
            header: DefinitionHeader::new(),
            time,
            offset,
            standard_deviation,
        })
    }

    /// The first and the last recorded offsets.
    pub fn clock_sync_pair(&self) -> Result<(&ClockOffsetDef, &ClockOffsetDef)> {
        let available = self.count::<ClockOffsetDef>() as usize;
        let entry = self.entry(HandleType::ClockOffset);
        let first = self.try_get(ClockOffsetHandle::from_any(entry.head()));
        let last = self.try_get(ClockOffsetHandle::from_any(entry.tail()));
        match (first, last) {
            (Some(first), Some(last)) if available >= 2 => Ok((first, last)),
            _ => Err(DefinitionsError::ClockOffsetsUnavailable {
                requested: 2,
                available,
            }),
        }
    }
}

impl Definitions {
    /// Record a clock offset measured at local time `time`.
    pub fn add_clock_offset(
        &self,
        time: u64,
        offset: i64,
        standard_deviation: f64,
    ) -> Result<ClockOffsetHandle> {
        self.define(|local| local.define_clock_offset(time, offset, standard_deviation))
    }

    /// The first and the last recorded offsets, as `(time, offset)` pairs.
    pub fn clock_sync_pair(&self) -> Result<((u64, i64), (u64, i64))> {
        let local = self.lock();
        let (first, last) = local.clock_sync_pair()?;
        Ok(((first.time, first.offset), (last.time, last.offset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionsConfig;

    #[test]
    fn sync_pair_needs_two_offsets() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        assert_eq!(definitions.clock_sync_pair().unwrap_err().code(), "E302");

        definitions.add_clock_offset(100, -5, 0.5).unwrap();
        assert_eq!(definitions.clock_sync_pair().unwrap_err().code(), "E302");

        definitions.add_clock_offset(200, -3, 0.25).unwrap();
        definitions.add_clock_offset(300, 2, 0.1).unwrap();
        assert_eq!(definitions.clock_sync_pair().unwrap(), ((100, -5), (300, 2)));
    }

    #[test]
    fn timestamps_must_not_go_back() {
        let definitions = Definitions::new(DefinitionsConfig::default()).unwrap();
        definitions.add_clock_offset(500, 0, 0.0).unwrap();
        definitions.add_clock_offset(500, 1, 0.0).unwrap();
        let err = definitions.add_clock_offset(499, 0, 0.0).unwrap_err();
        assert_eq!(
            err,
            DefinitionsError::ClockOffsetOutOfOrder {
                time: 499,
                previous: 500
            }
        );
        assert_eq!(definitions.lock().count::<ClockOffsetDef>(), 2);
    }
}
