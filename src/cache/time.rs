use std::{
    fmt::Display,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use super::CacheError;

/// How long a decoy ticket claims to be valid, ten years including leap days
pub const DECOY_LIFETIME: Duration = Duration::from_secs(3653 * 24 * 60 * 60);

/// A credential cache time stamp, unsigned 32-bit seconds since the epoch
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheTime(u32);
impl CacheTime {
    /// 2106-02-07T06:28:15Z
    pub const MAX: Self = Self(u32::MAX);

    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }
    pub fn from_system_time(time: SystemTime) -> Result<Self, CacheError> {
        let secs = time.duration_since(UNIX_EPOCH).map_or(0, |since| since.as_secs());
        u32::try_from(secs).map(Self).map_err(|_| CacheError::TimestampOverflow {
            start: secs,
            offset: Duration::ZERO,
        })
    }
    pub fn now() -> Result<Self, CacheError> {
        Self::from_system_time(SystemTime::now())
    }
    /// `self + offset`, failing when the result is past [`CacheTime::MAX`]
    pub fn checked_add(self, offset: Duration) -> Result<Self, CacheError> {
        let overflow = || CacheError::TimestampOverflow {
            start: u64::from(self.0),
            offset,
        };
        let offset = u32::try_from(offset.as_secs()).map_err(|_| overflow())?;
        self.0.checked_add(offset).map(Self).ok_or_else(overflow)
    }
    pub fn as_secs(self) -> u32 {
        self.0
    }
}
impl Display for CacheTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s since epoch", self.0)
    }
}
