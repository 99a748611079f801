//! Small helpers shared by the pathmq crates
//!
//! - [`Bytesize`]: `"1M"`/`"512K"` style sizes, used for frame size limits
//! - [`to_duration`]: `"1m30s"`/`"250ms"` style durations, used for timeouts in configuration
//! - serde helpers to read both of the above, and socket addresses, from configuration files
//! - [`Counter`]: a current/max gauge used to instrument the broker
//!
//! ```
//! use pathmq_utils::{Bytesize, to_duration};
//!
//! assert_eq!(Bytesize::from("1M512K").as_usize(), 1_572_864);
//! assert_eq!(to_duration("1m30s").as_secs(), 90);
//! ```

#![deny(unsafe_code)]

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

mod counter;

pub use counter::Counter;

const BYTESIZE_K: usize = 1024;
const BYTESIZE_M: usize = 1048576;
const BYTESIZE_G: usize = 1073741824;

/// Byte size that reads and prints as `2G512M`-style text
///
/// ```
/// use pathmq_utils::Bytesize;
///
/// let size = Bytesize::from("64K");
/// assert_eq!(size.as_usize(), 65_536);
/// assert_eq!(Bytesize::from(1024).string(), "1K");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Bytesize(pub usize);

impl Bytesize {
    #[inline]
    pub fn as_usize(&self) -> usize {
        self.0
    }

    /// Largest units first, empty components skipped.
    pub fn string(&self) -> String {
        let mut v = self.0;
        let mut res = String::new();
        for (unit, size) in [('G', BYTESIZE_G), ('M', BYTESIZE_M), ('K', BYTESIZE_K)] {
            let n = v / size;
            if n > 0 {
                res.push_str(&format!("{n}{unit}"));
                v %= size;
            }
        }
        if v > 0 || res.is_empty() {
            res.push_str(&format!("{v}B"));
        }
        res
    }
}

impl From<usize> for Bytesize {
    fn from(v: usize) -> Self {
        Bytesize(v)
    }
}

impl From<&str> for Bytesize {
    fn from(v: &str) -> Self {
        Bytesize(to_bytesize(v))
    }
}

impl fmt::Debug for Bytesize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.string())
    }
}

impl<'de> Deserialize<'de> for Bytesize {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Bytesize(to_bytesize(&String::deserialize(deserializer)?)))
    }
}

/// Parses `2G512K`-style text, unknown or malformed components count as zero.
///
/// ```
/// assert_eq!(pathmq_utils::to_bytesize("2KB10B"), 2058);
/// ```
#[inline]
pub fn to_bytesize(text: &str) -> usize {
    let text = text.to_uppercase().replace("GB", "G").replace("MB", "M").replace("KB", "K");
    text.split_inclusive(['G', 'M', 'K', 'B'])
        .map(|x| {
            let mut chars = x.chars();
            let u = match chars.nth_back(0) {
                None => return 0,
                Some(u) => u,
            };
            let v = match chars.as_str().trim().parse::<usize>() {
                Err(_e) => return 0,
                Ok(v) => v,
            };
            match u {
                'B' => v,
                'K' => v * BYTESIZE_K,
                'M' => v * BYTESIZE_M,
                'G' => v * BYTESIZE_G,
                _ => 0,
            }
        })
        .sum()
}

/// Converts `1h30m15s`-style text to a [`Duration`].
///
/// Units: `ms`, `s`, `m`, `h`, `d`. A bare number is read as milliseconds.
///
/// ```
/// assert_eq!(pathmq_utils::to_duration("1h30m15s").as_secs(), 5415);
/// assert_eq!(pathmq_utils::to_duration("250ms").as_millis(), 250);
/// assert_eq!(pathmq_utils::to_duration("1500").as_millis(), 1500);
/// ```
#[inline]
pub fn to_duration(text: &str) -> Duration {
    let text = text.trim().to_lowercase();
    if let Ok(ms) = text.parse::<u64>() {
        return Duration::from_millis(ms);
    }
    let text = text.replace("ms", "Y");
    let ms: u64 = text
        .split_inclusive(['s', 'm', 'h', 'd', 'Y'])
        .map(|x| {
            let mut chars = x.chars();
            let u = match chars.nth_back(0) {
                None => return 0,
                Some(u) => u,
            };
            let v = match chars.as_str().trim().parse::<u64>() {
                Err(_e) => return 0,
                Ok(v) => v,
            };
            match u {
                'Y' => v,
                's' => v * 1000,
                'm' => v * 60000,
                'h' => v * 3600000,
                'd' => v * 86400000,
                _ => 0,
            }
        })
        .sum();
    Duration::from_millis(ms)
}

#[inline]
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let v = String::deserialize(deserializer)?;
    Ok(to_duration(&v))
}

#[inline]
pub fn deserialize_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer)?.parse::<SocketAddr>().map_err(de::Error::custom)
}

/// Number of processing units, never less than one.
#[inline]
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
