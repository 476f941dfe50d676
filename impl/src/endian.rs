//! Endianness and the process-wide default.

use std::sync::atomic::{AtomicU8, Ordering};

const UNSET: u8 = 2;
const LITTLE: u8 = 0;
const BIG: u8 = 1;

static DEFAULT_ENDIAN: AtomicU8 = AtomicU8::new(UNSET);

/// Big- or little-endian byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    fn encode(self) -> u8 {
        match self {
            Endian::Little => LITTLE,
            Endian::Big => BIG,
        }
    }
}

/// The endianness of the host this process is running on, detected by
/// probing the in-memory representation of a known word.
pub fn host_endian() -> Endian {
    let probe: u16 = 1;
    if probe.to_ne_bytes()[0] == 1 {
        Endian::Little
    } else {
        Endian::Big
    }
}

/// The process-wide default endian, used whenever neither a descriptor nor
/// a caller supplies one explicitly. Initialized lazily to [`host_endian`].
pub fn default_endian() -> Endian {
    match DEFAULT_ENDIAN.load(Ordering::Relaxed) {
        LITTLE => Endian::Little,
        BIG => Endian::Big,
        _ => {
            let host = host_endian();
            set_default_endian(host);
            host
        }
    }
}

/// Replace the process-wide default endian.
pub fn set_default_endian(endian: Endian) {
    DEFAULT_ENDIAN.store(endian.encode(), Ordering::Relaxed);
}

/// Resolve the endian that actually governs a pack/unpack call: the
/// descriptor's own fixed endian, else the caller's, else the process
/// default.
pub(crate) fn effective(fixed: Option<Endian>, caller: Option<Endian>) -> Endian {
    fixed.or(caller).unwrap_or_else(default_endian)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_read_back() {
        set_default_endian(Endian::Big);
        assert_eq!(default_endian(), Endian::Big);
        set_default_endian(Endian::Little);
        assert_eq!(default_endian(), Endian::Little);
    }

    #[test]
    fn effective_prefers_fixed_over_caller() {
        assert_eq!(effective(Some(Endian::Big), Some(Endian::Little)), Endian::Big);
        assert_eq!(effective(None, Some(Endian::Little)), Endian::Little);
    }
}
