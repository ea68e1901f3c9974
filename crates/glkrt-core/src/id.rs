#![forbid(unsafe_code)]

//! Stable identifiers for runtime objects.
//!
//! Ids are allocated monotonically per registry and never reused while the
//! runtime lives. `0` is reserved so that raw peer signals can use it to mean
//! "no window".

use std::fmt;
use std::num::NonZeroU32;

/// Opaque caller tag stored with every object and handed back on iteration.
pub type Rock = u32;

/// Behaviour shared by every registry key.
pub trait ObjectId: Copy + Ord + fmt::Debug {
    /// First id handed out by a fresh registry.
    const FIRST: Self;

    /// Raw numeric value (never 0).
    fn get(self) -> u32;

    /// The id allocated after this one, or `None` when the space is exhausted.
    fn checked_next(self) -> Option<Self>;
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Create an id from its raw value, rejecting 0.
            #[must_use]
            pub const fn new(raw: u32) -> Option<Self> {
                match NonZeroU32::new(raw) {
                    Some(value) => Some(Self(value)),
                    None => None,
                }
            }

            /// Raw numeric value.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl ObjectId for $name {
            const FIRST: Self = Self(NonZeroU32::MIN);

            fn get(self) -> u32 {
                self.0.get()
            }

            fn checked_next(self) -> Option<Self> {
                self.0.checked_add(1).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifier of a window (leaf or pair). Also the id passed to the peer.
    WindowId,
    "window"
);

define_id!(
    /// Identifier of a stream of any kind.
    StreamId,
    "stream"
);

define_id!(
    /// Identifier of a file reference.
    FilerefId,
    "fileref"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(WindowId::new(0).is_none());
        assert_eq!(WindowId::new(7).map(WindowId::get), Some(7));
    }

    #[test]
    fn first_id_is_one_and_next_is_monotonic() {
        let first = StreamId::FIRST;
        assert_eq!(first.get(), 1);
        let next = first.checked_next().expect("room for another id");
        assert!(next > first);
        assert_eq!(next.get(), 2);
    }

    #[test]
    fn exhaustion_reports_none() {
        let last = FilerefId::new(u32::MAX).expect("non-zero");
        assert!(last.checked_next().is_none());
    }

    #[test]
    fn display_names_the_object_class() {
        let id = WindowId::new(3).expect("non-zero");
        assert_eq!(id.to_string(), "window#3");
    }
}
