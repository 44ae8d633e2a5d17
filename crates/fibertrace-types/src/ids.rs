//! Type-safe identifier wrappers.
//!
//! Run numbers and sensor copy numbers are both plain integers handed over by
//! the simulation engine. Wrapping them prevents a run number from being
//! passed where a sensor copy number is expected.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around an integer with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Create an identifier from its raw integer value.
            pub const fn new(raw: $inner) -> Self {
                Self(raw)
            }

            /// Return the raw integer value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(raw: $inner) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Sequential run number assigned by the simulation engine.
    ///
    /// Used to name per-run report files, so two runs never write to the
    /// same destination.
    RunId(u32)
}

define_id! {
    /// Copy number of a sensor placement in the detector geometry.
    SensorId(i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_displays_raw_number() {
        assert_eq!(RunId::new(7).to_string(), "7");
        assert_eq!(u32::from(RunId::new(7)), 7);
    }

    #[test]
    fn sensor_id_serializes_transparently() {
        let json = serde_json::to_string(&SensorId::new(-3)).unwrap_or_default();
        assert_eq!(json, "-3");
    }
}
