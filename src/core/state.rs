//! The `State` trait for typed views over machine states.
//!
//! Machine definitions name their states with strings. Hosts that drive a
//! fixed definition (the discovery workflow, the instance lifecycle) map
//! those names onto an enum implementing this trait, usually through the
//! [`state_enum!`](crate::state_enum) macro.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for typed state enums.
///
/// All methods are pure.
///
/// # Example
///
/// ```rust
/// use waypoint::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Phase {
///     Asking,
///     Finished,
///     Broken,
/// }
///
/// impl State for Phase {
///     fn name(&self) -> &str {
///         match self {
///             Self::Asking => "asking",
///             Self::Finished => "finished",
///             Self::Broken => "broken",
///         }
///     }
///
///     fn is_final(&self) -> bool {
///         matches!(self, Self::Finished | Self::Broken)
///     }
///
///     fn is_error(&self) -> bool {
///         matches!(self, Self::Broken)
///     }
/// }
///
/// assert_eq!(Phase::Asking.name(), "asking");
/// assert!(Phase::Broken.is_final());
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// The state id as it appears in the machine definition.
    fn name(&self) -> &str;

    /// Terminal states accept no further events.
    ///
    /// Default implementation returns `false`.
    fn is_final(&self) -> bool {
        false
    }

    /// Default implementation returns `false`.
    fn is_error(&self) -> bool {
        false
    }
}
