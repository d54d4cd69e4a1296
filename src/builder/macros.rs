//! Macros for typed views over machine states.

/// Generate a `State` implementation for a simple enum.
///
/// A variant may carry the state id it stands for (`Loading = "loading"`);
/// without one the variant name is used. The macro also generates
/// `from_name`, the inverse of `State::name`.
///
/// # Example
///
/// ```
/// use waypoint::state_enum;
/// use waypoint::core::State;
///
/// state_enum! {
///     pub enum Phase {
///         Asking = "asking",
///         Done = "done",
///         Failed,
///     }
///     final: [Done, Failed]
///     error: [Failed]
/// }
///
/// assert_eq!(Phase::Asking.name(), "asking");
/// assert_eq!(Phase::from_name("Failed"), Some(Phase::Failed));
/// assert!(Phase::Failed.is_error());
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(= $label:literal)?
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $name {
            /// Look up the variant whose state id is `name`.
            #[allow(dead_code)]
            pub fn from_name(name: &str) -> Option<Self> {
                $(
                    if name == $crate::__state_label!($variant $(, $label)?) {
                        return Some(Self::$variant);
                    }
                )*
                None
            }
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $crate::__state_label!($variant $(, $label)?)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }

            fn is_error(&self) -> bool {
                match self {
                    $($(Self::$error => true,)*)?
                    _ => false,
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __state_label {
    ($variant:ident) => {
        stringify!($variant)
    };
    ($variant:ident, $label:literal) => {
        $label
    };
}

#[cfg(test)]
mod tests {
    use crate::core::State;

    state_enum! {
        enum TestState {
            Loading = "loading",
            Choosing = "choosing",
            Complete = "complete",
            Failed,
        }
        final: [Complete, Failed]
        error: [Failed]
    }

    #[test]
    fn state_enum_macro_generates_trait() {
        assert_eq!(TestState::Loading.name(), "loading");
        assert!(!TestState::Loading.is_final());
        assert!(TestState::Complete.is_final());
        assert!(!TestState::Complete.is_error());
        assert!(TestState::Failed.is_error());
    }

    #[test]
    fn unlabelled_variant_uses_its_name() {
        assert_eq!(TestState::Failed.name(), "Failed");
    }

    #[test]
    fn from_name_inverts_name() {
        for state in [
            TestState::Loading,
            TestState::Choosing,
            TestState::Complete,
            TestState::Failed,
        ] {
            assert_eq!(TestState::from_name(state.name()), Some(state));
        }
        assert_eq!(TestState::from_name("nowhere"), None);
    }

    #[test]
    fn state_enum_works_without_final_error() {
        state_enum! {
            enum MinimalState {
                One,
                Two,
            }
        }

        let state = MinimalState::One;
        assert!(!state.is_final());
        assert!(!state.is_error());
        assert_eq!(MinimalState::from_name("Two"), Some(MinimalState::Two));
    }
}
