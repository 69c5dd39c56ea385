//! Macros for ergonomic state declarations.

/// Generate a fieldless state enum and its `State` implementation.
///
/// Each variant is named by its identifier.
///
/// # Example
///
/// ```
/// use statewarden::state_enum;
/// use statewarden::core::State;
///
/// state_enum! {
///     pub enum PostState {
///         New,
///         Published,
///         Hidden,
///     }
/// }
///
/// assert_eq!(PostState::Published.name(), "Published");
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize,
        )]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> ::std::borrow::Cow<'_, str> {
                match self {
                    $(Self::$variant => ::std::borrow::Cow::Borrowed(stringify!($variant))),*
                }
            }
        }
    };
}
