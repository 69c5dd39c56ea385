//! Core State trait for governed state values.
//!
//! A state value is the scalar held by an entity's state attribute. It is
//! compared against declared source sets, hashed into lookup tables and
//! serialized into snapshots, so the trait bounds reflect all three uses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{self, Debug, Display};
use std::hash::Hash;

/// Trait for values held by a governed state attribute.
///
/// # Required Traits
///
/// - `Clone`: values are copied into events, logs and snapshots
/// - `Eq` + `Hash`: source sets are matched by equality
/// - `Debug`: values are debuggable for diagnostics
/// - `Serialize` + `Deserialize`: values round-trip through stores and snapshots
///
/// # Example
///
/// ```rust
/// use statewarden::core::State;
/// use serde::{Deserialize, Serialize};
/// use std::borrow::Cow;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
/// enum OrderState {
///     Placed,
///     Shipped,
/// }
///
/// impl State for OrderState {
///     fn name(&self) -> Cow<'_, str> {
///         match self {
///             Self::Placed => Cow::Borrowed("placed"),
///             Self::Shipped => Cow::Borrowed("shipped"),
///         }
///     }
/// }
///
/// assert_eq!(OrderState::Shipped.name(), "shipped");
/// ```
pub trait State:
    Clone + Eq + Hash + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Get the state's name for display, logging and error messages.
    fn name(&self) -> Cow<'_, str>;
}

impl State for String {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

macro_rules! integer_state {
    ($($ty:ty),* $(,)?) => {
        $(
            impl State for $ty {
                fn name(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }
            }
        )*
    };
}

integer_state!(i16, i32, i64, u8, u16, u32, u64);

/// Opaque reference key used as a state value.
///
/// Useful when the legal states live in their own table and the governed
/// attribute only stores the key of a row in it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey<K>(pub K);

impl<K> StateKey<K> {
    pub fn key(&self) -> &K {
        &self.0
    }
}

impl<K> From<K> for StateKey<K> {
    fn from(key: K) -> Self {
        StateKey(key)
    }
}

impl<K: Display> Display for StateKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<K> State for StateKey<K>
where
    K: Clone + Eq + Hash + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> Cow<'_, str> {
        Cow::Owned(self.0.to_string())
    }
}
