use std::{borrow::Borrow, fmt, time::Instant};

use toml::Value;

use crate::{ObserveError, lifecycle::EntityId};

/// Validated name of an observed property.
///
/// Either a plain name (`"count"`) or a dotted chain (`"player.volume"`).
/// The chain is validated but otherwise treated as an opaque key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath(String);

impl PropertyPath {
    /// Validates `path` and wraps it.
    ///
    /// # Errors
    /// * `ObserveError::InvalidArgument` - If the path is empty, contains
    ///   whitespace, or has an empty segment (`"a..b"`, `".a"`, `"a."`)
    pub fn parse(path: &str) -> Result<Self, ObserveError> {
        if path.is_empty() {
            return Err(ObserveError::invalid_argument(
                "property_path",
                "property path is empty",
            ));
        }

        if path.chars().any(char::is_whitespace) {
            return Err(ObserveError::invalid_argument(
                "property_path",
                format!("'{path}' contains whitespace"),
            ));
        }

        if let Some(index) = path.split('.').position(str::is_empty) {
            return Err(ObserveError::invalid_argument(
                "property_path",
                format!("'{path}' has an empty segment at position {index}"),
            ));
        }

        Ok(Self(path.to_string()))
    }

    /// The path as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dot-separated segments of the path.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PropertyPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PropertyPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for PropertyPath {
    type Error = ObserveError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::parse(path)
    }
}

impl TryFrom<String> for PropertyPath {
    type Error = ObserveError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Self::parse(&path)
    }
}

/// One property change as delivered by the transport.
///
/// Values are forwarded to callbacks exactly as the transport produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    /// The subject whose property changed.
    pub subject: EntityId,
    /// Path of the changed property.
    pub path: PropertyPath,
    /// The previous value, or `None` if the property had never been set.
    pub old_value: Option<Value>,
    /// The new value.
    pub new_value: Value,
    /// When the change occurred.
    pub timestamp: Instant,
}

impl PropertyChange {
    /// Creates a new property change stamped with the current time.
    ///
    /// # Arguments
    ///
    /// * `subject` - The subject whose property changed
    /// * `path` - The changed property
    /// * `old_value` - The previous value of the property (if any)
    /// * `new_value` - The new value of the property
    pub fn new(
        subject: EntityId,
        path: PropertyPath,
        old_value: Option<Value>,
        new_value: Value,
    ) -> Self {
        Self {
            subject,
            path,
            old_value,
            new_value,
            timestamp: Instant::now(),
        }
    }

    /// Extracts the new value as a specific type.
    ///
    /// # Errors
    ///
    /// Returns `ObserveError::TypeMismatch` if the value cannot be deserialized
    /// into the requested type.
    pub fn extract<T>(&self) -> Result<T, ObserveError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.deserialize_value(&self.new_value)
    }

    /// Extracts the old value as a specific type, if there was one.
    ///
    /// # Errors
    ///
    /// Returns `ObserveError::TypeMismatch` if the old value cannot be
    /// deserialized into the requested type.
    pub fn extract_old<T>(&self) -> Result<Option<T>, ObserveError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.old_value
            .as_ref()
            .map(|value| self.deserialize_value(value))
            .transpose()
    }

    fn deserialize_value<T>(&self, value: &Value) -> Result<T, ObserveError>
    where
        T: serde::de::DeserializeOwned,
    {
        let handle_err = |_e: toml::de::Error| -> ObserveError {
            ObserveError::TypeMismatch {
                path: self.path.to_string(),
                expected_type: std::any::type_name::<T>(),
                actual_value: value.clone(),
            }
        };

        T::deserialize(value.clone()).map_err(handle_err)
    }
}
