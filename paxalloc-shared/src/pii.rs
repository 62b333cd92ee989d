use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wrapper for passenger documents and phone numbers.
///
/// `Debug` and `Display` never print the value, so a stray
/// `tracing::debug!("{:?}", detail)` cannot leak it. Serialization writes the
/// real value because the manifest export needs it.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Explicit access to the unmasked value
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_value() {
        let doc = Masked::new("X1234567".to_string());
        assert_eq!(format!("{:?}", doc), "********");
        assert_eq!(doc.to_string(), "********");
        assert_eq!(doc.expose(), "X1234567");
    }

    #[test]
    fn test_serialize_exposes_value() {
        let doc = Masked::new("X1234567".to_string());
        assert_eq!(serde_json::to_string(&doc).unwrap(), "\"X1234567\"");
        let back: Masked<String> = serde_json::from_str("\"Y9\"").unwrap();
        assert_eq!(back.into_inner(), "Y9");
    }
}
