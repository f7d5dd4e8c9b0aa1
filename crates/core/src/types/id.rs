//! Prefixed string IDs for type-safe entity references.
//!
//! Every persisted entity is keyed by a string of the form `<prefix>_<suffix>`
//! where the suffix is a UUID v7 in simple form (`reg_0190f3c2...`, 32 lowercase
//! hex digits). Use the `define_id!` macro to create a wrapper per entity type
//! so ids of different entities cannot be mixed up.

use rand::RngCore;
use thiserror::Error;

/// Default length of identifiers produced by [`random_identifier`].
pub const RANDOM_IDENTIFIER_LENGTH: usize = 10;

/// Length of the suffix of a generated id.
pub const SUFFIX_LENGTH: usize = 32;

/// Errors that can occur when parsing a prefixed id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("id cannot be empty")]
    Empty,
    /// The input does not follow the `<prefix>_<suffix>` naming convention.
    #[error("id '{id}' is not of the form '{prefix}_<32 hex digits>'")]
    Malformed {
        /// The rejected input.
        id: String,
        /// Expected prefix.
        prefix: &'static str,
    },
}

/// Macro to define a type-safe prefixed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - `generate()` for fresh ids, `parse()` enforcing the prefix convention,
///   `from_raw()` for values read back from storage
///
/// # Example
///
/// ```rust
/// # use bazaar_core::define_id;
/// define_id!(WidgetId, "wid");
///
/// let id = WidgetId::generate();
/// assert!(id.as_str().starts_with("wid_"));
/// assert!(WidgetId::parse("wid_dummy").is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Prefix every generated id of this kind starts with.
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new, time-ordered id.
            #[must_use]
            pub fn generate() -> Self {
                Self(format!("{}_{}", $prefix, $crate::types::id::unique_suffix()))
            }

            /// Parse an id that must follow the `<prefix>_<suffix>` naming convention.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is empty or not of the generated shape.
            pub fn parse(s: &str) -> Result<Self, $crate::IdError> {
                if s.is_empty() {
                    return Err($crate::IdError::Empty);
                }
                if !Self::follows_convention(s) {
                    return Err($crate::IdError::Malformed {
                        id: s.to_owned(),
                        prefix: $prefix,
                    });
                }
                Ok(Self(s.to_owned()))
            }

            /// Wrap a value without checking the naming convention.
            #[must_use]
            pub fn from_raw(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Whether `s` has the shape of a generated id of this kind.
            #[must_use]
            pub fn follows_convention(s: &str) -> bool {
                s.strip_prefix($prefix)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .is_some_and($crate::types::id::is_suffix)
            }

            /// Get the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the id and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Entity IDs
define_id!(RegionId, "reg");
define_id!(ProductId, "prod");
define_id!(VariantId, "variant");
define_id!(ProductOptionId, "opt");
define_id!(OptionValueId, "optval");
define_id!(MoneyAmountId, "ma");
define_id!(ImageId, "img");
define_id!(CategoryId, "pcat");
define_id!(ShippingOptionId, "so");
define_id!(ShippingProfileId, "sp");
define_id!(StoreId, "store");
define_id!(SalesChannelId, "sc");
define_id!(UserId, "usr");

/// Suffix used by generated ids: a UUID v7 in simple (hex, no dashes) form.
///
/// UUID v7 is time-ordered, so ids sort roughly by creation time.
#[must_use]
pub fn unique_suffix() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

/// Whether `s` has the shape produced by [`unique_suffix`].
#[must_use]
pub fn is_suffix(s: &str) -> bool {
    s.len() == SUFFIX_LENGTH
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Generate a random lowercase hex identifier of exactly `length` characters.
#[must_use]
pub fn random_identifier(length: usize) -> String {
    let mut bytes = vec![0u8; length.div_ceil(2)];
    rand::rng().fill_bytes(&mut bytes);
    let mut out = hex::encode(bytes);
    out.truncate(length);
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uses_prefix() {
        let id = RegionId::generate();
        assert!(id.as_str().starts_with("reg_"));
        assert!(RegionId::follows_convention(id.as_str()));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(ProductId::generate(), ProductId::generate());
    }

    #[test]
    fn test_parse_accepts_convention() {
        let raw = "reg_0190f3c2a1b24c7d8e9f0a1b2c3d4e5f";
        let id = RegionId::parse(raw).unwrap();
        assert_eq!(id.as_str(), raw);
    }

    #[test]
    fn test_parse_rejects_placeholder() {
        assert!(matches!(
            RegionId::parse("test-region-eu"),
            Err(IdError::Malformed { prefix: "reg", .. })
        ));
        assert!(matches!(RegionId::parse(""), Err(IdError::Empty)));
    }

    #[test]
    fn test_prefix_alone_is_not_the_convention() {
        assert!(!RegionId::follows_convention("reg"));
        assert!(!RegionId::follows_convention("reg_"));
        assert!(!RegionId::follows_convention("reg_dummy"));
        assert!(!RegionId::follows_convention("region_0190f3c2a1b24c7d8e9f0a1b2c3d4e5f"));
        assert!(!RegionId::follows_convention("reg_0190F3C2A1B24C7D8E9F0A1B2C3D4E5F"));
    }

    #[test]
    fn test_random_identifier_length_and_charset() {
        for len in [1, 9, 10, 16] {
            let id = random_identifier(len);
            assert_eq!(id.len(), len);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_serde_transparent() {
        let id = StoreId::from_raw("store_abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"store_abc\"");
    }
}
