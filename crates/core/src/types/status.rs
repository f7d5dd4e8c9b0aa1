//! Status and kind enums for catalog entities.
//!
//! Each enum serializes in `snake_case`, which is also the value stored in the
//! database column (see `as_str`).

use serde::{Deserialize, Serialize};

/// Publication status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Draft,
    Proposed,
    Published,
    Rejected,
}

impl ProductStatus {
    /// Column value for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Proposed => "proposed",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

/// Role of a back-office user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Full access including user management.
    Admin,
    /// Regular store staff.
    #[default]
    Member,
    /// API access for integrations.
    Developer,
}

impl UserRole {
    /// Column value for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Developer => "developer",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "developer" => Ok(Self::Developer),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// How a shipping option is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingPriceType {
    /// Fixed amount, stored on the option.
    FlatRate,
    /// Computed by the fulfillment provider at checkout.
    Calculated,
}

impl ShippingPriceType {
    /// Column value for this price type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FlatRate => "flat_rate",
            Self::Calculated => "calculated",
        }
    }
}

/// Kind of shipping profile.
///
/// Every store has exactly one `Default` and one `GiftCard` profile; products
/// and shipping options attach to one of them depending on `is_giftcard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingProfileKind {
    Default,
    GiftCard,
    Custom,
}

impl ShippingProfileKind {
    /// Column value for this profile kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::GiftCard => "gift_card",
            Self::Custom => "custom",
        }
    }

    /// Profile kind selected by an entity's gift-card flag.
    #[must_use]
    pub const fn for_giftcard(is_giftcard: bool) -> Self {
        if is_giftcard {
            Self::GiftCard
        } else {
            Self::Default
        }
    }
}

impl std::fmt::Display for ShippingProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_matches_column_values() {
        for status in [
            ProductStatus::Draft,
            ProductStatus::Proposed,
            ProductStatus::Published,
            ProductStatus::Rejected,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert_eq!(
            serde_json::to_string(&ShippingPriceType::FlatRate).unwrap(),
            "\"flat_rate\""
        );
        assert_eq!(
            serde_json::to_string(&ShippingProfileKind::GiftCard).unwrap(),
            "\"gift_card\""
        );
    }

    #[test]
    fn test_user_role_parse() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("developer".parse::<UserRole>().unwrap(), UserRole::Developer);
        assert!("owner".parse::<UserRole>().is_err());
        assert_eq!(UserRole::default(), UserRole::Member);
    }

    #[test]
    fn test_profile_for_giftcard() {
        assert_eq!(ShippingProfileKind::for_giftcard(true), ShippingProfileKind::GiftCard);
        assert_eq!(ShippingProfileKind::for_giftcard(false), ShippingProfileKind::Default);
    }
}
