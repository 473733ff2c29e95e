//! Catalog entries as served by the flower API.

use serde::{Deserialize, Serialize};

use crate::{CategoryId, FlowerId, Price};

/// A flower category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// A product in the catalog.
///
/// Immutable from the storefront's point of view; a copy of it is snapshotted
/// into every cart line and order item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flower {
    pub id: FlowerId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    /// Uploaded image path or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Absolute image URL resolved by the API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

impl Flower {
    /// Image reference to render, preferring the resolved URL.
    #[must_use]
    pub fn image_ref(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .or(self.image.as_deref())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_flower() {
        let flower: Flower =
            serde_json::from_str(r#"{"id": 1, "name": "Rose", "price": "500.00"}"#).unwrap();
        assert_eq!(flower.id, FlowerId::new(1));
        assert_eq!(flower.price, Price::from_rubles(500));
        assert!(flower.in_stock);
        assert_eq!(flower.image_ref(), None);
    }

    #[test]
    fn test_image_ref_prefers_url() {
        let flower: Flower = serde_json::from_str(
            r#"{"id": 2, "name": "Tulip", "price": 120,
                "image": "/media/tulip.jpg",
                "image_url": "https://cdn.example.com/tulip.jpg"}"#,
        )
        .unwrap();
        assert_eq!(flower.image_ref(), Some("https://cdn.example.com/tulip.jpg"));
    }

    #[test]
    fn test_image_ref_falls_back_to_upload() {
        let flower: Flower = serde_json::from_str(
            r#"{"id": 3, "name": "Lily", "price": 300, "image": "/media/lily.jpg", "image_url": null}"#,
        )
        .unwrap();
        assert_eq!(flower.image_ref(), Some("/media/lily.jpg"));
    }
}
