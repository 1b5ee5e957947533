//! Bundled fallback catalog
//!
//! Static product data shown when the live API is unreachable and nothing is
//! cached. Inventory is deliberately reported as zero so that nothing bought from
//! an offline listing can pass checkout without a live stock check.

use super::Product;

/// Static product record that can live in a `static` array
struct FallbackProduct {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    price_cents: u64,
    category: &'static str,
}

/// Static array of the store's core merchandise
static FALLBACK_PRODUCTS: [FallbackProduct; 8] = [
    FallbackProduct {
        id: "tote-bag",
        name: "Canvas Tote Bag",
        description: "Heavyweight organic cotton tote with the community logo.",
        price_cents: 1800,
        category: "accessories",
    },
    FallbackProduct {
        id: "logo-tee",
        name: "Logo T-Shirt",
        description: "Soft unisex tee, printed locally with water-based inks.",
        price_cents: 2500,
        category: "apparel",
    },
    FallbackProduct {
        id: "zip-hoodie",
        name: "Zip Hoodie",
        description: "Midweight fleece hoodie with embroidered chest logo.",
        price_cents: 4800,
        category: "apparel",
    },
    FallbackProduct {
        id: "enamel-mug",
        name: "Enamel Camp Mug",
        description: "12 oz enamel mug, dishwasher safe.",
        price_cents: 1600,
        category: "home",
    },
    FallbackProduct {
        id: "water-bottle",
        name: "Insulated Water Bottle",
        description: "Keeps drinks cold for 24 hours, hot for 12.",
        price_cents: 3000,
        category: "home",
    },
    FallbackProduct {
        id: "sticker-pack",
        name: "Sticker Pack",
        description: "Five weatherproof vinyl stickers.",
        price_cents: 600,
        category: "accessories",
    },
    FallbackProduct {
        id: "beanie",
        name: "Knit Beanie",
        description: "Recycled-yarn beanie, one size.",
        price_cents: 2200,
        category: "apparel",
    },
    FallbackProduct {
        id: "notebook",
        name: "Recycled Notebook",
        description: "A5 dot-grid notebook, 120 pages of recycled paper.",
        price_cents: 1400,
        category: "stationery",
    },
];

impl FallbackProduct {
    fn to_product(&self) -> Product {
        Product {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            price_cents: self.price_cents,
            category: self.category.to_string(),
            image_url: None,
            inventory: 0,
            is_active: true,
        }
    }
}

/// All fallback products
pub fn fallback_products() -> Vec<Product> {
    FALLBACK_PRODUCTS.iter().map(FallbackProduct::to_product).collect()
}

/// Fallback product by id
pub fn fallback_product(id: &str) -> Option<Product> {
    FALLBACK_PRODUCTS
        .iter()
        .find(|product| product.id == id)
        .map(FallbackProduct::to_product)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fallback_catalog_has_8_entries() {
        assert_eq!(fallback_products().len(), 8);
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<_> = FALLBACK_PRODUCTS.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), FALLBACK_PRODUCTS.len());
    }

    #[test]
    fn test_every_product_is_priced_and_named() {
        for product in fallback_products() {
            assert!(product.price_cents > 0, "{} has no price", product.id);
            assert!(!product.name.is_empty());
        }
    }

    #[test]
    fn test_fallback_products_are_not_purchasable() {
        assert!(fallback_products().iter().all(|p| !p.is_available()));
    }

    #[test]
    fn test_fallback_product_lookup() {
        let mug = fallback_product("enamel-mug").expect("mug should exist");
        assert_eq!(mug.name, "Enamel Camp Mug");
        assert!(fallback_product("does-not-exist").is_none());
    }
}
