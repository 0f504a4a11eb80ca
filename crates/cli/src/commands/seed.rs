//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - sku: MUG-ENAMEL
//!     name: Enamel Mug
//!     price: "18.00"
//!     image_url: /images/mug.jpg
//! ```
//!
//! Products are matched by SKU, so re-running the command updates existing
//! rows instead of duplicating them.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use corner_shop_storefront::db::{self, products::ProductRepository};

use super::{CommandError, database_url};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogSeed {
    pub products: Vec<ProductSeed>,
}

/// One product entry.
#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub sku: String,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Check every entry, returning one message per problem.
#[must_use]
pub fn validate(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (index, product) in seed.products.iter().enumerate() {
        let sku = product.sku.trim();
        if sku.is_empty() {
            errors.push(format!("product #{}: sku is empty", index + 1));
        } else if !seen.insert(sku) {
            errors.push(format!("product #{}: duplicate sku '{sku}'", index + 1));
        }
        if product.name.trim().is_empty() {
            errors.push(format!("product #{}: name is empty", index + 1));
        }
        if product.price.is_sign_negative() && !product.price.is_zero() {
            errors.push(format!(
                "product #{}: price {} is negative",
                index + 1,
                product.price
            ));
        }
    }

    errors
}

/// Parse and validate a seed file's contents.
///
/// # Errors
///
/// Returns `CommandError::Yaml` for malformed YAML and
/// `CommandError::Validation` if any entry is invalid.
pub fn parse(content: &str) -> Result<CatalogSeed, CommandError> {
    let seed: CatalogSeed = serde_yaml::from_str(content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(CommandError::Validation(errors.len()));
    }

    Ok(seed)
}

/// Upsert every product in `file_path`. Returns the number of products written.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or a database
/// operation fails.
pub async fn products(file_path: &Path) -> Result<usize, CommandError> {
    info!(path = %file_path.display(), "Loading catalog");

    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.display().to_string(),
            source,
        })?;

    // Validate before touching the database
    let seed = parse(&content)?;
    info!(products = seed.products.len(), "Catalog validated");

    let pool = db::create_pool(&database_url()?).await?;
    let repo = ProductRepository::new(&pool);

    for product in &seed.products {
        let stored = repo
            .upsert_by_sku(
                product.sku.trim(),
                product.name.trim(),
                product.price,
                product.image_url.as_deref(),
            )
            .await?;
        info!(sku = %product.sku, id = %stored.id, "Upserted product");
    }

    Ok(seed.products.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catalog() {
        let seed = parse(
            r#"
products:
  - sku: MUG-ENAMEL
    name: Enamel Mug
    price: "18.00"
    image_url: /images/mug.jpg
  - sku: TOTE
    name: Canvas Tote
    price: 12.5
"#,
        )
        .unwrap();

        assert_eq!(seed.products.len(), 2);
        assert_eq!(seed.products[0].price, Decimal::new(1800, 2));
        assert_eq!(seed.products[1].price, Decimal::new(125, 1));
        assert!(seed.products[1].image_url.is_none());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let seed = CatalogSeed {
            products: vec![
                ProductSeed {
                    sku: "A".into(),
                    name: " ".into(),
                    price: Decimal::ONE,
                    image_url: None,
                },
                ProductSeed {
                    sku: "A".into(),
                    name: "Dup".into(),
                    price: Decimal::new(-1, 0),
                    image_url: None,
                },
            ],
        };

        let errors = validate(&seed);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("name is empty"));
        assert!(errors[1].contains("duplicate sku"));
        assert!(errors[2].contains("negative"));
    }

    #[test]
    fn test_parse_rejects_invalid_catalog() {
        let result = parse("products:\n  - sku: ''\n    name: Mug\n    price: 1\n");
        assert!(matches!(result, Err(CommandError::Validation(1))));
    }
}
