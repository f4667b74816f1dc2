//! # Session Snapshot
//!
//! The cart snapshot stored in the payment session's metadata. It is the only
//! thing the reconciler trusts when it rebuilds an order.
//!
//! ## Wire Form
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  processor metadata (≤ 50 keys, ≤ 500 chars per value)                  │
//! │                                                                         │
//! │  userId          = "64f1c0..."                                          │
//! │  snapshotVersion = "2"                                                  │
//! │  productsChunks  = "3"                                                  │
//! │  products        = "[{\"id\":\"p1\",\"quantity\":2,\"pri"               │
//! │  products_1      = "ce\":10},{\"id\":\"p2\",\"quantity\":1,"            │
//! │  products_2      = "\"price\":4.5}]"                                    │
//! │                                                                         │
//! │  v1: a single `products` value, no chunk count                          │
//! │  legacy: v1 without `snapshotVersion`                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The JSON array is cut on character boundaries and joined again before
//! parsing, so a chunk on its own is not valid JSON.
//!
//! Decoding fails closed: anything unexpected is a [`CoreError::CorruptSnapshot`]
//! and no order is written.

use base64::Engine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::CartLine;

/// Metadata key holding the initiating user id.
pub const USER_ID_KEY: &str = "userId";

/// Metadata key holding the first (or only) slice of the snapshot lines.
/// Later slices use `products_1`, `products_2`, ...
pub const PRODUCTS_KEY: &str = "products";

/// Metadata key holding the number of `products` slices (v2).
pub const CHUNK_COUNT_KEY: &str = "productsChunks";

/// Metadata key holding the snapshot version.
pub const VERSION_KEY: &str = "snapshotVersion";

/// The snapshot version written by this build.
pub const CURRENT_VERSION: u8 = 2;

/// Single-value snapshots, with or without a version key.
const SINGLE_VALUE_VERSION: u8 = 1;

/// Processor limit on a single metadata value, in characters.
pub const MAX_METADATA_VALUE_LEN: usize = 500;

/// Processor limit on the number of metadata keys.
pub const MAX_METADATA_KEYS: usize = 50;

/// Slices left once userId, the version and the chunk count are stored.
pub const MAX_PRODUCT_CHUNKS: usize = MAX_METADATA_KEYS - 3;

// =============================================================================
// Snapshot Types
// =============================================================================

/// One frozen cart line: product, quantity and quote-currency unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLine {
    #[serde(rename = "id", alias = "productId")]
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in quote-currency major units, unconverted.
    pub price: Decimal,
}

impl From<&CartLine> for SnapshotLine {
    fn from(line: &CartLine) -> Self {
        SnapshotLine {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            price: line.price,
        }
    }
}

/// Versioned snapshot of a checkout, carried by the payment session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub version: u8,
    pub user_id: String,
    pub lines: Vec<SnapshotLine>,
}

impl SessionSnapshot {
    /// Freezes a validated cart for the given user.
    pub fn from_cart(user_id: impl Into<String>, cart: &[CartLine]) -> Self {
        SessionSnapshot {
            version: CURRENT_VERSION,
            user_id: user_id.into(),
            lines: cart.iter().map(SnapshotLine::from).collect(),
        }
    }

    /// Encodes the snapshot into processor metadata.
    ///
    /// ## Errors
    /// `ValidationError::TooLong` when the products array needs more than
    /// [`MAX_PRODUCT_CHUNKS`] values. A cart within `MAX_CART_LINES` with
    /// ordinary ids never gets there. The cart is rejected before the
    /// processor is called.
    pub fn to_metadata(&self) -> CoreResult<HashMap<String, String>> {
        let products = serde_json::to_string(&self.lines)
            .map_err(|e| CoreError::CorruptSnapshot(e.to_string()))?;

        let chunks = split_chunks(&products, MAX_METADATA_VALUE_LEN);
        if chunks.len() > MAX_PRODUCT_CHUNKS {
            return Err(ValidationError::TooLong {
                field: "products".to_string(),
                max: MAX_METADATA_VALUE_LEN * MAX_PRODUCT_CHUNKS,
            }
            .into());
        }

        let mut metadata = HashMap::with_capacity(chunks.len() + 3);
        metadata.insert(USER_ID_KEY.to_string(), self.user_id.clone());
        metadata.insert(VERSION_KEY.to_string(), CURRENT_VERSION.to_string());
        metadata.insert(CHUNK_COUNT_KEY.to_string(), chunks.len().to_string());
        for (idx, chunk) in chunks.into_iter().enumerate() {
            metadata.insert(chunk_key(idx), chunk);
        }
        Ok(metadata)
    }

    /// Decodes a snapshot from processor metadata.
    ///
    /// ## Fails Closed On
    /// - missing or empty `userId`
    /// - missing `products`, invalid JSON, or an empty array
    /// - a v2 chunk count outside 1..=47, or a missing slice
    /// - a line with an empty id, non-positive quantity or negative price
    /// - an unknown `snapshotVersion`
    pub fn from_metadata(metadata: &HashMap<String, String>) -> CoreResult<Self> {
        let version = match metadata.get(VERSION_KEY) {
            None => SINGLE_VALUE_VERSION,
            Some(raw) => raw
                .trim()
                .parse::<u8>()
                .map_err(|_| corrupt(format!("unreadable snapshot version '{}'", raw)))?,
        };

        let user_id = metadata
            .get(USER_ID_KEY)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| corrupt("missing userId"))?
            .to_string();

        let raw_products = match version {
            SINGLE_VALUE_VERSION => metadata
                .get(PRODUCTS_KEY)
                .cloned()
                .ok_or_else(|| corrupt("missing products"))?,
            CURRENT_VERSION => join_chunks(metadata)?,
            other => return Err(corrupt(format!("unsupported snapshot version {}", other))),
        };

        let lines: Vec<SnapshotLine> = serde_json::from_str(&raw_products)
            .map_err(|e| corrupt(format!("products is not a line array: {}", e)))?;

        if lines.is_empty() {
            return Err(corrupt("products is empty"));
        }

        for (idx, line) in lines.iter().enumerate() {
            if line.product_id.trim().is_empty() {
                return Err(corrupt(format!("line {} has no product id", idx)));
            }
            if line.quantity <= 0 {
                return Err(corrupt(format!("line {} has quantity {}", idx, line.quantity)));
            }
            if line.price < Decimal::ZERO {
                return Err(corrupt(format!("line {} has negative price", idx)));
            }
        }

        Ok(SessionSnapshot {
            version,
            user_id,
            lines,
        })
    }
}

/// Content digest of a set of snapshot lines, `"c1~"` + URL-safe base64 of
/// SHA-256 over the line JSON. Lines are hashed in cart order, so the same
/// items in a different order give a different digest.
pub fn cart_digest(lines: &[SnapshotLine]) -> CoreResult<String> {
    let json = serde_json::to_vec(lines).map_err(|e| CoreError::CorruptSnapshot(e.to_string()))?;
    let hash = Sha256::digest(&json);
    Ok(format!(
        "c1~{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash)
    ))
}

/// `products`, `products_1`, `products_2`, ...
fn chunk_key(idx: usize) -> String {
    if idx == 0 {
        PRODUCTS_KEY.to_string()
    } else {
        format!("{}_{}", PRODUCTS_KEY, idx)
    }
}

/// Cuts `value` into pieces of at most `max` characters.
fn split_chunks(value: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut len = 0;

    for ch in value.chars() {
        if len == max {
            chunks.push(std::mem::take(&mut current));
            len = 0;
        }
        current.push(ch);
        len += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn join_chunks(metadata: &HashMap<String, String>) -> CoreResult<String> {
    let raw = metadata
        .get(CHUNK_COUNT_KEY)
        .ok_or_else(|| corrupt("missing products chunk count"))?;
    let count = raw
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=MAX_PRODUCT_CHUNKS).contains(n))
        .ok_or_else(|| corrupt(format!("bad products chunk count '{}'", raw)))?;

    let mut joined = String::with_capacity(count * MAX_METADATA_VALUE_LEN);
    for idx in 0..count {
        let key = chunk_key(idx);
        let chunk = metadata
            .get(&key)
            .ok_or_else(|| corrupt(format!("missing {}", key)))?;
        joined.push_str(chunk);
    }
    Ok(joined)
}

fn corrupt(reason: impl Into<String>) -> CoreError {
    CoreError::CorruptSnapshot(reason.into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cart() -> Vec<CartLine> {
        vec![
            CartLine {
                product_id: "p-1".into(),
                name: "Mug".into(),
                image: None,
                price: dec!(10.00),
                quantity: 2,
            },
            CartLine {
                product_id: "p-2".into(),
                name: "Tee".into(),
                image: Some("https://img/tee.png".into()),
                price: dec!(10.99),
                quantity: 1,
            },
        ]
    }

    fn metadata(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn lines(count: usize, id_len: usize, price: Decimal, quantity: i64) -> Vec<CartLine> {
        (0..count)
            .map(|i| CartLine {
                product_id: format!("{:0>width$}", i, width = id_len),
                name: format!("Item {}", i),
                image: None,
                price,
                quantity,
            })
            .collect()
    }

    #[test]
    fn test_metadata_keys() {
        let snapshot = SessionSnapshot::from_cart("u-1", &cart());
        let md = snapshot.to_metadata().unwrap();

        assert_eq!(md.get(USER_ID_KEY).unwrap(), "u-1");
        assert_eq!(md.get(VERSION_KEY).unwrap(), "2");
        assert_eq!(md.get(CHUNK_COUNT_KEY).unwrap(), "1");
        let products: serde_json::Value =
            serde_json::from_str(md.get(PRODUCTS_KEY).unwrap()).unwrap();
        assert_eq!(products[0]["id"], "p-1");
        assert_eq!(products[0]["quantity"], 2);

        let decoded = SessionSnapshot::from_metadata(&md).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_large_cart_spans_numbered_keys() {
        // ObjectId-length ids: about 60 characters per line
        let cart = lines(50, 24, dec!(199.99), 3);
        let snapshot = SessionSnapshot::from_cart("64f1c0aa9e1b2c3d4e5f6000", &cart);
        let md = snapshot.to_metadata().unwrap();

        let chunks: usize = md.get(CHUNK_COUNT_KEY).unwrap().parse().unwrap();
        assert!(chunks > 1);
        assert_eq!(md.len(), chunks + 3);
        assert!(md.len() <= MAX_METADATA_KEYS);
        for idx in 0..chunks {
            assert!(md.get(&chunk_key(idx)).unwrap().chars().count() <= MAX_METADATA_VALUE_LEN);
        }
        assert!(md.contains_key("products_1"));

        let decoded = SessionSnapshot::from_metadata(&md).unwrap();
        assert_eq!(decoded.lines.len(), 50);
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn test_largest_allowed_cart_fits() {
        let cart = lines(crate::MAX_CART_LINES, 64, dec!(99999999.99), crate::MAX_LINE_QUANTITY);
        let md = SessionSnapshot::from_cart("u-1", &cart).to_metadata().unwrap();

        assert!(md.len() <= MAX_METADATA_KEYS);
        let decoded = SessionSnapshot::from_metadata(&md).unwrap();
        assert_eq!(decoded.lines.len(), crate::MAX_CART_LINES);
        assert_eq!(decoded.lines[99].price, dec!(99999999.99));
    }

    #[test]
    fn test_chunks_split_on_character_boundaries() {
        let cart: Vec<CartLine> = (0..30)
            .map(|i| CartLine {
                product_id: format!("สินค้า-{}", i),
                name: "ชา".into(),
                image: None,
                price: dec!(35.00),
                quantity: 1,
            })
            .collect();
        let snapshot = SessionSnapshot::from_cart("u-1", &cart);
        let md = snapshot.to_metadata().unwrap();

        assert!(md.contains_key("products_1"));
        assert_eq!(SessionSnapshot::from_metadata(&md).unwrap(), snapshot);
    }

    #[test]
    fn test_missing_or_miscounted_chunks_fail_closed() {
        let md = SessionSnapshot::from_cart("u-1", &lines(50, 24, dec!(1.00), 1))
            .to_metadata()
            .unwrap();

        let mut missing = md.clone();
        missing.remove("products_1");
        assert!(matches!(
            SessionSnapshot::from_metadata(&missing),
            Err(CoreError::CorruptSnapshot(_))
        ));

        for count in ["0", "48", "x"] {
            let mut bad = md.clone();
            bad.insert(CHUNK_COUNT_KEY.to_string(), count.to_string());
            assert!(SessionSnapshot::from_metadata(&bad).is_err(), "accepted count {}", count);
        }

        let mut uncounted = md;
        uncounted.remove(CHUNK_COUNT_KEY);
        assert!(SessionSnapshot::from_metadata(&uncounted).is_err());
    }

    #[test]
    fn test_cart_digest_tracks_contents() {
        let snapshot = SessionSnapshot::from_cart("u-1", &cart());
        let digest = cart_digest(&snapshot.lines).unwrap();
        assert!(digest.starts_with("c1~"));
        assert_eq!(digest, cart_digest(&snapshot.lines).unwrap());

        let mut changed = snapshot.lines.clone();
        changed[0].quantity = 3;
        assert_ne!(digest, cart_digest(&changed).unwrap());

        // Same items, one unit price written with more scale
        let mut rescaled = snapshot.lines.clone();
        rescaled[0].price = dec!(10.0000);
        assert_eq!(digest, cart_digest(&rescaled).unwrap());
    }

    #[test]
    fn test_decodes_v1_single_value() {
        let md = metadata(&[
            ("userId", "u-1"),
            ("products", r#"[{"id":"p-1","quantity":1,"price":5}]"#),
            ("snapshotVersion", "1"),
        ]);
        let snapshot = SessionSnapshot::from_metadata(&md).unwrap();
        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.lines[0].product_id, "p-1");
    }

    #[test]
    fn test_decodes_legacy_session_without_version() {
        let md = metadata(&[
            ("userId", "64f1c0aa"),
            ("products", r#"[{"id":"p-1","quantity":2,"price":10.99}]"#),
        ]);
        let snapshot = SessionSnapshot::from_metadata(&md).unwrap();

        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.user_id, "64f1c0aa");
        assert_eq!(snapshot.lines[0].price, dec!(10.99));
        assert_eq!(snapshot.lines[0].quantity, 2);
    }

    #[test]
    fn test_malformed_products_fail_closed() {
        for products in ["not json", "{}", "[]", r#"[{"id":"p","quantity":0,"price":1}]"#,
            r#"[{"id":"","quantity":1,"price":1}]"#, r#"[{"id":"p","quantity":1,"price":-1}]"#]
        {
            let md = metadata(&[("userId", "u-1"), ("products", products)]);
            assert!(
                matches!(SessionSnapshot::from_metadata(&md), Err(CoreError::CorruptSnapshot(_))),
                "accepted {}",
                products
            );
        }
    }

    #[test]
    fn test_missing_user_fails_closed() {
        let md = metadata(&[("products", r#"[{"id":"p","quantity":1,"price":1}]"#)]);
        assert!(matches!(
            SessionSnapshot::from_metadata(&md),
            Err(CoreError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_unknown_version_fails_closed() {
        let md = metadata(&[
            ("userId", "u-1"),
            ("products", r#"[{"id":"p","quantity":1,"price":1}]"#),
            ("snapshotVersion", "7"),
        ]);
        assert!(SessionSnapshot::from_metadata(&md).is_err());
    }

    #[test]
    fn test_oversized_cart_is_rejected() {
        // Only escape-heavy ids can outgrow the slice budget.
        let big: Vec<CartLine> = (0..crate::MAX_CART_LINES)
            .map(|i| CartLine {
                product_id: format!("{:\u{1}>60}", i),
                name: "Item".into(),
                image: None,
                price: dec!(1.00),
                quantity: 1,
            })
            .collect();
        let err = SessionSnapshot::from_cart("u-1", &big).to_metadata().unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::TooLong { .. })));
    }
}
