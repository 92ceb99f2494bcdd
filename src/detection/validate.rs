//! Cross-checks between the product name, the barcode and the printed price.

use crate::error::LabelError;

/// Price embedded in an EAN-13 barcode.
///
/// A non-zero character at index 8 gives two integer digits (`DD.DD` from
/// indices 8..=11); a zero gives one (`D.DD` from indices 9..=11).
/// Returns `None` when the barcode is shorter than 12 characters.
pub fn derive_price(barcode: &str) -> Option<String> {
    let chars: Vec<char> = barcode.chars().collect();
    if chars.len() < 12 {
        return None;
    }
    let price = if chars[8] != '0' {
        format!("{}{}.{}{}", chars[8], chars[9], chars[10], chars[11])
    } else {
        format!("{}.{}{}", chars[9], chars[10], chars[11])
    };
    Some(price)
}

/// The first seven barcode characters must equal `product_code`.
pub fn validate_product(barcode: &str, product_code: &str) -> Result<(), LabelError> {
    let matches = barcode
        .get(..product_code.len())
        .is_some_and(|prefix| prefix == product_code);
    if matches {
        Ok(())
    } else {
        Err(LabelError::ProductMismatch {
            expected: product_code.to_string(),
            barcode: barcode.to_string(),
        })
    }
}

/// The OCR'd price must start with the price embedded in the barcode.
pub fn validate_price(barcode: &str, price: &str) -> Result<(), LabelError> {
    match derive_price(barcode) {
        Some(expected) if price.starts_with(&expected) => Ok(()),
        expected => Err(LabelError::PriceMismatch {
            read: price.to_string(),
            expected,
        }),
    }
}

/// The OCR'd product-name text must start with `expected`.
pub fn validate_name(text: &str, expected: &str) -> Result<(), LabelError> {
    if text.trim_start().starts_with(expected) {
        Ok(())
    } else {
        Err(LabelError::NameNotFound {
            expected: expected.to_string(),
            read: Some(text.to_string()),
        })
    }
}
