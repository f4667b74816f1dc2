//! # PromptPay Payload Encoder
//!
//! Builds the EMVCo merchant-presented QR text that Thai banking apps scan to
//! pay a PromptPay receiver.
//!
//! ## Payload Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every field is TLV: id(2) + length(2, zero padded) + value             │
//! │                                                                         │
//! │  00 02 01                     payload format indicator                  │
//! │  01 02 12                     dynamic (11 = static, no amount)          │
//! │  29 37 ┬ 00 16 A000000677010111   PromptPay application id             │
//! │        └ 01 13 0066812345678      receiver (01 phone/02 tax/03 wallet)  │
//! │  58 02 TH                     country                                   │
//! │  53 03 764                    currency (THB)                            │
//! │  54 06 100.00                 amount (omitted when zero)                │
//! │  63 04 XXXX                   CRC-16/CCITT-FALSE over all of the above  │
//! │                               including the "6304" prefix               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Output is a pure function of `(receiver, amount)`.

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Field Identifiers
// =============================================================================

const ID_PAYLOAD_FORMAT: &str = "00";
const ID_POI_METHOD: &str = "01";
const ID_MERCHANT_INFORMATION_BOT: &str = "29";
const ID_TRANSACTION_CURRENCY: &str = "53";
const ID_TRANSACTION_AMOUNT: &str = "54";
const ID_COUNTRY_CODE: &str = "58";
const ID_CRC: &str = "63";

const PAYLOAD_FORMAT_EMV_QRCPS_MERCHANT_PRESENTED_MODE: &str = "01";
const POI_METHOD_STATIC: &str = "11";
const POI_METHOD_DYNAMIC: &str = "12";
const MERCHANT_INFORMATION_TEMPLATE_ID_GUID: &str = "00";
const BOT_ID_MERCHANT_PHONE_NUMBER: &str = "01";
const BOT_ID_MERCHANT_TAX_ID: &str = "02";
const BOT_ID_MERCHANT_EWALLET_ID: &str = "03";
const GUID_PROMPTPAY: &str = "A000000677010111";
const TRANSACTION_CURRENCY_THB: &str = "764";
const COUNTRY_CODE_TH: &str = "TH";

// =============================================================================
// Receiver
// =============================================================================

/// A sanitized PromptPay receiving identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receiver {
    /// Mobile number, stored as the local 10-digit form (`0812345678`).
    Phone(String),
    /// 13-digit national id or tax id.
    TaxId(String),
    /// 15-digit e-wallet id.
    EWallet(String),
}

impl Receiver {
    /// Parses a receiver, ignoring anything that is not a digit.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::promptpay::Receiver;
    ///
    /// let r = Receiver::parse("081-234-5678").unwrap();
    /// assert_eq!(r, Receiver::Phone("0812345678".to_string()));
    /// ```
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        match digits.len() {
            10 => Ok(Receiver::Phone(digits)),
            13 => Ok(Receiver::TaxId(digits)),
            15 => Ok(Receiver::EWallet(digits)),
            n => Err(CoreError::InvalidReceiver(format!(
                "expected 10, 13 or 15 digits, got {}",
                n
            ))),
        }
    }

    /// Sub-tag inside the merchant information template.
    fn tag(&self) -> &'static str {
        match self {
            Receiver::Phone(_) => BOT_ID_MERCHANT_PHONE_NUMBER,
            Receiver::TaxId(_) => BOT_ID_MERCHANT_TAX_ID,
            Receiver::EWallet(_) => BOT_ID_MERCHANT_EWALLET_ID,
        }
    }

    /// Value as it is written into the payload.
    ///
    /// Phones are switched to the international `66` prefix and left-padded
    /// to 13 characters.
    fn encoded_value(&self) -> String {
        match self {
            Receiver::Phone(digits) => {
                let international = match digits.strip_prefix('0') {
                    Some(rest) => format!("66{}", rest),
                    None => digits.clone(),
                };
                format!("{:0>13}", international)
            }
            Receiver::TaxId(digits) | Receiver::EWallet(digits) => digits.clone(),
        }
    }

    /// Identifier with all but the last four digits hidden.
    pub fn masked(&self) -> String {
        let digits = match self {
            Receiver::Phone(d) | Receiver::TaxId(d) | Receiver::EWallet(d) => d,
        };
        let visible = digits.len().saturating_sub(4);
        format!("{}{}", "x".repeat(visible), &digits[visible..])
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Builds the PromptPay payload for a receiver and an optional amount.
///
/// A zero or absent amount produces a static code where the payer types the
/// amount.
///
/// ## Errors
/// `AmountOutOfRange` for negative amounts.
pub fn generate_payload(receiver: &Receiver, amount: Option<Decimal>) -> CoreResult<String> {
    let amount = match amount {
        Some(a) if a < Decimal::ZERO => {
            return Err(CoreError::AmountOutOfRange(a.to_string()));
        }
        Some(a) if a.is_zero() => None,
        other => other,
    };

    let merchant_info = [
        tlv(MERCHANT_INFORMATION_TEMPLATE_ID_GUID, GUID_PROMPTPAY),
        tlv(receiver.tag(), &receiver.encoded_value()),
    ]
    .concat();

    let mut payload = String::with_capacity(96);
    payload.push_str(&tlv(
        ID_PAYLOAD_FORMAT,
        PAYLOAD_FORMAT_EMV_QRCPS_MERCHANT_PRESENTED_MODE,
    ));
    payload.push_str(&tlv(
        ID_POI_METHOD,
        if amount.is_some() {
            POI_METHOD_DYNAMIC
        } else {
            POI_METHOD_STATIC
        },
    ));
    payload.push_str(&tlv(ID_MERCHANT_INFORMATION_BOT, &merchant_info));
    payload.push_str(&tlv(ID_COUNTRY_CODE, COUNTRY_CODE_TH));
    payload.push_str(&tlv(ID_TRANSACTION_CURRENCY, TRANSACTION_CURRENCY_THB));
    if let Some(amount) = amount {
        payload.push_str(&tlv(ID_TRANSACTION_AMOUNT, &format_amount(amount)));
    }

    payload.push_str(ID_CRC);
    payload.push_str("04");
    let checksum = crc16_ccitt_false(payload.as_bytes());
    payload.push_str(&format!("{:04X}", checksum));

    Ok(payload)
}

/// Two fixed decimals, half-up.
fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

fn tlv(id: &str, value: &str) -> String {
    format!("{}{:02}{}", id, value.len(), value)
}

/// CRC-16/CCITT-FALSE: poly `0x1021`, init `0xFFFF`, no reflection, no xor-out.
pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

// =============================================================================
// Unit Tests
// =============================================================================
