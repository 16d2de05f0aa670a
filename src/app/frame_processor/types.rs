// SPDX-License-Identifier: MPL-2.0

//! Core types for decode results

/// Symbology of a decoded symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFormat {
    QrCode,
    /// Reported by decoders that do not classify their results
    Unknown,
}

/// One decoded barcode
///
/// A decoder may find a symbol but fail to read its content; such symbols
/// carry no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Raw decoded content
    pub payload: Option<String>,
    /// Symbology metadata (not used by the relay)
    pub format: SymbolFormat,
}

impl Symbol {
    pub fn new(payload: Option<String>, format: SymbolFormat) -> Self {
        Self { payload, format }
    }

    /// A QR code symbol
    pub fn qr(payload: Option<String>) -> Self {
        Self::new(payload, SymbolFormat::QrCode)
    }
}

/// Payload of the first symbol that has one, in decoder order
///
/// First match wins; there is no confidence ranking and no duplicate
/// suppression.
pub fn first_payload(symbols: &[Symbol]) -> Option<&str> {
    symbols.iter().find_map(|symbol| symbol.payload.as_deref())
}
