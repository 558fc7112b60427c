//! A1-style cell addresses
//!
//! Every fixed anchor in the extraction engine is configured as a
//! human-readable coordinate ("K4", "AB10"). This module is the single
//! place that converts those to 0-based (row, col) indices.

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Anchored letter-run + digit-run pattern. Anything else is rejected.
static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").expect("address pattern"));

/// A cell address (e.g. "A1", "K4")
///
/// Rows and columns are 0-based internally; display is the usual 1-based
/// A1 notation. Absolute (`$`) references are not part of the accepted
/// grammar since anchors are always plain coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
}

impl CellAddress {
    /// Create a new cell address
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use pcmscan_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("A1").unwrap();
    /// assert_eq!((addr.row, addr.col), (0, 0));
    ///
    /// let addr = CellAddress::parse("k4").unwrap();
    /// assert_eq!((addr.row, addr.col), (3, 10));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let caps = ADDRESS_RE
            .captures(s)
            .ok_or_else(|| Error::InvalidAddress(format!("'{s}' is not a cell address")))?;

        let col = Self::letters_to_column(&caps[1])?;

        let row: u32 = caps[2]
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{s}'")))?;

        // Excel rows are 1-based, we use 0-based internally
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{s}'"
            )));
        }
        let row = row - 1;

        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self { row, col })
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    ///
    /// Letters form a bijective base-26 numeral (A=1..Z=26), accumulated
    /// left to right, then shifted to 0-based.
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }
        // Three letters already reach past XFD; a longer run from corrupt
        // input would overflow the accumulator.
        if letters.len() > 3 {
            return Err(Error::InvalidAddress(format!(
                "column '{letters}' out of range"
            )));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!("invalid column letter '{c}'")));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }

        let col = col - 1; // Convert to 0-based

        if col >= MAX_COLS as u32 {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }

        Ok(col as u16)
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut result = String::new();
        let mut n = col as u32 + 1; // 1-based for calculation

        while n > 0 {
            n -= 1;
            let c = ((n % 26) as u8 + b'A') as char;
            result.insert(0, c);
            n /= 26;
        }

        result
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!("{}{}", Self::column_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_basics() {
        let addr = CellAddress::parse("A1").unwrap();
        assert_eq!((addr.row, addr.col), (0, 0));

        let addr = CellAddress::parse("K4").unwrap();
        assert_eq!((addr.row, addr.col), (3, 10));

        let addr = CellAddress::parse("AB10").unwrap();
        assert_eq!((addr.row, addr.col), (9, 27));
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(
            CellAddress::parse("k4").unwrap(),
            CellAddress::parse("K4").unwrap()
        );
        assert_eq!(
            CellAddress::parse("ab10").unwrap(),
            CellAddress::parse("AB10").unwrap()
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            CellAddress::parse("4K"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("A").is_err());
        assert!(CellAddress::parse("1").is_err());
        assert!(CellAddress::parse("A0").is_err()); // Row 0 is invalid
        assert!(CellAddress::parse("B 3").is_err()); // Interior whitespace
        assert!(CellAddress::parse("A1048577").is_err()); // Row too large
        assert!(CellAddress::parse("XFE1").is_err()); // Column too large
    }

    #[test]
    fn test_long_column_runs_rejected() {
        // Letter runs past three characters must error, not overflow
        assert!(CellAddress::letters_to_column("ZZZZZZZZ").is_err());
        assert!(CellAddress::parse("ZZZZZZZZ1").is_err());
        assert!(CellAddress::parse("AAAAAAAAAAAAAAAA1048576").is_err());
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(CellAddress::letters_to_column("A").unwrap(), 0);
        assert_eq!(CellAddress::letters_to_column("Z").unwrap(), 25);
        assert_eq!(CellAddress::letters_to_column("AA").unwrap(), 26);
        assert_eq!(CellAddress::letters_to_column("AB").unwrap(), 27);
        assert_eq!(CellAddress::letters_to_column("XFD").unwrap(), 16383);
    }

    #[test]
    fn test_display_roundtrip() {
        assert_eq!(CellAddress::new(0, 0).to_string(), "A1");
        assert_eq!(CellAddress::new(3, 10).to_string(), "K4");
        assert_eq!(CellAddress::new(9, 27).to_string(), "AB10");
    }

    proptest! {
        #[test]
        fn parse_inverts_display(row in 0u32..MAX_ROWS, col in 0u16..MAX_COLS) {
            let addr = CellAddress::new(row, col);
            let parsed = CellAddress::parse(&addr.to_a1_string()).unwrap();
            prop_assert_eq!(parsed, addr);
        }
    }
}
