//! Printer command dialects
//!
//! Most thermal printers speak plain ESC/POS. Star Micronics models use the
//! Star Line Mode variant, which differs in the paper-control sequences. The
//! dialect selects which bytes the builder emits for cut and feed so rendered
//! receipts stay byte-compatible with both firmware families.

use serde::{Deserialize, Serialize};

/// Command dialect of a printer brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Generic ESC/POS (Epson-compatible), the overwhelming default
    #[default]
    EscPos,
    /// Star Line Mode (TSP/mPOP families)
    Star,
}

impl Dialect {
    /// Printer initialization sequence (ESC @ on both families).
    pub fn init(&self) -> &'static [u8] {
        &[0x1B, 0x40]
    }

    /// Full cut.
    pub fn cut(&self) -> &'static [u8] {
        match self {
            // GS V 0
            Dialect::EscPos => &[0x1D, 0x56, 0x00],
            // ESC d 2
            Dialect::Star => &[0x1B, 0x64, 0x02],
        }
    }

    /// Partial cut (leaves a paper bridge).
    pub fn cut_partial(&self) -> &'static [u8] {
        match self {
            // GS V 1
            Dialect::EscPos => &[0x1D, 0x56, 0x01],
            // ESC d 3
            Dialect::Star => &[0x1B, 0x64, 0x03],
        }
    }

    /// Feed `lines` then full-cut.
    ///
    /// ESC/POS has a fused command (GS V 66 n) that lets the printer manage
    /// the cutter-to-head distance; Star needs an explicit feed first.
    pub fn cut_feed(&self, lines: u8) -> Vec<u8> {
        match self {
            Dialect::EscPos => vec![0x1D, 0x56, 0x42, lines],
            Dialect::Star => {
                let mut seq = self.feed(lines);
                seq.extend_from_slice(self.cut());
                seq
            }
        }
    }

    /// Feed `lines` blank lines without cutting.
    ///
    /// Star firmware reads ESC d as a cut request, so its feed is plain
    /// line feeds; ESC/POS uses the dedicated feed command.
    pub fn feed(&self, lines: u8) -> Vec<u8> {
        match self {
            // ESC d n
            Dialect::EscPos => vec![0x1B, 0x64, lines],
            Dialect::Star => vec![b'\n'; lines as usize],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_escpos() {
        assert_eq!(Dialect::default(), Dialect::EscPos);
    }

    #[test]
    fn test_cut_sequences_differ() {
        assert_ne!(Dialect::EscPos.cut(), Dialect::Star.cut());
        assert_eq!(Dialect::EscPos.cut(), &[0x1D, 0x56, 0x00]);
    }

    #[test]
    fn test_escpos_cut_feed_is_fused() {
        assert_eq!(Dialect::EscPos.cut_feed(3), vec![0x1D, 0x56, 0x42, 3]);
    }

    #[test]
    fn test_star_cut_feed_feeds_then_cuts() {
        let seq = Dialect::Star.cut_feed(3);
        assert!(seq.starts_with(b"\n\n\n"));
        assert!(seq.ends_with(Dialect::Star.cut()));
    }
}
