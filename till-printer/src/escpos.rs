//! ESC/POS command builder
//!
//! Fluent builder for thermal-printer byte streams. Text is accumulated as
//! UTF-8 and converted to the GBK wire encoding by [`EscPosBuilder::build`];
//! paper-control sequences come from the configured [`Dialect`].

use crate::dialect::Dialect;
use crate::encoding::{column_width, encode_wire, wrap_width};

/// ESC/POS command builder
///
/// Width is in columns:
/// - 58 mm paper: 32 columns
/// - 80 mm paper: 48 columns
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
    dialect: Dialect,
}

impl EscPosBuilder {
    /// Create a builder for the given paper width and command dialect.
    ///
    /// The stream starts with the printer initialization sequence.
    pub fn new(width: usize, dialect: Dialect) -> Self {
        let mut buf = Vec::with_capacity(4096);
        buf.extend_from_slice(dialect.init());
        Self {
            buf,
            width,
            dialect,
        }
    }

    /// Configured paper width in columns
    pub fn width(&self) -> usize {
        self.width
    }

    // === Text Output ===

    /// Append raw text (converted to GBK at build time)
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self
    }

    /// Append text followed by a newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Append text wrapped to the paper width, one newline per wrapped row
    pub fn wrapped(&mut self, s: &str) -> &mut Self {
        for row in wrap_width(s, self.width) {
            self.line(&row);
        }
        self
    }

    /// Append a blank line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// Feed `lines` blank lines using the dialect's feed command
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        let seq = self.dialect.feed(lines);
        self.buf.extend_from_slice(&seq);
        self
    }

    // === Alignment ===

    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    pub fn right(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x02]);
        self
    }

    // === Text Style ===

    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x11]);
        self
    }

    /// Double height only
    pub fn double_height(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x01]);
        self
    }

    /// Back to normal glyph size
    pub fn reset_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x00]);
        self
    }

    // === Separators ===

    /// Full-width line of '='
    pub fn sep_double(&mut self) -> &mut Self {
        let sep = "=".repeat(self.width);
        self.line(&sep)
    }

    /// Full-width line of '-'
    pub fn sep_single(&mut self) -> &mut Self {
        let sep = "-".repeat(self.width);
        self.line(&sep)
    }

    // === Layout Helpers ===

    /// Left and right text on one line, gap filled with spaces.
    ///
    /// Falls back to a single space separator when the pair overflows the
    /// paper width.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = column_width(left);
        let rw = column_width(right);

        if lw + rw >= self.width {
            self.text(left);
            self.text(" ");
            self.line(right);
        } else {
            let gap = " ".repeat(self.width - lw - rw);
            self.text(left);
            self.text(&gap);
            self.line(right);
        }
        self
    }

    /// Key-value row (alias for [`EscPosBuilder::line_lr`])
    pub fn pair(&mut self, key: &str, value: &str) -> &mut Self {
        self.line_lr(key, value)
    }

    // === Paper Control ===

    /// Full cut
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(self.dialect.cut());
        self
    }

    /// Feed `lines` then full-cut
    pub fn cut_feed(&mut self, lines: u8) -> &mut Self {
        let seq = self.dialect.cut_feed(lines);
        self.buf.extend_from_slice(&seq);
        self
    }

    /// Partial cut
    pub fn cut_partial(&mut self) -> &mut Self {
        self.buf.extend_from_slice(self.dialect.cut_partial());
        self
    }

    // === Cash Drawer ===

    /// Pulse the cash drawer on pin 2
    pub fn open_drawer(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x70, 0x00, 25, 250]);
        self
    }

    // === Barcodes ===

    /// Print a CODE128 barcode with the human-readable text below.
    ///
    /// `height` is in dots (clamped to 1..=255). Data must be ASCII; anything
    /// else is skipped because the printer would garble the symbol.
    pub fn barcode(&mut self, data: &str, height: u8) -> &mut Self {
        if data.is_empty() || data.len() > 50 || !data.is_ascii() {
            return self;
        }
        let height = height.max(1);

        // GS h n - barcode height
        self.buf.extend_from_slice(&[0x1D, 0x68, height]);
        // GS w 2 - module width
        self.buf.extend_from_slice(&[0x1D, 0x77, 0x02]);
        // GS H 2 - HRI below the symbol
        self.buf.extend_from_slice(&[0x1D, 0x48, 0x02]);

        // GS k 73 n {CODE B} data - CODE128
        let payload_len = (data.len() + 2) as u8;
        self.buf.extend_from_slice(&[0x1D, 0x6B, 73, payload_len]);
        self.buf.extend_from_slice(&[0x7B, 0x42]);
        self.buf.extend_from_slice(data.as_bytes());
        self
    }

    /// Print a QR code. `size` is the module size in dots (1-16).
    pub fn qr_code(&mut self, data: &str, size: u8) -> &mut Self {
        let size = size.clamp(1, 16);

        // Model 2
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x31, 0x00]);
        // Module size
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, size]);
        // Error correction level L
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 0x31]);

        // Store data
        let data_bytes = data.as_bytes();
        let len = data_bytes.len() + 3;
        self.buf.extend_from_slice(&[
            0x1D,
            0x28,
            0x6B,
            (len & 0xFF) as u8,
            ((len >> 8) & 0xFF) as u8,
            0x31,
            0x50,
            0x30,
        ]);
        self.buf.extend_from_slice(data_bytes);

        // Print
        self.buf
            .extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);
        self
    }

    // === Raw ===

    /// Append raw bytes verbatim
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    // === Build ===

    /// Finalize into wire bytes (UTF-8 text re-encoded as GBK).
    pub fn build(self) -> Vec<u8> {
        encode_wire(&self.buf)
    }

    /// Finalize without the wire-encoding pass (ASCII-only content, tests).
    pub fn build_raw(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(48, Dialect::EscPos)
    }
}
