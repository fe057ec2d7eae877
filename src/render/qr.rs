//! Verification QR code printed next to the metadata block.

use qrcode::{Color, EcLevel, QrCode};

use super::RenderError;

/// Printed edge of the code, quiet zone included.
pub const QR_SIZE_MM: f32 = 26.0;
pub const QUIET_ZONE_MODULES: usize = 2;

/// A horizontal run of dark modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub x: usize,
    pub y: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyQr {
    width: usize,
    dark: Vec<bool>,
}

impl VerifyQr {
    pub fn encode(url: &str) -> Result<Self, RenderError> {
        let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::M)?;
        let width = code.width();
        let dark = code
            .into_colors()
            .into_iter()
            .map(|color| color == Color::Dark)
            .collect();
        Ok(Self { width, dark })
    }

    /// Modules per side, quiet zone excluded.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.dark[y * self.width + x]
    }

    pub fn module_mm(&self) -> f32 {
        QR_SIZE_MM / (self.width + 2 * QUIET_ZONE_MODULES) as f32
    }

    /// Dark modules merged into horizontal runs, row by row.
    pub fn runs(&self) -> Vec<Run> {
        let mut runs = Vec::new();
        for (y, row) in self.dark.chunks(self.width).enumerate() {
            let mut start = None;
            for (x, &dark) in row.iter().chain(std::iter::once(&false)).enumerate() {
                match (dark, start) {
                    (true, None) => start = Some(x),
                    (false, Some(from)) => {
                        runs.push(Run { x: from, y, len: x - from });
                        start = None;
                    }
                    _ => {}
                }
            }
        }
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://mr3x.com.br/verify/0f3a9c";

    #[test]
    fn test_encodes_finder_patterns() {
        let qr = VerifyQr::encode(URL).unwrap();
        let width = qr.width();
        assert!(width >= 21);
        assert_eq!((width - 17) % 4, 0);

        for (x, y) in [(0, 0), (width - 1, 0), (0, width - 1)] {
            assert!(qr.is_dark(x, y), "corner {},{} should be dark", x, y);
        }
        // separator ring around the top-left finder
        assert!(!qr.is_dark(7, 0));
        assert!(!qr.is_dark(0, 7));
        assert!(!qr.is_dark(width, 0));
    }

    #[test]
    fn test_runs_cover_every_dark_module() {
        let qr = VerifyQr::encode(URL).unwrap();
        let runs = qr.runs();

        let covered: usize = runs.iter().map(|r| r.len).sum();
        assert_eq!(covered, qr.dark.iter().filter(|&&d| d).count());
        assert!(runs
            .iter()
            .all(|r| (r.x..r.x + r.len).all(|x| qr.is_dark(x, r.y))));
        assert!(runs.iter().all(|r| r.x + r.len <= qr.width()));
    }

    #[test]
    fn test_different_urls_give_different_codes() {
        let a = VerifyQr::encode("https://mr3x.com.br/verify/aaaa").unwrap();
        let b = VerifyQr::encode("https://mr3x.com.br/verify/bbbb").unwrap();
        assert_ne!(a, b);
        assert!(a.module_mm() * (a.width() + 2 * QUIET_ZONE_MODULES) as f32 - QR_SIZE_MM < 1e-3);
    }
}
