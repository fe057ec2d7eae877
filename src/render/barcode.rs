//! Decorative side barcode.
//!
//! The bars carry no information. They are drawn once per render and repeated
//! unchanged on every page.

use rand::Rng;

pub const BARCODE_X_MM: f32 = 3.0;
pub const BARCODE_Y_MM: f32 = 40.0;
pub const BARCODE_WIDTH_MM: f32 = 8.0;
pub const BARCODE_HEIGHT_MM: f32 = 200.0;
pub const BAR_COUNT: usize = 50;

const THICK_BAR_MM: f32 = 3.0;
const THIN_BAR_MM: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    /// Distance from the top edge of the page
    pub y_mm: f32,
    pub height_mm: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SideBarcode {
    pub bars: Vec<Bar>,
}

impl SideBarcode {
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        let step = BARCODE_HEIGHT_MM / BAR_COUNT as f32;

        let bars = (0..BAR_COUNT)
            .map(|i| Bar {
                y_mm: BARCODE_Y_MM + i as f32 * step,
                height_mm: if rng.gen_bool(0.5) {
                    THICK_BAR_MM
                } else {
                    THIN_BAR_MM
                },
            })
            .collect();

        Self { bars }
    }
}
