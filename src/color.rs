use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Series colours: category label → Color32
// ---------------------------------------------------------------------------

/// Maps the series labels of one chart (genders, balances, races…) to
/// distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Labels are deduplicated and sorted before colours are handed out, so
    /// the same label set always gets the same colours.
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut mapping: BTreeMap<String, Color32> = labels
            .into_iter()
            .map(|label| (label.to_string(), Color32::GRAY))
            .collect();
        let palette = generate_palette(mapping.len());
        for (slot, color) in mapping.values_mut().zip(palette) {
            *slot = color;
        }

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a series label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        assert_eq!(generate_palette(4).len(), 4);
    }

    #[test]
    fn colours_are_stable_and_distinct() {
        let a = ColorMap::new(["Mulher", "Homem", "Homem"]);
        let b = ColorMap::new(["Homem", "Mulher"]);
        assert_eq!(a.color_for("Homem"), b.color_for("Homem"));
        assert_ne!(a.color_for("Homem"), a.color_for("Mulher"));
        assert_eq!(a.color_for("Outro"), Color32::GRAY);
    }
}
