use serde::{Deserialize, Serialize};

/// Hue on the 0–180 half scale, saturation and value on 0–255.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

/// Standard RGB → HSV, hue halved to fit a byte.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> Hsv {
    let [r, g, b] = rgb.map(|c| c as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let mut h = 0.0f32;
    if delta > 0.0 {
        h = if max == r {
            ((g - b) / delta) % 6.0
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };
        h *= 60.0;
        if h < 0.0 {
            h += 360.0;
        }
    }
    let s = if max == 0.0 { 0.0 } else { delta / max };

    Hsv {
        h: (h / 2.0).round().min(180.0) as u8,
        s: (s * 255.0).round() as u8,
        v: (max * 255.0).round() as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primaries_land_on_half_scale_hues() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(rgb_to_hsv([0, 255, 0]).h, 60);
        assert_eq!(rgb_to_hsv([0, 0, 255]).h, 120);
        assert_eq!(rgb_to_hsv([255, 0, 255]).h, 150);
        assert_eq!(rgb_to_hsv([255, 255, 0]).h, 30);
    }

    #[test]
    fn grays_have_no_saturation() {
        let hsv = rgb_to_hsv([128, 128, 128]);
        assert_eq!(hsv.s, 0);
        assert_eq!(hsv.v, 128);
        assert_eq!(rgb_to_hsv([0, 0, 0]), Hsv { h: 0, s: 0, v: 0 });
    }
}
