//! Hover card placement.

use catalog::City;
use ephemeris::city_time::CityTime;
use foundation::bounds::Aabb2;

use crate::config::TooltipConfig;

/// What the host renders next to the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooltipContent {
    pub city: String,
    pub country_code: Option<String>,
    pub time: CityTime,
}

impl TooltipContent {
    pub fn new(city: &City, time: CityTime) -> Self {
        Self {
            city: city.name.clone(),
            country_code: city.country_code.clone(),
            time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub content: TooltipContent,
    /// Card box in viewport pixels.
    pub card: Aabb2,
}

/// Box for a card of `config.card` size shown near `cursor`.
///
/// The card sits below-right of the cursor, flips to the other side on an
/// axis where it would overflow, and is finally clamped so it stays
/// `margin` away from every viewport edge. When the viewport cannot hold the
/// card plus margins, the card is pinned to the top-left margin.
pub fn place_tooltip(cursor: [f64; 2], viewport: [f64; 2], config: &TooltipConfig) -> Aabb2 {
    let x = place_axis(cursor[0], viewport[0], config.offset[0], config.card[0], config.margin);
    let y = place_axis(cursor[1], viewport[1], config.offset[1], config.card[1], config.margin);
    Aabb2::from_origin_size([x, y], config.card)
}

fn place_axis(cursor: f64, extent: f64, offset: f64, size: f64, margin: f64) -> f64 {
    let max = extent - size - margin;
    if !cursor.is_finite() || !(max >= margin) {
        return margin;
    }
    let mut pos = cursor + offset;
    if pos + size > extent - margin {
        pos = cursor - offset - size;
    }
    pos.clamp(margin, max)
}

#[cfg(test)]
mod tests {
    use super::place_tooltip;
    use crate::config::TooltipConfig;
    use foundation::bounds::Aabb2;
    use pretty_assertions::assert_eq;

    fn config() -> TooltipConfig {
        TooltipConfig {
            offset: [16.0, 16.0],
            margin: 12.0,
            card: [200.0, 80.0],
        }
    }

    #[test]
    fn sits_below_right_of_cursor_by_default() {
        let card = place_tooltip([100.0, 100.0], [1024.0, 768.0], &config());
        assert_eq!(card.min, [116.0, 116.0]);
    }

    #[test]
    fn flips_near_right_and_bottom_edges() {
        let card = place_tooltip([1000.0, 740.0], [1024.0, 768.0], &config());
        assert_eq!(card.min, [1000.0 - 16.0 - 200.0, 740.0 - 16.0 - 80.0]);
    }

    #[test]
    fn always_inside_margins_when_it_fits() {
        let viewport = [640.0, 480.0];
        let cfg = config();
        let safe = Aabb2::new([cfg.margin, cfg.margin], [viewport[0] - cfg.margin, viewport[1] - cfg.margin]);
        let mut x = -50.0;
        while x <= viewport[0] + 50.0 {
            let mut y = -50.0;
            while y <= viewport[1] + 50.0 {
                let card = place_tooltip([x, y], viewport, &cfg);
                assert!(safe.contains_box(&card), "cursor ({x}, {y}) -> {card:?}");
                y += 7.0;
            }
            x += 7.0;
        }
    }

    #[test]
    fn pinned_to_margin_in_tiny_viewport() {
        let card = place_tooltip([50.0, 30.0], [150.0, 60.0], &config());
        assert_eq!(card.min, [12.0, 12.0]);
        let card = place_tooltip([f64::NAN, 30.0], [1024.0, 768.0], &config());
        assert_eq!(card.min[0], 12.0);
    }
}
