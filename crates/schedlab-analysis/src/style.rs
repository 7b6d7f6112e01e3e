//! Series styles for comparison charts.
//!
//! Every algorithm group on a chart gets a unique (line, marker) pair. The
//! enumeration is fixed and line-major, so the assignment only depends on
//! the group order. Running out of pairs is an error, never a wraparound.

use crate::error::ReportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dash {
    Solid,
    Dashed,
    LongDash,
    DashDot,
    Dotted,
}

impl Dash {
    /// Dash length and gap in pixels; `None` for a continuous line.
    pub fn pattern(self) -> Option<(u32, u32)> {
        match self {
            Dash::Solid => None,
            Dash::Dashed => Some((8, 5)),
            Dash::LongDash => Some((16, 6)),
            Dash::DashDot => Some((10, 3)),
            Dash::Dotted => Some((2, 4)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineStyle {
    pub dash: Dash,
    pub width: u32,
}

pub const LINE_STYLES: [LineStyle; 10] = [
    LineStyle { dash: Dash::Solid, width: 1 },
    LineStyle { dash: Dash::Dashed, width: 1 },
    LineStyle { dash: Dash::LongDash, width: 1 },
    LineStyle { dash: Dash::DashDot, width: 1 },
    LineStyle { dash: Dash::Dotted, width: 1 },
    LineStyle { dash: Dash::Solid, width: 3 },
    LineStyle { dash: Dash::Dashed, width: 3 },
    LineStyle { dash: Dash::LongDash, width: 3 },
    LineStyle { dash: Dash::DashDot, width: 3 },
    LineStyle { dash: Dash::Dotted, width: 3 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Circle,
    Square,
    Diamond,
    TriangleUp,
    TriangleDown,
    TriangleLeft,
    TriangleRight,
    Pentagon,
    Star,
    Plus,
    Cross,
}

pub const MARKERS: [Marker; 11] = [
    Marker::Circle,
    Marker::Square,
    Marker::Diamond,
    Marker::TriangleUp,
    Marker::TriangleDown,
    Marker::TriangleLeft,
    Marker::TriangleRight,
    Marker::Pentagon,
    Marker::Star,
    Marker::Plus,
    Marker::Cross,
];

pub const STYLE_COMBINATIONS: usize = LINE_STYLES.len() * MARKERS.len();

impl Marker {
    /// Polygon outline around the data point, in pixel offsets.
    pub fn outline(self, size: i32) -> Vec<(i32, i32)> {
        let s = size;
        let t = (size / 3).max(1);
        match self {
            Marker::Circle => regular_polygon(12, s as f64, 0.0),
            Marker::Square => vec![(-s, -s), (s, -s), (s, s), (-s, s)],
            Marker::Diamond => vec![(0, -s - 1), (s, 0), (0, s + 1), (-s, 0)],
            Marker::TriangleUp => vec![(0, -s), (s, s), (-s, s)],
            Marker::TriangleDown => vec![(0, s), (s, -s), (-s, -s)],
            Marker::TriangleLeft => vec![(-s, 0), (s, -s), (s, s)],
            Marker::TriangleRight => vec![(s, 0), (-s, -s), (-s, s)],
            Marker::Pentagon => regular_polygon(5, s as f64, -90.0),
            Marker::Star => star(s as f64),
            Marker::Plus => vec![
                (-t, -s),
                (t, -s),
                (t, -t),
                (s, -t),
                (s, t),
                (t, t),
                (t, s),
                (-t, s),
                (-t, t),
                (-s, t),
                (-s, -t),
                (-t, -t),
            ],
            Marker::Cross => rotate_45(&Marker::Plus.outline(size)),
        }
    }
}

fn regular_polygon(sides: usize, radius: f64, start_deg: f64) -> Vec<(i32, i32)> {
    (0..sides)
        .map(|i| {
            let angle = (start_deg + 360.0 * i as f64 / sides as f64).to_radians();
            (
                (radius * angle.cos()).round() as i32,
                (radius * angle.sin()).round() as i32,
            )
        })
        .collect()
}

fn star(radius: f64) -> Vec<(i32, i32)> {
    (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { radius + 1.0 } else { radius * 0.45 };
            let angle = (-90.0 + 36.0 * i as f64).to_radians();
            ((r * angle.cos()).round() as i32, (r * angle.sin()).round() as i32)
        })
        .collect()
}

fn rotate_45(points: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let c = std::f64::consts::FRAC_1_SQRT_2;
    points
        .iter()
        .map(|&(x, y)| {
            let (x, y) = (x as f64, y as f64);
            ((c * (x - y)).round() as i32, (c * (x + y)).round() as i32)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesStyle {
    pub line: LineStyle,
    pub marker: Marker,
    /// Palette slot; equal to the position in the enumeration.
    pub color_index: usize,
}

pub fn all_styles() -> Vec<SeriesStyle> {
    LINE_STYLES
        .iter()
        .flat_map(|line| MARKERS.iter().map(move |marker| (*line, *marker)))
        .enumerate()
        .map(|(color_index, (line, marker))| SeriesStyle {
            line,
            marker,
            color_index,
        })
        .collect()
}

/// Styles for `n` groups, or [`ReportError::StyleExhausted`] when `n`
/// exceeds [`STYLE_COMBINATIONS`].
pub fn assign_styles(n: usize) -> Result<Vec<SeriesStyle>, ReportError> {
    if n > STYLE_COMBINATIONS {
        return Err(ReportError::StyleExhausted {
            requested: n,
            available: STYLE_COMBINATIONS,
        });
    }
    let mut styles = all_styles();
    styles.truncate(n);
    Ok(styles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn enumeration_has_110_unique_pairs() {
        let styles = all_styles();
        assert_eq!(styles.len(), 110);
        assert_eq!(STYLE_COMBINATIONS, 110);
        let pairs: HashSet<(LineStyle, Marker)> =
            styles.iter().map(|s| (s.line, s.marker)).collect();
        assert_eq!(pairs.len(), 110);
    }

    #[test]
    fn assignment_is_line_major_and_deterministic() {
        let styles = assign_styles(13).expect("within range");
        assert_eq!(styles[0].line, LINE_STYLES[0]);
        assert_eq!(styles[0].marker, Marker::Circle);
        assert_eq!(styles[10].marker, Marker::Cross);
        assert_eq!(styles[11].line, LINE_STYLES[1]);
        assert_eq!(styles[11].marker, Marker::Circle);
        assert_eq!(styles, assign_styles(13).unwrap());
    }

    #[test]
    fn exactly_110_groups_still_fit() {
        assert_eq!(assign_styles(110).expect("ceiling is inclusive").len(), 110);
    }

    #[test]
    fn more_groups_than_styles_is_a_configuration_error() {
        match assign_styles(120) {
            Err(ReportError::StyleExhausted {
                requested,
                available,
            }) => {
                assert_eq!(requested, 120);
                assert_eq!(available, 110);
            }
            other => panic!("expected style exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn marker_outlines_are_closed_shapes() {
        for marker in MARKERS {
            let outline = marker.outline(4);
            assert!(outline.len() >= 3, "{:?} needs a polygon", marker);
        }
        assert_eq!(Marker::Cross.outline(4).len(), 12);
    }
}
