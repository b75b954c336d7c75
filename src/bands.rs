//! Magnitude bands shared by the map, the legend and the terminal.

/// Fixed magnitude ranges, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagnitudeBand {
    /// mag >= 6.0
    Major,
    /// 5.0 <= mag < 6.0
    Strong,
    /// 4.0 <= mag < 5.0
    Moderate,
    /// 3.0 <= mag < 4.0
    Light,
    /// 2.0 <= mag < 3.0
    Minor,
    /// mag < 2.0, or unknown
    Micro,
}

impl MagnitudeBand {
    /// Every band, in legend order.
    pub const ALL: [Self; 6] = [
        Self::Major,
        Self::Strong,
        Self::Moderate,
        Self::Light,
        Self::Minor,
        Self::Micro,
    ];

    /// Band for a magnitude; absent magnitudes fall in the lowest band.
    #[must_use]
    pub fn for_magnitude(mag: Option<f64>) -> Self {
        match mag {
            Some(m) if m >= 6.0 => Self::Major,
            Some(m) if m >= 5.0 => Self::Strong,
            Some(m) if m >= 4.0 => Self::Moderate,
            Some(m) if m >= 3.0 => Self::Light,
            Some(m) if m >= 2.0 => Self::Minor,
            _ => Self::Micro,
        }
    }

    /// Marker fill color.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Major => "#ef4444",    // red
            Self::Strong => "#f97316",   // orange
            Self::Moderate => "#f59e0b", // amber
            Self::Light => "#eab308",    // yellow
            Self::Minor => "#10b981",    // green
            Self::Micro => "#06b6d4",    // cyan
        }
    }

    /// Closest ANSI foreground color for terminal output.
    #[must_use]
    pub const fn ansi(self) -> &'static str {
        match self {
            Self::Major => "\x1b[91m",
            Self::Strong => "\x1b[38;5;208m",
            Self::Moderate => "\x1b[38;5;214m",
            Self::Light => "\x1b[93m",
            Self::Minor => "\x1b[92m",
            Self::Micro => "\x1b[96m",
        }
    }

    /// Legend text for the band's range.
    #[must_use]
    pub const fn range_label(self) -> &'static str {
        match self {
            Self::Major => "6.0+",
            Self::Strong => "5.0 - 5.9",
            Self::Moderate => "4.0 - 4.9",
            Self::Light => "3.0 - 3.9",
            Self::Minor => "2.0 - 2.9",
            Self::Micro => "< 2.0",
        }
    }

    /// Severity word used in terminal output.
    #[must_use]
    pub const fn severity(self) -> &'static str {
        match self {
            Self::Major => "MAJOR",
            Self::Strong => "STRONG",
            Self::Moderate => "MODERATE",
            Self::Light => "LIGHT",
            Self::Minor => "MINOR",
            Self::Micro => "MICRO",
        }
    }
}

/// Smallest marker radius in pixels.
const MIN_MARKER_RADIUS: f64 = 4.0;

/// Marker radius in pixels: three pixels per magnitude unit, at least 4.
#[must_use]
pub fn marker_radius(mag: Option<f64>) -> f64 {
    (mag.unwrap_or(0.0) * 3.0).max(MIN_MARKER_RADIUS)
}
