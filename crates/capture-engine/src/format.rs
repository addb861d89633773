//! Capture format discovery from the negotiated capability set.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;

/// Exact frame rate fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FrameRate {
    pub numerator: i32,
    pub denominator: i32,
}

impl FrameRate {
    pub fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Whole frames per second, rounded to nearest (30000/1001 is 30).
    pub fn rounded_fps(&self) -> i64 {
        if self.denominator == 0 {
            return 0;
        }
        let (n, d) = (i64::from(self.numerator), i64::from(self.denominator));
        (n + d / 2) / d
    }

    /// Compare by value, so 30/1 equals 60/2.
    pub fn cmp_rate(&self, other: &FrameRate) -> Ordering {
        let lhs = i64::from(self.numerator) * i64::from(other.denominator);
        let rhs = i64::from(other.numerator) * i64::from(self.denominator);
        lhs.cmp(&rhs)
    }
}

/// One structure of the source's capability set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityEntry {
    /// Media type, e.g. `video/x-raw` or `image/jpeg`.
    pub media_type: String,
    pub width: u32,
    pub height: u32,
    pub frame_rates: Vec<FrameRate>,
}

/// A selectable capture mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub media_type: String,
}

impl FormatDescriptor {
    pub fn new(media_type: impl Into<String>, width: u32, height: u32, frame_rate: FrameRate) -> Self {
        Self {
            label: format!("{width} x {height} @ {} fps", frame_rate.rounded_fps()),
            width,
            height,
            frame_rate,
            media_type: media_type.into(),
        }
    }

    /// Caps string for the capsfilter, keeping the exact fraction.
    pub fn caps_string(&self) -> String {
        format!(
            "{}, width=(int){}, height=(int){}, framerate=(fraction){}/{}",
            self.media_type,
            self.width,
            self.height,
            self.frame_rate.numerator,
            self.frame_rate.denominator
        )
    }

    /// Richest mode first: width, then height, then frame rate, descending.
    fn richness_desc(a: &Self, b: &Self) -> Ordering {
        b.width
            .cmp(&a.width)
            .then(b.height.cmp(&a.height))
            .then(b.frame_rate.cmp_rate(&a.frame_rate))
    }
}

/// Build the selectable format list from the capability entries.
///
/// Only video media types are considered. Entries rendering the same label
/// contribute one format (the first seen).
pub fn discover_formats(entries: &[CapabilityEntry]) -> Vec<FormatDescriptor> {
    let mut seen = HashSet::new();
    let mut formats = Vec::new();

    for entry in entries.iter().filter(|e| e.media_type.starts_with("video")) {
        for rate in &entry.frame_rates {
            let format = FormatDescriptor::new(entry.media_type.as_str(), entry.width, entry.height, *rate);
            if seen.insert(format.label.clone()) {
                formats.push(format);
            }
        }
    }

    formats.sort_by(FormatDescriptor::richness_desc);
    tracing::debug!(count = formats.len(), "Discovered capture formats");
    formats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(media_type: &str, width: u32, height: u32, rates: &[(i32, i32)]) -> CapabilityEntry {
        CapabilityEntry {
            media_type: media_type.to_string(),
            width,
            height,
            frame_rates: rates.iter().map(|&(n, d)| FrameRate::new(n, d)).collect(),
        }
    }

    #[test]
    fn richest_mode_sorts_first() {
        let formats = discover_formats(&[
            entry("video/x-raw", 640, 480, &[(30, 1)]),
            entry("video/x-raw", 1920, 1080, &[(30, 1)]),
        ]);
        assert_eq!(formats[0].label, "1920 x 1080 @ 30 fps");
        assert_eq!(formats[1].label, "640 x 480 @ 30 fps");
    }

    #[test]
    fn identical_labels_are_deduplicated() {
        let formats = discover_formats(&[
            entry("video/x-raw", 1920, 1080, &[(30, 1)]),
            entry("video/x-h264", 1920, 1080, &[(30, 1)]),
        ]);
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].media_type, "video/x-raw");
    }

    #[test]
    fn non_video_entries_are_ignored() {
        let formats = discover_formats(&[
            entry("image/jpeg", 1920, 1080, &[(30, 1)]),
            entry("video/x-raw", 320, 240, &[(15, 1)]),
        ]);
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].width, 320);
    }

    #[test]
    fn each_frame_rate_is_a_separate_mode_ordered_by_rate() {
        let formats = discover_formats(&[entry("video/x-raw", 1280, 720, &[(10, 1), (30, 1), (15, 2)])]);
        let labels: Vec<&str> = formats.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["1280 x 720 @ 30 fps", "1280 x 720 @ 10 fps", "1280 x 720 @ 8 fps"]
        );
    }

    #[test]
    fn ntsc_rates_round_in_label_but_stay_exact_in_caps() {
        let format = FormatDescriptor::new("video/x-raw", 1280, 720, FrameRate::new(30000, 1001));
        assert_eq!(format.label, "1280 x 720 @ 30 fps");
        assert_eq!(
            format.caps_string(),
            "video/x-raw, width=(int)1280, height=(int)720, framerate=(fraction)30000/1001"
        );
    }
}
