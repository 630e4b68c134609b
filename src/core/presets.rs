//! Frame size presets and the `FrameSize` geometry type
//!
//! **Why**: Raw sequences carry no header, so the active geometry has to be
//! picked by the user. The preset list backs the size combo box and the
//! `--size` CLI argument.
//!
//! Index 0 is always "Custom Size" with the unset sentinel (-1,-1).

use once_cell::sync::Lazy;
use std::fmt;

/// Frame geometry in pixels. `(-1,-1)` means "no constraint".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: i32,
    pub height: i32,
}

impl FrameSize {
    pub const UNSET: FrameSize = FrameSize { width: -1, height: -1 };

    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_unset(&self) -> bool {
        *self == Self::UNSET
    }

    /// Number of pixels, 0 for unset or degenerate sizes
    pub fn area(&self) -> usize {
        if self.width <= 0 || self.height <= 0 {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    /// Parse "WxH" (also accepts "W,H")
    pub fn parse(s: &str) -> Option<Self> {
        let (w, h) = s.split_once(['x', 'X', ','])?;
        let width = w.trim().parse::<i32>().ok()?;
        let height = h.trim().parse::<i32>().ok()?;
        (width >= 0 && height >= 0).then_some(Self { width, height })
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::UNSET
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Ordered list of named preset resolutions
#[derive(Debug)]
pub struct FrameSizePresets {
    entries: Vec<(&'static str, FrameSize)>,
}

/// Process-wide preset table, built on first use and never mutated.
pub static FRAME_SIZE_PRESETS: Lazy<FrameSizePresets> = Lazy::new(FrameSizePresets::new);

impl FrameSizePresets {
    fn new() -> Self {
        let entries = vec![
            ("Custom Size", FrameSize::UNSET),
            ("QCIF", FrameSize::new(176, 144)),
            ("QVGA", FrameSize::new(320, 240)),
            ("WQVGA", FrameSize::new(416, 240)),
            ("CIF", FrameSize::new(352, 288)),
            ("VGA", FrameSize::new(640, 480)),
            ("WVGA", FrameSize::new(832, 480)),
            ("4CIF", FrameSize::new(704, 576)),
            ("ITU R.BT601", FrameSize::new(720, 576)),
            ("720i/p", FrameSize::new(1280, 720)),
            ("1080i/p", FrameSize::new(1920, 1080)),
            ("4k", FrameSize::new(3840, 2160)),
            ("XGA", FrameSize::new(1024, 768)),
            ("XGA+", FrameSize::new(1280, 960)),
        ];
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in the form "Name (W,H)", first entry plain "Custom Size".
    pub fn names_formatted(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, (name, size))| {
                if i == 0 {
                    name.to_string()
                } else {
                    format!("{} ({},{})", name, size.width, size.height)
                }
            })
            .collect()
    }

    /// Preset size at index, `UNSET` if the index is out of range
    pub fn size_at(&self, index: usize) -> FrameSize {
        self.entries
            .get(index)
            .map(|(_, size)| *size)
            .unwrap_or(FrameSize::UNSET)
    }

    /// First preset matching `size`, or 0 (custom) if none does.
    pub fn find_index(&self, size: FrameSize) -> usize {
        self.entries
            .iter()
            .position(|(_, s)| *s == size)
            .unwrap_or(0)
    }

    /// Case-insensitive lookup by preset name. "Custom Size" never matches.
    pub fn find_by_name(&self, name: &str) -> Option<FrameSize> {
        self.entries
            .iter()
            .skip(1)
            .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
            .map(|(_, size)| *size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_names() {
        let names = FRAME_SIZE_PRESETS.names_formatted();
        assert_eq!(names.len(), FRAME_SIZE_PRESETS.len());
        assert_eq!(names[0], "Custom Size");
        assert_eq!(names[1], "QCIF (176,144)");
        assert_eq!(names[10], "1080i/p (1920,1080)");
    }

    #[test]
    fn test_find_index_round_trip() {
        for i in 1..FRAME_SIZE_PRESETS.len() {
            let size = FRAME_SIZE_PRESETS.size_at(i);
            assert_eq!(FRAME_SIZE_PRESETS.find_index(size), i, "preset {}", i);
        }
    }

    #[test]
    fn test_unknown_size_is_custom() {
        assert_eq!(FRAME_SIZE_PRESETS.find_index(FrameSize::new(123, 45)), 0);
        assert_eq!(FRAME_SIZE_PRESETS.find_index(FrameSize::UNSET), 0);
        assert_eq!(FRAME_SIZE_PRESETS.size_at(999), FrameSize::UNSET);
    }

    #[test]
    fn test_find_by_name() {
        assert_eq!(FRAME_SIZE_PRESETS.find_by_name("cif"), Some(FrameSize::new(352, 288)));
        assert_eq!(FRAME_SIZE_PRESETS.find_by_name("Custom Size"), None);
        assert_eq!(FRAME_SIZE_PRESETS.find_by_name("nope"), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(FrameSize::parse("640x480"), Some(FrameSize::new(640, 480)));
        assert_eq!(FrameSize::parse("8,4"), Some(FrameSize::new(8, 4)));
        assert_eq!(FrameSize::parse("axb"), None);
        assert_eq!(FrameSize::parse("-3x4"), None);
    }
}
