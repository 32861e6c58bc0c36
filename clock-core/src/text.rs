//! Fixed-capacity text helpers.

use core::fmt;

use heapless::String;

/// Copies `value` into a bounded string, dropping whatever does not fit.
///
/// Truncation happens on a char boundary so the result is always valid UTF-8.
#[must_use]
pub fn copy_truncated<const N: usize>(value: &str) -> String<N> {
    let mut out = String::new();
    for ch in value.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// `fmt::Write` sink that silently truncates once full.
///
/// Screens and status lines format into this so an unexpectedly long value
/// clips instead of failing the whole line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FormatBuffer<const N: usize> {
    inner: String<N>,
    truncated: bool,
}

impl<const N: usize> FormatBuffer<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: String::new(),
            truncated: false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    /// Returns `true` when a write was clipped.
    #[must_use]
    pub const fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.truncated = false;
    }

    #[must_use]
    pub fn into_string(self) -> String<N> {
        self.inner
    }
}

impl<const N: usize> fmt::Write for FormatBuffer<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.inner.push(ch).is_err() {
                self.truncated = true;
                break;
            }
        }
        Ok(())
    }
}

impl<const N: usize> fmt::Display for FormatBuffer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats `minutes` since midnight as `HH:MM`.
#[must_use]
pub fn hh_mm(minutes: u16) -> String<5> {
    let mut out = FormatBuffer::<5>::new();
    let _ = fmt::write(&mut out, format_args!("{:02}:{:02}", minutes / 60, minutes % 60));
    out.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;

    #[test]
    fn copy_truncated_respects_char_boundaries() {
        let copied: String<6> = copy_truncated("Portimão");
        assert_eq!(copied.as_str(), "Portim");

        let copied: String<8> = copy_truncated("Portimão");
        assert_eq!(copied.as_str(), "Portimã");
    }

    #[test]
    fn format_buffer_clips_and_flags() {
        let mut buffer = FormatBuffer::<4>::new();
        write!(buffer, "{}", 123_456).unwrap();
        assert_eq!(buffer.as_str(), "1234");
        assert!(buffer.truncated());
    }

    #[test]
    fn hh_mm_pads_components() {
        assert_eq!(hh_mm(472).as_str(), "07:52");
        assert_eq!(hh_mm(0).as_str(), "00:00");
    }
}
