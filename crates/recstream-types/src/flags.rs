/// Per-field modifier flags.
///
/// Record definitions carry flags as a short string such as `"BE"` or
/// `"LE|AUX"`. Only two markers matter here:
///
///   bit 0 = big-endian (`BE`); multi-byte elements are little-endian otherwise
///   bit 1 = auxiliary (`AUX`); the session may be configured to skip it
///
/// Unknown markers are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldFlags(u8);

impl FieldFlags {
    pub const NONE: Self = Self(0);
    pub const BIG_ENDIAN: Self = Self(0b0000_0001);
    pub const AUX: Self = Self(0b0000_0010);

    pub fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    /// Parse the flag string of a field definition.
    ///
    /// Markers are matched as substrings, so both `"BE"` and `"BE|AUX"` set
    /// the big-endian bit.
    pub fn parse(flags: &str) -> Self {
        let mut raw = 0;
        if flags.contains("BE") {
            raw |= Self::BIG_ENDIAN.0;
        }
        if flags.contains("AUX") {
            raw |= Self::AUX.0;
        }
        Self(raw)
    }

    pub fn is_big_endian(self) -> bool {
        self.0 & Self::BIG_ENDIAN.0 != 0
    }

    pub fn is_aux(self) -> bool {
        self.0 & Self::AUX.0 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_little_endian() {
        let flags = FieldFlags::parse("");
        assert!(!flags.is_big_endian());
        assert!(!flags.is_aux());
        assert_eq!(flags, FieldFlags::NONE);
    }

    #[test]
    fn combined_markers() {
        let flags = FieldFlags::parse("BE|AUX");
        assert!(flags.is_big_endian());
        assert!(flags.is_aux());
    }

    #[test]
    fn le_marker_leaves_big_endian_clear() {
        assert!(!FieldFlags::parse("LE").is_big_endian());
    }
}
