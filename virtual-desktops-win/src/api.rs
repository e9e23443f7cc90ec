use std::fmt;

use uuid::Uuid;

/// Identifier of a single virtual desktop.
///
/// Wraps the 128-bit GUID Explorer assigns to every desktop. Equality is
/// bitwise. The all-zero value is reserved for "no desktop" and is never
/// returned as a valid resolution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DesktopId(Uuid);

impl DesktopId {
    /// Size in bytes of one identifier in the registry records.
    pub const LEN: usize = 16;

    pub const fn nil() -> DesktopId {
        DesktopId(Uuid::nil())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Decodes the 16-byte GUID memory layout the registry records use.
    /// Returns `None` unless `bytes` is exactly [`DesktopId::LEN`] long.
    pub fn from_guid_bytes(bytes: &[u8]) -> Option<DesktopId> {
        let raw: [u8; Self::LEN] = bytes.try_into().ok()?;
        Some(DesktopId(Uuid::from_bytes_le(raw)))
    }

    /// Encodes into the GUID memory layout, the inverse of
    /// [`DesktopId::from_guid_bytes`].
    pub fn to_guid_bytes(&self) -> [u8; Self::LEN] {
        self.0.to_bytes_le()
    }

    /// Parses a textual GUID, with or without the `{}` braces Explorer uses.
    pub fn parse(s: &str) -> Option<DesktopId> {
        let s = s.strip_prefix('{').unwrap_or(s);
        let s = s.strip_suffix('}').unwrap_or(s);
        Uuid::parse_str(s).ok().map(DesktopId)
    }
}

impl From<Uuid> for DesktopId {
    fn from(uuid: Uuid) -> Self {
        DesktopId(uuid)
    }
}

impl From<DesktopId> for Uuid {
    fn from(id: DesktopId) -> Self {
        id.0
    }
}

impl fmt::Display for DesktopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0)
    }
}

/// Opaque handle of a top-level window. Carries no ownership, it is only a
/// correlation key for per-window desktop queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Extracts the desktop id from a work-area key of the form
/// `<device>_<resolution>_<desktop-id>`.
///
/// Takes the substring after the last `_` (the whole string when there is no
/// separator) and parses it as a GUID. Any parse failure yields `None`; no
/// further validation is applied.
pub fn desktop_id_from_work_area(key: &str) -> Option<DesktopId> {
    let tail = key.rsplit('_').next()?;
    DesktopId::parse(tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_work_area_key() {
        let id = desktop_id_from_work_area(
            "DEV123_1920x1080_{11111111-1111-1111-1111-111111111111}",
        )
        .unwrap();
        assert_eq!(
            id,
            DesktopId::parse("11111111-1111-1111-1111-111111111111").unwrap()
        );
    }

    #[test]
    fn work_area_key_without_separator_parses_whole_string() {
        let id = desktop_id_from_work_area("{22222222-2222-2222-2222-222222222222}").unwrap();
        assert_eq!(
            id,
            DesktopId::parse("22222222-2222-2222-2222-222222222222").unwrap()
        );
    }

    #[test]
    fn malformed_work_area_suffix_yields_none() {
        assert_eq!(desktop_id_from_work_area("DEV123_1920x1080_oops"), None);
        assert_eq!(desktop_id_from_work_area(""), None);
    }

    #[test]
    fn guid_bytes_round_trip() {
        let id = DesktopId::parse("{33333333-3333-3333-3333-333333333333}").unwrap();
        let bytes = id.to_guid_bytes();
        assert_eq!(DesktopId::from_guid_bytes(&bytes), Some(id));
    }

    #[test]
    fn from_guid_bytes_rejects_wrong_lengths() {
        assert_eq!(DesktopId::from_guid_bytes(&[0u8; 15]), None);
        assert_eq!(DesktopId::from_guid_bytes(&[0u8; 17]), None);
    }

    #[test]
    fn guid_bytes_are_little_endian_in_leading_fields() {
        // GUID memory layout stores the first three groups little-endian.
        let mut bytes = [0u8; 16];
        bytes[0] = 0x44;
        bytes[1] = 0x33;
        bytes[2] = 0x22;
        bytes[3] = 0x11;
        let id = DesktopId::from_guid_bytes(&bytes).unwrap();
        assert!(id.to_string().starts_with("{11223344-"));
    }

    #[test]
    fn nil_is_detected() {
        assert!(DesktopId::nil().is_nil());
        assert!(DesktopId::from_guid_bytes(&[0u8; 16]).unwrap().is_nil());
    }
}
