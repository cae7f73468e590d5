//! Device classification by name prefix

use std::fmt;

/// Category label grouping entries by device-name prefix
///
/// Derived from the identity on every write; never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Core routers (`co…`)
    Core,
    /// Label-switching routers (`la…`)
    Label,
    /// Anything with an unrecognized prefix
    Unknown,
}

impl Classification {
    /// All labels, in directory-listing order
    pub const ALL: [Classification; 3] = [
        Classification::Core,
        Classification::Label,
        Classification::Unknown,
    ];

    /// Classify a device identity by its two-character prefix (case-insensitive)
    pub fn from_identity(identity: &str) -> Self {
        let mut chars = identity.chars().map(|c| c.to_ascii_lowercase());
        match (chars.next(), chars.next()) {
            (Some('c'), Some('o')) => Classification::Core,
            (Some('l'), Some('a')) => Classification::Label,
            _ => Classification::Unknown,
        }
    }

    /// Directory name used in the archive
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Core => "Core",
            Classification::Label => "Label",
            Classification::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_prefixes() {
        assert_eq!(Classification::from_identity("co01.test01"), Classification::Core);
        assert_eq!(Classification::from_identity("la01.test01"), Classification::Label);
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        assert_eq!(Classification::from_identity("CO01.dc2"), Classification::Core);
        assert_eq!(Classification::from_identity("La7"), Classification::Label);
    }

    #[test]
    fn test_fallback_to_unknown() {
        assert_eq!(Classification::from_identity("ag01.test01"), Classification::Unknown);
        assert_eq!(Classification::from_identity("c"), Classification::Unknown);
        assert_eq!(Classification::from_identity(""), Classification::Unknown);
        // Multi-byte first character must not panic
        assert_eq!(Classification::from_identity("éo01"), Classification::Unknown);
    }

    #[test]
    fn test_display_matches_directory_name() {
        for class in Classification::ALL {
            assert_eq!(class.to_string(), class.as_str());
        }
    }
}
