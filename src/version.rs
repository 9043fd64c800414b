//! Z-machine version dispatch.
//!
//! Every version-sensitive layout decision (object-entry width, header fields
//! present, text-buffer convention, packed-address formula) is isolated behind
//! [`Version`] so the rest of the crate reads as version-agnostic code.

use crate::error::{Error, Result};

/// The story-file versions this core supports: 3, 4, 5, 7, 8. Version 6
/// (windowed graphics) is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V3,
    V4,
    V5,
    V7,
    V8,
}

impl Version {
    pub fn from_byte(b: u8) -> Result<Version> {
        match b {
            3 => Ok(Version::V3),
            4 => Ok(Version::V4),
            5 => Ok(Version::V5),
            7 => Ok(Version::V7),
            8 => Ok(Version::V8),
            6 => Err(Error::Malformed(
                "version 6 (windowed graphics) is out of scope".into(),
            )),
            other => Err(Error::Malformed(format!("unsupported story version {other}"))),
        }
    }

    /// True for versions whose object entries and property headers use the
    /// "v4+" wide layout (§3 DATA MODEL).
    pub fn is_v4_plus(self) -> bool {
        !matches!(self, Version::V3)
    }

    /// True for versions whose text buffer uses the v1-4 `(len, bytes..., 0)`
    /// convention instead of the v5+ `(len, used, bytes...)` convention.
    pub fn legacy_text_buffer(self) -> bool {
        matches!(self, Version::V3 | Version::V4)
    }

    /// True for versions whose routine locals are read out of the routine
    /// header; false when locals always start at zero (v5+).
    pub fn locals_from_header(self) -> bool {
        matches!(self, Version::V3 | Version::V4)
    }

    /// True for versions with the extended instruction form (`0xBE`) and a
    /// custom alphabet table / header extension table.
    pub fn has_extended_form(self) -> bool {
        matches!(self, Version::V5 | Version::V7 | Version::V8)
    }

    /// Size in bytes of one object-tree entry.
    pub fn object_entry_size(self) -> usize {
        if self.is_v4_plus() {
            14
        } else {
            9
        }
    }

    /// Number of attribute bytes (32 or 48 bits) at the front of an entry.
    pub fn attribute_bytes(self) -> usize {
        if self.is_v4_plus() {
            6
        } else {
            4
        }
    }

    /// Width in bytes of the parent/sibling/child links.
    pub fn object_link_width(self) -> usize {
        if self.is_v4_plus() {
            2
        } else {
            1
        }
    }

    /// Number of default-property table entries preceding the object entries.
    pub fn default_prop_count(self) -> usize {
        if self.is_v4_plus() {
            63
        } else {
            31
        }
    }

    /// Number of z-chars packed into one dictionary entry's encoded word.
    pub fn dict_zchar_width(self) -> usize {
        if self.is_v4_plus() {
            6
        } else {
            4
        }
    }

    /// Maximum raw bytes of a typed word clipped before encoding for dictionary
    /// lookup.
    pub fn max_word_bytes(self) -> usize {
        if self.is_v4_plus() {
            9
        } else {
            6
        }
    }

    /// Expand a packed routine address to a byte address.
    pub fn unpack_routine(self, packed: u16, routine_offset: u16) -> usize {
        match self {
            Version::V3 | Version::V4 => packed as usize * 2,
            Version::V5 => packed as usize * 4,
            Version::V7 => packed as usize * 4 + routine_offset as usize * 8,
            Version::V8 => packed as usize * 8,
        }
    }

    /// Expand a packed string address to a byte address.
    pub fn unpack_string(self, packed: u16, string_offset: u16) -> usize {
        match self {
            Version::V3 | Version::V4 => packed as usize * 2,
            Version::V5 => packed as usize * 4,
            Version::V7 => packed as usize * 4 + string_offset as usize * 8,
            Version::V8 => packed as usize * 8,
        }
    }

    /// File-length multiplier used to compute the end of the story-file image
    /// from the header's length field (for `verify`).
    pub fn file_length_scale(self) -> usize {
        match self {
            Version::V3 | Version::V4 => 2,
            Version::V5 | Version::V7 => 4,
            Version::V8 => 8,
        }
    }
}
