use bitflags::bitflags;

use crate::diagnostics::ContainerError;

/// `ASTC` as four ASCII bytes (`spec.md` §3, §6).
pub const MAGIC: [u8; 4] = *b"ASTC";
pub const CURRENT_VERSION: u32 = 1;
const HEADER_LEN: usize = 20;
const LENGTH_FIELD_LEN: usize = 4;

bitflags! {
    /// The container header's flags word. `spec.md` §3/§6 reserve this
    /// field and specify it as zero; this core defines one bit so the
    /// field carries real information instead of sitting permanently
    /// unused. Unknown bits round-trip through `decode` untouched, the
    /// way a reserved field should.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContainerFlags: u32 {
        /// Set when the emitting `CompileOptions` asked for debug info.
        /// This core does not yet emit a line table; the bit is a forward
        /// compatibility marker for when it does.
        const DEBUG_INFO = 1 << 0;
    }
}

/// The fixed 20-byte container header plus the length-prefixed
/// instruction region (`spec.md` §3 "Bytecode container", §6 "Bytecode
/// container format").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub version: u32,
    pub flags: ContainerFlags,
    pub entry_point: u32,
    pub reserved_source_size: u32,
    pub instructions: Vec<u8>,
}

impl Container {
    #[must_use]
    pub fn new(instructions: Vec<u8>) -> Self {
        Self {
            version: CURRENT_VERSION,
            flags: ContainerFlags::empty(),
            entry_point: 0,
            reserved_source_size: 0,
            instructions,
        }
    }

    /// Writes the 20-byte prefix, then a 4-byte length, then the
    /// instruction bytes (`spec.md` §4.4 "Container emission").
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + LENGTH_FIELD_LEN + self.instructions.len());
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&self.entry_point.to_le_bytes());
        out.extend_from_slice(&self.reserved_source_size.to_le_bytes());
        out.extend_from_slice(&(self.instructions.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.instructions);
        out
    }

    /// Validates the header and slices out the instruction region
    /// (`spec.md` §4.5 "Initialization").
    pub fn decode(bytes: &[u8]) -> Result<Self, ContainerError> {
        if bytes.len() < HEADER_LEN + LENGTH_FIELD_LEN {
            return Err(ContainerError::Truncated {
                min: HEADER_LEN + LENGTH_FIELD_LEN,
                found: bytes.len(),
            });
        }

        let magic: [u8; 4] = bytes[0..4].try_into().unwrap();
        if magic != MAGIC {
            return Err(ContainerError::InvalidMagic(magic));
        }

        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        if version != CURRENT_VERSION {
            return Err(ContainerError::UnsupportedVersion(version));
        }

        let flags = ContainerFlags::from_bits_truncate(u32::from_le_bytes(bytes[8..12].try_into().unwrap()));
        let entry_point = u32::from_le_bytes(bytes[12..16].try_into().unwrap());
        let reserved_source_size = u32::from_le_bytes(bytes[16..20].try_into().unwrap());
        let declared_len = u32::from_le_bytes(bytes[20..24].try_into().unwrap()) as usize;

        let available = bytes.len() - HEADER_LEN - LENGTH_FIELD_LEN;
        if declared_len > available {
            return Err(ContainerError::LengthMismatch {
                declared: declared_len as u32,
                available,
            });
        }

        let instructions = bytes[24..24 + declared_len].to_vec();
        Ok(Self {
            version,
            flags,
            entry_point,
            reserved_source_size,
            instructions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_instructions() {
        let container = Container::new(vec![0x10, 0, 0, 0, 14, 0x01]);
        let encoded = container.encode();
        let decoded = Container::decode(&encoded).unwrap();
        assert_eq!(decoded, container);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = Container::new(vec![0x01]).encode();
        bytes[0] = b'X';
        assert!(matches!(
            Container::decode(&bytes),
            Err(ContainerError::InvalidMagic(_))
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(matches!(
            Container::decode(&[0u8; 4]),
            Err(ContainerError::Truncated { .. })
        ));
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut bytes = Container::new(vec![0x01, 0x02]).encode();
        let len_offset = 20;
        bytes[len_offset..len_offset + 4].copy_from_slice(&100u32.to_le_bytes());
        assert!(matches!(
            Container::decode(&bytes),
            Err(ContainerError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn empty_instruction_region_round_trips() {
        let container = Container::new(Vec::new());
        let decoded = Container::decode(&container.encode()).unwrap();
        assert_eq!(decoded.instructions.len(), 0);
    }

    #[test]
    fn debug_info_flag_round_trips() {
        let mut container = Container::new(vec![0x01]);
        container.flags = ContainerFlags::DEBUG_INFO;
        let decoded = Container::decode(&container.encode()).unwrap();
        assert!(decoded.flags.contains(ContainerFlags::DEBUG_INFO));
    }

    #[test]
    fn unknown_reserved_bits_survive_decode() {
        let mut bytes = Container::new(vec![0x01]).encode();
        bytes[8..12].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        let decoded = Container::decode(&bytes).unwrap();
        assert!(decoded.flags.contains(ContainerFlags::DEBUG_INFO));
    }
}
