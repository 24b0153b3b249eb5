//! CAN frame value type carried by the logical bus

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum payload of a classic CAN frame
pub const CAN_MAX_DLC: usize = 8;
/// Largest identifier representable in the 29-bit extended format
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;
/// Largest identifier representable in the 11-bit standard format
pub const CAN_SFF_MASK: u32 = 0x7FF;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("identifier 0x{0:X} does not fit in 29 bits")]
    IdOutOfRange(u32),
    #[error("payload of {0} bytes exceeds the 8-byte limit")]
    PayloadTooLong(usize),
    #[error("data length code {0} is out of range 0..=8")]
    InvalidDlc(u8),
}

/// A single CAN message.
///
/// Fields are private so a frame cannot change after construction; the type
/// is `Copy`, which makes every bus delivery an independent value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CanFrame {
    id: u32,
    data: [u8; CAN_MAX_DLC],
    dlc: u8,
}

impl CanFrame {
    /// Build a frame from an identifier and a payload of at most 8 bytes.
    pub fn new(id: u32, payload: &[u8]) -> Result<Self, FrameError> {
        if id > CAN_EFF_MASK {
            return Err(FrameError::IdOutOfRange(id));
        }
        if payload.len() > CAN_MAX_DLC {
            return Err(FrameError::PayloadTooLong(payload.len()));
        }
        let mut data = [0u8; CAN_MAX_DLC];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            data,
            dlc: payload.len() as u8,
        })
    }

    /// Build a frame from its register-level shape `{ id, data[8], dlc }`.
    ///
    /// Bytes past `dlc` are kept as given, matching what a controller would
    /// leave in its mailbox.
    pub fn from_raw(id: u32, data: [u8; CAN_MAX_DLC], dlc: u8) -> Result<Self, FrameError> {
        if id > CAN_EFF_MASK {
            return Err(FrameError::IdOutOfRange(id));
        }
        if dlc as usize > CAN_MAX_DLC {
            return Err(FrameError::InvalidDlc(dlc));
        }
        Ok(Self { id, data, dlc })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// The full 8-byte data field, including bytes past `dlc`.
    pub fn data(&self) -> &[u8; CAN_MAX_DLC] {
        &self.data
    }

    /// The significant bytes of the payload.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.dlc as usize]
    }

    pub fn is_extended(&self) -> bool {
        self.id > CAN_SFF_MASK
    }
}

impl std::fmt::Display for CanFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ID=0x{:03X} DLC={} Data=", self.id, self.dlc)?;
        for byte in self.payload() {
            write!(f, "{:02X} ", byte)?;
        }
        Ok(())
    }
}
