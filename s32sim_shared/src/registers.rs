//! Register offsets and bit layouts shared by the peripheral models and the
//! firmware drivers that poke them.

/// LPUART register block
pub mod lpuart {
    use bitflags::bitflags;

    pub const BAUD: u32 = 0x10;
    pub const STAT: u32 = 0x14;
    pub const CTRL: u32 = 0x18;
    pub const DATA: u32 = 0x1C;

    /// BAUD value after reset, also what the firmware programs
    pub const RESET_BAUD: u32 = 0x1A0;

    bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Stat: u32 {
            /// Transmit data register empty
            const TDRE = 1 << 23;
            /// Receive data register full
            const RDRF = 1 << 21;
        }
    }

    bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Ctrl: u32 {
            /// Transmitter enable
            const TE = 1 << 19;
            /// Receiver enable
            const RE = 1 << 18;
        }
    }
}

/// FlexCAN scratch registers
pub mod flexcan {
    pub const MCR: u32 = 0x00;
    pub const CTRL: u32 = 0x04;
    pub const TFR: u32 = 0x08;
    pub const RFR: u32 = 0x0C;
}
