//! DMA Streaming Transfer
//!
//! Peripheral-to-memory transfer model used by streaming acquisition
//! groups, plus the sample buffer the transfer engine writes into.
//!
//! The buffer is caller-owned and shared: the transfer engine overwrites
//! slots asynchronously while application code reads them. Each slot is a
//! half-word atomic, so a single-slot read is never torn; reading several
//! slots gives no cross-slot consistency.

use core::sync::atomic::{AtomicU16, Ordering};

/// Number of channels on DMA controller 1
pub const DMA_CHANNEL_COUNT: usize = 7;

/// DMA controller 1 channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DmaChannel {
    /// Channel 1
    Ch1,
    /// Channel 2
    Ch2,
    /// Channel 3
    Ch3,
    /// Channel 4
    Ch4,
    /// Channel 5
    Ch5,
    /// Channel 6
    Ch6,
    /// Channel 7
    Ch7,
}

impl DmaChannel {
    /// All channels in index order
    pub const ALL: [Self; DMA_CHANNEL_COUNT] = [
        Self::Ch1,
        Self::Ch2,
        Self::Ch3,
        Self::Ch4,
        Self::Ch5,
        Self::Ch6,
        Self::Ch7,
    ];

    /// 0-based channel index
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Ch1 => 0,
            Self::Ch2 => 1,
            Self::Ch3 => 2,
            Self::Ch4 => 3,
            Self::Ch5 => 4,
            Self::Ch6 => 5,
            Self::Ch7 => 6,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for DmaChannel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "DMA1_CH{}", self.index() + 1);
    }
}

/// Transfer direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Peripheral data register to memory
    PeripheralToMemory,
    /// Memory to peripheral data register
    MemoryToPeripheral,
}

/// Buffer refill behaviour of a transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferMode {
    /// Fill the target once, then stop
    Normal,
    /// Wrap around and keep refilling
    Circular,
}

/// Width of one transferred element
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementSize {
    /// 8 bits
    Byte,
    /// 16 bits
    HalfWord,
    /// 32 bits
    Word,
}

/// Channel arbitration priority
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Very high
    VeryHigh,
}

/// Complete description of one transfer
#[derive(Clone, Copy, Debug)]
pub struct Transfer<'a> {
    /// Direction
    pub direction: Direction,
    /// One-shot or circular
    pub mode: TransferMode,
    /// Element size on both sides
    pub element: ElementSize,
    /// Advance the peripheral address after each element
    pub peripheral_increment: bool,
    /// Advance the memory address after each element
    pub memory_increment: bool,
    /// Arbitration priority
    pub priority: Priority,
    /// Peripheral data register address
    pub peripheral_address: u32,
    /// Memory slots written by the transfer
    pub target: &'a [AtomicU16],
}

impl Transfer<'_> {
    /// Number of elements per round
    #[must_use]
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// Check for an empty target
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}

/// Register file of the DMA controller
///
/// `'a` is the lifetime of the memory targets handed to the controller.
pub trait DmaHardware<'a> {
    /// Program a channel (the channel must be disabled)
    fn configure(&mut self, channel: DmaChannel, transfer: Transfer<'a>);

    /// Start or stop a channel
    fn set_enabled(&mut self, channel: DmaChannel, enabled: bool);

    /// Enable or disable the transfer-complete interrupt
    fn set_complete_interrupt(&mut self, channel: DmaChannel, enabled: bool);

    /// Transfer-complete flag
    fn transfer_complete(&self, channel: DmaChannel) -> bool;

    /// Clear the transfer-complete flag
    fn clear_transfer_complete(&mut self, channel: DmaChannel);
}

/// Fixed-size result buffer shared with the transfer engine
pub struct SampleBuffer<const N: usize> {
    slots: [AtomicU16; N],
}

impl<const N: usize> SampleBuffer<N> {
    /// Create a zeroed buffer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU16::new(0) }; N],
        }
    }

    /// Slots as handed to the acquisition engine
    #[must_use]
    pub const fn slots(&self) -> &[AtomicU16] {
        &self.slots
    }

    /// Read one slot
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u16> {
        self.slots.get(index).map(|slot| slot.load(Ordering::Relaxed))
    }

    /// Copy every slot (not a consistent snapshot while streaming)
    #[must_use]
    pub fn snapshot(&self) -> [u16; N] {
        core::array::from_fn(|i| self.slots[i].load(Ordering::Relaxed))
    }
}

impl<const N: usize> Default for SampleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one slot of a registered result buffer
#[must_use]
pub fn read_slot(slots: &[AtomicU16], index: usize) -> Option<u16> {
    slots.get(index).map(|slot| slot.load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_starts_zeroed() {
        let buffer = SampleBuffer::<4>::new();
        assert_eq!(buffer.snapshot(), [0; 4]);
        assert_eq!(buffer.get(4), None);
    }

    #[test]
    fn slot_reads_see_stores() {
        let buffer = SampleBuffer::<2>::new();
        buffer.slots()[1].store(1234, Ordering::Relaxed);
        assert_eq!(buffer.get(1), Some(1234));
        assert_eq!(read_slot(buffer.slots(), 1), Some(1234));
        assert_eq!(read_slot(buffer.slots(), 2), None);
    }
}
