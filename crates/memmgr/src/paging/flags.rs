//! Page table entry flags.

/// Page table entry flags.
///
/// Flags occupy the low bits of an encoded entry, below the frame address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageFlags(u32);

impl PageFlags {
    /// Present bit (bit 0).
    const PRESENT: u32 = 1 << 0;

    /// Writable bit (bit 1).
    const WRITABLE: u32 = 1 << 1;

    /// User-accessible bit (bit 2).
    const USER: u32 = 1 << 2;

    /// Every bit this type knows about.
    const ALL: u32 = Self::PRESENT | Self::WRITABLE | Self::USER;

    /// Creates empty page flags (page not present).
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Flags for a user page mapped read-write.
    ///
    /// Both leaf entries and root entries referencing second-level tables use these.
    pub const fn user_rw() -> Self {
        Self(Self::ALL)
    }

    /// Creates page flags from a raw value, dropping unknown bits.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw & Self::ALL)
    }

    /// Returns the raw value of these flags.
    pub const fn to_raw(self) -> u32 {
        self.0
    }

    /// Returns whether the present bit is set.
    pub fn is_present(self) -> bool {
        (self.0 & Self::PRESENT) != 0
    }

    /// Sets or clears the present bit.
    pub fn set_present(&mut self, present: bool) {
        self.assign(Self::PRESENT, present);
    }

    /// Returns whether the writable bit is set.
    pub fn is_writable(self) -> bool {
        (self.0 & Self::WRITABLE) != 0
    }

    /// Sets or clears the writable bit.
    pub fn set_writable(&mut self, writable: bool) {
        self.assign(Self::WRITABLE, writable);
    }

    /// Returns whether the user-accessible bit is set.
    pub fn is_user(self) -> bool {
        (self.0 & Self::USER) != 0
    }

    /// Sets or clears the user-accessible bit.
    pub fn set_user(&mut self, user: bool) {
        self.assign(Self::USER, user);
    }

    fn assign(&mut self, bit: u32, value: bool) {
        if value {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}

impl Default for PageFlags {
    fn default() -> Self {
        Self::empty()
    }
}
