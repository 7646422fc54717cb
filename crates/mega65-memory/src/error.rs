//! Mapper errors and the unmapped-access policy.

use std::fmt;

/// Direction of a faulting access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    /// Write of the contained byte.
    Write(u8),
}

/// Context for an access that landed in a range with no backing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmappedAccess {
    /// 28-bit linear address.
    pub address: u32,
    /// Program counter of the instruction that made the access.
    pub pc: u16,
    pub kind: AccessKind,
}

impl fmt::Display for UnmappedAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AccessKind::Read => write!(
                f,
                "unmapped read at ${:07X} (PC=${:04X})",
                self.address, self.pc
            ),
            AccessKind::Write(value) => write!(
                f,
                "unmapped write of ${value:02X} at ${:07X} (PC=${:04X})",
                self.address, self.pc
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The region table or the memory configuration failed its self-check.
    Configuration { reason: String },
    /// Access to a range with no backing device, aborted by the prompt.
    UnmappedAccess(UnmappedAccess),
    /// Address outside the 28-bit linear space.
    ImpossibleAddress { address: u32, pc: u16 },
}

impl MemoryError {
    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { reason } => write!(f, "memory configuration error: {reason}"),
            Self::UnmappedAccess(access) => write!(f, "{access}"),
            Self::ImpossibleAddress { address, pc } => write!(
                f,
                "impossible linear address ${address:08X} (PC=${pc:04X})"
            ),
        }
    }
}

impl std::error::Error for MemoryError {}

/// What to do about an unmapped access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmappedChoice {
    /// Record the fault for the host loop to pick up with `take_fault`.
    Abort,
    IgnoreOnce,
    /// Ignore this and every later unmapped access without asking.
    IgnoreAlways,
}

/// Asked once per unmapped access while the policy is [`UnmappedPolicy::Ask`].
pub trait UnmappedPrompt {
    fn choose(&mut self, access: &UnmappedAccess) -> UnmappedChoice;
}

impl<F> UnmappedPrompt for F
where
    F: FnMut(&UnmappedAccess) -> UnmappedChoice,
{
    fn choose(&mut self, access: &UnmappedAccess) -> UnmappedChoice {
        self(access)
    }
}

/// Prompt that aborts on every unmapped access.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnUnmapped;

impl UnmappedPrompt for AbortOnUnmapped {
    fn choose(&mut self, _access: &UnmappedAccess) -> UnmappedChoice {
        UnmappedChoice::Abort
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnmappedPolicy {
    /// Consult the prompt on each access.
    #[default]
    Ask,
    /// Reads return $FF and writes are dropped without notice.
    IgnoreSilently,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_address_and_pc() {
        let err = MemoryError::ImpossibleAddress {
            address: 0x1000_0000,
            pc: 0x2001,
        };
        assert_eq!(
            err.to_string(),
            "impossible linear address $10000000 (PC=$2001)"
        );

        let access = UnmappedAccess {
            address: 0x010_0000,
            pc: 0xC000,
            kind: AccessKind::Write(0x42),
        };
        assert_eq!(
            MemoryError::UnmappedAccess(access).to_string(),
            "unmapped write of $42 at $0100000 (PC=$C000)"
        );
    }

    #[test]
    fn closures_act_as_prompts() {
        let mut seen = 0;
        let mut prompt = |_: &UnmappedAccess| {
            seen += 1;
            UnmappedChoice::IgnoreOnce
        };
        let access = UnmappedAccess {
            address: 0,
            pc: 0,
            kind: AccessKind::Read,
        };
        assert_eq!(prompt.choose(&access), UnmappedChoice::IgnoreOnce);
        assert_eq!(seen, 1);
    }
}
