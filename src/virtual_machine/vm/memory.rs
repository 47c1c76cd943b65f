use crate::virtual_machine::errors::VMError;
use std::collections::BTreeMap;
use std::fmt::{self, Display};

/// Sparse, auto-extending Intcode memory.
///
/// Cells that were never written read as zero. Only written cells are stored,
/// so a program that touches a few far-away addresses stays small.
///
/// The highest written address is tracked separately from the stored cells:
/// it bounds [`Memory::snapshot`] and the rendered form, and it survives
/// writes of zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Memory {
    /// Written cells.
    cells: BTreeMap<u64, i64>,
    /// Highest address ever written, if any.
    high_water: Option<u64>,
}

impl Memory {
    /// Creates memory holding `program` at addresses `0..program.len()`.
    pub fn new(program: &[i64]) -> Self {
        let mut memory = Self::default();
        for (address, &value) in program.iter().enumerate() {
            memory.store(address as u64, value);
        }
        memory
    }

    /// Returns the value at `address`, or zero if it was never written.
    ///
    /// Returns [`VMError::InvalidAddress`] if `address` is negative.
    pub fn read(&self, address: i64) -> Result<i64, VMError> {
        let address = Self::check(address)?;
        Ok(self.cell(address))
    }

    /// Stores `value` at `address`, growing memory as needed.
    ///
    /// Returns [`VMError::InvalidAddress`] if `address` is negative.
    pub fn write(&mut self, address: i64, value: i64) -> Result<(), VMError> {
        let address = Self::check(address)?;
        self.store(address, value);
        Ok(())
    }

    /// Highest address ever written, or `None` for empty memory.
    pub fn high_water(&self) -> Option<u64> {
        self.high_water
    }

    /// Every cell from address 0 up to the highest written address, in order.
    ///
    /// Unwritten cells inside that range appear as zero; nothing past it is
    /// materialized.
    pub fn snapshot(&self) -> Vec<(u64, i64)> {
        let Some(high) = self.high_water else {
            return Vec::new();
        };
        (0..=high).map(|address| (address, self.cell(address))).collect()
    }

    fn cell(&self, address: u64) -> i64 {
        self.cells.get(&address).copied().unwrap_or(0)
    }

    fn store(&mut self, address: u64, value: i64) {
        self.cells.insert(address, value);
        self.high_water = Some(self.high_water.map_or(address, |high| high.max(address)));
    }

    fn check(address: i64) -> Result<u64, VMError> {
        u64::try_from(address).map_err(|_| VMError::InvalidAddress { address })
    }
}

/// Renders memory as `[v0,v1,...,vk]` where `k` is the highest written address.
impl Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        if let Some(high) = self.high_water {
            for address in 0..=high {
                if address > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", self.cell(address))?;
            }
        }
        write!(f, "]")
    }
}
