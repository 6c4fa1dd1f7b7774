use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Default,
            Serialize,
            Deserialize,
        )]
        pub struct $name(pub $inner);
    };
}

id_newtype!(BlockNumber, u64);
id_newtype!(BlockHash, [u8; 32]);

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BlockHash {
    /// Shortened `0xaaaa..bbbb` form used in log fields.
    fn terminal_string(&self) -> String {
        let head = &self.0[..2];
        let tail = &self.0[30..];
        format!(
            "0x{:02x}{:02x}..{:02x}{:02x}",
            head[0], head[1], tail[0], tail[1]
        )
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Reference to a block on the consumer side, typically the pending head a
/// step should advance toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockRef {
    pub hash: BlockHash,
    pub number: BlockNumber,
    pub parent_hash: BlockHash,
    pub timestamp: u64,
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash.terminal_string(), self.number)
    }
}
