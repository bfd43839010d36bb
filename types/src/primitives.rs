//! Opaque fixed-length identifiers used across the vault.

use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, Write};
use commonware_utils::hex;
use std::fmt;

/// A fixed-length opaque account identifier (20 bytes, the host's account id
/// width).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address([u8; Self::LEN]);

impl Address {
    pub const LEN: usize = 20;

    pub const fn new(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex(&self.0))
    }
}

impl Write for Address {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl Read for Address {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        if reader.remaining() < Self::LEN {
            return Err(Error::EndOfBuffer);
        }
        let mut bytes = [0u8; Self::LEN];
        reader.copy_to_slice(&mut bytes);
        Ok(Self(bytes))
    }
}

impl FixedSize for Address {
    const SIZE: usize = Self::LEN;
}

/// A fixed-length opaque token identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TokenId([u8; Self::LEN]);

impl TokenId {
    pub const LEN: usize = 32;

    pub const fn new(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex(&self.0))
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", hex(&self.0))
    }
}

impl Write for TokenId {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl Read for TokenId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        if reader.remaining() < Self::LEN {
            return Err(Error::EndOfBuffer);
        }
        let mut bytes = [0u8; Self::LEN];
        reader.copy_to_slice(&mut bytes);
        Ok(Self(bytes))
    }
}

impl FixedSize for TokenId {
    const SIZE: usize = Self::LEN;
}

/// A fixed-length opaque settlement-asset identifier (currency + issuer as
/// packed by the host; the core never inspects its contents).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AssetId([u8; Self::LEN]);

impl AssetId {
    pub const LEN: usize = 32;

    pub const fn new(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex(&self.0))
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", hex(&self.0))
    }
}

impl Write for AssetId {
    fn write(&self, writer: &mut impl BufMut) {
        writer.put_slice(&self.0);
    }
}

impl Read for AssetId {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        if reader.remaining() < Self::LEN {
            return Err(Error::EndOfBuffer);
        }
        let mut bytes = [0u8; Self::LEN];
        reader.copy_to_slice(&mut bytes);
        Ok(Self(bytes))
    }
}

impl FixedSize for AssetId {
    const SIZE: usize = Self::LEN;
}
