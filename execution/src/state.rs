use anyhow::Result;
use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use covault_types::{Key, Value};

#[cfg(any(test, feature = "mocks"))]
use std::collections::HashMap;

/// Persistent key/value state as seen by the engine. The host supplies the
/// durable implementation; the engine only ever reads typed keys and applies
/// the change set handed back by [`crate::Layer::commit`].
pub trait State {
    fn get(&self, key: &Key) -> Result<Option<Value>>;
    fn insert(&mut self, key: Key, value: Value) -> Result<()>;
    fn delete(&mut self, key: &Key) -> Result<()>;

    fn apply(&mut self, changes: Vec<(Key, Status)>) -> Result<()> {
        for (key, status) in changes {
            match status {
                Status::Update(value) => self.insert(key, value)?,
                Status::Delete => self.delete(&key)?,
            }
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
pub struct Memory {
    state: HashMap<Key, Value>,
}

#[cfg(any(test, feature = "mocks"))]
impl State for Memory {
    fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.state.get(key).cloned())
    }

    fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }
}

/// A buffered write: either a new value for the key or its removal.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(clippy::large_enum_variant)]
pub enum Status {
    Update(Value),
    Delete,
}

impl Write for Status {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Status::Update(value) => {
                0u8.write(writer);
                value.write(writer);
            }
            Status::Delete => 1u8.write(writer),
        }
    }
}

impl Read for Status {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Status::Update(Value::read(reader)?)),
            1 => Ok(Status::Delete),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Status {
    fn encode_size(&self) -> usize {
        1 + match self {
            Status::Update(value) => value.encode_size(),
            Status::Delete => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::Encode;
    use covault_types::VaultStatus;

    #[test]
    fn apply_replays_updates_and_deletes() {
        let mut memory = Memory::default();
        memory
            .apply(vec![
                (Key::Status, Status::Update(Value::Status(VaultStatus::Active))),
                (Key::TotalRaised, Status::Update(Value::TotalRaised(500))),
                (Key::TotalRaised, Status::Delete),
            ])
            .expect("apply changes");

        assert_eq!(
            memory.get(&Key::Status).expect("get status"),
            Some(Value::Status(VaultStatus::Active))
        );
        assert_eq!(memory.get(&Key::TotalRaised).expect("get total"), None);
    }

    #[test]
    fn status_round_trip() {
        for status in [
            Status::Update(Value::TotalRaised(42)),
            Status::Delete,
        ] {
            let encoded = status.encode();
            assert_eq!(encoded.len(), status.encode_size());
            let decoded = Status::read(&mut encoded.as_ref()).expect("decode status");
            assert_eq!(decoded, status);
        }
    }
}
