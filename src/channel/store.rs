use super::{Channel, Error, Status};
use crate::{abiencode::types::Hash, config::IdReuse};
use alloc::collections::BTreeMap;

/// All channels, indexed by their id. The only place channel records live.
#[derive(Debug, Default, Clone)]
pub struct ChannelStore {
    channels: BTreeMap<Hash, Channel>,
    id_reuse: IdReuse,
}

impl ChannelStore {
    pub fn new(id_reuse: IdReuse) -> Self {
        Self {
            channels: BTreeMap::new(),
            id_reuse,
        }
    }

    pub fn get(&self, id: &Hash) -> Result<&Channel, Error> {
        self.channels.get(id).ok_or(Error::ChannelNotFound(*id))
    }

    /// Whether a new channel may be opened under `id`.
    pub fn check_vacant(&self, id: &Hash) -> Result<(), Error> {
        match (self.channels.get(id), self.id_reuse) {
            (None, _) => Ok(()),
            (Some(ch), IdReuse::AfterSettlement) if ch.status == Status::Settled => Ok(()),
            (Some(_), _) => Err(Error::ChannelIdInUse(*id)),
        }
    }

    pub fn insert(&mut self, channel: Channel) -> Result<(), Error> {
        self.check_vacant(&channel.channel_id)?;
        self.channels.insert(channel.channel_id, channel);
        Ok(())
    }

    /// Replace an existing record.
    pub fn update(&mut self, channel: Channel) -> Result<(), Error> {
        match self.channels.get_mut(&channel.channel_id) {
            Some(existing) => {
                *existing = channel;
                Ok(())
            }
            None => Err(Error::ChannelNotFound(channel.channel_id)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
