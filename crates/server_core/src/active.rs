use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use shared::{channel::Channel, domain::PlayerId};

/// The tab each client last reported as open.
#[derive(Default)]
pub struct ActiveChannels {
    channels: RwLock<HashMap<PlayerId, Channel>>,
}

impl ActiveChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the reported ordinal; out-of-range values fall back to global.
    pub fn report(&self, player: PlayerId, ordinal: u8) -> Channel {
        let channel = Channel::from_ordinal(ordinal).unwrap_or_default();
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(player, channel);
        channel
    }

    pub fn get(&self, player: PlayerId) -> Channel {
        self.channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&player)
            .copied()
            .unwrap_or_default()
    }

    pub fn forget(&self, player: PlayerId) {
        self.channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ordinals_fall_back_to_global() {
        let active = ActiveChannels::new();
        let player = PlayerId::new_random();
        assert_eq!(active.get(player), Channel::Global);
        assert_eq!(active.report(player, 2), Channel::Trade);
        assert_eq!(active.get(player), Channel::Trade);
        assert_eq!(active.report(player, 200), Channel::Global);
        active.forget(player);
        assert_eq!(active.get(player), Channel::Global);
    }
}
