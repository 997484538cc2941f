use shared::domain::{Location, PlayerId};

/// Point-in-time view of a connected player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub name: String,
    pub location: Location,
    pub team: Option<String>,
    /// Vanilla operator level, 0..=4.
    pub permission_level: u8,
}

impl PlayerSnapshot {
    pub fn new(id: PlayerId, name: impl Into<String>, location: Location) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            team: None,
            permission_level: 0,
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn with_permission_level(mut self, level: u8) -> Self {
        self.permission_level = level;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct OnlinePlayers {
    players: Vec<PlayerSnapshot>,
}

impl OnlinePlayers {
    pub fn new(players: Vec<PlayerSnapshot>) -> Self {
        Self { players }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        self.players.iter()
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|player| player.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&PlayerSnapshot> {
        self.players
            .iter()
            .find(|player| player.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl FromIterator<PlayerSnapshot> for OnlinePlayers {
    fn from_iter<I: IntoIterator<Item = PlayerSnapshot>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
