use std::collections::HashSet;

use crate::world::{OnlinePlayers, PlayerSnapshot};

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 16;

/// Lowercased names written as `@name` in `body`. Tokens outside 3..=16
/// name characters are ignored entirely.
pub fn mentioned_names(body: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '@' {
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        let len = name.chars().count();
        if (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
            names.insert(name.to_lowercase());
        }
    }
    names
}

/// Online players mentioned in `body`, each at most once.
pub fn resolve_mentions(body: &str, online: &OnlinePlayers) -> Vec<PlayerSnapshot> {
    let names = mentioned_names(body);
    if names.is_empty() {
        return Vec::new();
    }
    online
        .iter()
        .filter(|player| names.contains(&player.name.to_lowercase()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use shared::domain::{Location, PlayerId};

    use super::*;

    #[test]
    fn extracts_names_within_length_bounds() {
        let names = mentioned_names("hey @Alex and @bo, @steve_99! also @@Notch and @averyveryverylongname");
        assert_eq!(
            names,
            HashSet::from(["alex".to_string(), "steve_99".to_string(), "notch".to_string()])
        );
    }

    #[test]
    fn resolves_only_online_players_once() {
        let alex = PlayerSnapshot::new(PlayerId::new_random(), "Alex", Location::default());
        let online = OnlinePlayers::new(vec![
            alex.clone(),
            PlayerSnapshot::new(PlayerId::new_random(), "Steve", Location::default()),
        ]);
        let hits = resolve_mentions("@alex @ALEX @ghost", &online);
        assert_eq!(hits, vec![alex]);
    }
}
