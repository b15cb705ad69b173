//! Static lookup tables keyed by player count (5..=10). Authoritative
//! values reproduced exactly as specified; see tests for the cross-check
//! against the composition a `initialize` call must reproduce.

use crate::domain::Role;

pub const MIN_PLAYERS: usize = 5;
pub const MAX_PLAYERS: usize = 10;

/// `team_size[n][round-1]` -> mission team size.
pub fn team_size(player_count: usize, round: u8) -> Option<u8> {
    let table: &[u8; 5] = match player_count {
        5 => &[2, 3, 2, 3, 3],
        6 => &[2, 3, 4, 3, 4],
        7 => &[2, 3, 3, 4, 4],
        8..=10 => &[3, 4, 4, 5, 5],
        _ => return None,
    };
    table.get((round as usize).checked_sub(1)?).copied()
}

/// `fail_requirement[n][round-1]` -> fail votes needed to fail that mission.
pub fn fail_requirement(player_count: usize, round: u8) -> Option<u8> {
    let table: &[u8; 5] = match player_count {
        5..=6 => &[1, 1, 1, 1, 1],
        7..=10 => &[1, 1, 1, 2, 1],
        _ => return None,
    };
    table.get((round as usize).checked_sub(1)?).copied()
}

/// Number of evil-team players for a given player count.
pub fn evil_count(player_count: usize) -> Option<u8> {
    match player_count {
        5 => Some(2),
        6 => Some(2),
        7 => Some(3),
        8 => Some(3),
        9 => Some(3),
        10 => Some(4),
        _ => None,
    }
}

/// The ordered good/evil role composition for a given player count.
/// The total length always equals `player_count`.
pub fn role_composition(player_count: usize) -> Option<(Vec<Role>, Vec<Role>)> {
    use Role::*;
    let (good, evil): (Vec<Role>, Vec<Role>) = match player_count {
        5 => (vec![Merlin, Percival, LoyalServant], vec![Morgana, Assassin]),
        6 => (
            vec![Merlin, Percival, LoyalServant, LoyalServant],
            vec![Morgana, Assassin],
        ),
        7 => (
            vec![Merlin, Percival, LoyalServant, LoyalServant],
            vec![Morgana, Assassin, Oberon],
        ),
        8 => (
            vec![Merlin, Percival, LoyalServant, LoyalServant, LoyalServant],
            vec![Morgana, Assassin, Minion],
        ),
        9 => (
            vec![
                Merlin,
                Percival,
                LoyalServant,
                LoyalServant,
                LoyalServant,
                LoyalServant,
            ],
            vec![Morgana, Assassin, Mordred],
        ),
        10 => (
            vec![
                Merlin,
                Percival,
                LoyalServant,
                LoyalServant,
                LoyalServant,
                LoyalServant,
            ],
            vec![Morgana, Assassin, Mordred, Oberon],
        ),
        _ => return None,
    };
    Some((good, evil))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composition_length_matches_player_count() {
        for n in MIN_PLAYERS..=MAX_PLAYERS {
            let (good, evil) = role_composition(n).unwrap();
            assert_eq!(good.len() + evil.len(), n);
            assert_eq!(evil.len(), evil_count(n).unwrap() as usize);
        }
    }

    #[test]
    fn team_size_seven_players_round_four_is_four() {
        assert_eq!(team_size(7, 4), Some(4));
        assert_eq!(fail_requirement(7, 4), Some(2));
    }

    #[test]
    fn out_of_range_player_count_is_none() {
        assert_eq!(team_size(4, 1), None);
        assert_eq!(team_size(11, 1), None);
    }
}
