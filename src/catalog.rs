//! Compiled-in definitions of the supported games.

use serde::Serialize;

use crate::error::LottoError;
use crate::types::GameType;

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumberRange {
    pub min: u8,
    pub max: u8,
}

impl NumberRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, n: u8) -> bool {
        (self.min..=self.max).contains(&n)
    }

    pub fn len(&self) -> usize {
        (self.max as usize + 1).saturating_sub(self.min as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + use<> {
        self.min..=self.max
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameDefinition {
    pub game_type: GameType,
    pub display_name: &'static str,
    pub description: &'static str,
    pub domain: NumberRange,
    pub draw_size: usize,
    /// Range of the "Más" number, for games that have one.
    pub secondary: Option<NumberRange>,
    /// Numbers are shown zero-padded to two digits ("00".."99").
    pub two_digit: bool,
}

impl GameDefinition {
    pub fn has_secondary(&self) -> bool {
        self.secondary.is_some()
    }

    pub fn format_number(&self, n: u8) -> String {
        if self.two_digit {
            format!("{:02}", n)
        } else {
            n.to_string()
        }
    }
}

static GAMES: [GameDefinition; 4] = [
    GameDefinition {
        game_type: GameType::Leidsa,
        display_name: "Leidsa",
        description: "6 números del 1 al 40 + Más del 1 al 12",
        domain: NumberRange::new(1, 40),
        draw_size: 6,
        secondary: Some(NumberRange::new(1, 12)),
        two_digit: false,
    },
    GameDefinition {
        game_type: GameType::Kino,
        display_name: "Kino",
        description: "10 números del 1 al 80",
        domain: NumberRange::new(1, 80),
        draw_size: 10,
        secondary: None,
        two_digit: false,
    },
    GameDefinition {
        game_type: GameType::Pale,
        display_name: "Pale",
        description: "2 números del 00 al 99",
        domain: NumberRange::new(0, 99),
        draw_size: 2,
        secondary: None,
        two_digit: true,
    },
    GameDefinition {
        game_type: GameType::Tripleta,
        display_name: "Tripleta",
        description: "3 números del 00 al 99",
        domain: NumberRange::new(0, 99),
        draw_size: 3,
        secondary: None,
        two_digit: true,
    },
];

pub fn all() -> &'static [GameDefinition] {
    &GAMES
}

pub fn definition(game: GameType) -> &'static GameDefinition {
    match game {
        GameType::Leidsa => &GAMES[0],
        GameType::Kino => &GAMES[1],
        GameType::Pale => &GAMES[2],
        GameType::Tripleta => &GAMES[3],
    }
}

pub fn lookup(name: &str) -> Result<&'static GameDefinition, LottoError> {
    Ok(definition(name.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definitions_match_their_game_type() {
        for game in GameType::ALL {
            assert_eq!(definition(game).game_type, game);
        }
    }

    #[test]
    fn draw_size_fits_domain() {
        for def in all() {
            assert!(def.draw_size <= def.domain.len(), "{}", def.display_name);
        }
    }

    #[test]
    fn only_leidsa_has_mas() {
        let with_mas: Vec<_> = all().iter().filter(|d| d.has_secondary()).collect();
        assert_eq!(with_mas.len(), 1);
        assert_eq!(with_mas[0].game_type, GameType::Leidsa);
        assert_eq!(with_mas[0].secondary, Some(NumberRange::new(1, 12)));
    }

    #[test]
    fn lookup_rejects_unknown_names() {
        assert_eq!(lookup("tripleta").unwrap().draw_size, 3);
        assert!(matches!(lookup("powerball"), Err(LottoError::InvalidGameType(_))));
    }

    #[test]
    fn pale_numbers_are_zero_padded() {
        assert_eq!(definition(GameType::Pale).format_number(7), "07");
        assert_eq!(definition(GameType::Kino).format_number(7), "7");
    }
}
