//! Random combination generation. Pure with respect to storage.

use std::sync::Arc;

use crate::catalog::{self, GameDefinition};
use crate::error::LottoError;
use crate::ports::RandomPort;
use crate::types::{Draw, GameType, GenerateOptions};

/// Most combinations one saved request may produce.
pub const MAX_QUANTITY: u32 = 10;
/// Most combinations an anonymous demo request may produce.
pub const MAX_DEMO_QUANTITY: u32 = 5;

pub struct DrawGenerator {
    random: Arc<dyn RandomPort>,
}

impl DrawGenerator {
    pub fn new(random: Arc<dyn RandomPort>) -> Self {
        Self { random }
    }

    pub fn generate(&self, game: GameType, options: GenerateOptions) -> Result<Draw, LottoError> {
        let def = catalog::definition(game);
        check_options(def, options)?;

        let main_numbers = if options.secondary_only {
            Vec::new()
        } else {
            self.pick_distinct(def)
        };

        let secondary_number = match def.secondary {
            Some(range) if options.include_secondary || options.secondary_only => {
                Some(self.random.gen_range(range.min, range.max))
            }
            _ => None,
        };

        Ok(Draw {
            main_numbers,
            secondary_number,
        })
    }

    pub fn generate_many(
        &self,
        game: GameType,
        options: GenerateOptions,
        quantity: u32,
        max_quantity: u32,
    ) -> Result<Vec<Draw>, LottoError> {
        if quantity == 0 || quantity > max_quantity {
            return Err(LottoError::invalid_options(format!(
                "quantity must be between 1 and {}, got {}",
                max_quantity, quantity
            )));
        }
        (0..quantity).map(|_| self.generate(game, options)).collect()
    }

    // Rejection sampling: redraw until `draw_size` distinct values are chosen.
    fn pick_distinct(&self, def: &GameDefinition) -> Vec<u8> {
        let mut numbers = Vec::with_capacity(def.draw_size);
        while numbers.len() < def.draw_size {
            let candidate = self.random.gen_range(def.domain.min, def.domain.max);
            if !numbers.contains(&candidate) {
                numbers.push(candidate);
            }
        }
        numbers.sort_unstable();
        numbers
    }
}

fn check_options(def: &GameDefinition, options: GenerateOptions) -> Result<(), LottoError> {
    if options.include_secondary && options.secondary_only {
        return Err(LottoError::invalid_options(
            "include_secondary and secondary_only are mutually exclusive",
        ));
    }
    if (options.include_secondary || options.secondary_only) && !def.has_secondary() {
        return Err(LottoError::invalid_options(format!(
            "{} has no Más number",
            def.display_name
        )));
    }
    Ok(())
}

/// Checks that a draw handed in by a caller could have come out of
/// [`DrawGenerator::generate`] for `game`.
pub fn validate_draw(game: GameType, draw: &Draw) -> Result<(), LottoError> {
    let def = catalog::definition(game);

    if draw.main_numbers.is_empty() {
        if draw.secondary_number.is_none() {
            return Err(LottoError::invalid_options("draw has no numbers"));
        }
    } else {
        if draw.main_numbers.len() != def.draw_size {
            return Err(LottoError::invalid_options(format!(
                "{} needs {} numbers, got {}",
                def.display_name,
                def.draw_size,
                draw.main_numbers.len()
            )));
        }
        if let Some(n) = draw.main_numbers.iter().find(|n| !def.domain.contains(**n)) {
            return Err(LottoError::invalid_options(format!(
                "{} is outside {}..={}",
                n, def.domain.min, def.domain.max
            )));
        }
        if draw.main_numbers.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LottoError::invalid_options(
                "numbers must be distinct and ascending",
            ));
        }
    }

    if let Some(mas) = draw.secondary_number {
        match def.secondary {
            Some(range) if range.contains(mas) => {}
            Some(range) => {
                return Err(LottoError::invalid_options(format!(
                    "Más {} is outside {}..={}",
                    mas, range.min, range.max
                )));
            }
            None => {
                return Err(LottoError::invalid_options(format!(
                    "{} has no Más number",
                    def.display_name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SeededRandom;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Replays a fixed script of values.
    struct ScriptedRandom {
        values: Mutex<Vec<u8>>,
    }

    impl ScriptedRandom {
        fn new(mut values: Vec<u8>) -> Self {
            values.reverse();
            Self {
                values: Mutex::new(values),
            }
        }
    }

    impl RandomPort for ScriptedRandom {
        fn gen_range(&self, min: u8, _max: u8) -> u8 {
            self.values.lock().unwrap().pop().unwrap_or(min)
        }

        fn gen_uuid(&self) -> Uuid {
            Uuid::nil()
        }
    }

    fn seeded() -> DrawGenerator {
        DrawGenerator::new(Arc::new(SeededRandom::new(7)))
    }

    #[test]
    fn every_game_produces_valid_sorted_distinct_numbers() {
        let generator = seeded();
        for game in GameType::ALL {
            let def = catalog::definition(game);
            for _ in 0..200 {
                let draw = generator.generate(game, GenerateOptions::default()).unwrap();
                assert_eq!(draw.main_numbers.len(), def.draw_size);
                assert!(draw.main_numbers.iter().all(|n| def.domain.contains(*n)));
                assert!(draw.main_numbers.windows(2).all(|w| w[0] < w[1]));
                assert_eq!(draw.secondary_number, None);
                validate_draw(game, &draw).unwrap();
            }
        }
    }

    #[test]
    fn duplicates_are_redrawn() {
        let generator = DrawGenerator::new(Arc::new(ScriptedRandom::new(vec![42, 42, 42, 7])));
        let draw = generator.generate(GameType::Pale, GenerateOptions::default()).unwrap();
        assert_eq!(draw.main_numbers, vec![7, 42]);
    }

    #[test]
    fn leidsa_with_mas() {
        let generator = seeded();
        for _ in 0..100 {
            let draw = generator
                .generate(GameType::Leidsa, GenerateOptions::with_secondary())
                .unwrap();
            assert_eq!(draw.main_numbers.len(), 6);
            let mas = draw.secondary_number.unwrap();
            assert!((1..=12).contains(&mas));
        }
    }

    #[test]
    fn leidsa_mas_only() {
        let draw = seeded()
            .generate(GameType::Leidsa, GenerateOptions::secondary_only())
            .unwrap();
        assert!(draw.main_numbers.is_empty());
        assert!((1..=12).contains(&draw.secondary_number.unwrap()));
    }

    #[test]
    fn secondary_requests_rejected_for_games_without_mas() {
        let generator = seeded();
        for game in [GameType::Pale, GameType::Tripleta, GameType::Kino] {
            for options in [GenerateOptions::with_secondary(), GenerateOptions::secondary_only()] {
                assert!(matches!(
                    generator.generate(game, options),
                    Err(LottoError::InvalidOptions(_))
                ));
            }
        }
    }

    #[test]
    fn conflicting_options_rejected() {
        let options = GenerateOptions {
            include_secondary: true,
            secondary_only: true,
        };
        assert!(matches!(
            seeded().generate(GameType::Leidsa, options),
            Err(LottoError::InvalidOptions(_))
        ));
    }

    #[test]
    fn quantity_is_bounded() {
        let generator = seeded();
        let draws = generator
            .generate_many(GameType::Kino, GenerateOptions::default(), 3, MAX_QUANTITY)
            .unwrap();
        assert_eq!(draws.len(), 3);
        assert!(generator
            .generate_many(GameType::Kino, GenerateOptions::default(), 0, MAX_QUANTITY)
            .is_err());
        assert!(generator
            .generate_many(GameType::Kino, GenerateOptions::default(), 6, MAX_DEMO_QUANTITY)
            .is_err());
    }

    #[test]
    fn validate_draw_rejects_malformed_input() {
        let bad = [
            Draw { main_numbers: vec![3, 1], secondary_number: None },
            Draw { main_numbers: vec![1, 1], secondary_number: None },
            Draw { main_numbers: vec![1, 100], secondary_number: None },
            Draw { main_numbers: vec![1, 2, 3], secondary_number: None },
            Draw { main_numbers: vec![1, 2], secondary_number: Some(3) },
            Draw { main_numbers: vec![], secondary_number: None },
        ];
        for draw in bad {
            assert!(validate_draw(GameType::Pale, &draw).is_err(), "{:?}", draw);
        }
        let mas_out_of_range = Draw {
            main_numbers: vec![1, 2, 3, 4, 5, 6],
            secondary_number: Some(13),
        };
        assert!(validate_draw(GameType::Leidsa, &mas_out_of_range).is_err());
        let pale_zero = Draw { main_numbers: vec![0, 99], secondary_number: None };
        assert!(validate_draw(GameType::Pale, &pale_zero).is_ok());
    }
}
