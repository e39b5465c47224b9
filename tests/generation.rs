use std::collections::HashSet;
use std::sync::Arc;

use lotto_rd::clock::SeededRandom;
use lotto_rd::generator::{MAX_DEMO_QUANTITY, MAX_QUANTITY};
use lotto_rd::{DrawGenerator, GameType, GenerateOptions, LottoError, catalog};

fn generator(seed: u64) -> DrawGenerator {
    DrawGenerator::new(Arc::new(SeededRandom::new(seed)))
}

#[test]
fn draws_are_in_range_distinct_and_sorted() {
    let generator = generator(2026);
    for game in GameType::ALL {
        let def = catalog::definition(game);
        for _ in 0..300 {
            let draw = generator.generate(game, GenerateOptions::default()).unwrap();
            assert_eq!(draw.main_numbers.len(), def.draw_size, "{}", game);
            assert!(draw.main_numbers.iter().all(|n| def.domain.contains(*n)));
            assert!(draw.main_numbers.windows(2).all(|w| w[0] < w[1]));
            let distinct: HashSet<_> = draw.main_numbers.iter().collect();
            assert_eq!(distinct.len(), def.draw_size);
            assert_eq!(draw.secondary_number, None);
        }
    }
}

#[test]
fn pale_and_tripleta_reach_zero_and_ninety_nine() {
    let generator = generator(99);
    let mut seen = HashSet::new();
    for _ in 0..2000 {
        let draw = generator
            .generate(GameType::Tripleta, GenerateOptions::default())
            .unwrap();
        seen.extend(draw.main_numbers);
    }
    assert!(seen.contains(&0));
    assert!(seen.contains(&99));
}

#[test]
fn leidsa_mas_options() {
    let generator = generator(5);
    for _ in 0..200 {
        let with_mas = generator
            .generate(GameType::Leidsa, GenerateOptions::with_secondary())
            .unwrap();
        assert_eq!(with_mas.main_numbers.len(), 6);
        assert!(matches!(with_mas.secondary_number, Some(1..=12)));

        let only_mas = generator
            .generate(GameType::Leidsa, GenerateOptions::secondary_only())
            .unwrap();
        assert!(only_mas.main_numbers.is_empty());
        assert!(matches!(only_mas.secondary_number, Some(1..=12)));
    }
}

#[test]
fn mas_is_rejected_for_other_games() {
    let generator = generator(1);
    for game in [GameType::Kino, GameType::Pale, GameType::Tripleta] {
        for options in [GenerateOptions::with_secondary(), GenerateOptions::secondary_only()] {
            let err = generator.generate(game, options).unwrap_err();
            assert!(matches!(err, LottoError::InvalidOptions(_)), "{}", game);
        }
    }

    let both = GenerateOptions {
        include_secondary: true,
        secondary_only: true,
    };
    assert!(generator.generate(GameType::Leidsa, both).is_err());
}

#[test]
fn quantity_is_bounded() {
    let generator = generator(3);
    let options = GenerateOptions::default();
    assert_eq!(
        generator
            .generate_many(GameType::Kino, options, MAX_QUANTITY, MAX_QUANTITY)
            .unwrap()
            .len(),
        10
    );
    assert!(generator.generate_many(GameType::Kino, options, 0, MAX_QUANTITY).is_err());
    assert!(generator.generate_many(GameType::Kino, options, 11, MAX_QUANTITY).is_err());
    assert!(
        generator
            .generate_many(GameType::Pale, options, 6, MAX_DEMO_QUANTITY)
            .is_err()
    );
}

#[test]
fn game_names_parse_case_insensitively() {
    assert_eq!("LEIDSA".parse::<GameType>().unwrap(), GameType::Leidsa);
    assert!(matches!(
        "loto".parse::<GameType>(),
        Err(LottoError::InvalidGameType(_))
    ));
    assert_eq!(catalog::all().len(), 4);
}
