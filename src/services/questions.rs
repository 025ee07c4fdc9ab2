//! Question and target generation for every duel mode.

use rand::{
    Rng,
    seq::{IndexedRandom, SliceRandom},
};

use crate::{
    config::AppConfig,
    countries::{Country, CountryCatalog},
    state::{
        DuelError,
        room::{Continent, DuelMode, DuelPool, DuelQuestion},
        state_machine::MatchSetup,
    },
};

/// Smallest country list accepted for a continent pool or quiz.
pub const MIN_POOL_COUNTRIES: usize = 8;

/// Validate a pool requested at creation; anything unusable silently becomes the world pool.
pub fn sanitize_pool(
    kind: Option<&str>,
    continent: Option<&str>,
    allowed: &[String],
    catalog: &CountryCatalog,
) -> DuelPool {
    if kind != Some("continent") {
        return DuelPool::World;
    }
    let Some(continent) = continent.and_then(Continent::parse) else {
        return DuelPool::World;
    };

    let countries = catalog.canonical_subset(allowed);
    if countries.len() < MIN_POOL_COUNTRIES {
        return DuelPool::World;
    }

    DuelPool::Continent {
        continent,
        countries,
    }
}

/// Everything a match of `mode` is played over.
pub fn build_match<R: Rng + ?Sized>(
    mode: DuelMode,
    pool: &DuelPool,
    continent: Option<&str>,
    allowed: &[String],
    catalog: &CountryCatalog,
    config: &AppConfig,
    rng: &mut R,
) -> Result<MatchSetup, DuelError> {
    match mode {
        DuelMode::WorldQuiz => {
            let targets = catalog.names();
            Ok(MatchSetup {
                mode,
                rounds: targets.len(),
                duration_seconds: config.world_quiz_duration_seconds,
                questions: Vec::new(),
                target_countries: targets,
                focus_region: None,
            })
        }
        DuelMode::ContinentQuiz => {
            let continent = continent
                .and_then(Continent::parse)
                .ok_or(DuelError::ContinentRequired)?;
            let targets = catalog.canonical_subset(allowed);
            if targets.len() < MIN_POOL_COUNTRIES {
                return Err(DuelError::ContinentCountriesRequired);
            }
            Ok(MatchSetup {
                mode,
                rounds: targets.len(),
                duration_seconds: continent.quiz_duration_seconds(),
                questions: Vec::new(),
                target_countries: targets,
                focus_region: Some(continent),
            })
        }
        DuelMode::NeighbourChain | DuelMode::CapitalGuess => {
            let rounds = config.discrete_rounds;
            Ok(MatchSetup {
                mode,
                rounds,
                duration_seconds: config.discrete_duration_seconds,
                questions: questions_for_mode(mode, pool, rounds, catalog, rng),
                target_countries: Vec::new(),
                focus_region: None,
            })
        }
    }
}

/// Discrete question list for `mode`. Open-target modes get none.
pub fn questions_for_mode<R: Rng + ?Sized>(
    mode: DuelMode,
    pool: &DuelPool,
    rounds: usize,
    catalog: &CountryCatalog,
    rng: &mut R,
) -> Vec<DuelQuestion> {
    match mode {
        DuelMode::NeighbourChain => neighbour_questions(rounds, catalog, rng),
        DuelMode::CapitalGuess => pool_questions(mode, pool, rounds, catalog, rng),
        DuelMode::WorldQuiz | DuelMode::ContinentQuiz => Vec::new(),
    }
}

/// Neighbours of one random seed country, always drawn from the whole world.
fn neighbour_questions<R: Rng + ?Sized>(
    rounds: usize,
    catalog: &CountryCatalog,
    rng: &mut R,
) -> Vec<DuelQuestion> {
    let viable = catalog
        .countries()
        .iter()
        .filter(|country| !country.neighbors.is_empty())
        .collect::<Vec<_>>();

    let Some(seed) = viable.choose(rng) else {
        return world_questions(DuelMode::WorldQuiz, rounds, catalog, rng);
    };

    seed.neighbors
        .iter()
        .take(rounds)
        .enumerate()
        .map(|(idx, neighbor)| DuelQuestion {
            idx,
            prompt: format!("Neighbor of {}", seed.name),
            answer: neighbor.clone(),
            country: neighbor.clone(),
            capital: catalog.capital_of(neighbor).unwrap_or_default().to_owned(),
        })
        .collect()
}

/// Random picks from the continent subset when it is large enough, otherwise from the world.
fn pool_questions<R: Rng + ?Sized>(
    mode: DuelMode,
    pool: &DuelPool,
    rounds: usize,
    catalog: &CountryCatalog,
    rng: &mut R,
) -> Vec<DuelQuestion> {
    let DuelPool::Continent { countries, .. } = pool else {
        return world_questions(mode, rounds, catalog, rng);
    };

    let mut source = catalog
        .countries()
        .iter()
        .filter(|country| countries.contains(&country.name))
        .collect::<Vec<_>>();
    if source.len() < MIN_POOL_COUNTRIES {
        return world_questions(mode, rounds, catalog, rng);
    }

    source.shuffle(rng);
    source
        .into_iter()
        .take(rounds)
        .enumerate()
        .map(|(idx, country)| question_for(mode, idx, country))
        .collect()
}

fn world_questions<R: Rng + ?Sized>(
    mode: DuelMode,
    rounds: usize,
    catalog: &CountryCatalog,
    rng: &mut R,
) -> Vec<DuelQuestion> {
    let mut source = catalog
        .countries()
        .iter()
        .filter(|country| !country.name.is_empty() && !country.capital.is_empty())
        .collect::<Vec<_>>();
    source.shuffle(rng);
    source
        .into_iter()
        .take(rounds)
        .enumerate()
        .map(|(idx, country)| question_for(mode, idx, country))
        .collect()
}

/// Capital guess prompts with the country; every other mode prompts with the capital.
fn question_for(mode: DuelMode, idx: usize, country: &Country) -> DuelQuestion {
    let (prompt, answer) = match mode {
        DuelMode::CapitalGuess => (country.name.clone(), country.capital.clone()),
        _ => (country.capital.clone(), country.name.clone()),
    };
    DuelQuestion {
        idx,
        prompt,
        answer,
        country: country.name.clone(),
        capital: country.capital.clone(),
    }
}
