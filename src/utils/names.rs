//! Cosmetic display names for new holder identities

use rand::seq::SliceRandom;
use uuid::Uuid;

const ADJECTIVES: &[&str] = &[
    "silent", "fuzzy", "tiny", "wild", "sleepy", "noisy", "brave", "elegant", "mighty", "zesty",
    "shiny", "weird", "bright", "slow", "quick", "lazy", "funny", "grumpy", "loopy", "snappy",
    "cranky", "fancy", "nimble", "silly", "charming", "bouncy", "quirky", "jazzy", "dreamy",
    "witty", "zany", "crafty", "dizzy", "jolly", "plucky", "spunky", "wobbly", "spicy", "clumsy",
    "frisky",
];

const SCIENTISTS: &[&str] = &[
    "turing", "curie", "lovelace", "einstein", "fermat", "newton", "hopper", "bohr", "planck",
    "darwin", "pasteur", "tesla", "gauss", "galilei", "archimedes", "feynman", "kepler", "dirac",
    "leonardo", "copernicus", "berners", "torvalds", "godel", "bernoulli", "noether",
    "mandelbrot", "heisenberg", "babbage", "knuth", "von_neumann", "da_vinci", "ada", "euclid",
    "euler", "marconi", "volta", "ohm", "boole",
];

/// `<adjective>_<scientist>_<5 hex chars>`, e.g. `jolly_noether_3fa9c`.
/// Not unique and never used as a key.
pub fn generate_holder_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("anonymous");
    let scientist = SCIENTISTS.choose(&mut rng).copied().unwrap_or("holder");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}", adjective, scientist, &suffix[..5])
}
