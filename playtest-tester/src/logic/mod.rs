pub mod assets;
pub mod reports;
pub mod seeds;
pub mod skirmish;

pub use assets::TesterAssets;
pub use seeds::SeedInput;
pub use skirmish::SkirmishFactory;
