pub mod booster;
pub mod card;
pub mod collection;
pub mod rarity;

pub use booster::*;
pub use card::*;
pub use collection::*;
pub use rarity::*;
