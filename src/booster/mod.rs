pub mod resolver;
pub mod session;

pub use resolver::{draw_pack, draw_rarity, resolve_card_ids, PackDraw, RarityResolver};
pub use session::{
    Delivery, RequestToken, RevealEvent, RevealMachine, RevealObserver, RevealPhase,
    RevealSession,
};
