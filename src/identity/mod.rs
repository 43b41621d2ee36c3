//! Game identity resolution and key construction

mod keys;
mod resolver;

pub use keys::{constructed_keys, placeholder_key, season_label};
pub use resolver::{GameIdentity, Resolution, ResolvedBy, resolve_game};
