pub mod character;
pub mod config;
pub mod content;
pub mod database;
pub mod dungeon;
pub mod error;
pub mod game;
pub mod network;

pub use character::*;
pub use config::*;
pub use content::*;
pub use database::*;
pub use dungeon::*;
pub use error::*;
pub use game::*;
pub use network::*;
