use wasm_bindgen::prelude::*;
use haunt_engine::*;

mod board;
mod character;
mod game;
mod shop;
mod tutorial;
use game::Soulkeeper;

haunt_web::export_game!(Soulkeeper, "soulkeeper");
