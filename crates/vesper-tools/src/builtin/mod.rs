// SPDX-License-Identifier: Apache-2.0
mod book_hotel;
mod navigate_to;
mod open_window;
mod play_music;
mod send_message;
mod set_temperature;

pub use book_hotel::BookHotel;
pub use navigate_to::NavigateTo;
pub use open_window::OpenWindow;
pub use play_music::PlayMusic;
pub use send_message::SendMessage;
pub use set_temperature::SetTemperature;

use crate::registry::ToolRegistry;

/// Registers the representative vehicle tool catalog: a stand-in for the
/// production system's much larger tool catalog, covering `navigation`,
/// `media`, `climate`, `comfort`, and `travel`, plus the `chat_agent`
/// fallback's `send_message`.
pub fn register_all(registry: &mut ToolRegistry) {
    registry.register(NavigateTo);
    registry.register(PlayMusic);
    registry.register(SetTemperature);
    registry.register(OpenWindow);
    registry.register(BookHotel);
    registry.register(SendMessage);
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
