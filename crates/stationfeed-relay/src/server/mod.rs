pub mod app;
pub mod status_page;
pub mod websocket;

pub use app::*;
pub use status_page::*;
pub use websocket::*;
