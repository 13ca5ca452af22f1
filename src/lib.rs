// Export modules for use in tests
pub mod app;
pub mod bookmarks;
pub mod cursor;
pub mod extract;
pub mod jump_menu;
pub mod library;
pub mod outline;
pub mod reflow;
pub mod session;
pub mod theme;

pub use app::App;
pub use session::{Bookmark, SessionState, SessionStore};
