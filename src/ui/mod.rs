//! Server-rendered HTML.
//!
//! The page is plain HTML with two forms, so it works without any client-side
//! framework. All transcript text is escaped before it is interpolated.

mod page;

pub use page::render_chat_page;
