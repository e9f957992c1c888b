//! Server-side cursor lifecycle: naming, declaration, forward fetch, close.

mod descriptor;
mod fetch;
mod name;
mod session;


pub use descriptor::CursorDescriptor;
pub use fetch::RowBatchFetcher;
pub use name::{CursorName, CursorNameAllocator};
pub use session::{CursorSession, SessionState};
