pub mod context;
pub mod error;
pub mod session;

pub use context::{AppContext, Backend};
pub use error::{EddyError, Result};
pub use session::SessionContext;
