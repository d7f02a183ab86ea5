pub mod session;
pub mod token;

pub use session::{SessionSnapshot, SessionStore};
pub use token::{Base64JsonCodec, TokenCodec};
