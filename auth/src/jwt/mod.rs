pub mod claims;
pub mod errors;
pub mod handler;

pub use claims::Claims;
pub use errors::JwtError;
pub use handler::issue_token;
pub use handler::verify_token;
pub use handler::IssuedToken;
pub use handler::JwtHandler;
pub use handler::DEFAULT_TOKEN_TTL_SECS;
