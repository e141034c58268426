pub mod middleware;
pub mod response;

pub use response::ErrorBody;
