pub mod forward_query;
pub mod intercept_query;
pub mod reply;

pub use forward_query::ForwardQueryUseCase;
pub use intercept_query::InterceptQueryUseCase;
