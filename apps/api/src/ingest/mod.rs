pub mod extract;
pub mod fallback;
pub mod handlers;
pub mod normalize;
pub mod pipeline;
