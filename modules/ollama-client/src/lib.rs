mod client;
mod traits;

pub use client::OllamaClient;
pub use traits::TextGenerator;
