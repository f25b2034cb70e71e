//! Vision/language backend clients

mod gemini;
mod prompts;

pub use gemini::GeminiClient;
