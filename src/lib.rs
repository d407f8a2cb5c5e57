// Authorship: AI-generated vs human-written text detection service.
//
// This is the library root. Each module corresponds to one stage of the
// request-intake pipeline, plus the web server that wires them together.

pub mod classifier;
pub mod config;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod rate_limit;
pub mod validate;
pub mod web;
