pub mod primop;
pub mod runtime;
pub mod scenarios;
