pub mod classify;
pub mod consts;
pub mod engine;
pub mod error;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod stack;
