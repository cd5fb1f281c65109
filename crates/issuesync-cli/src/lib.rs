pub mod cmd;
pub mod input;
pub mod output;
pub mod pipeline;
