mod batch;
mod feeds;
mod parse;
mod pipeline;
mod run;

pub use run::{run_csv, run_imdb};
