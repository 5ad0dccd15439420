mod enrich;
mod output;
mod router;
mod run;
#[cfg(test)]
mod tests;

pub use run::run;
