pub mod aggregate;
pub mod output;
pub mod parser;
pub mod repair;
pub mod series;
