// Library root: player aging projections, trained-model loading, and the
// season simulator built on top of them.

pub mod forecast;
pub mod models;
pub mod season;
pub mod tables;
