pub mod enrollment;
pub mod results;
