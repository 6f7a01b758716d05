pub mod aggregate;
pub mod chart;
