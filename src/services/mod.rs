pub mod comps;
pub mod dcf;
pub mod market;
pub mod projections;
pub mod report;
pub mod sheets;
pub mod valuation;
