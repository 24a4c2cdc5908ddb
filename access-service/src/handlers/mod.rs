pub mod audit;
pub mod authz;
pub mod masquerade;
pub mod members;
pub mod metrics;
pub mod rules;
