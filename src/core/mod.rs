//! The four inner proximal-gradient solvers (§4.4-§4.7): PANOC and ZeroFPR
//! share the forward-backward-envelope line-search kernel in [`fbe`];
//! FISTA and PANTR are built directly on [`crate::problem::Problem`] since
//! neither uses a line search against that merit function.

pub mod fbe;
pub mod fista;
pub mod panoc;
pub mod pantr;
pub mod zerofpr;
