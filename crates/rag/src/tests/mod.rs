//! Pipeline scenario tests against in-memory collaborators.

mod controller_scenarios;
