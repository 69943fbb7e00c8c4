pub mod prelude;

pub mod activity_logs;
pub mod api_keys;
pub mod apps;
pub mod deployments;
pub mod functions;
pub mod users;
