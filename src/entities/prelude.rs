pub use super::activity_logs::Entity as ActivityLogs;
pub use super::api_keys::Entity as ApiKeys;
pub use super::apps::Entity as Apps;
pub use super::deployments::Entity as Deployments;
pub use super::functions::Entity as Functions;
pub use super::users::Entity as Users;
