pub mod changelog;
pub mod notifications;
pub mod projects;
pub mod repositories;
