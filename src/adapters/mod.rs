pub mod auth_middleware;
pub mod file_manager_handler;
pub mod health_handler;
pub mod metrics_handler;
pub mod prompt_handler;

#[cfg(test)]
mod file_manager_handler_test;
