pub mod admin;
pub mod adyen;
pub mod api_errors;
