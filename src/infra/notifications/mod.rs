pub mod http_email_dispatcher;
pub mod in_app_dispatcher;
