pub mod request;
pub mod routing;
