pub mod config;
pub mod devauth;
pub mod error;
pub mod guard;
pub mod http;
pub mod identity;
pub mod routing;
pub mod storage;
