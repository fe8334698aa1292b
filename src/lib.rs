pub mod config;
pub mod connection;
pub mod exception;
pub mod param;
pub mod producer;
pub mod request;
pub mod resolver;
pub mod response;
pub mod server;
pub mod uri;
pub mod util;

pub use config::Config;
pub use connection::Connection;
pub use exception::Exception;
pub use param::HttpRequestMethod;
pub use producer::ContentProducer;
pub use request::Request;
pub use resolver::{Outcome, ParsedTarget};
pub use response::Response;
pub use server::{run_workers, Server};
