mod http;

pub mod runner;

pub use http::{
    Error, HttpClient, HttpRequest, HttpResponse, Result, TransportErrorKind,
};
pub use reqwest::Method;
