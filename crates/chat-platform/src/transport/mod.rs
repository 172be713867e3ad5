pub mod fetch;

pub use fetch::FetchStreamTransport;
