//! Test utilities shared by integration tests

mod proxy;

pub use proxy::FakeProxy;
