//! Integration tests for the bridge.
//!
//! Everything that touches HTTP runs against [`harness::MockHttpServer`],
//! a minimal HTTP/1.1 server on a loopback port that records requests and
//! serves queued responses.
