//! RPC 传输
//!
//! 一行一个 JSON 请求、一行一个 JSON 应答，跑在 TCP 上。

mod client;
mod server;
mod wire;

pub use client::RpcClient;
pub use server::{dispatch, serve, serve_connection};
pub use wire::{Payload, RemoteError, Reply, Request};
